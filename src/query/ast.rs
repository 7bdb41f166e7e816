//! Filter AST
//!
//! A closed set of node kinds; evaluation is an exhaustive match over it.
//! Nodes are immutable. The only per-execution state (the `_limit`
//! counters) lives in the evaluator, indexed by each limit node's slot.

use std::fmt::Write;

use crate::model::{Attribute, AttributeRegistry, PwnDirection, PwnMethod};

/// Integer ordering used by numeric, count, length and random predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparator {
    /// Applies the ordering: `a <op> b`
    pub fn compare(&self, a: i64, b: i64) -> bool {
        match self {
            Comparator::Equal => a == b,
            Comparator::Less => a < b,
            Comparator::LessOrEqual => a <= b,
            Comparator::Greater => a > b,
            Comparator::GreaterOrEqual => a >= b,
        }
    }

    /// Returns the filter syntax for this comparator
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::Greater => ">",
            Comparator::GreaterOrEqual => ">=",
        }
    }
}

/// A parsed filter node
#[derive(Debug, Clone)]
pub enum FilterNode {
    /// All children match
    And(Vec<FilterNode>),
    /// Any child matches
    Or(Vec<FilterNode>),
    /// Child does not match
    Not(Box<FilterNode>),
    /// Attribute has at least one value
    Present { attribute: Attribute },
    /// Some value equals `value` exactly
    Equals { attribute: Attribute, value: String },
    /// Some value equals `value` ignoring case; `value` is lower-cased
    EqualsIgnoreCase { attribute: Attribute, value: String },
    /// Some value matches a shell-style wildcard pattern
    Glob {
        attribute: Attribute,
        pattern: glob::Pattern,
        case_sensitive: bool,
    },
    /// Some value matches a regular expression
    Regex {
        attribute: Attribute,
        regex: regex::Regex,
        case_sensitive: bool,
    },
    /// Integer projection compared against `value`
    Compare {
        attribute: Attribute,
        comparator: Comparator,
        value: i64,
    },
    /// Every bit of `mask` is set
    BitAnd { attribute: Attribute, mask: i64 },
    /// Any bit of `mask` is set
    BitOr { attribute: Attribute, mask: i64 },
    /// Number of values compared against `value`
    Count {
        attribute: Attribute,
        comparator: Comparator,
        value: i64,
    },
    /// Some value's length compared against `value`
    Length {
        attribute: Attribute,
        comparator: Comparator,
        value: i64,
    },
    /// `dn` is reachable by following the attribute through DN references
    DnChain { attribute: Attribute, dn: String },
    /// Admits at most `max` objects per execution
    Limit { slot: usize, max: i64 },
    /// Uniform draw in [0, 100) compared against `value`
    Random100 { comparator: Comparator, value: i64 },
    /// Attack-path edge test
    Pwn {
        direction: PwnDirection,
        method: Option<PwnMethod>,
        target: Option<Box<FilterNode>>,
    },
}

impl FilterNode {
    /// Returns the (attribute, literal) of an index-eligible equality node
    pub fn exact_match(&self) -> Option<(Attribute, &str)> {
        match self {
            FilterNode::Equals { attribute, value }
            | FilterNode::EqualsIgnoreCase { attribute, value } => Some((*attribute, value)),
            _ => None,
        }
    }

    /// Returns true if this node or any descendant is a `_limit` node
    pub fn contains_limit(&self) -> bool {
        match self {
            FilterNode::Limit { .. } => true,
            FilterNode::And(children) | FilterNode::Or(children) => {
                children.iter().any(FilterNode::contains_limit)
            }
            FilterNode::Not(child) => child.contains_limit(),
            FilterNode::Pwn {
                target: Some(target),
                ..
            } => target.contains_limit(),
            _ => false,
        }
    }

    /// Short node kind name
    pub fn kind(&self) -> &'static str {
        match self {
            FilterNode::And(_) => "and",
            FilterNode::Or(_) => "or",
            FilterNode::Not(_) => "not",
            FilterNode::Present { .. } => "present",
            FilterNode::Equals { .. } => "equals",
            FilterNode::EqualsIgnoreCase { .. } => "equals_ignore_case",
            FilterNode::Glob { .. } => "glob",
            FilterNode::Regex { .. } => "regex",
            FilterNode::Compare { .. } => "compare",
            FilterNode::BitAnd { .. } => "bit_and",
            FilterNode::BitOr { .. } => "bit_or",
            FilterNode::Count { .. } => "count",
            FilterNode::Length { .. } => "length",
            FilterNode::DnChain { .. } => "dn_chain",
            FilterNode::Limit { .. } => "limit",
            FilterNode::Random100 { .. } => "random100",
            FilterNode::Pwn { .. } => "pwn",
        }
    }

    /// Renders the node back to filter text
    pub fn render(&self, registry: &AttributeRegistry) -> String {
        let mut out = String::new();
        self.render_into(registry, &mut out);
        out
    }

    fn render_into(&self, registry: &AttributeRegistry, out: &mut String) {
        let name = |attribute: &Attribute| escape(&registry.name(*attribute));

        // Writing to a String cannot fail
        let _ = match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                out.push('(');
                out.push(if matches!(self, FilterNode::And(_)) { '&' } else { '|' });
                for child in children {
                    child.render_into(registry, out);
                }
                out.push(')');
                Ok(())
            }
            FilterNode::Not(child) => {
                out.push_str("(!");
                child.render_into(registry, out);
                out.push(')');
                Ok(())
            }
            FilterNode::Present { attribute } => write!(out, "({}=*)", name(attribute)),
            FilterNode::Equals { attribute, value } => {
                write!(out, "({}:caseExactMatch:={})", name(attribute), escape(value))
            }
            FilterNode::EqualsIgnoreCase { attribute, value } => {
                write!(out, "({}={})", name(attribute), escape(value))
            }
            FilterNode::Glob {
                attribute,
                pattern,
                case_sensitive,
            } => write!(
                out,
                "({}{}={})",
                name(attribute),
                case_modifier(*case_sensitive),
                escape(pattern.as_str())
            ),
            FilterNode::Regex {
                attribute,
                regex,
                case_sensitive,
            } => write!(
                out,
                "({}{}=/{}/)",
                name(attribute),
                case_modifier(*case_sensitive),
                escape(regex.as_str())
            ),
            FilterNode::Compare {
                attribute,
                comparator,
                value,
            } => write!(out, "({}{}{})", name(attribute), comparator.symbol(), value),
            FilterNode::BitAnd { attribute, mask } => {
                write!(out, "({}:and:={})", name(attribute), mask)
            }
            FilterNode::BitOr { attribute, mask } => {
                write!(out, "({}:or:={})", name(attribute), mask)
            }
            FilterNode::Count {
                attribute,
                comparator,
                value,
            } => write!(
                out,
                "({}:count:{}{})",
                name(attribute),
                comparator.symbol(),
                value
            ),
            FilterNode::Length {
                attribute,
                comparator,
                value,
            } => write!(
                out,
                "({}:length:{}{})",
                name(attribute),
                comparator.symbol(),
                value
            ),
            FilterNode::DnChain { attribute, dn } => {
                write!(out, "({}:dnchain:={})", name(attribute), escape(dn))
            }
            FilterNode::Limit { max, .. } => write!(out, "(_limit={})", max),
            FilterNode::Random100 { comparator, value } => {
                write!(out, "(_random100{}{})", comparator.symbol(), value)
            }
            FilterNode::Pwn {
                direction,
                method,
                target,
            } => {
                let method = method.map_or("*", |m| m.as_str());
                match target {
                    Some(target) => write!(
                        out,
                        "({}={},{})",
                        direction.as_str(),
                        method,
                        target.render(registry)
                    ),
                    None => write!(out, "({}={})", direction.as_str(), method),
                }
            }
        };
    }
}

fn case_modifier(case_sensitive: bool) -> &'static str {
    if case_sensitive {
        ":caseExactMatch:"
    } else {
        ""
    }
}

/// Escapes characters the parser treats as syntax
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '(' | ')' | ':' | '=' | '<' | '>' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A parsed filter, ready to execute any number of times
#[derive(Debug, Clone)]
pub struct Filter {
    root: FilterNode,
    /// Initial counter for each `_limit` slot
    limits: Vec<i64>,
}

impl Filter {
    /// Wraps a node tree, collecting its `_limit` slots
    pub fn new(root: FilterNode) -> Self {
        let mut limits = Vec::new();
        collect_limits(&root, &mut limits);
        Self { root, limits }
    }

    pub fn root(&self) -> &FilterNode {
        &self.root
    }

    /// Initial counter values, indexed by slot
    pub fn limit_slots(&self) -> &[i64] {
        &self.limits
    }

    /// Returns true if evaluation order affects the result
    pub fn is_order_dependent(&self) -> bool {
        !self.limits.is_empty()
    }

    /// Renders the filter back to canonical text
    pub fn render(&self, registry: &AttributeRegistry) -> String {
        self.root.render(registry)
    }
}

fn collect_limits(node: &FilterNode, limits: &mut Vec<i64>) {
    match node {
        FilterNode::Limit { slot, max } => {
            if limits.len() <= *slot {
                limits.resize(*slot + 1, 0);
            }
            limits[*slot] = *max;
        }
        FilterNode::And(children) | FilterNode::Or(children) => {
            for child in children {
                collect_limits(child, limits);
            }
        }
        FilterNode::Not(child) => collect_limits(child, limits),
        FilterNode::Pwn {
            target: Some(target),
            ..
        } => collect_limits(target, limits),
        _ => {}
    }
}
