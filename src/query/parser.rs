//! Filter text parser
//!
//! Recursive descent over the raw filter string. Each step consumes a
//! recognized prefix; `parse` hands back whatever follows the outermost
//! query so callers can embed filters in larger inputs.
//!
//! ```text
//! query      := '(' expr ')'
//! expr       := '&' query+ | '|' query+ | '!' query | query | attrexpr
//! attrexpr   := attrname [':' modifier ':'] comparator value
//! comparator := '=' | '~=' | '<' | '<=' | '>' | '>='
//! ```
//!
//! A backslash takes the next character literally in names and values.

use glob::Pattern;
use regex::RegexBuilder;

use super::ast::{Comparator, Filter, FilterNode};
use super::errors::{QueryError, QueryErrorCode, QueryResult};
use crate::model::{index_key, AttributeRegistry, PwnDirection, PwnMethod};

/// Shortest input that can hold a filter, e.g. `(a=*)`
const MIN_QUERY_LEN: usize = 5;

/// Parses filter text into a `Filter`
///
/// Attribute names are interned through the registry, so a filter may name
/// attributes no object carries; those simply never match.
pub struct QueryParser<'r> {
    registry: &'r AttributeRegistry,
}

impl<'r> QueryParser<'r> {
    pub fn new(registry: &'r AttributeRegistry) -> Self {
        Self { registry }
    }

    /// Parses one query and returns it with the unconsumed remainder
    pub fn parse<'t>(&self, text: &'t str) -> QueryResult<(Filter, &'t str)> {
        if text.len() < MIN_QUERY_LEN {
            return Err(QueryError::too_short(text.len()));
        }
        if !text.starts_with('(') {
            return Err(QueryError::unbalanced("Query must start with '('", 0));
        }
        if !text.ends_with(')') {
            return Err(QueryError::unbalanced(
                "Query must end with ')'",
                text.len(),
            ));
        }

        let mut state = ParseState::new(self.registry, text, 0, 0);
        let root = state.query()?;
        Ok((Filter::new(root), &text[state.pos..]))
    }

    /// Parses one query, rejecting any trailing input
    pub fn parse_strict(&self, text: &str) -> QueryResult<Filter> {
        let (filter, rest) = self.parse(text)?;
        if !rest.is_empty() {
            return Err(QueryError::trailing_data(rest, text.len() - rest.len()));
        }
        Ok(filter)
    }
}

/// Cursor over one filter string
struct ParseState<'r, 't> {
    registry: &'r AttributeRegistry,
    text: &'t str,
    pos: usize,
    /// Offset of `text` within the outermost input, for error reporting
    base: usize,
    /// Next free `_limit` slot, shared with nested target filters
    next_slot: usize,
}

impl<'r, 't> ParseState<'r, 't> {
    fn new(registry: &'r AttributeRegistry, text: &'t str, base: usize, next_slot: usize) -> Self {
        Self {
            registry,
            text,
            pos: 0,
            base,
            next_slot,
        }
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect_open(&mut self) -> QueryResult<()> {
        match self.peek() {
            Some('(') => {
                self.bump();
                Ok(())
            }
            _ => Err(QueryError::unbalanced("Expected '('", self.offset())),
        }
    }

    fn expect_close(&mut self) -> QueryResult<()> {
        match self.peek() {
            Some(')') => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(QueryError::unbalanced(
                format!("Expected ')', found '{}'", c),
                self.offset(),
            )),
            None => Err(QueryError::unbalanced(
                "Expected ')' at end of input",
                self.offset(),
            )),
        }
    }

    fn query(&mut self) -> QueryResult<FilterNode> {
        self.expect_open()?;
        match self.peek() {
            Some('(') => {
                let inner = self.query()?;
                self.expect_close()?;
                Ok(inner)
            }
            Some('&') => {
                self.bump();
                Ok(FilterNode::And(self.group()?))
            }
            Some('|') => {
                self.bump();
                Ok(FilterNode::Or(self.group()?))
            }
            Some('!') => {
                self.bump();
                let inner = self.query()?;
                self.expect_close()?;
                Ok(FilterNode::Not(Box::new(inner)))
            }
            Some(_) => self.attribute_expression(),
            None => Err(QueryError::truncated("Query ends after '('", self.offset())),
        }
    }

    /// Subqueries of `&` / `|`, through the closing parenthesis
    fn group(&mut self) -> QueryResult<Vec<FilterNode>> {
        let start = self.offset();
        let mut children = Vec::new();
        while self.peek() == Some('(') {
            children.push(self.query()?);
        }
        if self.peek() == Some(')') && children.is_empty() {
            return Err(QueryError::empty_group(start));
        }
        self.expect_close()?;
        Ok(children)
    }

    fn escaped(&mut self) -> QueryResult<char> {
        let at = self.offset();
        self.bump();
        self.bump()
            .ok_or_else(|| QueryError::truncated("Escape at end of input", at))
    }

    fn attribute_expression(&mut self) -> QueryResult<FilterNode> {
        let name_start = self.offset();
        let mut name = String::new();
        let mut modifier = None;

        loop {
            match self.peek() {
                None => {
                    return Err(QueryError::truncated(
                        "Incomplete attribute name",
                        self.offset(),
                    ))
                }
                Some('\\') => name.push(self.escaped()?),
                Some(':') => {
                    modifier = Some(self.modifier()?);
                    break;
                }
                Some(')') => {
                    return Err(QueryError::unbalanced(
                        "Unexpected ')' in attribute name",
                        self.offset(),
                    ))
                }
                Some('~' | '=' | '<' | '>') => break,
                Some(c) => {
                    self.bump();
                    name.push(c);
                }
            }
        }

        if name.is_empty() {
            return Err(QueryError::empty_attribute(name_start));
        }

        let comparator = self.comparator()?;
        let value_start = self.offset();
        let nests_filter = name == "_canpwn" || name == "_pwnable";
        let value = self.value(nests_filter)?;

        let expression = Expression {
            name,
            name_start,
            modifier,
            comparator,
            value,
            value_start,
        };

        if expression.name.starts_with('_') {
            self.synthetic(expression)
        } else {
            self.ordinary(expression)
        }
    }

    /// `:modifier:`, returned with its offset
    fn modifier(&mut self) -> QueryResult<(String, usize)> {
        let at = self.offset();
        self.bump();
        let rest = &self.text[self.pos..];
        let end = rest
            .find(':')
            .ok_or_else(|| QueryError::truncated("Modifier has no closing ':'", at))?;
        let modifier = rest[..end].to_string();
        self.pos += end + 1;
        Ok((modifier, at))
    }

    fn comparator(&mut self) -> QueryResult<Comparator> {
        let at = self.offset();
        match self.bump() {
            Some('=') => Ok(Comparator::Equal),
            Some('~') => match self.bump() {
                Some('=') => Ok(Comparator::Equal),
                _ => Err(QueryError::invalid_comparator(
                    "'~' must be followed by '='",
                    at,
                )),
            },
            Some('<') => Ok(self.or_equal(Comparator::Less, Comparator::LessOrEqual)),
            Some('>') => Ok(self.or_equal(Comparator::Greater, Comparator::GreaterOrEqual)),
            Some(c) => Err(QueryError::invalid_comparator(
                format!("Expected comparator, found '{}'", c),
                at,
            )),
            None => Err(QueryError::truncated("Missing comparator", at)),
        }
    }

    fn or_equal(&mut self, strict: Comparator, inclusive: Comparator) -> Comparator {
        if self.peek() == Some('=') {
            self.bump();
            inclusive
        } else {
            strict
        }
    }

    /// Value text through the closing parenthesis, with escapes resolved.
    /// When `balanced`, parentheses inside the value must pair up, so a
    /// nested filter can be written without escaping; escapes are kept
    /// verbatim for the nested parser to resolve.
    fn value(&mut self, balanced: bool) -> QueryResult<String> {
        let mut value = String::new();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(QueryError::truncated("Incomplete value", self.offset())),
                Some('\\') if balanced => {
                    let c = self.escaped()?;
                    value.push('\\');
                    value.push(c);
                }
                Some('\\') => value.push(self.escaped()?),
                Some(')') if depth > 0 => {
                    self.bump();
                    depth -= 1;
                    value.push(')');
                }
                Some(')') => {
                    self.bump();
                    return Ok(value);
                }
                Some('(') if balanced => {
                    self.bump();
                    depth += 1;
                    value.push('(');
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
    }

    fn synthetic(&mut self, expr: Expression) -> QueryResult<FilterNode> {
        if let Some((modifier, at)) = &expr.modifier {
            return Err(QueryError::new(
                QueryErrorCode::UnknownModifier,
                format!(
                    "Modifier '{}' is not supported on synthetic attribute '{}'",
                    modifier, expr.name
                ),
                *at,
            ));
        }

        match expr.name.as_str() {
            "_limit" => {
                expr.require_equal()?;
                let max = expr.integer("limit")?;
                let slot = self.next_slot;
                self.next_slot += 1;
                Ok(FilterNode::Limit { slot, max })
            }
            "_random100" => Ok(FilterNode::Random100 {
                comparator: expr.comparator,
                value: expr.integer("random100")?,
            }),
            "_canpwn" | "_pwnable" => {
                expr.require_equal()?;
                let direction = if expr.name == "_canpwn" {
                    PwnDirection::CanPwn
                } else {
                    PwnDirection::PwnableBy
                };
                self.pwn(direction, &expr)
            }
            _ => Err(QueryError::unknown_synthetic(&expr.name, expr.name_start)),
        }
    }

    /// `method` or `method,nested-filter`; `*` or empty means any method
    fn pwn(&mut self, direction: PwnDirection, expr: &Expression) -> QueryResult<FilterNode> {
        let (method_name, nested) = match expr.value.split_once(',') {
            Some((method, nested)) => (method, Some(nested)),
            None => (expr.value.as_str(), None),
        };

        let method = match method_name {
            "" | "*" => None,
            name => Some(
                PwnMethod::from_name(name)
                    .map_err(|_| QueryError::unknown_method(name, expr.value_start))?,
            ),
        };

        let target = match nested {
            Some(text) => {
                let base = expr.value_start + method_name.len() + 1;
                Some(Box::new(self.nested(text, base)?))
            }
            None => None,
        };

        Ok(FilterNode::Pwn {
            direction,
            method,
            target,
        })
    }

    /// Strictly parses a nested target filter, sharing limit slots
    fn nested(&mut self, text: &str, base: usize) -> QueryResult<FilterNode> {
        if text.len() < MIN_QUERY_LEN {
            return Err(QueryError::new(
                QueryErrorCode::TooShort,
                format!("Nested target filter too short: '{}'", text),
                base,
            ));
        }

        let mut inner = ParseState::new(self.registry, text, base, self.next_slot);
        let node = inner.query()?;
        if inner.pos < text.len() {
            return Err(QueryError::trailing_data(&text[inner.pos..], inner.offset()));
        }
        self.next_slot = inner.next_slot;
        Ok(node)
    }

    fn ordinary(&mut self, expr: Expression) -> QueryResult<FilterNode> {
        let attribute = self.registry.attribute(&expr.name);

        let case_sensitive = match expr.modifier.as_ref().map(|(m, at)| (m.as_str(), *at)) {
            None => false,
            Some(("caseExactMatch", _)) => true,
            Some(("count", _)) => {
                return Ok(FilterNode::Count {
                    attribute,
                    comparator: expr.comparator,
                    value: expr.integer("count modifier")?,
                })
            }
            Some(("len" | "length", _)) => {
                return Ok(FilterNode::Length {
                    attribute,
                    comparator: expr.comparator,
                    value: expr.integer("length modifier")?,
                })
            }
            Some(("1.2.840.113556.1.4.803" | "and", _)) => {
                expr.require_equal()?;
                return Ok(FilterNode::BitAnd {
                    attribute,
                    mask: expr.integer("bitwise and")?,
                });
            }
            Some(("1.2.840.113556.1.4.804" | "or", _)) => {
                expr.require_equal()?;
                return Ok(FilterNode::BitOr {
                    attribute,
                    mask: expr.integer("bitwise or")?,
                });
            }
            Some(("1.2.840.113556.1.4.1941" | "dnchain", _)) => {
                expr.require_equal()?;
                return Ok(FilterNode::DnChain {
                    attribute,
                    dn: expr.value,
                });
            }
            Some((other, at)) => return Err(QueryError::unknown_modifier(other, at)),
        };

        if expr.comparator != Comparator::Equal {
            return Ok(FilterNode::Compare {
                attribute,
                comparator: expr.comparator,
                value: expr.integer("numeric comparison")?,
            });
        }

        let value = expr.value.as_str();
        if value == "*" {
            return Ok(FilterNode::Present { attribute });
        }

        if value.len() >= 2 && value.starts_with('/') && value.ends_with('/') {
            let regex = RegexBuilder::new(&value[1..value.len() - 1])
                .case_insensitive(!case_sensitive)
                .build()
                .map_err(|e| QueryError::invalid_regex(&e, expr.value_start))?;
            return Ok(FilterNode::Regex {
                attribute,
                regex,
                case_sensitive,
            });
        }

        if value.contains(['?', '*']) {
            let text = glob_text(value, case_sensitive);
            let pattern =
                Pattern::new(&text).map_err(|e| QueryError::invalid_glob(&e, expr.value_start))?;
            return Ok(FilterNode::Glob {
                attribute,
                pattern,
                case_sensitive,
            });
        }

        if case_sensitive {
            Ok(FilterNode::Equals {
                attribute,
                value: expr.value,
            })
        } else {
            Ok(FilterNode::EqualsIgnoreCase {
                attribute,
                value: expr.value.to_lowercase(),
            })
        }
    }
}

/// Glob source for a value: runs of `*` collapse to one, since `**` means
/// something else to a path glob, and case-insensitive patterns are folded
/// the same way as the values they are matched against.
fn glob_text(value: &str, case_sensitive: bool) -> String {
    let mut text = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '*' && text.ends_with('*') {
            continue;
        }
        text.push(c);
    }
    if case_sensitive {
        text
    } else {
        index_key(&text)
    }
}

/// One `attr[:modifier:]<op>value` term, before it becomes a node
struct Expression {
    name: String,
    name_start: usize,
    modifier: Option<(String, usize)>,
    comparator: Comparator,
    value: String,
    value_start: usize,
}

impl Expression {
    fn integer(&self, context: &str) -> QueryResult<i64> {
        self.value
            .parse::<i64>()
            .map_err(|_| QueryError::not_integer(context, &self.value, self.value_start))
    }

    fn require_equal(&self) -> QueryResult<()> {
        if self.comparator == Comparator::Equal {
            Ok(())
        } else {
            Err(QueryError::invalid_comparator(
                format!(
                    "'{}' requires the '=' comparator, found '{}'",
                    self.modifier
                        .as_ref()
                        .map_or(self.name.as_str(), |(m, _)| m.as_str()),
                    self.comparator.symbol()
                ),
                self.value_start,
            ))
        }
    }
}
