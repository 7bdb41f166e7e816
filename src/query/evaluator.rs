//! Predicate evaluation
//!
//! An `Evaluator` is created per execution. It owns the `_limit` counters
//! and borrows the randomness source, so the same `Filter` can be run any
//! number of times, or from several threads at once, with fresh state.

use std::collections::HashMap;

use glob::MatchOptions;
use rand::{Rng, RngCore};

use super::ast::{Filter, FilterNode};
use crate::model::{
    index_key, Attribute, Object, ObjectId, ObjectSource, PwnDirection, PwnMethod,
};

/// Maximum number of objects followed by a DN-chain match
pub const MAX_DN_CHAIN_DEPTH: usize = 10;

/// Execution-scoped filter evaluator
pub struct Evaluator<'a, S: ObjectSource + ?Sized> {
    root: &'a FilterNode,
    store: &'a S,
    /// Remaining admissions per `_limit` slot
    limits: Vec<i64>,
    rng: &'a mut dyn RngCore,
}

impl<'a, S: ObjectSource + ?Sized> Evaluator<'a, S> {
    pub fn new(filter: &'a Filter, store: &'a S, rng: &'a mut dyn RngCore) -> Self {
        Self {
            root: filter.root(),
            store,
            limits: filter.limit_slots().to_vec(),
            rng,
        }
    }

    /// Evaluates the filter against one object
    pub fn matches(&mut self, object: &Object) -> bool {
        let root = self.root;
        self.eval(root, object)
    }

    fn eval(&mut self, node: &'a FilterNode, object: &Object) -> bool {
        match node {
            FilterNode::And(children) => {
                for child in children {
                    if !self.eval(child, object) {
                        return false;
                    }
                }
                true
            }
            FilterNode::Or(children) => {
                for child in children {
                    if self.eval(child, object) {
                        return true;
                    }
                }
                false
            }
            FilterNode::Not(child) => !self.eval(child, object),
            FilterNode::Present { attribute } => object.has(*attribute),
            FilterNode::Equals { attribute, value } => object
                .values(*attribute)
                .iter()
                .any(|v| v.rendered() == *value),
            FilterNode::EqualsIgnoreCase { attribute, value } => object
                .values(*attribute)
                .iter()
                .any(|v| v.rendered().to_lowercase() == *value),
            FilterNode::Glob {
                attribute,
                pattern,
                case_sensitive,
            } => {
                // Case-insensitive patterns are folded at parse time
                let options = MatchOptions {
                    case_sensitive: true,
                    require_literal_separator: false,
                    require_literal_leading_dot: false,
                };
                object.values(*attribute).iter().any(|v| {
                    let candidate = if *case_sensitive {
                        v.rendered()
                    } else {
                        index_key(&v.rendered())
                    };
                    pattern.matches_with(&candidate, options)
                })
            }
            FilterNode::Regex {
                attribute, regex, ..
            } => object
                .values(*attribute)
                .iter()
                .any(|v| regex.is_match(&v.rendered())),
            FilterNode::Compare {
                attribute,
                comparator,
                value,
            } => object
                .as_integer(*attribute)
                .map_or(false, |v| comparator.compare(v, *value)),
            FilterNode::BitAnd { attribute, mask } => object
                .as_integer(*attribute)
                .map_or(false, |v| v & mask == *mask),
            FilterNode::BitOr { attribute, mask } => object
                .as_integer(*attribute)
                .map_or(false, |v| v & mask != 0),
            FilterNode::Count {
                attribute,
                comparator,
                value,
            } => comparator.compare(object.values(*attribute).len() as i64, *value),
            FilterNode::Length {
                attribute,
                comparator,
                value,
            } => object
                .values(*attribute)
                .iter()
                .any(|v| comparator.compare(v.rendered().chars().count() as i64, *value)),
            FilterNode::DnChain { attribute, dn } => self.dn_chain(object, *attribute, dn),
            FilterNode::Limit { slot, .. } => match self.limits.get_mut(*slot) {
                Some(counter) => {
                    *counter = counter.saturating_sub(1);
                    *counter >= 0
                }
                None => false,
            },
            FilterNode::Random100 { comparator, value } => {
                let draw: i64 = self.rng.gen_range(0..100);
                comparator.compare(draw, *value)
            }
            FilterNode::Pwn {
                direction,
                method,
                target,
            } => self.pwn(object, *direction, *method, target.as_deref()),
        }
    }

    fn pwn(
        &mut self,
        object: &Object,
        direction: PwnDirection,
        method: Option<PwnMethod>,
        target: Option<&'a FilterNode>,
    ) -> bool {
        let store = self.store;
        for edge in object.edges(direction) {
            if method.map_or(false, |m| m != edge.method) {
                continue;
            }
            let Some(target) = target else {
                return true;
            };
            if let Some(counterpart) = store.object(edge.object) {
                if self.eval(target, counterpart) {
                    return true;
                }
            }
        }
        false
    }

    fn dn_chain(&self, object: &Object, attribute: Attribute, dn: &str) -> bool {
        let mut visited = HashMap::new();
        self.chain_step(object, attribute, &index_key(dn), MAX_DN_CHAIN_DEPTH, &mut visited)
    }

    /// `visited` maps each examined object to the most depth it had left
    /// when examined; revisiting with no more depth cannot find anything new.
    fn chain_step(
        &self,
        object: &Object,
        attribute: Attribute,
        dn: &str,
        remaining: usize,
        visited: &mut HashMap<ObjectId, usize>,
    ) -> bool {
        if remaining == 0 {
            return false;
        }
        if visited.get(&object.id()).map_or(false, |&seen| seen >= remaining) {
            return false;
        }
        visited.insert(object.id(), remaining);

        let values = object.values(attribute);
        if values.iter().any(|v| index_key(&v.rendered()) == dn) {
            return true;
        }
        values.iter().any(|v| {
            self.store
                .find_by_distinguished_name(&v.rendered())
                .map_or(false, |next| {
                    self.chain_step(next, attribute, dn, remaining - 1, visited)
                })
        })
    }
}
