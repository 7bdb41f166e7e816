//! Query language for dirquery
//!
//! An LDAP-style filter dialect extended with modifiers, synthetic
//! attributes and attack-path predicates.
//!
//! # Lifecycle
//!
//! 1. `QueryParser` turns filter text into an immutable `Filter`
//! 2. Each execution creates an `Evaluator` holding the `_limit` counters
//!    and a borrowed randomness source
//! 3. `Evaluator::matches` decides one object at a time; it never fails
//!
//! Parsing rejects the whole filter on the first error.

mod ast;
mod errors;
mod evaluator;
mod parser;

pub use ast::{Comparator, Filter, FilterNode};
pub use errors::{QueryError, QueryErrorCode, QueryResult, Severity};
pub use evaluator::{Evaluator, MAX_DN_CHAIN_DEPTH};
pub use parser::QueryParser;

use crate::model::AttributeRegistry;

/// Strictly parses filter text
pub fn parse(text: &str, registry: &AttributeRegistry) -> QueryResult<Filter> {
    QueryParser::new(registry).parse_strict(text)
}
