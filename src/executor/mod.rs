//! Index-optimized query execution
//!
//! The executor consumes a parsed `Filter` and an `ObjectSource` and returns
//! the set of matching object ids.
//!
//! # Invariants
//!
//! - Semantic transparency: the result equals a full scan with a fresh
//!   evaluator; indexes only reduce the number of objects examined
//! - Filters containing `_limit` are always fully scanned in id order
//! - Results are ordered by ascending object id

mod executor;
mod explain;
mod plan;
mod result;

pub use executor::QueryExecutor;
pub use explain::{ExplainCandidate, ExplainPlan};
pub use plan::{IndexCandidate, PlanReason, ScanPlan};
pub use result::{ExecutionResult, ScanStrategy};
