//! Explain plan output
//!
//! Produces deterministic, human-readable explain output.

use std::fmt;

use crate::model::ObjectSource;
use crate::query::{Filter, QueryError};

use super::plan::ScanPlan;

/// One candidate as shown in the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainCandidate {
    pub attribute: String,
    pub value: String,
    /// `None` when the attribute has no index
    pub size: Option<usize>,
}

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether the filter parsed
    pub accepted: bool,
    /// Canonical filter text
    pub filter: Option<String>,
    pub strategy: Option<String>,
    /// Driving predicate, `attribute = "value"`
    pub driver: Option<String>,
    pub candidates: Vec<ExplainCandidate>,
    pub reason: Option<String>,
    pub object_count: Option<usize>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Plans `filter` against `store` without executing it
    pub fn for_filter<S: ObjectSource + ?Sized>(filter: &Filter, store: &S) -> Self {
        let registry = store.registry();
        let plan = ScanPlan::build(filter, store);

        let strategy = match plan.driving() {
            None => "FULL_SCAN",
            Some(_) if plan.is_direct() => "INDEX_DIRECT",
            Some(_) => "INDEX_VERIFIED",
        };

        let driver = plan.driving().map(|c| {
            format!(
                "{} = {:?} ({} objects)",
                registry.name(c.attribute),
                c.key,
                c.size
            )
        });

        let candidates = plan
            .candidates
            .iter()
            .map(|c| ExplainCandidate {
                attribute: registry.name(c.attribute),
                value: c.key.clone(),
                size: c.indexed.then_some(c.size),
            })
            .collect();

        Self {
            accepted: true,
            filter: Some(filter.render(registry)),
            strategy: Some(strategy.to_string()),
            driver,
            candidates,
            reason: Some(plan.reason.as_str().to_string()),
            object_count: Some(store.len()),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a parse error
    pub fn from_error(err: &QueryError) -> Self {
        Self {
            accepted: false,
            filter: None,
            strategy: None,
            driver: None,
            candidates: Vec::new(),
            reason: None,
            object_count: None,
            rejection_reason: Some(format!("{} (at offset {})", err.message(), err.offset())),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(filter) = &self.filter {
                writeln!(f, "Filter: {}", filter)?;
            }
            if let Some(strategy) = &self.strategy {
                writeln!(f, "Strategy: {}", strategy)?;
            }
            if let Some(driver) = &self.driver {
                writeln!(f, "Driver: {}", driver)?;
            }
            if !self.candidates.is_empty() {
                writeln!(f, "Candidates:")?;
                for candidate in &self.candidates {
                    match candidate.size {
                        Some(size) => writeln!(
                            f,
                            "  - {} = {:?}: {} objects",
                            candidate.attribute, candidate.value, size
                        )?,
                        None => writeln!(
                            f,
                            "  - {} = {:?}: not indexed",
                            candidate.attribute, candidate.value
                        )?,
                    }
                }
            }
            if let Some(reason) = &self.reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            if let Some(count) = self.object_count {
                writeln!(f, "Objects: {}", count)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
