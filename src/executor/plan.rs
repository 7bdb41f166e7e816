//! Candidate discovery and driver selection
//!
//! An equality predicate on an indexed attribute can stand in for a full
//! scan when it is either the whole filter or a direct child of a root
//! conjunction: every match must then satisfy it, so the index result is a
//! superset of the answer. Anything else (disjunctions, negations, nested
//! groups) is ignored and falls back to scanning.

use crate::model::{index_key, Attribute, ObjectSource};
use crate::query::{Filter, FilterNode};

/// One index-eligible equality predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCandidate {
    pub attribute: Attribute,
    /// Index key (case-folded literal)
    pub key: String,
    /// Size of the index result; 0 when the attribute has no index
    pub size: usize,
    pub indexed: bool,
    /// The predicate ignores case, so the folded index result is exact
    pub case_insensitive: bool,
}

/// Why the plan scans or which candidate drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanReason {
    NoCandidates,
    OrderDependent,
    NoIndexHits,
    IndexDriven,
}

impl PlanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanReason::NoCandidates => "no equality predicate at the root",
            PlanReason::OrderDependent => "filter contains _limit; result depends on scan order",
            PlanReason::NoIndexHits => "no candidate has index entries",
            PlanReason::IndexDriven => "smallest non-empty candidate drives",
        }
    }
}

/// Outcome of planning one filter against one store
#[derive(Debug, Clone)]
pub struct ScanPlan {
    /// Candidates in ascending size order (stable)
    pub candidates: Vec<IndexCandidate>,
    /// Index into `candidates` of the driving predicate
    pub driver: Option<usize>,
    /// The filter is a single equality node
    pub bare: bool,
    pub reason: PlanReason,
}

impl ScanPlan {
    pub fn build<S: ObjectSource + ?Sized>(filter: &Filter, store: &S) -> Self {
        let root = filter.root();
        let (nodes, bare): (Vec<&FilterNode>, bool) = match root {
            FilterNode::And(children) => (children.iter().collect(), false),
            node => (vec![node], true),
        };

        let mut candidates: Vec<IndexCandidate> = nodes
            .into_iter()
            .filter_map(|node| {
                let (attribute, value) = node.exact_match()?;
                let key = index_key(value);
                let index = store.index(attribute);
                Some(IndexCandidate {
                    attribute,
                    size: index.map_or(0, |i| i.cardinality(&key)),
                    indexed: index.is_some(),
                    case_insensitive: matches!(node, FilterNode::EqualsIgnoreCase { .. }),
                    key,
                })
            })
            .collect();
        candidates.sort_by_key(|c| c.size);

        let (driver, reason) = if candidates.is_empty() {
            (None, PlanReason::NoCandidates)
        } else if filter.is_order_dependent() {
            (None, PlanReason::OrderDependent)
        } else {
            match candidates.iter().position(|c| c.indexed && c.size > 0) {
                Some(i) => (Some(i), PlanReason::IndexDriven),
                None => (None, PlanReason::NoIndexHits),
            }
        };

        Self {
            candidates,
            driver,
            bare,
            reason,
        }
    }

    /// The driving candidate, if any
    pub fn driving(&self) -> Option<&IndexCandidate> {
        self.driver.map(|i| &self.candidates[i])
    }

    /// Returns true if the index result is the answer without evaluation
    pub fn is_direct(&self) -> bool {
        self.bare && self.driving().map_or(false, |c| c.case_insensitive)
    }
}
