//! Result types for query execution

use std::fmt;

use crate::model::{Attribute, AttributeRegistry, ObjectId, ObjectSet};

/// How the executor found its candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStrategy {
    /// Every object evaluated in id order
    FullScan,
    /// Index result returned as-is; the lookup is exactly the answer
    IndexDirect { attribute: Attribute, value: String },
    /// Index result re-evaluated against the full filter
    IndexVerified {
        attribute: Attribute,
        value: String,
        candidates: usize,
    },
}

impl ScanStrategy {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStrategy::FullScan => "FULL_SCAN",
            ScanStrategy::IndexDirect { .. } => "INDEX_DIRECT",
            ScanStrategy::IndexVerified { .. } => "INDEX_VERIFIED",
        }
    }

    /// Returns true if an index chose the candidates
    pub fn is_index_driven(&self) -> bool {
        !matches!(self, ScanStrategy::FullScan)
    }

    /// Describes the strategy with attribute names resolved
    pub fn describe(&self, registry: &AttributeRegistry) -> String {
        match self {
            ScanStrategy::FullScan => self.as_str().to_string(),
            ScanStrategy::IndexDirect { attribute, value } => {
                format!("{} {}={:?}", self.as_str(), registry.name(*attribute), value)
            }
            ScanStrategy::IndexVerified {
                attribute,
                value,
                candidates,
            } => format!(
                "{} {}={:?} ({} candidates)",
                self.as_str(),
                registry.name(*attribute),
                value,
                candidates
            ),
        }
    }
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of query execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Matching object ids, ascending
    pub objects: ObjectSet,
    pub strategy: ScanStrategy,
    /// Number of objects the filter was evaluated against
    pub examined: usize,
}

impl ExecutionResult {
    /// Returns true if no objects matched
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the number of matches
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Iterates over matching ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter()
    }
}
