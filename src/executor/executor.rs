//! Query executor for dirquery
//!
//! Execution flow:
//! 1. Plan: collect root-level equality candidates and size their index hits
//! 2. Choose: smallest non-empty candidate drives, otherwise full scan
//! 3. Evaluate: run a fresh `Evaluator` over the driving set (or every
//!    object), except when a bare case-insensitive lookup is already exact
//! 4. Return ids in ascending order with the strategy used
//!
//! The result is always the set a full scan would produce for the same
//! filter; the index only changes how many objects are examined.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::model::{ObjectSet, ObjectSource};
use crate::observability::{log_event_with_fields, Event, Logger, QueryMetrics, Severity};
use crate::query::{Evaluator, Filter};

use super::plan::ScanPlan;
use super::result::{ExecutionResult, ScanStrategy};

/// Executes parsed filters against an object source
pub struct QueryExecutor<'a, S: ObjectSource + ?Sized> {
    store: &'a S,
    metrics: Option<&'a QueryMetrics>,
}

impl<'a, S: ObjectSource + ?Sized> QueryExecutor<'a, S> {
    /// Creates a new executor
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    /// Records every execution into `metrics`
    pub fn with_metrics(mut self, metrics: &'a QueryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Executes with an entropy-seeded random source
    pub fn execute(&self, filter: &Filter) -> ExecutionResult {
        let mut rng = StdRng::from_entropy();
        self.execute_with_rng(filter, &mut rng)
    }

    /// Executes with the given random source for `_random100`
    pub fn execute_with_rng(&self, filter: &Filter, rng: &mut dyn RngCore) -> ExecutionResult {
        let plan = ScanPlan::build(filter, self.store);
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::QueryPlanned,
                &[
                    ("candidates", &plan.candidates.len().to_string()),
                    ("reason", plan.reason.as_str()),
                ],
            );
        }

        let mut evaluator = Evaluator::new(filter, self.store, rng);
        let result = match plan.driving() {
            None => {
                let mut examined = 0;
                let objects = self.store.scan(&mut |object| {
                    examined += 1;
                    evaluator.matches(object)
                });
                ExecutionResult {
                    objects,
                    strategy: ScanStrategy::FullScan,
                    examined,
                }
            }
            Some(driver) => {
                let driving_set = self
                    .store
                    .index(driver.attribute)
                    .and_then(|index| index.lookup(&driver.key))
                    .cloned()
                    .unwrap_or_default();

                if plan.is_direct() {
                    ExecutionResult {
                        objects: driving_set,
                        strategy: ScanStrategy::IndexDirect {
                            attribute: driver.attribute,
                            value: driver.key.clone(),
                        },
                        examined: 0,
                    }
                } else {
                    let mut examined = 0;
                    let mut objects = ObjectSet::new();
                    for id in driving_set.iter() {
                        let Some(object) = self.store.object(id) else {
                            continue;
                        };
                        examined += 1;
                        if evaluator.matches(object) {
                            objects.insert(id);
                        }
                    }
                    ExecutionResult {
                        objects,
                        strategy: ScanStrategy::IndexVerified {
                            attribute: driver.attribute,
                            value: driver.key.clone(),
                            candidates: driving_set.len(),
                        },
                        examined,
                    }
                }
            }
        };

        if let Some(metrics) = self.metrics {
            metrics.record_execution(
                result.strategy.is_index_driven(),
                result.examined as u64,
                result.len() as u64,
            );
        }
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::QueryExecuted,
                &[
                    ("examined", &result.examined.to_string()),
                    ("matched", &result.len().to_string()),
                    ("strategy", result.strategy.as_str()),
                ],
            );
        }

        result
    }
}
