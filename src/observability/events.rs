//! Observability events for dirquery
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration loaded
    ConfigLoaded,
    /// Object file loaded and indexed
    StoreLoaded,
    /// Filter text received
    QueryReceived,
    /// Filter text parsed
    QueryParsed,
    /// Filter text rejected by the parser
    QueryRejected,
    /// Scan strategy chosen
    QueryPlanned,
    /// Execution finished
    QueryExecuted,
    /// Explain plan produced
    ExplainComplete,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreLoaded => "STORE_LOADED",
            Event::QueryReceived => "QUERY_RECEIVED",
            Event::QueryParsed => "QUERY_PARSED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::ExplainComplete => "EXPLAIN_COMPLETE",
        }
    }

    /// Severity the event is logged at; per-query events are TRACE
    pub fn severity(&self) -> Severity {
        match self {
            Event::ConfigLoaded | Event::StoreLoaded | Event::ExplainComplete => Severity::Info,
            Event::QueryRejected => Severity::Warn,
            Event::QueryReceived
            | Event::QueryParsed
            | Event::QueryPlanned
            | Event::QueryExecuted => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
