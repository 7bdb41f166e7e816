//! Observability for dirquery
//!
//! - Structured logging (JSON lines on stderr)
//! - Atomic query counters
//! - Typed lifecycle events
//!
//! Observability is read-only: nothing here changes what a query returns.
//!
//! ```ignore
//! use dirquery::observability::{log_event_with_fields, Event, QueryMetrics};
//!
//! log_event_with_fields(Event::StoreLoaded, &[("objects", "42")]);
//!
//! let metrics = QueryMetrics::new();
//! metrics.increment_parsed();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, QueryMetrics};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
