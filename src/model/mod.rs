//! Directory object model for dirquery
//!
//! The query engine reads objects through the `ObjectSource` trait. This
//! module provides a minimal in-memory implementation: built once, then
//! read-only.
//!
//! # Invariants
//!
//! - Object ids follow insertion order; scans and index sets iterate in
//!   ascending id order
//! - Index keys and DN lookups are case-insensitive
//! - Every `can_pwn` edge has a matching `pwnable_by` edge on its target

mod attribute;
mod errors;
mod index;
mod loader;
mod method;
mod object;
mod store;
mod value;

pub use attribute::{Attribute, AttributeFlags, AttributeRegistry};
pub use errors::{StoreError, StoreResult};
pub use index::{index_key, AttributeIndex, ObjectSet};
pub use loader::{EdgeRecord, ObjectDocument, ObjectRecord, OneOrMany, StoreLoader};
pub use method::{PwnMethod, UnknownMethod};
pub use object::{Object, ObjectDraft, ObjectId, PwnDirection, PwnEdge, Sid};
pub use store::{ObjectSource, ObjectStore, ObjectStoreBuilder};
pub use value::AttributeValue;
