//! JSON object file loader
//!
//! File layout:
//!
//! ```json
//! { "objects": [
//!     { "dn": "CN=Alice,DC=corp",
//!       "guid": "…", "sid": "S-1-5-…",
//!       "attributes": { "cn": "Alice", "memberOf": ["CN=IT,DC=corp"] },
//!       "can_pwn": [ { "target": "CN=Bob,DC=corp", "method": "ResetPassword" } ] }
//! ] }
//! ```
//!
//! A missing `guid` gets a random one. `"sid": null` marks a present-but-null
//! SID; omitting `sid` leaves it absent. Edge targets are resolved by DN once
//! every object has been added.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::index::index_key;
use super::method::PwnMethod;
use super::object::{ObjectDraft, Sid};
use super::store::{ObjectStore, ObjectStoreBuilder};
use super::value::AttributeValue;

/// Top-level object file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDocument {
    pub objects: Vec<ObjectRecord>,
}

/// One object in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub dn: String,

    #[serde(default)]
    pub guid: Option<String>,

    /// Outer `None`: no SID. `Some(None)`: null SID.
    #[serde(default, deserialize_with = "present_or_null")]
    pub sid: Option<Option<String>>,

    #[serde(default)]
    pub attributes: BTreeMap<String, OneOrMany>,

    #[serde(default)]
    pub can_pwn: Vec<EdgeRecord>,
}

/// An outgoing attack-path edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Target distinguished name
    pub target: String,
    /// Method name
    pub method: String,
}

/// Attribute value(s): a scalar or a list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    Many(Vec<AttributeValue>),
    One(AttributeValue),
}

impl OneOrMany {
    fn into_values(self) -> Vec<AttributeValue> {
        match self {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        }
    }
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Builds object stores from JSON object files
#[derive(Debug, Clone, Default)]
pub struct StoreLoader {
    indexed_attributes: Vec<String>,
}

impl StoreLoader {
    /// Creates a loader indexing only the registry's default attributes
    pub fn new() -> Self {
        Self::default()
    }

    /// Additionally indexes the given attributes
    pub fn with_indexed(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.indexed_attributes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Loads a store from a file
    pub fn load_path(&self, path: &Path) -> StoreResult<ObjectStore> {
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
    }

    /// Loads a store from JSON text
    pub fn load_str(&self, json: &str) -> StoreResult<ObjectStore> {
        let document: ObjectDocument = serde_json::from_str(json)?;
        self.build(document)
    }

    /// Builds a store from a parsed document
    pub fn build(&self, document: ObjectDocument) -> StoreResult<ObjectStore> {
        let mut builder = ObjectStoreBuilder::new();
        for name in &self.indexed_attributes {
            builder.index_attribute(name);
        }

        let mut by_dn = HashMap::with_capacity(document.objects.len());
        let mut pending_edges = Vec::new();

        for record in document.objects {
            let mut draft = ObjectDraft::new(record.dn.clone());
            if let Some(guid) = &record.guid {
                let parsed =
                    Uuid::parse_str(guid).map_err(|_| StoreError::InvalidGuid(guid.clone()))?;
                draft = draft.with_guid(parsed);
            }
            match record.sid {
                Some(Some(sid)) => draft = draft.with_sid(Sid::new(sid)),
                Some(None) => draft = draft.with_sid(Sid::null()),
                None => {}
            }
            for (name, values) in record.attributes {
                draft = draft.with_all(&name, values.into_values());
            }

            let id = builder.add(draft);
            if by_dn.insert(index_key(&record.dn), id).is_some() {
                return Err(StoreError::DuplicateDistinguishedName(record.dn));
            }
            for edge in record.can_pwn {
                pending_edges.push((id, record.dn.clone(), edge));
            }
        }

        for (from, from_dn, edge) in pending_edges {
            let to = by_dn.get(&index_key(&edge.target)).copied().ok_or_else(|| {
                StoreError::UnknownEdgeTarget {
                    from: from_dn.clone(),
                    target: edge.target.clone(),
                }
            })?;
            let method = PwnMethod::from_name(&edge.method).map_err(|source| {
                StoreError::UnknownMethod {
                    dn: from_dn.clone(),
                    source,
                }
            })?;
            builder.add_edge(from, to, method)?;
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, ObjectSource};
    use serde_json::json;

    #[test]
    fn test_load_objects_and_edges() {
        let doc = json!({
            "objects": [
                {
                    "dn": "CN=Helpdesk,DC=corp",
                    "attributes": { "cn": "Helpdesk", "member": ["CN=Alice,DC=corp"] },
                    "can_pwn": [ { "target": "cn=alice,dc=corp", "method": "ResetPassword" } ]
                },
                {
                    "dn": "CN=Alice,DC=corp",
                    "sid": "S-1-5-21-7-1104",
                    "attributes": { "userAccountControl": 512 }
                }
            ]
        });

        let store = StoreLoader::new().load_str(&doc.to_string()).unwrap();
        assert_eq!(store.len(), 2);

        let alice = store.find_by_distinguished_name("CN=Alice,DC=corp").unwrap();
        assert_eq!(alice.sid().map(Sid::as_str), Some("S-1-5-21-7-1104"));
        assert_eq!(alice.pwnable_by()[0].method, PwnMethod::ResetPassword);

        let uac = store.registry().attribute("userAccountControl");
        assert_eq!(alice.as_integer(uac), Some(512));

        let helpdesk = store.find_by_distinguished_name("CN=Helpdesk,DC=corp").unwrap();
        assert_eq!(helpdesk.rendered_strings(Attribute::CN), vec!["Helpdesk"]);
    }

    #[test]
    fn test_null_sid_vs_absent() {
        let doc = json!({
            "objects": [
                { "dn": "CN=A,DC=x", "sid": null },
                { "dn": "CN=B,DC=x" }
            ]
        });

        let store = StoreLoader::new().load_str(&doc.to_string()).unwrap();
        let a = store.find_by_distinguished_name("CN=A,DC=x").unwrap();
        let b = store.find_by_distinguished_name("CN=B,DC=x").unwrap();
        assert!(a.sid().unwrap().is_null());
        assert!(b.sid().is_none());
    }

    #[test]
    fn test_explicit_guid_kept() {
        let guid = "6f2b4c7e-2d7a-4a59-9e1b-3f0c1d2e4a5b";
        let doc = json!({ "objects": [ { "dn": "CN=A,DC=x", "guid": guid } ] });

        let store = StoreLoader::new().load_str(&doc.to_string()).unwrap();
        let a = store.find_by_distinguished_name("CN=A,DC=x").unwrap();
        assert_eq!(a.guid().to_string(), guid);
    }

    #[test]
    fn test_unknown_edge_target() {
        let doc = json!({
            "objects": [
                { "dn": "CN=A,DC=x", "can_pwn": [ { "target": "CN=Nobody,DC=x", "method": "Owns" } ] }
            ]
        });

        let err = StoreLoader::new().load_str(&doc.to_string()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownEdgeTarget { .. }));
    }

    #[test]
    fn test_unknown_method() {
        let doc = json!({
            "objects": [
                { "dn": "CN=A,DC=x", "can_pwn": [ { "target": "CN=A,DC=x", "method": "Hypnosis" } ] }
            ]
        });

        let err = StoreLoader::new().load_str(&doc.to_string()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownMethod { .. }));
        assert!(err.to_string().contains("Hypnosis"));
    }

    #[test]
    fn test_invalid_guid() {
        let doc = json!({ "objects": [ { "dn": "CN=A,DC=x", "guid": "nope" } ] });
        let err = StoreLoader::new().load_str(&doc.to_string()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidGuid(_)));
    }

    #[test]
    fn test_configured_index() {
        let doc = json!({
            "objects": [
                { "dn": "CN=A,DC=x", "attributes": { "department": "IT" } },
                { "dn": "CN=B,DC=x", "attributes": { "department": "HR" } }
            ]
        });

        let store = StoreLoader::new()
            .with_indexed(["department"])
            .load_str(&doc.to_string())
            .unwrap();
        let department = store.registry().attribute("department");
        assert_eq!(store.index(department).unwrap().cardinality("hr"), 1);
    }
}
