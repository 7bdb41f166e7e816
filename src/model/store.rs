//! In-memory object store
//!
//! The store is built once by `ObjectStoreBuilder` and is read-only
//! afterwards. Concurrent queries read it without locking; the only shared
//! mutable state is attribute-name interning inside the registry.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use super::attribute::{Attribute, AttributeRegistry};
use super::errors::{StoreError, StoreResult};
use super::index::{index_key, AttributeIndex, ObjectSet};
use super::method::PwnMethod;
use super::object::{Object, ObjectDraft, ObjectId, PwnEdge};
use super::value::AttributeValue;

/// Read contract the query engine consumes
pub trait ObjectSource {
    /// Attribute registry shared with the parser
    fn registry(&self) -> &AttributeRegistry;

    /// Number of objects
    fn len(&self) -> usize;

    /// Returns true if the source holds no objects
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up an object by id
    fn object(&self, id: ObjectId) -> Option<&Object>;

    /// Returns the exact-value index of an attribute, if one exists
    fn index(&self, attribute: Attribute) -> Option<&AttributeIndex>;

    /// Scans every object in ascending id order, keeping those the
    /// predicate accepts
    fn scan(&self, predicate: &mut dyn FnMut(&Object) -> bool) -> ObjectSet;

    /// Resolves a distinguished name (case-insensitive)
    fn find_by_distinguished_name(&self, dn: &str) -> Option<&Object>;
}

/// Immutable object collection with per-attribute indexes
#[derive(Debug)]
pub struct ObjectStore {
    registry: AttributeRegistry,
    objects: Vec<Object>,
    indexes: HashMap<Attribute, AttributeIndex>,
    dn_lookup: HashMap<String, ObjectId>,
}

impl ObjectStore {
    /// Starts a builder with the default registry
    pub fn builder() -> ObjectStoreBuilder {
        ObjectStoreBuilder::new()
    }

    /// Iterates over all objects in id order
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    /// Returns the attributes that carry an index
    pub fn indexed_attributes(&self) -> Vec<Attribute> {
        let mut attributes: Vec<Attribute> = self.indexes.keys().copied().collect();
        attributes.sort();
        attributes
    }
}

impl ObjectSource for ObjectStore {
    fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    fn len(&self) -> usize {
        self.objects.len()
    }

    fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index())
    }

    fn index(&self, attribute: Attribute) -> Option<&AttributeIndex> {
        self.indexes.get(&attribute)
    }

    fn scan(&self, predicate: &mut dyn FnMut(&Object) -> bool) -> ObjectSet {
        self.objects
            .iter()
            .filter(|o| predicate(*o))
            .map(Object::id)
            .collect()
    }

    fn find_by_distinguished_name(&self, dn: &str) -> Option<&Object> {
        let id = self.dn_lookup.get(&index_key(dn))?;
        self.object(*id)
    }
}

/// Builds an `ObjectStore`
///
/// Objects receive ids in insertion order. Edges are recorded on both ends:
/// `can_pwn` on the source, `pwnable_by` on the target.
#[derive(Debug)]
pub struct ObjectStoreBuilder {
    registry: AttributeRegistry,
    objects: Vec<Object>,
}

impl ObjectStoreBuilder {
    /// Creates a builder with the well-known attribute registry
    pub fn new() -> Self {
        Self::with_registry(AttributeRegistry::new())
    }

    /// Creates a builder around an existing registry
    pub fn with_registry(registry: AttributeRegistry) -> Self {
        Self {
            registry,
            objects: Vec::new(),
        }
    }

    /// Flags an attribute as indexed
    pub fn index_attribute(&mut self, name: &str) -> &mut Self {
        self.registry.mark_indexed(name);
        self
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Number of objects added so far
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Adds an object and returns its id.
    ///
    /// The DN, GUID and SID are mirrored into `distinguishedName`,
    /// `objectGUID` and `objectSid` unless the draft sets them explicitly.
    pub fn add(&mut self, draft: ObjectDraft) -> ObjectId {
        let id = ObjectId::new(self.objects.len() as u32);
        let guid = draft.guid.unwrap_or_else(Uuid::new_v4);

        let mut attributes: BTreeMap<Attribute, Vec<AttributeValue>> = BTreeMap::new();
        for (name, value) in draft.attributes {
            let attribute = self.registry.attribute(&name);
            attributes.entry(attribute).or_default().push(value);
        }

        let dn_attribute = self.registry.attribute("distinguishedName");
        attributes
            .entry(dn_attribute)
            .or_insert_with(|| vec![AttributeValue::string(draft.dn.clone())]);
        let guid_attribute = self.registry.attribute("objectGUID");
        attributes
            .entry(guid_attribute)
            .or_insert_with(|| vec![AttributeValue::string(guid.to_string())]);
        if let Some(sid) = &draft.sid {
            let sid_attribute = self.registry.attribute("objectSid");
            attributes
                .entry(sid_attribute)
                .or_insert_with(|| vec![AttributeValue::string(sid.as_str())]);
        }

        self.objects.push(Object {
            id,
            guid,
            sid: draft.sid,
            dn: draft.dn,
            attributes,
            can_pwn: Vec::new(),
            pwnable_by: Vec::new(),
        });
        id
    }

    /// Records that `from` can compromise `to` via `method`
    pub fn add_edge(&mut self, from: ObjectId, to: ObjectId, method: PwnMethod) -> StoreResult<()> {
        if from.index() >= self.objects.len() {
            return Err(StoreError::UnknownObject(from.get()));
        }
        if to.index() >= self.objects.len() {
            return Err(StoreError::UnknownObject(to.get()));
        }

        self.objects[from.index()].can_pwn.push(PwnEdge { object: to, method });
        self.objects[to.index()].pwnable_by.push(PwnEdge {
            object: from,
            method,
        });
        Ok(())
    }

    /// Freezes the collection and builds its indexes
    pub fn build(self) -> StoreResult<ObjectStore> {
        let mut dn_lookup = HashMap::with_capacity(self.objects.len());
        for object in &self.objects {
            if dn_lookup.insert(index_key(&object.dn), object.id).is_some() {
                return Err(StoreError::DuplicateDistinguishedName(object.dn.clone()));
            }
        }

        let mut indexes = HashMap::new();
        for attribute in self.registry.indexed_attributes() {
            let mut index = AttributeIndex::new();
            for object in &self.objects {
                for value in object.values(attribute) {
                    index.insert(&value.rendered(), object.id);
                }
            }
            indexes.insert(attribute, index);
        }

        Ok(ObjectStore {
            registry: self.registry,
            objects: self.objects,
            indexes,
            dn_lookup,
        })
    }
}

impl Default for ObjectStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::object::Sid;

    fn sample() -> ObjectStore {
        let mut builder = ObjectStoreBuilder::new();
        let alice = builder.add(
            ObjectDraft::new("CN=Alice,OU=Users,DC=corp")
                .with("cn", "Alice")
                .with("sAMAccountName", "alice")
                .with_sid(Sid::new("S-1-5-21-1-1001")),
        );
        let bob = builder.add(
            ObjectDraft::new("CN=Bob,OU=Users,DC=corp")
                .with("cn", "Bob")
                .with("userAccountControl", 512i64),
        );
        builder.add_edge(alice, bob, PwnMethod::ResetPassword).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_ids_in_insertion_order() {
        let store = sample();
        let ids: Vec<u32> = store.objects().map(|o| o.id().get()).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_edges_recorded_on_both_ends() {
        let store = sample();
        let alice = store.object(ObjectId::new(0)).unwrap();
        let bob = store.object(ObjectId::new(1)).unwrap();

        assert_eq!(alice.can_pwn()[0].object, bob.id());
        assert_eq!(bob.pwnable_by()[0].object, alice.id());
        assert_eq!(bob.pwnable_by()[0].method, PwnMethod::ResetPassword);
    }

    #[test]
    fn test_identity_attributes_mirrored() {
        let store = sample();
        let alice = store.object(ObjectId::new(0)).unwrap();

        assert_eq!(
            alice.rendered_strings(Attribute::DISTINGUISHED_NAME),
            vec!["CN=Alice,OU=Users,DC=corp"]
        );
        assert_eq!(
            alice.rendered_strings(Attribute::OBJECT_GUID),
            vec![alice.guid().to_string()]
        );
        assert_eq!(
            alice.rendered_strings(Attribute::OBJECT_SID),
            vec!["S-1-5-21-1-1001"]
        );

        let bob = store.object(ObjectId::new(1)).unwrap();
        assert!(bob.sid().is_none());
        assert!(!bob.has(Attribute::OBJECT_SID));
    }

    #[test]
    fn test_find_by_dn_case_insensitive() {
        let store = sample();
        let found = store
            .find_by_distinguished_name("cn=bob,ou=users,dc=corp")
            .unwrap();
        assert_eq!(found.id(), ObjectId::new(1));
        assert!(store.find_by_distinguished_name("CN=Carol,DC=corp").is_none());
    }

    #[test]
    fn test_indexes_built_for_indexed_attributes() {
        let store = sample();
        let cn = store.index(Attribute::CN).unwrap();
        assert_eq!(cn.cardinality("alice"), 1);

        let uac = store.registry().attribute("userAccountControl");
        assert!(store.index(uac).is_none());
    }

    #[test]
    fn test_extra_index_attribute() {
        let mut builder = ObjectStoreBuilder::new();
        builder.index_attribute("department");
        builder.add(ObjectDraft::new("CN=A,DC=x").with("department", "IT"));
        builder.add(ObjectDraft::new("CN=B,DC=x").with("department", "it"));
        let store = builder.build().unwrap();

        let department = store.registry().attribute("department");
        assert_eq!(store.index(department).unwrap().cardinality("IT"), 2);
    }

    #[test]
    fn test_duplicate_dn_rejected() {
        let mut builder = ObjectStoreBuilder::new();
        builder.add(ObjectDraft::new("CN=Same,DC=x"));
        builder.add(ObjectDraft::new("cn=same,dc=x"));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDistinguishedName(_)));
    }

    #[test]
    fn test_edge_to_unknown_object_rejected() {
        let mut builder = ObjectStoreBuilder::new();
        let a = builder.add(ObjectDraft::new("CN=A,DC=x"));
        let err = builder
            .add_edge(a, ObjectId::new(9), PwnMethod::Owns)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownObject(9)));
    }

    #[test]
    fn test_scan_in_id_order() {
        let store = sample();
        let mut seen = Vec::new();
        let all = store.scan(&mut |o| {
            seen.push(o.id().get());
            true
        });
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(all.len(), 2);
    }
}
