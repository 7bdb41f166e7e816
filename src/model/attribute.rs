//! Attribute registry
//!
//! Maps attribute names to stable identifiers. Names are matched
//! case-insensitively, as directory attribute names are; the canonical
//! spelling is the one first registered.
//!
//! Unknown names are interned on first use so that a filter naming an
//! attribute no object carries still parses (and simply matches nothing).

use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Stable attribute identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute(u32);

impl Attribute {
    /// `distinguishedName`, always registered first
    pub const DISTINGUISHED_NAME: Attribute = Attribute(0);
    /// `name`
    pub const NAME: Attribute = Attribute(1);
    /// `cn`
    pub const CN: Attribute = Attribute(2);
    /// `sAMAccountName`
    pub const SAM_ACCOUNT_NAME: Attribute = Attribute(3);
    /// `objectGUID`
    pub const OBJECT_GUID: Attribute = Attribute(4);
    /// `objectSid`
    pub const OBJECT_SID: Attribute = Attribute(5);

    /// Returns the raw identifier
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attr#{}", self.0)
    }
}

/// Per-attribute flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeFlags {
    /// An exact-value index is built for this attribute
    pub indexed: bool,
    /// Objects from different sources may be merged on this attribute
    pub mergeable: bool,
}

impl AttributeFlags {
    /// No flags set
    pub const NONE: AttributeFlags = AttributeFlags {
        indexed: false,
        mergeable: false,
    };

    /// Indexed only
    pub const INDEXED: AttributeFlags = AttributeFlags {
        indexed: true,
        mergeable: false,
    };

    /// Indexed and mergeable
    pub const IDENTITY: AttributeFlags = AttributeFlags {
        indexed: true,
        mergeable: true,
    };
}

/// Attributes every registry starts with, in identifier order.
const WELL_KNOWN: &[(&str, AttributeFlags)] = &[
    ("distinguishedName", AttributeFlags::IDENTITY),
    ("name", AttributeFlags::INDEXED),
    ("cn", AttributeFlags::INDEXED),
    ("sAMAccountName", AttributeFlags::IDENTITY),
    ("objectGUID", AttributeFlags::IDENTITY),
    ("objectSid", AttributeFlags::IDENTITY),
    ("objectClass", AttributeFlags::NONE),
    ("objectCategory", AttributeFlags::NONE),
    ("userAccountControl", AttributeFlags::NONE),
    ("memberOf", AttributeFlags::NONE),
    ("member", AttributeFlags::NONE),
    ("displayName", AttributeFlags::NONE),
    ("description", AttributeFlags::NONE),
    ("servicePrincipalName", AttributeFlags::NONE),
];

#[derive(Debug)]
struct AttributeInfo {
    name: String,
    flags: AttributeFlags,
}

#[derive(Debug, Default)]
struct RegistryInner {
    attributes: Vec<AttributeInfo>,
    by_name: HashMap<String, Attribute>,
}

/// Name → identifier registry with interning
#[derive(Debug)]
pub struct AttributeRegistry {
    inner: RwLock<RegistryInner>,
}

impl AttributeRegistry {
    /// Creates a registry holding the well-known directory attributes
    pub fn new() -> Self {
        let registry = Self::empty();
        for (name, flags) in WELL_KNOWN {
            registry.register(name, *flags);
        }
        registry
    }

    /// Creates a registry without any pre-registered attributes
    ///
    /// The `Attribute::*` constants are meaningless for such a registry.
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers an attribute, or merges `flags` into an existing one.
    pub fn register(&self, name: &str, flags: AttributeFlags) -> Attribute {
        let key = name.to_lowercase();
        let mut inner = self.write();
        if let Some(&attribute) = inner.by_name.get(&key) {
            let info = &mut inner.attributes[attribute.0 as usize];
            info.flags.indexed |= flags.indexed;
            info.flags.mergeable |= flags.mergeable;
            return attribute;
        }
        let attribute = Attribute(inner.attributes.len() as u32);
        inner.attributes.push(AttributeInfo {
            name: name.to_string(),
            flags,
        });
        inner.by_name.insert(key, attribute);
        attribute
    }

    /// Returns the identifier for `name`, interning it if unknown
    pub fn attribute(&self, name: &str) -> Attribute {
        if let Some(attribute) = self.lookup(name) {
            return attribute;
        }
        self.register(name, AttributeFlags::NONE)
    }

    /// Returns the identifier for `name` without interning
    pub fn lookup(&self, name: &str) -> Option<Attribute> {
        self.read().by_name.get(&name.to_lowercase()).copied()
    }

    /// Returns the canonical name of an attribute
    pub fn name(&self, attribute: Attribute) -> String {
        self.read()
            .attributes
            .get(attribute.0 as usize)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| attribute.to_string())
    }

    /// Returns the flags of an attribute (no flags if unknown)
    pub fn flags(&self, attribute: Attribute) -> AttributeFlags {
        self.read()
            .attributes
            .get(attribute.0 as usize)
            .map(|info| info.flags)
            .unwrap_or_default()
    }

    /// Returns true if an exact-value index is built for `attribute`
    pub fn is_indexed(&self, attribute: Attribute) -> bool {
        self.flags(attribute).indexed
    }

    /// Returns true if `attribute` is a merge key
    pub fn is_mergeable(&self, attribute: Attribute) -> bool {
        self.flags(attribute).mergeable
    }

    /// Flags an attribute as indexed, registering it if needed
    pub fn mark_indexed(&self, name: &str) -> Attribute {
        self.register(name, AttributeFlags::INDEXED)
    }

    /// Returns all indexed attributes in identifier order
    pub fn indexed_attributes(&self) -> Vec<Attribute> {
        self.read()
            .attributes
            .iter()
            .enumerate()
            .filter(|(_, info)| info.flags.indexed)
            .map(|(i, _)| Attribute(i as u32))
            .collect()
    }

    /// Returns the number of registered attributes
    pub fn len(&self) -> usize {
        self.read().attributes.len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
