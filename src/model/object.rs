//! Directory objects
//!
//! Objects are immutable once the store is built. The query engine only
//! reads them.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use super::attribute::Attribute;
use super::method::PwnMethod;
use super::value::AttributeValue;

/// Stable numeric object identifier, assigned in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates an identifier from its raw value
    pub fn new(raw: u32) -> Self {
        ObjectId(raw)
    }

    /// Returns the raw value
    pub fn get(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Security identifier
///
/// An object without a SID has `sid() == None`; an object whose SID is
/// present but null carries `Sid::null()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sid(String);

impl Sid {
    /// Textual form of the null SID
    pub const NULL: &'static str = "S-1-0-0";

    /// Creates a SID from its textual form
    pub fn new(s: impl Into<String>) -> Self {
        Sid(s.into())
    }

    /// The null SID
    pub fn null() -> Self {
        Sid(Self::NULL.to_string())
    }

    /// Returns true for the null SID
    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which edge list an attack-path predicate walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwnDirection {
    /// Edges to objects this object can compromise
    CanPwn,
    /// Edges from objects that can compromise this object
    PwnableBy,
}

impl PwnDirection {
    /// Synthetic attribute name selecting this direction
    pub fn as_str(&self) -> &'static str {
        match self {
            PwnDirection::CanPwn => "_canpwn",
            PwnDirection::PwnableBy => "_pwnable",
        }
    }
}

/// A directed attack-path edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwnEdge {
    /// The object at the other end of the edge
    pub object: ObjectId,
    /// How the compromise happens
    pub method: PwnMethod,
}

/// A directory object
#[derive(Debug, Clone)]
pub struct Object {
    pub(crate) id: ObjectId,
    pub(crate) guid: Uuid,
    pub(crate) sid: Option<Sid>,
    pub(crate) dn: String,
    pub(crate) attributes: BTreeMap<Attribute, Vec<AttributeValue>>,
    pub(crate) can_pwn: Vec<PwnEdge>,
    pub(crate) pwnable_by: Vec<PwnEdge>,
}

impl Object {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn guid(&self) -> Uuid {
        self.guid
    }

    pub fn sid(&self) -> Option<&Sid> {
        self.sid.as_ref()
    }

    pub fn distinguished_name(&self) -> &str {
        &self.dn
    }

    /// Returns the raw values of an attribute (empty if absent)
    pub fn values(&self, attribute: Attribute) -> &[AttributeValue] {
        self.attributes
            .get(&attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if the attribute has at least one value
    pub fn has(&self, attribute: Attribute) -> bool {
        !self.values(attribute).is_empty()
    }

    /// Renders every value of an attribute as a string
    pub fn rendered_strings(&self, attribute: Attribute) -> Vec<String> {
        self.values(attribute)
            .iter()
            .map(AttributeValue::rendered)
            .collect()
    }

    /// Projects the first value of an attribute as an integer
    pub fn as_integer(&self, attribute: Attribute) -> Option<i64> {
        self.values(attribute).first()?.as_integer()
    }

    /// Iterates over attributes carrying at least one value
    pub fn attributes(&self) -> impl Iterator<Item = (Attribute, &[AttributeValue])> {
        self.attributes
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(a, v)| (*a, v.as_slice()))
    }

    pub fn can_pwn(&self) -> &[PwnEdge] {
        &self.can_pwn
    }

    pub fn pwnable_by(&self) -> &[PwnEdge] {
        &self.pwnable_by
    }

    /// Returns the edge list for a direction
    pub fn edges(&self, direction: PwnDirection) -> &[PwnEdge] {
        match direction {
            PwnDirection::CanPwn => &self.can_pwn,
            PwnDirection::PwnableBy => &self.pwnable_by,
        }
    }
}

/// Object under construction, before the store assigns its identifier.
///
/// Attributes are named; the store builder resolves names through its
/// registry.
#[derive(Debug, Clone)]
pub struct ObjectDraft {
    pub(crate) dn: String,
    pub(crate) guid: Option<Uuid>,
    pub(crate) sid: Option<Sid>,
    pub(crate) attributes: Vec<(String, AttributeValue)>,
}

impl ObjectDraft {
    /// Starts a draft for the given distinguished name
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            guid: None,
            sid: None,
            attributes: Vec::new(),
        }
    }

    /// Sets the GUID (a random one is generated otherwise)
    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = Some(guid);
        self
    }

    /// Sets the SID
    pub fn with_sid(mut self, sid: Sid) -> Self {
        self.sid = Some(sid);
        self
    }

    /// Adds one attribute value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Adds several values of one attribute
    pub fn with_all<V: Into<AttributeValue>>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        for value in values {
            self.attributes.push((name.to_string(), value.into()));
        }
        self
    }

    pub fn distinguished_name(&self) -> &str {
        &self.dn
    }
}
