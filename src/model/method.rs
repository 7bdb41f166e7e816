//! Attack-path methods
//!
//! Every `CanPwn`/`PwnableBy` edge is tagged with the method by which the
//! source can compromise the target. Name lookup fails closed: an unknown
//! name is an error, never a wildcard.

use std::fmt;

use thiserror::Error;

/// Unknown attack method name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown attack method: {0}")]
pub struct UnknownMethod(pub String);

/// Method by which one object can compromise another
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PwnMethod {
    AclContainsDeny,
    ResetPassword,
    AddMember,
    AddMemberGroupAttr,
    TakeOwnership,
    WriteDacl,
    WriteAll,
    WritePropertyAll,
    WriteExtendedAll,
    GenericAll,
    AllExtendedRights,
    CreateAnyObject,
    DeleteChildrenTarget,
    DcSync,
    ReadLapsPassword,
    MemberOfGroup,
    HasSpn,
    DontReqPreauth,
    Owns,
    WriteSpn,
    AdminTo,
    HasSession,
}

impl PwnMethod {
    const ALL: &'static [PwnMethod] = &[
        PwnMethod::AclContainsDeny,
        PwnMethod::ResetPassword,
        PwnMethod::AddMember,
        PwnMethod::AddMemberGroupAttr,
        PwnMethod::TakeOwnership,
        PwnMethod::WriteDacl,
        PwnMethod::WriteAll,
        PwnMethod::WritePropertyAll,
        PwnMethod::WriteExtendedAll,
        PwnMethod::GenericAll,
        PwnMethod::AllExtendedRights,
        PwnMethod::CreateAnyObject,
        PwnMethod::DeleteChildrenTarget,
        PwnMethod::DcSync,
        PwnMethod::ReadLapsPassword,
        PwnMethod::MemberOfGroup,
        PwnMethod::HasSpn,
        PwnMethod::DontReqPreauth,
        PwnMethod::Owns,
        PwnMethod::WriteSpn,
        PwnMethod::AdminTo,
        PwnMethod::HasSession,
    ];

    /// Returns the canonical method name
    pub fn as_str(&self) -> &'static str {
        match self {
            PwnMethod::AclContainsDeny => "ACLContainsDeny",
            PwnMethod::ResetPassword => "ResetPassword",
            PwnMethod::AddMember => "AddMember",
            PwnMethod::AddMemberGroupAttr => "AddMemberGroupAttr",
            PwnMethod::TakeOwnership => "TakeOwnership",
            PwnMethod::WriteDacl => "WriteDACL",
            PwnMethod::WriteAll => "WriteAll",
            PwnMethod::WritePropertyAll => "WritePropertyAll",
            PwnMethod::WriteExtendedAll => "WriteExtendedAll",
            PwnMethod::GenericAll => "GenericAll",
            PwnMethod::AllExtendedRights => "AllExtendedRights",
            PwnMethod::CreateAnyObject => "CreateAnyObject",
            PwnMethod::DeleteChildrenTarget => "DeleteChildrenTarget",
            PwnMethod::DcSync => "DCsync",
            PwnMethod::ReadLapsPassword => "ReadLAPSPassword",
            PwnMethod::MemberOfGroup => "MemberOfGroup",
            PwnMethod::HasSpn => "HasSPN",
            PwnMethod::DontReqPreauth => "DontReqPreauth",
            PwnMethod::Owns => "Owns",
            PwnMethod::WriteSpn => "WriteSPN",
            PwnMethod::AdminTo => "AdminTo",
            PwnMethod::HasSession => "HasSession",
        }
    }

    /// Resolves a method by name (case-insensitive)
    pub fn from_name(name: &str) -> Result<PwnMethod, UnknownMethod> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownMethod(name.to_string()))
    }

    /// Returns every known method in declaration order
    pub fn all() -> &'static [PwnMethod] {
        Self::ALL
    }
}

impl fmt::Display for PwnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PwnMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PwnMethod::from_name(s)
    }
}
