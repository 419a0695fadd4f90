//! This module contains the OSSA IR type definitions.
use std::fmt;

/// Value types.
///
/// `Ref` is the only managed type; values of every other type are trivial
/// and always carry [`crate::Ownership::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Unit,
    I1,
    I64,
    /// A managed reference, subject to ownership rules.
    Ref,
    /// An address. Trivial; access scopes operate on these.
    Ptr,
}

impl Type {
    /// Returns `true` if values of this type carry ownership.
    pub fn is_managed(self) -> bool {
        matches!(self, Self::Ref)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Unit => "unit",
            Self::I1 => "i1",
            Self::I64 => "i64",
            Self::Ref => "ref",
            Self::Ptr => "ptr",
        };
        write!(f, "{s}")
    }
}
