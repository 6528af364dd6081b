//! Transaction propagation behaviors.

use std::fmt;

/// How a new transactional scope relates to any currently active transaction.
///
/// The discriminants are the stable wire encoding; [`Propagation::code`] and
/// [`Propagation::from_code`] convert without a private mapping table.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(i32)]
pub enum Propagation {
    /// Join the current transaction; begin a new one if none exists.
    #[default]
    Required = 0,
    /// Join the current transaction; run non-transactionally if none exists.
    Supports = 1,
    /// Join the current transaction; fail if none exists.
    Mandatory = 2,
    /// Begin a new transaction, suspending any current one.
    RequiresNew = 3,
    /// Run non-transactionally, suspending any current transaction.
    NotSupported = 4,
    /// Run non-transactionally; fail if a transaction exists.
    Never = 5,
    /// Run within a nested scope of the current transaction if one exists,
    /// otherwise behave like [`Propagation::Required`].
    Nested = 6,
}

impl Propagation {
    /// All behaviors, in code order.
    pub const ALL: [Self; 7] = [
        Self::Required,
        Self::Supports,
        Self::Mandatory,
        Self::RequiresNew,
        Self::NotSupported,
        Self::Never,
        Self::Nested,
    ];

    /// Stable integer code for this behavior.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Decode a behavior from its integer code.
    #[inline]
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Required),
            1 => Some(Self::Supports),
            2 => Some(Self::Mandatory),
            3 => Some(Self::RequiresNew),
            4 => Some(Self::NotSupported),
            5 => Some(Self::Never),
            6 => Some(Self::Nested),
            _ => None,
        }
    }

    /// Whether this behavior begins a new transaction when none is active.
    #[must_use]
    pub const fn begins_without_current(self) -> bool {
        matches!(self, Self::Required | Self::RequiresNew | Self::Nested)
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Required => "required",
            Self::Supports => "supports",
            Self::Mandatory => "mandatory",
            Self::RequiresNew => "requires-new",
            Self::NotSupported => "not-supported",
            Self::Never => "never",
            Self::Nested => "nested",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_values() {
        assert_eq!(Propagation::Required.code(), 0);
        assert_eq!(Propagation::Supports.code(), 1);
        assert_eq!(Propagation::Mandatory.code(), 2);
        assert_eq!(Propagation::RequiresNew.code(), 3);
        assert_eq!(Propagation::NotSupported.code(), 4);
        assert_eq!(Propagation::Never.code(), 5);
        assert_eq!(Propagation::Nested.code(), 6);
    }

    #[test]
    fn from_code_covers_all() {
        for behavior in Propagation::ALL {
            assert_eq!(Propagation::from_code(behavior.code()), Some(behavior));
        }
        assert_eq!(Propagation::from_code(7), None);
        assert_eq!(Propagation::from_code(-1), None);
    }

    #[test]
    fn display() {
        assert_eq!(Propagation::RequiresNew.to_string(), "requires-new");
        assert_eq!(Propagation::Nested.to_string(), "nested");
    }

    #[test]
    fn default_is_required() {
        assert_eq!(Propagation::default(), Propagation::Required);
    }

    #[test]
    fn begin_behaviors() {
        assert!(Propagation::Required.begins_without_current());
        assert!(Propagation::RequiresNew.begins_without_current());
        assert!(Propagation::Nested.begins_without_current());
        assert!(!Propagation::Supports.begins_without_current());
        assert!(!Propagation::Mandatory.begins_without_current());
    }
}
