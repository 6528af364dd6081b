//! Transaction isolation levels.

use std::fmt;

/// Guarantee strength against concurrent anomalies (dirty read,
/// non-repeatable read, phantom read).
///
/// The codes match the standard database driver constants; `Default` means
/// "whatever the underlying resource is configured with".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(i32)]
pub enum Isolation {
    /// Use the resource's default isolation level.
    #[default]
    Default = -1,
    /// Dirty reads, non-repeatable reads and phantom reads can occur.
    ReadUncommitted = 1,
    /// Dirty reads are prevented.
    ReadCommitted = 2,
    /// Dirty and non-repeatable reads are prevented.
    RepeatableRead = 4,
    /// Dirty reads, non-repeatable reads and phantom reads are prevented.
    Serializable = 8,
}

impl Isolation {
    /// All levels, weakest to strongest, with `Default` first.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Serializable,
    ];

    /// Stable integer code for this level.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Decode a level from its integer code.
    #[inline]
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Default),
            1 => Some(Self::ReadUncommitted),
            2 => Some(Self::ReadCommitted),
            4 => Some(Self::RepeatableRead),
            8 => Some(Self::Serializable),
            _ => None,
        }
    }
}

impl fmt::Display for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::ReadUncommitted => "read-uncommitted",
            Self::ReadCommitted => "read-committed",
            Self::RepeatableRead => "repeatable-read",
            Self::Serializable => "serializable",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_values() {
        assert_eq!(Isolation::Default.code(), -1);
        assert_eq!(Isolation::ReadUncommitted.code(), 1);
        assert_eq!(Isolation::ReadCommitted.code(), 2);
        assert_eq!(Isolation::RepeatableRead.code(), 4);
        assert_eq!(Isolation::Serializable.code(), 8);
    }

    #[test]
    fn from_code_covers_all() {
        for level in Isolation::ALL {
            assert_eq!(Isolation::from_code(level.code()), Some(level));
        }
        assert_eq!(Isolation::from_code(0), None);
        assert_eq!(Isolation::from_code(3), None);
    }

    #[test]
    fn display() {
        assert_eq!(Isolation::Serializable.to_string(), "serializable");
        assert_eq!(Isolation::Default.to_string(), "default");
    }
}
