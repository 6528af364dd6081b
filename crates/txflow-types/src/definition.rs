//! Caller-declared transaction demarcation.

use std::fmt;

use crate::{Isolation, Propagation};

/// Sentinel timeout meaning "use the manager or resource default".
pub const TIMEOUT_DEFAULT: i32 = -1;

/// An immutable declaration of how a transactional scope should behave:
/// propagation, isolation, timeout, read-only hint and an optional name.
///
/// Definitions are cheap values; build one with the chaining constructors and
/// hand it to the engine by reference.
///
/// ```
/// use txflow_types::{Isolation, Propagation, TransactionDefinition};
///
/// let def = TransactionDefinition::with_propagation(Propagation::RequiresNew)
///     .isolation(Isolation::Serializable)
///     .timeout(30)
///     .named("checkout");
/// assert_eq!(def.timeout_seconds(), 30);
/// assert!(!def.is_read_only());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionDefinition {
    propagation: Propagation,
    isolation: Isolation,
    timeout: i32,
    read_only: bool,
    name: Option<String>,
}

impl Default for TransactionDefinition {
    fn default() -> Self {
        Self::required()
    }
}

impl TransactionDefinition {
    /// A definition with all defaults: `Required`, default isolation,
    /// default timeout, writable, unnamed.
    #[must_use]
    pub fn required() -> Self {
        Self {
            propagation: Propagation::Required,
            isolation: Isolation::Default,
            timeout: TIMEOUT_DEFAULT,
            read_only: false,
            name: None,
        }
    }

    /// A default definition with the given propagation behavior.
    #[must_use]
    pub fn with_propagation(propagation: Propagation) -> Self {
        Self {
            propagation,
            ..Self::required()
        }
    }

    /// Replace the isolation level.
    #[must_use]
    pub fn isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Replace the timeout, in seconds. `-1` means default; values below
    /// `-1` are rejected by the engine at `get_transaction` time.
    #[must_use]
    pub fn timeout(mut self, seconds: i32) -> Self {
        self.timeout = seconds;
        self
    }

    /// Mark the scope as a read-only hint for the resource.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Attach a diagnostic name to the scope.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    #[inline]
    #[must_use]
    pub fn isolation_level(&self) -> Isolation {
        self.isolation
    }

    /// Timeout in seconds; [`TIMEOUT_DEFAULT`] when unset.
    #[inline]
    #[must_use]
    pub fn timeout_seconds(&self) -> i32 {
        self.timeout
    }

    #[inline]
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for TransactionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.propagation, self.isolation)?;
        if self.timeout != TIMEOUT_DEFAULT {
            write!(f, ",timeout={}", self.timeout)?;
        }
        if self.read_only {
            f.write_str(",read-only")?;
        }
        if let Some(name) = &self.name {
            write!(f, ",name={name}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let def = TransactionDefinition::default();
        assert_eq!(def.propagation(), Propagation::Required);
        assert_eq!(def.isolation_level(), Isolation::Default);
        assert_eq!(def.timeout_seconds(), TIMEOUT_DEFAULT);
        assert!(!def.is_read_only());
        assert_eq!(def.name(), None);
        assert_eq!(def, TransactionDefinition::required());
    }

    #[test]
    fn chaining_constructors() {
        let def = TransactionDefinition::with_propagation(Propagation::Nested)
            .isolation(Isolation::RepeatableRead)
            .timeout(5)
            .read_only(true)
            .named("audit");
        assert_eq!(def.propagation(), Propagation::Nested);
        assert_eq!(def.isolation_level(), Isolation::RepeatableRead);
        assert_eq!(def.timeout_seconds(), 5);
        assert!(def.is_read_only());
        assert_eq!(def.name(), Some("audit"));
    }

    #[test]
    fn display_compact() {
        let def = TransactionDefinition::required();
        assert_eq!(def.to_string(), "required,default");

        let def = TransactionDefinition::with_propagation(Propagation::RequiresNew)
            .isolation(Isolation::Serializable)
            .timeout(30)
            .read_only(true)
            .named("checkout");
        assert_eq!(
            def.to_string(),
            "requires-new,serializable,timeout=30,read-only,name=checkout"
        );
    }

    #[test]
    fn serde_round_trip() {
        let def = TransactionDefinition::with_propagation(Propagation::Mandatory).timeout(10);
        let json = serde_json::to_string(&def).expect("definition should serialize");
        let back: TransactionDefinition =
            serde_json::from_str(&json).expect("definition should deserialize");
        assert_eq!(back, def);
    }
}
