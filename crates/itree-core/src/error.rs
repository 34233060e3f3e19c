//! Error types for the instance tree
//!
//! Every mutating operation is all-or-nothing: when one of these errors is
//! returned the tree and its properties are exactly as they were before the
//! call. The single exception is [`InstanceError::Dispatch`], which reports
//! handler failures for a mutation that *did* commit.

use itree_schema::{InstanceId, SchemaError};
use itree_signal::DispatchError;

/// Main instance tree error type
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// Property absent from the resolved schema
    #[error("{property} is not a valid member of {class}")]
    UnknownProperty {
        /// Class of the instance
        class: String,
        /// Requested property
        property: String,
    },

    /// Write to an immutable property
    #[error("unable to assign property {property}: property is read-only")]
    ReadOnlyProperty {
        /// Offending property
        property: String,
    },

    /// Parent candidate is not a valid instance node here
    #[error("invalid parent: {reason}")]
    InvalidParent {
        /// Why the candidate was rejected
        reason: String,
    },

    /// Non-null `Parent` assignment after destruction
    #[error("the Parent property of {name} is locked: instance has been destroyed")]
    DestroyedInstance {
        /// Name of the destroyed instance
        name: String,
    },

    /// Value rejected by the property's descriptor
    #[error("invalid value for {property}: {reason}")]
    InvalidValue {
        /// Offending property
        property: String,
        /// Validator message
        reason: String,
    },

    /// Class not registered
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// Abstract class instantiated
    #[error("class {0} is not creatable")]
    NotCreatable(String),

    /// Other schema failure
    #[error("schema error: {0}")]
    Schema(SchemaError),

    /// Handle does not resolve in this tree
    #[error("stale instance handle {0}")]
    StaleHandle(InstanceId),

    /// A distinguished root already exists
    #[error("a distinguished root is already designated")]
    RootAlreadyDesignated,

    /// `WaitForChild` interrupted by tree shutdown
    #[error("WaitForChild cancelled: tree shut down")]
    WaitCancelled,

    /// Mutation committed, but signal handlers failed
    #[error("mutation committed, but {0}")]
    Dispatch(#[from] DispatchError),
}

impl InstanceError {
    /// Create invalid parent error
    #[inline]
    pub fn invalid_parent(reason: impl Into<String>) -> Self {
        Self::InvalidParent {
            reason: reason.into(),
        }
    }

    /// Check if error is a reparenting rejection
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::InvalidParent { .. } | Self::DestroyedInstance { .. })
    }

    /// Check if the underlying mutation was applied
    ///
    /// Only handler failures are reported after commit.
    #[inline]
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}

impl From<SchemaError> for InstanceError {
    fn from(value: SchemaError) -> Self {
        match value {
            SchemaError::UnknownProperty { class, property } => {
                Self::UnknownProperty { class, property }
            }
            SchemaError::UnknownClass(class) => Self::UnknownClass(class),
            SchemaError::NotCreatable(class) => Self::NotCreatable(class),
            other => Self::Schema(other),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML document could not be parsed
    #[error("invalid tree configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
