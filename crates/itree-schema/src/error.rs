//! Schema error types

/// Errors raised by class registration and property resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Class name already taken
    #[error("class already registered: {0}")]
    DuplicateClass(String),

    /// Parent class not registered yet
    #[error("cannot register {class}: unknown parent class {parent}")]
    UnknownParentClass {
        /// Class being registered
        class: String,
        /// Missing parent
        parent: String,
    },

    /// Class not registered
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// Property absent from the whole class chain
    #[error("{property} is not a valid member of {class}")]
    UnknownProperty {
        /// Class whose chain was searched
        class: String,
        /// Requested property
        property: String,
    },

    /// Subclass redeclares an inherited property
    #[error("{class}.{property} shadows the property declared by {owner}")]
    ShadowedProperty {
        /// Class being registered
        class: String,
        /// Redeclared property
        property: String,
        /// Ancestor that already declares it
        owner: String,
    },

    /// Default value fails its own descriptor
    #[error("invalid default for {class}.{property}: {reason}")]
    InvalidDefault {
        /// Class being registered
        class: String,
        /// Property with the bad default
        property: String,
        /// Validator message
        reason: String,
    },

    /// Abstract class instantiated
    #[error("class {0} is not creatable")]
    NotCreatable(String),
}
