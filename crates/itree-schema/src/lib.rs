//! itree Schema
//!
//! Class descriptors and validated property schemas for the instance tree.
//!
//! # Overview
//!
//! - **Value**: dynamically-typed property cell, with [`InstanceId`] references
//! - **PropertyDescriptor**: kind, default, read-only flag, custom validator
//! - **ClassDescriptor**: immutable, single-inheritance class with `is_a`
//! - **ClassRegistry**: registration and lookup of every known class
//!
//! # Example
//!
//! ```rust
//! use itree_schema::{ClassRegistry, PropertyDescriptor, Schema};
//!
//! let mut registry = ClassRegistry::new();
//! registry
//!     .register_abstract_class(
//!         "BasePart",
//!         None,
//!         Schema::new().property("Anchored", PropertyDescriptor::bool(false)),
//!     )
//!     .unwrap();
//! registry.register_class("Part", Some("BasePart"), Schema::new()).unwrap();
//!
//! assert!(registry.is_a("Part", "BasePart"));
//! assert!(registry.resolve("Part", "Anchored").is_ok());
//! assert!(registry.resolve("Part", "CanDestroyTheWorld").is_err());
//! ```

#![warn(missing_docs)]

pub mod class;
pub mod error;
pub mod property;
pub mod registry;
pub mod value;

// Re-exports
pub use class::ClassDescriptor;
pub use error::SchemaError;
pub use property::{PropertyDescriptor, Schema, Validator};
pub use registry::{ClassRegistry, BASE_CLASS, CLASS_NAME, NAME, PARENT};
pub use value::{InstanceId, Value, ValueKind};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for schema declarations
    pub use crate::{
        ClassDescriptor, ClassRegistry, InstanceId, PropertyDescriptor, Schema, SchemaError,
        Value, ValueKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
