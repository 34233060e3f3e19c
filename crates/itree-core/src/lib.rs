//! itree Core
//!
//! A schema-validated, observable instance tree.
//!
//! # Core Concepts
//!
//! - **Tree**: arena owning every node; children lists are the only
//!   ownership edges, `Parent` is a back-reference
//! - **Instance**: handle to one node, with validated property access
//! - **Mutator**: reparenting, `Destroy` and `ClearAllChildren`, keeping
//!   Parent/Children consistent and firing signals only after commit
//! - **Queries**: child/ancestor/descendant search, full names, snapshots
//! - **WaitForChild**: async wait for a named child under a [`WaitPolicy`]
//!
//! # Example
//!
//! ```rust
//! use itree_core::prelude::*;
//!
//! let mut registry = ClassRegistry::new();
//! registry.register_class("Folder", None, Schema::new()).unwrap();
//! let tree = Tree::new(registry);
//!
//! let parent = tree.create("Folder").unwrap();
//! let child = tree.create("Folder").unwrap();
//! child.set_parent(Some(&parent)).unwrap();
//! child.set_name("foo").unwrap();
//!
//! assert_eq!(parent.find_first_child("foo"), Some(child.clone()));
//! assert_eq!(child.get_full_name().unwrap(), "Folder.foo");
//!
//! child.set_parent(None).unwrap();
//! assert_eq!(parent.find_first_child("foo"), None);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
mod instance;
mod mutator;
mod node;
mod query;
pub mod snapshot;
mod tree;
mod wait;

// Re-exports
pub use config::{TreeConfig, WaitPolicy};
pub use error::{ConfigError, InstanceError};
pub use instance::Instance;
pub use snapshot::InstanceSnapshot;
pub use tree::Tree;

pub use itree_schema as schema;
pub use itree_signal as signal;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and querying trees
    pub use crate::{Instance, InstanceError, Tree, TreeConfig, WaitPolicy};
    pub use itree_schema::{
        ClassRegistry, InstanceId, PropertyDescriptor, Schema, Value, BASE_CLASS, CLASS_NAME,
        NAME, PARENT,
    };
    pub use itree_signal::{Connection, ConnectionGuard, Signal};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
