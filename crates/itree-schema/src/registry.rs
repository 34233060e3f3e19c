//! Class registry
//!
//! Provides [`ClassRegistry`], the table of every class known to a tree.
//! Registration happens once at startup; once the registry is shared with a
//! tree it is read-only.

use crate::class::ClassDescriptor;
use crate::error::SchemaError;
use crate::property::{PropertyDescriptor, Schema};
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the base class every chain ends in
pub const BASE_CLASS: &str = "Instance";

/// Base property: display name, defaults to the class name
pub const NAME: &str = "Name";

/// Base property: parent reference, written through the reparenting protocol
pub const PARENT: &str = "Parent";

/// Base property: class identity, read-only
pub const CLASS_NAME: &str = "ClassName";

/// Registry of class descriptors
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    classes: HashMap<String, Arc<ClassDescriptor>>,
    /// Registration order, for stable listing
    order: Vec<String>,
}

impl ClassRegistry {
    /// Create registry holding only the base class
    #[must_use]
    pub fn new() -> Self {
        let base = ClassDescriptor::root(BASE_CLASS, Self::base_schema(), false);
        let mut classes = HashMap::new();
        classes.insert(BASE_CLASS.to_string(), Arc::new(base));
        Self {
            classes,
            order: vec![BASE_CLASS.to_string()],
        }
    }

    /// Properties shared by every instance
    fn base_schema() -> Schema {
        Schema::new()
            .property(NAME, PropertyDescriptor::string(""))
            .property(PARENT, PropertyDescriptor::reference())
            .property(CLASS_NAME, PropertyDescriptor::string("").read_only())
    }

    /// Register a creatable class
    ///
    /// `parent` of `None` derives directly from [`BASE_CLASS`].
    ///
    /// # Errors
    /// - `DuplicateClass` if the name is taken
    /// - `UnknownParentClass` if the parent is not registered
    /// - `ShadowedProperty` / `InvalidDefault` from schema resolution
    pub fn register_class(
        &mut self,
        name: &str,
        parent: Option<&str>,
        schema: Schema,
    ) -> Result<Arc<ClassDescriptor>, SchemaError> {
        self.insert(name, parent, schema, true)
    }

    /// Register an abstract class: usable as a parent and in `is_a`
    /// queries, but not instantiable
    ///
    /// # Errors
    /// Same as [`register_class`](Self::register_class)
    pub fn register_abstract_class(
        &mut self,
        name: &str,
        parent: Option<&str>,
        schema: Schema,
    ) -> Result<Arc<ClassDescriptor>, SchemaError> {
        self.insert(name, parent, schema, false)
    }

    fn insert(
        &mut self,
        name: &str,
        parent: Option<&str>,
        schema: Schema,
        creatable: bool,
    ) -> Result<Arc<ClassDescriptor>, SchemaError> {
        if self.classes.contains_key(name) {
            return Err(SchemaError::DuplicateClass(name.to_string()));
        }

        let parent_name = parent.unwrap_or(BASE_CLASS);
        let parent = self
            .classes
            .get(parent_name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownParentClass {
                class: name.to_string(),
                parent: parent_name.to_string(),
            })?;

        let descriptor = Arc::new(ClassDescriptor::derive(name, parent, schema, creatable)?);
        self.classes.insert(name.to_string(), Arc::clone(&descriptor));
        self.order.push(name.to_string());
        Ok(descriptor)
    }

    /// Lookup descriptor
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(name).cloned()
    }

    /// Lookup descriptor or fail
    ///
    /// # Errors
    /// Returns `UnknownClass` if not registered
    pub fn require(&self, name: &str) -> Result<Arc<ClassDescriptor>, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownClass(name.to_string()))
    }

    /// Lookup a creatable descriptor
    ///
    /// # Errors
    /// - `UnknownClass` if not registered
    /// - `NotCreatable` for abstract classes
    pub fn creatable(&self, name: &str) -> Result<Arc<ClassDescriptor>, SchemaError> {
        let descriptor = self.require(name)?;
        if descriptor.is_creatable() {
            Ok(descriptor)
        } else {
            Err(SchemaError::NotCreatable(name.to_string()))
        }
    }

    /// Resolve `property` for `class_name`, searching the chain outward
    ///
    /// # Errors
    /// - `UnknownClass` if the class is not registered
    /// - `UnknownProperty` if the chain does not declare it
    pub fn resolve(
        &self,
        class_name: &str,
        property: &str,
    ) -> Result<PropertyDescriptor, SchemaError> {
        let class = self.require(class_name)?;
        class.resolve(property).cloned()
    }

    /// Chain membership; unknown classes are never anything
    #[must_use]
    pub fn is_a(&self, class_name: &str, query: &str) -> bool {
        self.classes
            .get(class_name)
            .is_some_and(|class| class.is_a(query))
    }

    /// Check if registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Class names in registration order
    #[must_use]
    pub fn class_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Number of registered classes, base included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false: the base class is registered on construction
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
