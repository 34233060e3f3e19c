//! Class descriptors
//!
//! A [`ClassDescriptor`] is resolved once at registration and never changes
//! afterwards. It links to its parent descriptor, so property resolution is
//! a walk outward along an immutable chain, and it carries a precomputed
//! ancestry list so `is_a` never touches the registry.

use crate::error::SchemaError;
use crate::property::{PropertyDescriptor, Schema};
use smallvec::SmallVec;
use std::sync::Arc;

/// Resolved, immutable class descriptor
#[derive(Debug)]
pub struct ClassDescriptor {
    name: String,
    parent: Option<Arc<ClassDescriptor>>,
    schema: Schema,
    /// Self first, then each ancestor outward
    ancestry: SmallVec<[String; 4]>,
    creatable: bool,
}

impl ClassDescriptor {
    /// Build the chain root (no parent)
    pub(crate) fn root(name: impl Into<String>, schema: Schema, creatable: bool) -> Self {
        let name = name.into();
        let mut ancestry = SmallVec::new();
        ancestry.push(name.clone());
        Self {
            name,
            parent: None,
            schema,
            ancestry,
            creatable,
        }
    }

    /// Build a subclass of `parent`
    ///
    /// # Errors
    /// - `ShadowedProperty` if `schema` redeclares an inherited property
    /// - `InvalidDefault` if a default fails its own descriptor
    pub(crate) fn derive(
        name: impl Into<String>,
        parent: Arc<ClassDescriptor>,
        schema: Schema,
        creatable: bool,
    ) -> Result<Self, SchemaError> {
        let name = name.into();

        for (property, descriptor) in schema.iter() {
            if let Some(owner) = parent.owner_of(property) {
                return Err(SchemaError::ShadowedProperty {
                    class: name,
                    property: property.to_string(),
                    owner: owner.to_string(),
                });
            }
            if let Err(reason) = descriptor.validate(descriptor.default_value().clone()) {
                return Err(SchemaError::InvalidDefault {
                    class: name,
                    property: property.to_string(),
                    reason,
                });
            }
        }

        let mut ancestry = SmallVec::with_capacity(parent.ancestry.len() + 1);
        ancestry.push(name.clone());
        ancestry.extend(parent.ancestry.iter().cloned());

        Ok(Self {
            name,
            parent: Some(parent),
            schema,
            ancestry,
            creatable,
        })
    }

    /// Class name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent descriptor
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<ClassDescriptor>> {
        self.parent.as_ref()
    }

    /// Parent class name
    #[inline]
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().map(ClassDescriptor::name)
    }

    /// Properties declared by this class only
    #[inline]
    #[must_use]
    pub fn own_schema(&self) -> &Schema {
        &self.schema
    }

    /// Whether instances of this class can be created directly
    #[inline]
    #[must_use]
    pub fn is_creatable(&self) -> bool {
        self.creatable
    }

    /// Chain depth (the root class has depth 0)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestry.len() - 1
    }

    /// Class names from self outward
    pub fn ancestry(&self) -> impl Iterator<Item = &str> {
        self.ancestry.iter().map(String::as_str)
    }

    /// Chain membership: true for this class and every ancestor
    #[must_use]
    pub fn is_a(&self, class_name: &str) -> bool {
        self.ancestry.iter().any(|c| c == class_name)
    }

    /// Resolve a property by walking the chain outward
    ///
    /// # Errors
    /// Returns `UnknownProperty` if no class in the chain declares it
    pub fn resolve(&self, property: &str) -> Result<&PropertyDescriptor, SchemaError> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(descriptor) = class.schema.get(property) {
                return Ok(descriptor);
            }
            current = class.parent.as_deref();
        }
        Err(SchemaError::UnknownProperty {
            class: self.name.clone(),
            property: property.to_string(),
        })
    }

    /// Check whether the chain declares `property`
    #[inline]
    #[must_use]
    pub fn has_property(&self, property: &str) -> bool {
        self.resolve(property).is_ok()
    }

    /// Name of the class in the chain that declares `property`
    #[must_use]
    pub fn owner_of(&self, property: &str) -> Option<&str> {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.schema.contains(property) {
                return Some(&class.name);
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// All resolved properties, root class first, declaration order within each
    #[must_use]
    pub fn properties(&self) -> Vec<(&str, &PropertyDescriptor)> {
        let mut chain: SmallVec<[&ClassDescriptor; 4]> = SmallVec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            chain.push(class);
            current = class.parent.as_deref();
        }
        chain
            .iter()
            .rev()
            .flat_map(|class| class.schema.iter())
            .collect()
    }
}
