//! Instance handles
//!
//! An [`Instance`] is a cheap, clonable handle naming one node of a
//! [`Tree`]. All accessors go through the tree lock, so a handle always
//! observes committed state. Handles to reclaimed nodes are *stale*:
//! accessors report [`InstanceError::StaleHandle`] and queries come back
//! empty.

use crate::error::InstanceError;
use crate::mutator::{self, ParentTarget};
use crate::node::Emissions;
use crate::tree::Tree;
use itree_schema::{ClassDescriptor, InstanceId, Value, NAME, PARENT};
use itree_signal::Signal;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Handle to one node of a [`Tree`]
#[derive(Clone)]
pub struct Instance {
    tree: Tree,
    id: InstanceId,
}

impl Instance {
    pub(crate) fn new(tree: Tree, id: InstanceId) -> Self {
        Self { tree, id }
    }

    /// Stable identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Owning tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Check if the handle still resolves
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.tree.contains(self.id)
    }

    /// Class descriptor
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn class(&self) -> Result<Arc<ClassDescriptor>, InstanceError> {
        Ok(Arc::clone(&self.tree.state().node(self.id)?.class))
    }

    /// Class name
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn class_name(&self) -> Result<String, InstanceError> {
        Ok(self.tree.state().node(self.id)?.class.name().to_string())
    }

    /// Current `Name`
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn name(&self) -> Result<String, InstanceError> {
        Ok(self.tree.state().node(self.id)?.name.clone())
    }

    /// Rename; shorthand for writing `Name`
    ///
    /// # Errors
    /// See [`set_property`](Self::set_property)
    pub fn set_name(&self, name: impl Into<String>) -> Result<(), InstanceError> {
        self.set_property(NAME, Value::String(name.into()))
    }

    /// Current parent
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn parent(&self) -> Result<Option<Instance>, InstanceError> {
        let parent = self.tree.state().node(self.id)?.parent;
        Ok(parent.map(|id| self.tree.handle(id)))
    }

    /// Whether `Destroy` has run on this node
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn is_destroyed(&self) -> Result<bool, InstanceError> {
        Ok(self.tree.state().node(self.id)?.destroyed)
    }

    /// Check class-chain membership; `false` for stale handles
    #[must_use]
    pub fn is_a(&self, class_name: &str) -> bool {
        self.tree
            .state()
            .nodes
            .get(&self.id)
            .is_some_and(|node| node.class.is_a(class_name))
    }

    /// Read a property through the resolved schema
    ///
    /// # Errors
    /// - `UnknownProperty` if absent from the class chain
    /// - `StaleHandle` if the node was reclaimed
    pub fn get_property(&self, property: &str) -> Result<Value, InstanceError> {
        let state = self.tree.state();
        let node = state.node(self.id)?;
        node.class.resolve(property)?;
        node.read(property).ok_or_else(|| InstanceError::UnknownProperty {
            class: node.class.name().to_string(),
            property: property.to_string(),
        })
    }

    /// Validate and write a property
    ///
    /// Writing `Parent` runs the reparenting protocol. Writing a value equal
    /// to the current one succeeds without firing anything. Otherwise
    /// `Changed(property)` and the dedicated property signal fire after the
    /// value is stored.
    ///
    /// # Errors
    /// - `UnknownProperty`, `ReadOnlyProperty`, `InvalidValue`
    /// - `InvalidParent`, `DestroyedInstance` for `Parent`; any value other
    ///   than null or an instance reference is `InvalidParent`
    /// - `Dispatch` if the write committed but handlers failed
    pub fn set_property(&self, property: &str, value: impl Into<Value>) -> Result<(), InstanceError> {
        let mut emissions = Emissions::default();
        {
            let mut state = self.tree.state_mut();
            let node = state.node(self.id)?;
            let descriptor = node.class.resolve(property)?;
            if descriptor.is_read_only() {
                return Err(InstanceError::ReadOnlyProperty {
                    property: property.to_string(),
                });
            }

            if property == PARENT {
                let target = match value.into() {
                    Value::Nil | Value::Ref(None) => ParentTarget::Detach,
                    Value::Ref(Some(parent)) => ParentTarget::Attach(parent),
                    other => ParentTarget::NotAnInstance(other.kind_name()),
                };
                mutator::reparent(&mut state, &self.tree, self.id, target, &mut emissions)?;
            } else {
                let value = descriptor
                    .validate(value.into())
                    .map_err(|reason| InstanceError::InvalidValue {
                        property: property.to_string(),
                        reason,
                    })?;
                if let Value::Ref(Some(target)) = value {
                    if !state.nodes.contains_key(&target) {
                        return Err(InstanceError::InvalidValue {
                            property: property.to_string(),
                            reason: format!("{target} is not an instance of this tree"),
                        });
                    }
                }
                if node.read(property).as_ref() == Some(&value) {
                    return Ok(());
                }

                let renamed = if property == NAME {
                    value.as_str().map(str::to_string)
                } else {
                    None
                };
                let node = state.node_mut(self.id)?;
                match &renamed {
                    Some(name) => node.name.clone_from(name),
                    None => {
                        node.properties.insert(property.to_string(), value);
                    }
                }
                emissions.property_changed(node, property);
                let parent = node.parent;

                if let (Some(name), Some(parent)) = (renamed, parent) {
                    state.resolve_waiters(parent, &name, self.id);
                }
                tracing::trace!("Set {}.{} on {}", state.node(self.id)?.class.name(), property, self.id);
            }
        }
        emissions.fire()
    }

    /// Dedicated signal for one property, created on first request
    ///
    /// Fires with no payload exactly when that property changes.
    ///
    /// # Errors
    /// - `UnknownProperty` if absent from the class chain
    /// - `StaleHandle` if the node was reclaimed
    pub fn get_property_changed_signal(&self, property: &str) -> Result<Signal<()>, InstanceError> {
        let mut state = self.tree.state_mut();
        let node = state.node_mut(self.id)?;
        node.class.resolve(property)?;
        let class = node.class.name().to_string();
        let signal = node
            .signals
            .by_property
            .entry(property.to_string())
            .or_insert_with(|| Signal::new(format!("{class}.{property}Changed")));
        Ok(signal.clone())
    }

    /// Fires with the property name after any property change
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn changed(&self) -> Result<Signal<String>, InstanceError> {
        Ok(self.tree.state().node(self.id)?.signals.changed.clone())
    }

    /// Fires with the new child after it is appended
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn child_added(&self) -> Result<Signal<Instance>, InstanceError> {
        Ok(self.tree.state().node(self.id)?.signals.child_added.clone())
    }

    /// Fires with the former child after it is removed
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn child_removed(&self) -> Result<Signal<Instance>, InstanceError> {
        Ok(self.tree.state().node(self.id)?.signals.child_removed.clone())
    }

    /// Fires once when `Destroy` starts, before anything is detached
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn destroying(&self) -> Result<Signal<()>, InstanceError> {
        Ok(self.tree.state().node(self.id)?.signals.destroying.clone())
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.tree.ptr_eq(&other.tree)
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.id).finish()
    }
}

/// Renders the current `Name`, read at call time
impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.state().nodes.get(&self.id) {
            Some(node) => f.write_str(&node.name),
            None => write!(f, "<stale {}>", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itree_schema::{ClassRegistry, PropertyDescriptor, Schema, CLASS_NAME};
    use parking_lot::Mutex;

    fn tree() -> Tree {
        let mut registry = ClassRegistry::new();
        registry
            .register_class(
                "Part",
                None,
                Schema::new()
                    .property("Anchored", PropertyDescriptor::bool(false))
                    .property("Transparency", PropertyDescriptor::number(0.0))
                    .property("Target", PropertyDescriptor::reference()),
            )
            .unwrap();
        Tree::new(registry)
    }

    #[test]
    fn defaults_and_base_properties() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        assert_eq!(part.get_property(NAME).unwrap(), Value::from("Part"));
        assert_eq!(part.get_property(CLASS_NAME).unwrap(), Value::from("Part"));
        assert_eq!(part.get_property(PARENT).unwrap(), Value::Ref(None));
        assert_eq!(part.get_property("Anchored").unwrap(), Value::Bool(false));
    }

    #[test]
    fn unknown_property_on_read_and_write() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        assert!(matches!(
            part.get_property("Nope"),
            Err(InstanceError::UnknownProperty { .. })
        ));
        assert!(matches!(
            part.set_property("Nope", true),
            Err(InstanceError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn class_name_is_read_only() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        let err = part.set_property(CLASS_NAME, "Other").unwrap_err();
        assert!(matches!(err, InstanceError::ReadOnlyProperty { .. }));
        assert_eq!(part.class_name().unwrap(), "Part");
    }

    #[test]
    fn invalid_value_leaves_property_unchanged() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        let err = part.set_property("Anchored", "yes").unwrap_err();
        assert!(matches!(err, InstanceError::InvalidValue { .. }));
        assert_eq!(part.get_property("Anchored").unwrap(), Value::Bool(false));
    }

    #[test]
    fn int_widens_into_number_property() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        part.set_property("Transparency", 1).unwrap();
        assert_eq!(part.get_property("Transparency").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn changed_fires_after_store() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let observer = part.clone();
        let sink = Arc::clone(&seen);
        let _connection = part.changed().unwrap().connect(move |property| {
            let value = observer.get_property(property)?;
            sink.lock().push((property.clone(), value));
            Ok(())
        });

        part.set_property("Anchored", true).unwrap();
        assert_eq!(*seen.lock(), vec![("Anchored".to_string(), Value::Bool(true))]);
    }

    #[test]
    fn equal_write_fires_nothing() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let _connection = part.changed().unwrap().connect(move |_| {
            *sink.lock() += 1;
            Ok(())
        });

        part.set_property("Anchored", false).unwrap();
        part.set_name("Part").unwrap();
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn property_signal_is_lazy_and_shared() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        let first = part.get_property_changed_signal("Anchored").unwrap();
        let second = part.get_property_changed_signal("Anchored").unwrap();
        assert!(first.same_signal(&second));
        assert!(matches!(
            part.get_property_changed_signal("CanDestroyTheWorld"),
            Err(InstanceError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn reference_must_name_instance_in_tree() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        let other = tree.create("Part").unwrap();
        part.set_property("Target", other.id()).unwrap();
        assert_eq!(part.get_property("Target").unwrap(), Value::Ref(Some(other.id())));

        let foreign = self::tree().create("Part").unwrap();
        assert!(matches!(
            part.set_property("Target", foreign.id()),
            Err(InstanceError::InvalidValue { .. })
        ));
        part.set_property("Target", Value::Nil).unwrap();
        assert_eq!(part.get_property("Target").unwrap(), Value::Ref(None));
    }

    #[test]
    fn display_reads_name_at_call_time() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        assert_eq!(part.to_string(), "Part");
        part.set_name("Brick").unwrap();
        assert_eq!(part.to_string(), "Brick");
    }

    #[test]
    fn handles_compare_by_tree_and_id() {
        let tree = tree();
        let part = tree.create("Part").unwrap();
        assert_eq!(part, tree.instance(part.id()).unwrap());
        assert_ne!(part, tree.create("Part").unwrap());
    }
}
