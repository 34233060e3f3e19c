//! Query engine
//!
//! Read-only traversals over committed tree state. Every query takes the
//! read lock once, so it never observes a half-applied reparent. Searches
//! are linear scans in child insertion order; names need not be unique.
//! A stale handle yields an absent or empty result rather than an error.

use crate::error::InstanceError;
use crate::instance::Instance;
use itree_schema::InstanceId;

impl Instance {
    fn wrap(&self, id: Option<InstanceId>) -> Option<Instance> {
        id.map(|id| self.tree().handle(id))
    }

    /// Snapshot of the current children in order
    ///
    /// Later mutations do not affect the returned vector.
    #[must_use]
    pub fn get_children(&self) -> Vec<Instance> {
        let state = self.tree().state();
        state
            .nodes
            .get(&self.id())
            .map(|node| node.children.iter().map(|id| self.tree().handle(*id)).collect())
            .unwrap_or_default()
    }

    /// Every descendant in pre-order, excluding this node
    #[must_use]
    pub fn get_descendants(&self) -> Vec<Instance> {
        let ids = self.tree().state().descendants(self.id());
        ids.into_iter().map(|id| self.tree().handle(id)).collect()
    }

    /// First child whose `Name` equals `name`
    #[must_use]
    pub fn find_first_child(&self, name: &str) -> Option<Instance> {
        let found = self.tree().state().find_child(self.id(), name);
        self.wrap(found)
    }

    /// First descendant (pre-order) whose `Name` equals `name`
    ///
    /// The recursive form of [`find_first_child`](Self::find_first_child).
    #[must_use]
    pub fn find_first_descendant(&self, name: &str) -> Option<Instance> {
        let found = {
            let state = self.tree().state();
            state
                .descendants(self.id())
                .into_iter()
                .find(|id| state.nodes.get(id).is_some_and(|node| node.name == name))
        };
        self.wrap(found)
    }

    /// First child whose class is exactly `class_name`
    #[must_use]
    pub fn find_first_child_of_class(&self, class_name: &str) -> Option<Instance> {
        let found = self
            .tree()
            .state()
            .first_child(self.id(), |node| node.class.name() == class_name);
        self.wrap(found)
    }

    /// First child whose class chain contains `class_name`
    #[must_use]
    pub fn find_first_child_which_is_a(&self, class_name: &str) -> Option<Instance> {
        let found = self
            .tree()
            .state()
            .first_child(self.id(), |node| node.class.is_a(class_name));
        self.wrap(found)
    }

    /// Nearest strict ancestor whose `Name` equals `name`
    #[must_use]
    pub fn find_first_ancestor(&self, name: &str) -> Option<Instance> {
        let found = self
            .tree()
            .state()
            .first_ancestor(self.id(), |node| node.name == name);
        self.wrap(found)
    }

    /// Nearest strict ancestor whose class is exactly `class_name`
    #[must_use]
    pub fn find_first_ancestor_of_class(&self, class_name: &str) -> Option<Instance> {
        let found = self
            .tree()
            .state()
            .first_ancestor(self.id(), |node| node.class.name() == class_name);
        self.wrap(found)
    }

    /// Nearest strict ancestor whose class chain contains `class_name`
    #[must_use]
    pub fn find_first_ancestor_which_is_a(&self, class_name: &str) -> Option<Instance> {
        let found = self
            .tree()
            .state()
            .first_ancestor(self.id(), |node| node.class.is_a(class_name));
        self.wrap(found)
    }

    /// Whether `other` lies strictly above this node
    #[must_use]
    pub fn is_descendant_of(&self, other: &Instance) -> bool {
        self.tree().ptr_eq(other.tree()) && self.tree().state().is_ancestor(other.id(), self.id())
    }

    /// Whether this node lies strictly above `other`
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Instance) -> bool {
        other.is_descendant_of(self)
    }

    /// Dot-joined path from the topmost ancestor down to this node
    ///
    /// The distinguished root, when it is an ancestor, is left out.
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn get_full_name(&self) -> Result<String, InstanceError> {
        let state = self.tree().state();
        let node = state.node(self.id())?;
        let mut names = vec![node.name.as_str()];
        let mut current = node.parent;

        while let Some(id) = current {
            if state.root == Some(id) {
                break;
            }
            let Some(ancestor) = state.nodes.get(&id) else {
                break;
            };
            names.push(ancestor.name.as_str());
            current = ancestor.parent;
        }

        names.reverse();
        Ok(names.join("."))
    }
}
