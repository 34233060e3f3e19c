//! Serializable subtree dumps for inspection and debugging

use crate::error::InstanceError;
use crate::instance::Instance;
use crate::node::Node;
use crate::tree::TreeState;
use indexmap::IndexMap;
use itree_schema::{InstanceId, Value};
use serde::Serialize;

/// Recursive view of one instance and its descendants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    /// Class name
    pub class_name: String,
    /// `Name` at capture time
    pub name: String,
    /// Class-specific properties, base properties excluded
    pub properties: IndexMap<String, Value>,
    /// Children in order
    pub children: Vec<InstanceSnapshot>,
}

impl InstanceSnapshot {
    fn from_node(node: &Node, children: Vec<InstanceSnapshot>) -> Self {
        Self {
            class_name: node.class.name().to_string(),
            name: node.name.clone(),
            properties: node.properties.clone(),
            children,
        }
    }

    /// Post-order walk with an explicit stack; depth is bounded by memory only
    fn capture(state: &TreeState, root: InstanceId) -> Result<Self, InstanceError> {
        let mut current = (state.node(root)?, Vec::new());
        let mut ancestors = Vec::new();
        loop {
            if let Some(&child) = current.0.children.get(current.1.len()) {
                let child = state.node(child)?;
                let frame = (child, Vec::with_capacity(child.children.len()));
                ancestors.push(std::mem::replace(&mut current, frame));
                continue;
            }

            let snapshot = Self::from_node(current.0, std::mem::take(&mut current.1));
            match ancestors.pop() {
                Some(parent) => {
                    current = parent;
                    current.1.push(snapshot);
                }
                None => return Ok(snapshot),
            }
        }
    }

    /// Number of instances in the snapshot, this one included
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(snapshot) = pending.pop() {
            count += 1;
            pending.extend(&snapshot.children);
        }
        count
    }

    /// Always `false`; a snapshot holds at least its own instance
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Render as pretty-printed JSON
    ///
    /// # Errors
    /// Returns the serializer error. Non-finite numbers do not fail; they
    /// render as `null`. Serialization recurses once per nesting level.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Drop for InstanceSnapshot {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut snapshot) = pending.pop() {
            pending.append(&mut snapshot.children);
        }
    }
}

impl Instance {
    /// Capture this instance and its descendants under one read lock
    ///
    /// # Errors
    /// Returns `StaleHandle` if the node was reclaimed
    pub fn snapshot(&self) -> Result<InstanceSnapshot, InstanceError> {
        let state = self.tree().state();
        InstanceSnapshot::capture(&state, self.id())
    }
}
