//! Tree mutator
//!
//! The reparenting and destruction protocol. Each structural step commits
//! under the tree write lock, keeping `child.Parent == P` exactly when `P`
//! lists `child` once; signals for the step fire after the lock is released.
//!
//! Signal order for one committed reparent:
//! 1. child `Changed("Parent")`
//! 2. child dedicated `Parent` signal, if requested
//! 3. old parent `ChildRemoved(child)`
//! 4. new parent `ChildAdded(child)`

use crate::error::InstanceError;
use crate::instance::Instance;
use crate::node::Emissions;
use crate::tree::{Tree, TreeState};
use itree_schema::{InstanceId, PARENT};
use itree_signal::DispatchReport;

/// Requested parent for a reparent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParentTarget {
    /// Set `Parent` to null
    Detach,
    /// Append under this node
    Attach(InstanceId),
    /// A node owned by another tree
    Foreign,
    /// A value that is not an instance reference, by kind name
    NotAnInstance(&'static str),
}

/// Apply one reparent to locked state, queueing its signals
///
/// Returns `false` for the no-op case (target equals current parent).
pub(crate) fn reparent(
    state: &mut TreeState,
    tree: &Tree,
    id: InstanceId,
    target: ParentTarget,
    emissions: &mut Emissions,
) -> Result<bool, InstanceError> {
    let node = state.node(id)?;
    let old = node.parent;

    if node.destroyed && target != ParentTarget::Detach {
        return Err(InstanceError::DestroyedInstance {
            name: node.name.clone(),
        });
    }

    let new = match target {
        ParentTarget::Detach => None,
        ParentTarget::Attach(parent) => Some(parent),
        ParentTarget::Foreign => {
            return Err(InstanceError::invalid_parent(
                "parent belongs to a different tree",
            ));
        }
        ParentTarget::NotAnInstance(kind) => {
            return Err(InstanceError::invalid_parent(format!(
                "expected an instance, got {kind}"
            )));
        }
    };

    if new == old {
        return Ok(false);
    }

    if let Some(parent) = new {
        if parent == id {
            return Err(InstanceError::invalid_parent(
                "cannot parent an instance to itself",
            ));
        }
        if !state.nodes.contains_key(&parent) {
            return Err(InstanceError::invalid_parent(format!(
                "{parent} is not a live instance of this tree"
            )));
        }
        if state.is_ancestor(id, parent) {
            return Err(InstanceError::invalid_parent(format!(
                "{parent} is a descendant of {id}"
            )));
        }
    }

    // Commit
    if let Some(previous) = old.and_then(|o| state.nodes.get_mut(&o)) {
        previous.children.retain(|child| *child != id);
    }
    let node = state.node_mut(id)?;
    node.parent = new;
    emissions.property_changed(node, PARENT);
    let name = node.name.clone();

    if let Some(previous) = old.and_then(|o| state.nodes.get(&o)) {
        emissions.child_removed(previous, tree.handle(id));
    }
    if let Some(parent) = new {
        if let Some(next) = state.nodes.get_mut(&parent) {
            next.children.push(id);
            emissions.child_added(next, tree.handle(id));
        }
        state.resolve_waiters(parent, &name, id);
    }

    tracing::debug!("Reparented {} ({}) from {:?} to {:?}", id, name, old, new);
    Ok(true)
}

/// Fold a step's result into `report`, keeping only handler failures
fn absorb(report: &mut DispatchReport, result: Result<(), InstanceError>) -> Result<(), InstanceError> {
    match result {
        Err(InstanceError::Dispatch(failures)) => {
            report.record(Err(failures));
            Ok(())
        }
        other => other,
    }
}

impl Instance {
    /// Set or clear the parent
    ///
    /// The new child is appended after existing children; remaining siblings
    /// of the old parent keep their relative order.
    ///
    /// # Errors
    /// - `DestroyedInstance` for a non-null parent after `Destroy`
    /// - `InvalidParent` for a foreign or stale handle, the node itself, or
    ///   one of its descendants
    /// - `Dispatch` if the reparent committed but handlers failed
    pub fn set_parent(&self, parent: Option<&Instance>) -> Result<(), InstanceError> {
        let target = match parent {
            None => ParentTarget::Detach,
            Some(parent) if !parent.tree().ptr_eq(self.tree()) => ParentTarget::Foreign,
            Some(parent) => ParentTarget::Attach(parent.id()),
        };
        self.apply_reparent(target)
    }

    fn apply_reparent(&self, target: ParentTarget) -> Result<(), InstanceError> {
        let mut emissions = Emissions::default();
        {
            let mut state = self.tree().state_mut();
            reparent(&mut state, self.tree(), self.id(), target, &mut emissions)?;
        }
        emissions.fire()
    }

    /// Detach a child if it is still listed under this node
    fn detach_child(&self, child: InstanceId) -> Result<(), InstanceError> {
        let mut emissions = Emissions::default();
        {
            let mut state = self.tree().state_mut();
            let still_ours = state.nodes.get(&child).and_then(|c| c.parent) == Some(self.id());
            if !still_ours {
                return Ok(());
            }
            reparent(&mut state, self.tree(), child, ParentTarget::Detach, &mut emissions)?;
        }
        emissions.fire()
    }

    /// Destroy: detach from the parent, detach every child, lock `Parent`
    ///
    /// Descendants are detached, not destroyed; they remain usable and may be
    /// reparented. `Destroying` fires first, only on the first call. Calling
    /// again on a destroyed node detaches anything parented to it since.
    ///
    /// # Errors
    /// - `StaleHandle` if the node was reclaimed
    /// - `Dispatch` if the destruction completed but handlers failed
    pub fn destroy(&self) -> Result<(), InstanceError> {
        let mut report = DispatchReport::new();

        let destroying = {
            let state = self.tree().state();
            let node = state.node(self.id())?;
            (!node.destroyed).then(|| node.signals.destroying.clone())
        };
        if let Some(signal) = destroying {
            report.record(signal.fire(&()));
        }

        absorb(&mut report, self.apply_reparent(ParentTarget::Detach))?;

        let children = self.tree().state().node(self.id())?.children.clone();
        for child in &children {
            absorb(&mut report, self.detach_child(*child))?;
        }

        {
            let mut state = self.tree().state_mut();
            state.node_mut(self.id())?.destroyed = true;
        }
        tracing::debug!(
            "Destroyed {} and detached {} child(ren)",
            self.id(),
            children.len()
        );
        report.finish().map_err(Into::into)
    }

    /// Detach every current child without destroying anything
    ///
    /// # Errors
    /// - `StaleHandle` if the node was reclaimed
    /// - `Dispatch` if the children were detached but handlers failed
    pub fn clear_all_children(&self) -> Result<(), InstanceError> {
        let mut report = DispatchReport::new();
        let children = self.tree().state().node(self.id())?.children.clone();
        for child in &children {
            absorb(&mut report, self.detach_child(*child))?;
        }
        tracing::debug!("Cleared {} child(ren) of {}", children.len(), self.id());
        report.finish().map_err(Into::into)
    }
}
