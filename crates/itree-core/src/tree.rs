//! Instance tree arena
//!
//! Provides [`Tree`], the owner of every node. Nodes live in an arena keyed
//! by [`InstanceId`]; a node's `parent` is a non-owning id, and its children
//! list is the only ownership edge. All tree state sits behind a single
//! `RwLock` (single-writer discipline): mutations commit under the write
//! lock, and readers always observe a fully applied mutation.

use crate::config::TreeConfig;
use crate::error::InstanceError;
use crate::instance::Instance;
use crate::node::Node;
use crate::wait::Waiter;
use itree_schema::{ClassRegistry, InstanceId};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lock-protected tree state
#[derive(Default)]
pub(crate) struct TreeState {
    pub(crate) nodes: HashMap<InstanceId, Node>,
    pub(crate) root: Option<InstanceId>,
    /// Pending `WaitForChild` calls keyed by the awaited parent
    pub(crate) waiters: HashMap<InstanceId, Vec<Waiter>>,
}

impl TreeState {
    pub(crate) fn node(&self, id: InstanceId) -> Result<&Node, InstanceError> {
        self.nodes.get(&id).ok_or(InstanceError::StaleHandle(id))
    }

    pub(crate) fn node_mut(&mut self, id: InstanceId) -> Result<&mut Node, InstanceError> {
        self.nodes.get_mut(&id).ok_or(InstanceError::StaleHandle(id))
    }

    /// First child (insertion order) matching `predicate`
    pub(crate) fn first_child<P>(&self, parent: InstanceId, predicate: P) -> Option<InstanceId>
    where
        P: Fn(&Node) -> bool,
    {
        let node = self.nodes.get(&parent)?;
        node.children
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(&predicate))
    }

    /// First child named `name`
    pub(crate) fn find_child(&self, parent: InstanceId, name: &str) -> Option<InstanceId> {
        self.first_child(parent, |node| node.name == name)
    }

    /// First strict ancestor of `id` matching `predicate`
    pub(crate) fn first_ancestor<P>(&self, id: InstanceId, predicate: P) -> Option<InstanceId>
    where
        P: Fn(&Node) -> bool,
    {
        let mut current = self.nodes.get(&id)?.parent;
        while let Some(ancestor) = current {
            let node = self.nodes.get(&ancestor)?;
            if predicate(node) {
                return Some(ancestor);
            }
            current = node.parent;
        }
        None
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub(crate) fn is_ancestor(&self, ancestor: InstanceId, id: InstanceId) -> bool {
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.nodes.get(&candidate).and_then(|n| n.parent);
        }
        false
    }

    /// Pre-order descendants of `id`, excluding `id`
    pub(crate) fn descendants(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut out = Vec::new();
        let mut stack: Vec<InstanceId> = match self.nodes.get(&id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.nodes.get(&next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }
}

pub(crate) struct TreeInner {
    registry: Arc<ClassRegistry>,
    config: TreeConfig,
    state: RwLock<TreeState>,
    shut_down: AtomicBool,
}

/// Shared handle to an instance tree
///
/// Cloning is cheap and yields another handle to the same tree.
#[derive(Clone)]
pub struct Tree {
    inner: Arc<TreeInner>,
}

impl Tree {
    /// Create tree with default configuration
    #[must_use]
    pub fn new(registry: impl Into<Arc<ClassRegistry>>) -> Self {
        Self::with_config(registry, TreeConfig::default())
    }

    /// Create tree with custom configuration
    #[must_use]
    pub fn with_config(registry: impl Into<Arc<ClassRegistry>>, config: TreeConfig) -> Self {
        Self {
            inner: Arc::new(TreeInner {
                registry: registry.into(),
                config,
                state: RwLock::new(TreeState::default()),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Class registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.inner.registry
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.inner.config
    }

    pub(crate) fn state(&self) -> RwLockReadGuard<'_, TreeState> {
        self.inner.state.read()
    }

    pub(crate) fn state_mut(&self) -> RwLockWriteGuard<'_, TreeState> {
        self.inner.state.write()
    }

    /// Wrap an id without checking it
    pub(crate) fn handle(&self, id: InstanceId) -> Instance {
        Instance::new(self.clone(), id)
    }

    /// Check if two handles refer to the same tree
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Create a detached instance of `class_name` with schema defaults
    ///
    /// The new instance is named after its class.
    ///
    /// # Errors
    /// - `UnknownClass` if not registered
    /// - `NotCreatable` for abstract classes
    pub fn create(&self, class_name: &str) -> Result<Instance, InstanceError> {
        let class = self.inner.registry.creatable(class_name)?;
        let id = InstanceId::next();
        self.state_mut().nodes.insert(id, Node::new(class));
        tracing::trace!("Created {} {}", class_name, id);
        Ok(self.handle(id))
    }

    /// Handle for `id`, if it is live in this tree
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<Instance> {
        self.state()
            .nodes
            .contains_key(&id)
            .then(|| self.handle(id))
    }

    /// Check if `id` is live in this tree
    #[inline]
    #[must_use]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.state().nodes.contains_key(&id)
    }

    /// Number of live nodes (destroyed but unreclaimed nodes included)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().nodes.len()
    }

    /// Check if the tree holds no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register the distinguished root
    ///
    /// The root is only special to `GetFullName`, which leaves its name out.
    /// Designating the current root again is a no-op.
    ///
    /// # Errors
    /// - `StaleHandle` if `root` does not live in this tree
    /// - `RootAlreadyDesignated` if another root exists
    pub fn designate_root(&self, root: &Instance) -> Result<(), InstanceError> {
        if !self.ptr_eq(root.tree()) {
            return Err(InstanceError::StaleHandle(root.id()));
        }
        let mut state = self.state_mut();
        state.node(root.id())?;
        match state.root {
            Some(existing) if existing == root.id() => Ok(()),
            Some(_) => Err(InstanceError::RootAlreadyDesignated),
            None => {
                state.root = Some(root.id());
                tracing::debug!("Designated {} as the distinguished root", root.id());
                Ok(())
            }
        }
    }

    /// Distinguished root, if designated
    #[must_use]
    pub fn root(&self) -> Option<Instance> {
        let root = self.state().root;
        root.map(|id| self.handle(id))
    }

    /// Drop destroyed nodes that have no parent and no children
    ///
    /// Handles to reclaimed nodes become stale. Returns the number removed.
    pub fn reclaim_destroyed(&self) -> usize {
        let mut state = self.state_mut();
        let reclaimable: Vec<InstanceId> = state
            .nodes
            .iter()
            .filter(|(_, node)| node.destroyed && node.parent.is_none() && node.children.is_empty())
            .map(|(id, _)| *id)
            .collect();

        for id in &reclaimable {
            state.nodes.remove(id);
            state.waiters.remove(id);
            if state.root == Some(*id) {
                state.root = None;
            }
        }

        if !reclaimable.is_empty() {
            tracing::debug!("Reclaimed {} destroyed instance(s)", reclaimable.len());
        }
        reclaimable.len()
    }

    /// Cancel every pending `WaitForChild` and refuse new waits
    ///
    /// Tree mutations and queries keep working.
    pub fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        let cancelled = {
            let mut state = self.state_mut();
            let count: usize = state.waiters.values().map(Vec::len).sum();
            state.waiters.clear();
            count
        };
        tracing::debug!("Tree shut down, cancelled {} pending wait(s)", cancelled);
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Check the Parent/Children invariant across the whole arena
    ///
    /// Returns one message per violation; empty means consistent.
    #[must_use]
    pub fn audit(&self) -> Vec<String> {
        let state = self.state();
        let mut problems = Vec::new();

        for (id, node) in &state.nodes {
            if let Some(parent) = node.parent {
                match state.nodes.get(&parent) {
                    None => problems.push(format!("{id} points at missing parent {parent}")),
                    Some(p) => {
                        let count = p.children.iter().filter(|c| *c == id).count();
                        if count != 1 {
                            problems.push(format!("{id} listed {count} time(s) under its parent {parent}"));
                        }
                    }
                }
            }
            for child in &node.children {
                match state.nodes.get(child) {
                    None => problems.push(format!("{id} lists missing child {child}")),
                    Some(c) if c.parent != Some(*id) => {
                        problems.push(format!("{id} lists {child}, whose parent is {:?}", c.parent));
                    }
                    Some(_) => {}
                }
            }
        }
        problems
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("config", &self.inner.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
