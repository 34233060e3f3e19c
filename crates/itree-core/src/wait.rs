//! WaitForChild
//!
//! Cooperative suspension until a named child appears. A pending wait is a
//! `oneshot` sender keyed by (parent, awaited name), registered in the same
//! critical section that checked for an existing child so no append can slip
//! between the check and the registration. The mutator resolves matching
//! waiters whenever it appends or renames a child.

use crate::config::WaitPolicy;
use crate::error::InstanceError;
use crate::instance::Instance;
use crate::tree::{Tree, TreeState};
use itree_schema::InstanceId;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};

/// One suspended `WaitForChild`
pub(crate) struct Waiter {
    name: String,
    sender: oneshot::Sender<InstanceId>,
}

impl TreeState {
    /// Wake every waiter on `parent` awaiting `name`
    ///
    /// Waiters whose future was dropped are pruned on the way.
    pub(crate) fn resolve_waiters(&mut self, parent: InstanceId, name: &str, child: InstanceId) -> usize {
        let Some(list) = self.waiters.get_mut(&parent) else {
            return 0;
        };

        let mut resolved = 0;
        for waiter in std::mem::take(list) {
            if waiter.sender.is_closed() {
                continue;
            }
            if waiter.name == name {
                if waiter.sender.send(child).is_ok() {
                    resolved += 1;
                }
            } else {
                list.push(waiter);
            }
        }

        if list.is_empty() {
            self.waiters.remove(&parent);
        }
        if resolved > 0 {
            tracing::trace!("Resolved {} WaitForChild(\"{}\") on {}", resolved, name, parent);
        }
        resolved
    }

    fn prune_waiters(&mut self, parent: InstanceId) {
        if let Some(list) = self.waiters.get_mut(&parent) {
            list.retain(|waiter| !waiter.sender.is_closed());
            if list.is_empty() {
                self.waiters.remove(&parent);
            }
        }
    }
}

impl Tree {
    /// Number of `WaitForChild` calls still suspended
    #[must_use]
    pub fn pending_waits(&self) -> usize {
        self.state()
            .waiters
            .values()
            .flatten()
            .filter(|waiter| !waiter.sender.is_closed())
            .count()
    }
}

impl Instance {
    /// Wait for a child named `name` under the tree's configured policy
    ///
    /// Returns at once when the child already exists. Otherwise suspends the
    /// calling task until the child is appended or renamed into place,
    /// yielding `None` if the policy's bound elapses first. Dropping the
    /// future cancels the wait.
    ///
    /// # Errors
    /// - `StaleHandle` if the node was reclaimed
    /// - `WaitCancelled` if the tree shuts down while waiting
    pub async fn wait_for_child(&self, name: &str) -> Result<Option<Instance>, InstanceError> {
        let policy = self.tree().config().wait_policy;
        self.wait_for_child_with(name, policy).await
    }

    /// Wait for a child with an explicit upper bound
    ///
    /// # Errors
    /// See [`wait_for_child`](Self::wait_for_child)
    pub async fn wait_for_child_timeout(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<Instance>, InstanceError> {
        self.wait_for_child_with(name, WaitPolicy::bounded(timeout)).await
    }

    /// Wait for a child under an explicit policy
    ///
    /// # Errors
    /// See [`wait_for_child`](Self::wait_for_child)
    pub async fn wait_for_child_with(
        &self,
        name: &str,
        policy: WaitPolicy,
    ) -> Result<Option<Instance>, InstanceError> {
        let mut receiver = {
            let mut state = self.tree().state_mut();
            state.node(self.id())?;
            if let Some(child) = state.find_child(self.id(), name) {
                return Ok(Some(self.tree().handle(child)));
            }
            if policy == WaitPolicy::Immediate {
                return Ok(None);
            }
            if self.tree().is_shut_down() {
                return Err(InstanceError::WaitCancelled);
            }

            let (sender, receiver) = oneshot::channel();
            state.waiters.entry(self.id()).or_default().push(Waiter {
                name: name.to_string(),
                sender,
            });
            receiver
        };

        let started = Instant::now();
        let deadline = policy.timeout().and_then(|bound| started.checked_add(bound));
        let warn_at = warn_point(started, deadline, self.tree().config().warn_after());

        if let Some(warn_at) = warn_at {
            match timeout_at(warn_at, &mut receiver).await {
                Ok(outcome) => return self.finish(outcome),
                Err(_) => tracing::warn!(
                    "Infinite yield possible on '{}:WaitForChild(\"{}\")'",
                    self.get_full_name().unwrap_or_default(),
                    name
                ),
            }
        }

        let outcome = match deadline {
            Some(deadline) => match timeout_at(deadline, receiver).await {
                Ok(outcome) => outcome,
                Err(_) => return Ok(self.timed_out(name)),
            },
            None => receiver.await,
        };
        self.finish(outcome)
    }

    fn finish(
        &self,
        outcome: Result<InstanceId, oneshot::error::RecvError>,
    ) -> Result<Option<Instance>, InstanceError> {
        match outcome {
            Ok(child) => Ok(Some(self.tree().handle(child))),
            Err(_) => Err(InstanceError::WaitCancelled),
        }
    }

    /// Final look after the bound elapsed; the receiver is already dropped
    fn timed_out(&self, name: &str) -> Option<Instance> {
        let found = {
            let mut state = self.tree().state_mut();
            state.prune_waiters(self.id());
            state.find_child(self.id(), name)
        };
        if found.is_none() {
            tracing::warn!(
                "WaitForChild(\"{}\") on {} timed out",
                name,
                self.get_full_name().unwrap_or_default()
            );
        }
        found.map(|id| self.tree().handle(id))
    }
}

/// When to log the pending-wait warning
///
/// A threshold at or before the deadline warns; one past it never does.
fn warn_point(started: Instant, deadline: Option<Instant>, warn_after: Option<Duration>) -> Option<Instant> {
    warn_after
        .and_then(|after| started.checked_add(after))
        .filter(|at| deadline.map_or(true, |deadline| *at <= deadline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use itree_schema::{ClassRegistry, Schema};

    fn tree() -> Tree {
        let mut registry = ClassRegistry::new();
        registry.register_class("Folder", None, Schema::new()).unwrap();
        Tree::new(registry)
    }

    #[tokio::test]
    async fn existing_child_returns_immediately() {
        let tree = tree();
        let parent = tree.create("Folder").unwrap();
        let child = tree.create("Folder").unwrap();
        child.set_parent(Some(&parent)).unwrap();

        let found = parent.wait_for_child("Folder").await.unwrap();
        assert_eq!(found, Some(child));
        assert_eq!(tree.pending_waits(), 0);
    }

    #[tokio::test]
    async fn immediate_policy_never_registers() {
        let tree = tree();
        let parent = tree.create("Folder").unwrap();
        let found = parent
            .wait_for_child_with("Missing", WaitPolicy::Immediate)
            .await
            .unwrap();
        assert_eq!(found, None);
        assert_eq!(tree.pending_waits(), 0);
    }

    #[test]
    fn default_config_warns_at_the_bound() {
        let config = TreeConfig::default();
        let started = Instant::now();
        let deadline = config.wait_policy.timeout().map(|bound| started + bound);
        assert_eq!(config.warn_after(), config.wait_policy.timeout());
        assert_eq!(warn_point(started, deadline, config.warn_after()), deadline);
    }

    #[test]
    fn warn_point_past_deadline_is_skipped() {
        let started = Instant::now();
        let deadline = Some(started + Duration::from_millis(100));
        assert_eq!(warn_point(started, deadline, Some(Duration::from_millis(101))), None);
        assert_eq!(
            warn_point(started, None, Some(Duration::from_millis(101))),
            Some(started + Duration::from_millis(101))
        );
        assert_eq!(warn_point(started, deadline, None), None);
    }

    #[test]
    fn resolve_skips_other_names_and_prunes_closed() {
        let tree = tree();
        let parent = tree.create("Folder").unwrap();
        let (open, mut open_rx) = oneshot::channel();
        let (other, _other_rx) = oneshot::channel();
        let (closed, closed_rx) = oneshot::channel();
        drop(closed_rx);

        let mut state = tree.state_mut();
        state.waiters.insert(
            parent.id(),
            vec![
                Waiter { name: "A".into(), sender: open },
                Waiter { name: "B".into(), sender: other },
                Waiter { name: "A".into(), sender: closed },
            ],
        );

        let child = InstanceId::next();
        assert_eq!(state.resolve_waiters(parent.id(), "A", child), 1);
        assert_eq!(state.waiters[&parent.id()].len(), 1);
        assert_eq!(open_rx.try_recv().unwrap(), child);
    }
}
