//! Testing utilities for the itree workspace
//!
//! Shared fixtures: a small leaf-class catalog, ready-made trees, tracing
//! setup, and a recorder for signal firings.

#![allow(missing_docs)]

use itree_core::{Instance, Tree, TreeConfig};
use itree_schema::{ClassRegistry, PropertyDescriptor, Schema, Value};
use itree_signal::{Connection, Signal};
use parking_lot::Mutex;
use std::sync::Arc;

/// Registry with a handful of familiar leaf classes
///
/// ```text
/// Instance
/// ├── Folder
/// ├── DataModel
/// ├── IntValue            Value: int
/// └── PVInstance          (abstract)
///     ├── BasePart        (abstract) Anchored: bool, Transparency: number in [0, 1]
///     │   └── Part        Shape: "Block" | "Ball" | "Cylinder"
///     └── Model           PrimaryPart: ref
///         └── Workspace
/// ```
pub fn sample_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry
        .register_class("Folder", None, Schema::new())
        .unwrap();
    registry
        .register_class("DataModel", None, Schema::new())
        .unwrap();
    registry
        .register_class(
            "IntValue",
            None,
            Schema::new().property("Value", PropertyDescriptor::int(0)),
        )
        .unwrap();
    registry
        .register_abstract_class("PVInstance", None, Schema::new())
        .unwrap();
    registry
        .register_abstract_class(
            "BasePart",
            Some("PVInstance"),
            Schema::new()
                .property("Anchored", PropertyDescriptor::bool(false))
                .property(
                    "Transparency",
                    PropertyDescriptor::number(0.0).with_validator(|value| {
                        match value.as_number() {
                            Some(t) if (0.0..=1.0).contains(&t) => Ok(()),
                            _ => Err("Transparency must be within [0, 1]".to_string()),
                        }
                    }),
                ),
        )
        .unwrap();
    registry
        .register_class(
            "Part",
            Some("BasePart"),
            Schema::new().property(
                "Shape",
                PropertyDescriptor::string("Block").with_validator(|value| {
                    match value.as_str() {
                        Some("Block" | "Ball" | "Cylinder") => Ok(()),
                        other => Err(format!("unknown shape {other:?}")),
                    }
                }),
            ),
        )
        .unwrap();
    registry
        .register_class(
            "Model",
            Some("PVInstance"),
            Schema::new().property("PrimaryPart", PropertyDescriptor::reference()),
        )
        .unwrap();
    registry
        .register_class("Workspace", Some("Model"), Schema::new())
        .unwrap();
    registry
}

pub fn sample_tree() -> Tree {
    Tree::new(sample_registry())
}

pub fn sample_tree_with_config(config: TreeConfig) -> Tree {
    Tree::with_config(sample_registry(), config)
}

/// Tree with a `DataModel` named "game" designated as the root
pub fn tree_with_root() -> (Tree, Instance) {
    let tree = sample_tree();
    let game = tree.create("DataModel").unwrap();
    game.set_name("game").unwrap();
    tree.designate_root(&game).unwrap();
    (tree, game)
}

/// Create `class` named `name`, parented under `parent`
pub fn spawn(tree: &Tree, class: &str, name: &str, parent: Option<&Instance>) -> Instance {
    let instance = tree.create(class).unwrap();
    instance.set_property("Name", Value::from(name)).unwrap();
    instance.set_parent(parent).unwrap();
    instance
}

/// Install a fmt subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collects a string rendering of every firing of one or more signals
#[derive(Clone, Default)]
pub struct SignalRecorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl SignalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record firings of `signal` as `"{label}:{render(payload)}"`
    pub fn watch<T, F>(&self, signal: &Signal<T>, label: &str, render: F) -> Connection
    where
        T: 'static,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let events = Arc::clone(&self.events);
        let label = label.to_string();
        signal.connect(move |payload| {
            events.lock().push(format!("{label}:{}", render(payload)));
            Ok(())
        })
    }

    /// Record firings of a payload-less signal as `label`
    pub fn watch_unit(&self, signal: &Signal<()>, label: &str) -> Connection {
        let events = Arc::clone(&self.events);
        let label = label.to_string();
        signal.connect(move |_| {
            events.lock().push(label.clone());
            Ok(())
        })
    }

    /// Record `Changed`, `ChildAdded` and `ChildRemoved` of `instance`
    pub fn watch_instance(&self, instance: &Instance, label: &str) -> Vec<Connection> {
        vec![
            self.watch(&instance.changed().unwrap(), &format!("{label}.Changed"), Clone::clone),
            self.watch(
                &instance.child_added().unwrap(),
                &format!("{label}.ChildAdded"),
                ToString::to_string,
            ),
            self.watch(
                &instance.child_removed().unwrap(),
                &format!("{label}.ChildRemoved"),
                ToString::to_string,
            ),
        ]
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
