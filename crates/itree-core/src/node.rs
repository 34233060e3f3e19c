//! Arena node storage
//!
//! [`Node`] is the generic element stored in the tree arena. It is never
//! handed out directly; callers go through [`Instance`](crate::Instance).

use crate::instance::Instance;
use indexmap::IndexMap;
use itree_schema::{ClassDescriptor, InstanceId, Value, CLASS_NAME, NAME, PARENT};
use itree_signal::Signal;
use std::collections::HashMap;
use std::sync::Arc;

/// Signals owned by one node
pub(crate) struct NodeSignals {
    pub(crate) changed: Signal<String>,
    pub(crate) child_added: Signal<Instance>,
    pub(crate) child_removed: Signal<Instance>,
    pub(crate) destroying: Signal<()>,
    /// Created on first `GetPropertyChangedSignal` request
    pub(crate) by_property: HashMap<String, Signal<()>>,
}

impl NodeSignals {
    fn new(class: &str) -> Self {
        Self {
            changed: Signal::new(format!("{class}.Changed")),
            child_added: Signal::new(format!("{class}.ChildAdded")),
            child_removed: Signal::new(format!("{class}.ChildRemoved")),
            destroying: Signal::new(format!("{class}.Destroying")),
            by_property: HashMap::new(),
        }
    }
}

/// Generic tree element
pub(crate) struct Node {
    pub(crate) class: Arc<ClassDescriptor>,
    pub(crate) name: String,
    pub(crate) parent: Option<InstanceId>,
    /// Insertion order, each id at most once
    pub(crate) children: Vec<InstanceId>,
    pub(crate) destroyed: bool,
    /// Every resolved property except the structural base ones
    pub(crate) properties: IndexMap<String, Value>,
    pub(crate) signals: NodeSignals,
}

impl Node {
    /// Fresh node with schema defaults, no parent and no children
    pub(crate) fn new(class: Arc<ClassDescriptor>) -> Self {
        let properties = class
            .properties()
            .into_iter()
            .filter(|(name, _)| !is_structural(name))
            .map(|(name, descriptor)| (name.to_string(), descriptor.default_value().clone()))
            .collect();

        Self {
            name: class.name().to_string(),
            signals: NodeSignals::new(class.name()),
            class,
            parent: None,
            children: Vec::new(),
            destroyed: false,
            properties,
        }
    }

    /// Current value of a resolved property
    pub(crate) fn read(&self, property: &str) -> Option<Value> {
        match property {
            NAME => Some(Value::String(self.name.clone())),
            PARENT => Some(Value::Ref(self.parent)),
            CLASS_NAME => Some(Value::String(self.class.name().to_string())),
            other => self.properties.get(other).cloned(),
        }
    }
}

/// Base properties backed by dedicated node fields
pub(crate) fn is_structural(property: &str) -> bool {
    matches!(property, NAME | PARENT | CLASS_NAME)
}

/// A signal firing queued while the tree lock is held
pub(crate) enum Emission {
    PropertyChanged {
        changed: Signal<String>,
        dedicated: Option<Signal<()>>,
        property: String,
    },
    ChildAdded {
        signal: Signal<Instance>,
        child: Instance,
    },
    ChildRemoved {
        signal: Signal<Instance>,
        child: Instance,
    },
}

/// Firings collected during one committed mutation
///
/// Built under the write lock, fired after it is released so that handlers
/// only ever observe committed state and may re-enter the tree.
#[derive(Default)]
pub(crate) struct Emissions(Vec<Emission>);

impl Emissions {
    pub(crate) fn property_changed(&mut self, node: &Node, property: &str) {
        self.0.push(Emission::PropertyChanged {
            changed: node.signals.changed.clone(),
            dedicated: node.signals.by_property.get(property).cloned(),
            property: property.to_string(),
        });
    }

    pub(crate) fn child_added(&mut self, parent: &Node, child: Instance) {
        self.0.push(Emission::ChildAdded {
            signal: parent.signals.child_added.clone(),
            child,
        });
    }

    pub(crate) fn child_removed(&mut self, parent: &Node, child: Instance) {
        self.0.push(Emission::ChildRemoved {
            signal: parent.signals.child_removed.clone(),
            child,
        });
    }

    /// Fire everything in order; every signal runs even if one fails
    pub(crate) fn fire(self) -> Result<(), crate::InstanceError> {
        let mut report = itree_signal::DispatchReport::new();
        for emission in self.0 {
            match emission {
                Emission::PropertyChanged {
                    changed,
                    dedicated,
                    property,
                } => {
                    report.record(changed.fire(&property));
                    if let Some(dedicated) = dedicated {
                        report.record(dedicated.fire(&()));
                    }
                }
                Emission::ChildAdded { signal, child } | Emission::ChildRemoved { signal, child } => {
                    report.record(signal.fire(&child));
                }
            }
        }
        report.finish().map_err(Into::into)
    }
}
