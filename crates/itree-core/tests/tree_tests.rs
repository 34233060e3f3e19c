//! Tree Mutator Tests
//!
//! Reparenting, destruction and property-write behavior through the public
//! instance API, including the bidirectional Parent/Children invariant under
//! random operation sequences.

use itree_core::prelude::*;
use itree_test_utils::{sample_tree, spawn, tree_with_root, SignalRecorder};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn names(instances: &[Instance]) -> Vec<String> {
    instances.iter().map(|i| i.name().unwrap()).collect()
}

#[test]
fn test_find_after_rename_and_unparent() {
    let tree = sample_tree();
    let p = tree.create("Folder").unwrap();
    let c = tree.create("Folder").unwrap();

    c.set_parent(Some(&p)).unwrap();
    c.set_name("foo").unwrap();
    assert_eq!(p.find_first_child("foo"), Some(c.clone()));

    c.set_parent(None).unwrap();
    assert_eq!(p.find_first_child("foo"), None);
}

#[test]
fn test_parent_via_set_property() {
    let tree = sample_tree();
    let p = tree.create("Folder").unwrap();
    let c = tree.create("Folder").unwrap();

    c.set_property(PARENT, p.id()).unwrap();
    assert_eq!(c.parent().unwrap(), Some(p.clone()));
    assert_eq!(c.get_property(PARENT).unwrap(), Value::Ref(Some(p.id())));

    c.set_property(PARENT, Value::Nil).unwrap();
    assert_eq!(c.parent().unwrap(), None);
    assert!(p.get_children().is_empty());
}

#[test]
fn test_parent_property_rejects_wrong_kind() {
    let tree = sample_tree();
    let c = tree.create("Folder").unwrap();
    let err = c.set_property(PARENT, "game").unwrap_err();
    assert!(matches!(err, InstanceError::InvalidParent { .. }));
    let err = c.set_property(PARENT, 3.0).unwrap_err();
    assert!(matches!(err, InstanceError::InvalidParent { .. }));
    assert_eq!(c.parent().unwrap(), None);
}

#[test]
fn test_destroyed_parent_write_reports_destroyed_first() {
    let tree = sample_tree();
    let c = tree.create("Folder").unwrap();
    c.destroy().unwrap();

    let err = c.set_property(PARENT, true).unwrap_err();
    assert!(matches!(err, InstanceError::DestroyedInstance { .. }));
    c.set_property(PARENT, Value::Nil).unwrap();
}

#[test]
fn test_same_parent_is_noop() {
    let tree = sample_tree();
    let p = tree.create("Folder").unwrap();
    let a = spawn(&tree, "Folder", "a", Some(&p));
    let b = spawn(&tree, "Folder", "b", Some(&p));

    let recorder = SignalRecorder::new();
    let _child = recorder.watch_instance(&a, "a");
    let _parent = recorder.watch_instance(&p, "p");

    a.set_parent(Some(&p)).unwrap();
    assert!(recorder.is_empty());
    assert_eq!(p.get_children(), vec![a, b]);
}

#[test]
fn test_destroy_child_locks_parent() {
    let tree = sample_tree();
    let p = tree.create("Folder").unwrap();
    let c = spawn(&tree, "Folder", "c", Some(&p));

    c.destroy().unwrap();
    assert_eq!(c.parent().unwrap(), None);
    assert!(c.is_destroyed().unwrap());

    let err = c.set_parent(Some(&p)).unwrap_err();
    assert!(matches!(err, InstanceError::DestroyedInstance { .. }));
    assert!(p.get_children().is_empty());

    let err = c.set_property(PARENT, p.id()).unwrap_err();
    assert!(matches!(err, InstanceError::DestroyedInstance { .. }));

    // Null stays legal
    c.set_parent(None).unwrap();
}

#[test]
fn test_destroy_parent_frees_children() {
    let tree = sample_tree();
    let grand = tree.create("Folder").unwrap();
    let parent = spawn(&tree, "Folder", "parent", Some(&grand));
    let child = spawn(&tree, "Folder", "child", Some(&parent));

    parent.destroy().unwrap();
    assert_eq!(parent.parent().unwrap(), None);
    assert_eq!(child.parent().unwrap(), None);
    assert!(!child.is_destroyed().unwrap());

    child.set_parent(Some(&grand)).unwrap();
    assert_eq!(grand.get_children(), vec![child]);
}

#[test]
fn test_destroyed_node_still_accepts_children() {
    let tree = sample_tree();
    let dead = tree.create("Folder").unwrap();
    dead.destroy().unwrap();

    let child = spawn(&tree, "Folder", "late", Some(&dead));
    assert_eq!(child.parent().unwrap(), Some(dead.clone()));

    dead.destroy().unwrap();
    assert_eq!(child.parent().unwrap(), None);
}

#[test]
fn test_children_order_follows_parenting_order() {
    let tree = sample_tree();
    let p = tree.create("Folder").unwrap();
    let a = spawn(&tree, "Folder", "a", Some(&p));
    let _b = spawn(&tree, "Folder", "b", Some(&p));
    let _c = spawn(&tree, "Folder", "c", Some(&p));

    a.set_parent(None).unwrap();
    a.set_parent(Some(&p)).unwrap();
    assert_eq!(names(&p.get_children()), vec!["b", "c", "a"]);
    assert_eq!(p.get_children().len(), 3);
}

#[test]
fn test_clear_all_children() {
    let tree = sample_tree();
    let p = tree.create("Folder").unwrap();
    let kids: Vec<_> = (0..3)
        .map(|i| spawn(&tree, "Folder", &format!("k{i}"), Some(&p)))
        .collect();

    p.clear_all_children().unwrap();
    assert!(p.get_children().is_empty());
    for kid in &kids {
        assert_eq!(kid.parent().unwrap(), None);
        assert!(!kid.is_destroyed().unwrap());
    }
    assert!(!p.is_destroyed().unwrap());
}

#[test]
fn test_is_a_follows_chain() {
    let tree = sample_tree();
    let part = tree.create("Part").unwrap();
    for class in ["Part", "BasePart", "PVInstance", "Instance"] {
        assert!(part.is_a(class), "Part should be a {class}");
    }
    assert!(!part.is_a("Model"));
    assert!(!part.is_a("Folder"));
}

#[test]
fn test_abstract_classes_not_creatable() {
    let tree = sample_tree();
    assert!(matches!(tree.create("BasePart"), Err(InstanceError::NotCreatable(_))));
    assert!(matches!(tree.create("Instance"), Err(InstanceError::NotCreatable(_))));
    assert!(matches!(tree.create("Widget"), Err(InstanceError::UnknownClass(_))));
}

#[test]
fn test_inherited_properties_and_validators() {
    let tree = sample_tree();
    let part = tree.create("Part").unwrap();

    part.set_property("Anchored", true).unwrap();
    part.set_property("Transparency", 0.5).unwrap();
    part.set_property("Shape", "Ball").unwrap();

    let err = part.set_property("Transparency", 2.0).unwrap_err();
    assert!(matches!(err, InstanceError::InvalidValue { .. }));
    assert_eq!(part.get_property("Transparency").unwrap(), Value::Number(0.5));

    let err = part.set_property("Shape", "Wedge").unwrap_err();
    assert!(matches!(err, InstanceError::InvalidValue { .. }));
    assert_eq!(part.get_property("Shape").unwrap(), Value::from("Ball"));
}

#[test]
fn test_rejected_write_fires_nothing() {
    let tree = sample_tree();
    let part = tree.create("Part").unwrap();
    let recorder = SignalRecorder::new();
    let _changed = recorder.watch(&part.changed().unwrap(), "Changed", Clone::clone);

    assert!(part.set_property("Transparency", -1.0).is_err());
    assert!(part.set_property("ClassName", "Model").is_err());
    assert!(part.set_property("Bogus", 1).is_err());
    assert!(recorder.is_empty());
}

#[test]
fn test_reclaimed_handles_are_stale() {
    let (tree, game) = tree_with_root();
    let part = spawn(&tree, "Part", "p", Some(&game));
    part.destroy().unwrap();
    assert_eq!(tree.reclaim_destroyed(), 1);

    assert!(!part.is_live());
    assert!(matches!(part.name(), Err(InstanceError::StaleHandle(_))));
    assert!(matches!(part.set_parent(Some(&game)), Err(InstanceError::StaleHandle(_))));
    assert!(part.get_children().is_empty());
    assert_eq!(part.to_string(), format!("<stale {}>", part.id()));

    let other = tree.create("Folder").unwrap();
    assert!(matches!(
        other.set_parent(Some(&part)),
        Err(InstanceError::InvalidParent { .. })
    ));
}

#[derive(Debug, Clone)]
enum Op {
    Reparent(usize, Option<usize>),
    Destroy(usize),
    Clear(usize),
    Rename(usize, u8),
}

fn op_strategy(n: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..n, proptest::option::of(0..n)).prop_map(|(c, p)| Op::Reparent(c, p)),
        1 => (0..n).prop_map(Op::Destroy),
        1 => (0..n).prop_map(Op::Clear),
        1 => (0..n, 0..4u8).prop_map(|(i, k)| Op::Rename(i, k)),
    ]
}

proptest! {
    #[test]
    fn prop_parent_children_consistent(ops in proptest::collection::vec(op_strategy(8), 0..80)) {
        let tree = sample_tree();
        let nodes: Vec<Instance> = (0..8).map(|_| tree.create("Folder").unwrap()).collect();

        for op in ops {
            let result = match op {
                Op::Reparent(c, p) => nodes[c].set_parent(p.map(|p| &nodes[p])),
                Op::Destroy(i) => nodes[i].destroy(),
                Op::Clear(i) => nodes[i].clear_all_children(),
                Op::Rename(i, k) => nodes[i].set_name(format!("n{k}")),
            };
            if let Err(err) = result {
                prop_assert!(err.is_structural(), "unexpected error: {err}");
            }
            prop_assert_eq!(tree.audit(), Vec::<String>::new());
        }

        for node in &nodes {
            if let Some(parent) = node.parent().unwrap() {
                let count = parent.get_children().iter().filter(|c| *c == node).count();
                prop_assert_eq!(count, 1);
                prop_assert!(!node.is_ancestor_of(&parent));
            }
        }
    }
}
