//! Query Engine Tests

use itree_core::prelude::*;
use itree_test_utils::{sample_tree, spawn, tree_with_root};
use pretty_assertions::assert_eq;

#[test]
fn test_full_name_unparented() {
    let tree = sample_tree();
    let a = spawn(&tree, "Folder", "A", None);
    assert_eq!(a.get_full_name().unwrap(), "A");
}

#[test]
fn test_full_name_under_plain_parent() {
    let tree = sample_tree();
    let b = spawn(&tree, "Folder", "B", None);
    let a = spawn(&tree, "Folder", "A", Some(&b));
    assert_eq!(a.get_full_name().unwrap(), "B.A");
}

#[test]
fn test_full_name_excludes_root() {
    let (tree, game) = tree_with_root();
    let workspace = spawn(&tree, "Workspace", "Workspace", Some(&game));
    let model = spawn(&tree, "Model", "Car", Some(&workspace));
    let part = spawn(&tree, "Part", "Wheel", Some(&model));

    assert_eq!(workspace.get_full_name().unwrap(), "Workspace");
    assert_eq!(part.get_full_name().unwrap(), "Workspace.Car.Wheel");
    assert_eq!(game.get_full_name().unwrap(), "game");

    model.set_parent(None).unwrap();
    assert_eq!(part.get_full_name().unwrap(), "Car.Wheel");
}

#[test]
fn test_full_name_reads_current_names() {
    let tree = sample_tree();
    let b = spawn(&tree, "Folder", "B", None);
    let a = spawn(&tree, "Folder", "A", Some(&b));
    b.set_name("Renamed").unwrap();
    assert_eq!(a.get_full_name().unwrap(), "Renamed.A");
}

#[test]
fn test_class_and_isa_searches() {
    let (tree, game) = tree_with_root();
    let folder = spawn(&tree, "Folder", "Stuff", Some(&game));
    let workspace = spawn(&tree, "Workspace", "Workspace", Some(&game));

    assert_eq!(game.find_first_child_of_class("Workspace"), Some(workspace.clone()));
    assert_eq!(game.find_first_child_of_class("Model"), None);
    assert_eq!(game.find_first_child_which_is_a("PVInstance"), Some(workspace.clone()));
    assert_eq!(game.find_first_child_which_is_a("Instance"), Some(folder));
    assert_eq!(game.find_first_child_which_is_a("BasePart"), None);
}

#[test]
fn test_ancestor_searches() {
    let (tree, game) = tree_with_root();
    let workspace = spawn(&tree, "Workspace", "Workspace", Some(&game));
    let model = spawn(&tree, "Model", "Car", Some(&workspace));
    let part = spawn(&tree, "Part", "Wheel", Some(&model));

    assert_eq!(part.find_first_ancestor("Workspace"), Some(workspace.clone()));
    assert_eq!(part.find_first_ancestor("Wheel"), None);
    assert_eq!(part.find_first_ancestor_of_class("Model"), Some(model.clone()));
    assert_eq!(part.find_first_ancestor_which_is_a("Model"), Some(model));
    assert_eq!(part.find_first_ancestor_of_class("DataModel"), Some(game.clone()));
    assert_eq!(game.find_first_ancestor("anything"), None);
}

#[test]
fn test_descendant_queries() {
    let (tree, game) = tree_with_root();
    let workspace = spawn(&tree, "Workspace", "Workspace", Some(&game));
    let model = spawn(&tree, "Model", "Car", Some(&workspace));
    let wheel = spawn(&tree, "Part", "Wheel", Some(&model));
    let storage = spawn(&tree, "Folder", "Storage", Some(&game));

    let names: Vec<String> = game
        .get_descendants()
        .iter()
        .map(|i| i.name().unwrap())
        .collect();
    assert_eq!(names, vec!["Workspace", "Car", "Wheel", "Storage"]);

    assert_eq!(game.find_first_descendant("Wheel"), Some(wheel.clone()));
    assert_eq!(game.find_first_child("Wheel"), None);
    assert!(wheel.is_descendant_of(&game));
    assert!(!wheel.is_descendant_of(&storage));
    assert!(workspace.is_ancestor_of(&wheel));
}

#[test]
fn test_queries_across_trees_are_false() {
    let (tree, game) = tree_with_root();
    let other = sample_tree();
    let stray = other.create("Folder").unwrap();
    let _child = spawn(&tree, "Folder", "Folder", Some(&game));

    assert!(!stray.is_descendant_of(&game));
    assert!(!game.is_ancestor_of(&stray));
    assert_ne!(stray, game);
}

#[test]
fn test_snapshot_shape() {
    let (tree, game) = tree_with_root();
    let workspace = spawn(&tree, "Workspace", "Workspace", Some(&game));
    let part = spawn(&tree, "Part", "Wheel", Some(&workspace));
    part.set_property("Anchored", true).unwrap();
    workspace.set_property("PrimaryPart", part.id()).unwrap();

    let snapshot = game.snapshot().unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.class_name, "DataModel");

    let ws = &snapshot.children[0];
    assert_eq!(ws.properties["PrimaryPart"], Value::Ref(Some(part.id())));
    assert_eq!(ws.children[0].properties["Anchored"], Value::Bool(true));
    assert_eq!(ws.children[0].properties["Shape"], Value::from("Block"));
}
