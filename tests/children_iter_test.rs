//! Tests for editing children while iterating over them.

use rstest::{fixture, rstest};

use rstree::util::testing::{init_test_setup, Label, LabelKind};
use rstree::{NodeId, TreeArena, TreeError};

struct Row {
    arena: TreeArena<Label>,
    parent: NodeId,
    kids: Vec<NodeId>,
}

/// Parent `p` with leaves `k0..k4`.
#[fixture]
fn row() -> Row {
    init_test_setup();
    let mut arena = TreeArena::new();
    let parent = arena.new_node(Label::block("p"));
    let kids: Vec<NodeId> = (0..5).map(|i| arena.new_node(Label::leaf(format!("k{i}")))).collect();
    arena.add_children(parent, &kids).expect("add kids");
    Row { arena, parent, kids }
}

#[rstest]
fn given_iterator_when_removing_every_other_child_then_rest_remains(row: Row) {
    // Arrange
    let Row { mut arena, parent, kids } = row;

    // Act
    let mut iter = arena.children_iter(parent).unwrap();
    let mut keep = true;
    while iter.next().is_some() {
        if !keep {
            iter.remove().expect("remove");
        }
        keep = !keep;
    }

    // Assert
    assert_eq!(arena.children(parent).unwrap(), &[kids[0], kids[2], kids[4]]);
    assert_eq!(arena.parent(kids[1]).unwrap(), None);
    arena.verify_integrity().expect("integrity");
}

#[rstest]
fn given_last_returned_when_setting_then_new_node_takes_slot(row: Row) {
    let Row { mut arena, parent, kids } = row;
    let x = arena.new_node(Label::special("x"));

    let mut iter = arena.children_iter(parent).unwrap();
    iter.next();
    iter.next();
    let inserted = iter.set(x).expect("set");
    assert_eq!(iter.last_returned(), Some(x));
    assert_eq!(iter.next(), Some(kids[2]));

    assert_eq!(inserted, x);
    assert_eq!(arena.children(parent).unwrap()[1], x);
    assert_eq!(arena.parent(kids[1]).unwrap(), None);
}

#[rstest]
fn given_cursor_when_adding_then_node_lands_before_cursor(row: Row) {
    let Row { mut arena, parent, kids } = row;
    let x = arena.new_node(Label::special("x"));

    let mut iter = arena.children_iter(parent).unwrap();
    iter.next();
    iter.add(x).expect("add");
    assert!(matches!(iter.remove(), Err(TreeError::IteratorState(_))));
    assert_eq!(iter.next(), Some(kids[1]));

    assert_eq!(&arena.children(parent).unwrap()[..3], &[kids[0], x, kids[1]]);
}

#[rstest]
fn given_owned_node_when_adding_through_iterator_then_copy_is_inserted(row: Row) {
    let Row { mut arena, parent, kids } = row;
    let other = arena.new_node(Label::block("other"));
    let owned = arena.new_node(Label::leaf("owned"));
    arena.add_child(other, owned).unwrap();

    let mut iter = arena.children_iter(parent).unwrap();
    let inserted = iter.add(owned).expect("add");

    assert_ne!(inserted, owned);
    assert_eq!(arena.children(parent).unwrap()[0], inserted);
    assert_eq!(arena.parent(owned).unwrap(), Some(other));
    assert_eq!(arena.num_children(parent).unwrap(), kids.len() + 1);
}

#[rstest]
fn given_cursor_when_moving_back_past_start_then_stops_at_first(row: Row) {
    let Row { mut arena, parent, kids } = row;

    let mut iter = arena.children_iter(parent).unwrap();
    iter.move_by(3);
    assert_eq!(iter.next_index(), 3);
    assert_eq!(iter.back(10), Some(kids[0]));
    assert_eq!(iter.next_index(), 0);
    assert_eq!(iter.back(1), None);
}

#[rstest]
fn given_signed_amounts_when_moving_then_direction_follows_sign(row: Row) {
    let Row { mut arena, parent, kids } = row;

    let mut iter = arena.children_iter(parent).unwrap();
    assert_eq!(iter.move_by(0), None);
    assert_eq!(iter.move_by(4), Some(kids[3]));
    assert_eq!(iter.move_by(0), Some(kids[3]));
    assert_eq!(iter.move_by(-2), Some(kids[2]));
    assert_eq!(iter.next(), Some(kids[2]));
}

#[rstest]
fn given_three_previous_nodes_when_replacing_then_they_collapse_into_one(row: Row) {
    // Arrange
    let Row { mut arena, parent, kids } = row;
    let x = arena.new_node(Label::special("x"));

    // Act
    let mut iter = arena.children_iter(parent).unwrap();
    iter.move_by(4);
    let inserted = iter.replace(x, 3).expect("replace");
    let after = iter.next();

    // Assert
    assert_eq!(inserted, x);
    assert_eq!(after, Some(x));
    assert_eq!(arena.children(parent).unwrap(), &[kids[0], x, kids[4]]);
    for removed in &kids[1..4] {
        assert_eq!(arena.parent(*removed).unwrap(), None);
    }
    arena.verify_integrity().expect("integrity");
}

#[rstest]
fn given_single_previous_node_when_replacing_then_cursor_sits_before_it(row: Row) {
    let Row { mut arena, parent, kids } = row;
    let x = arena.new_node(Label::special("x"));

    let mut iter = arena.children_iter(parent).unwrap();
    iter.next();
    iter.replace(x, 1).expect("replace");
    assert_eq!(iter.next(), Some(x));
    assert_eq!(iter.next(), Some(kids[1]));
}

#[rstest]
fn given_too_few_previous_nodes_when_replacing_then_iterator_state_error(row: Row) {
    let Row { mut arena, parent, .. } = row;
    let x = arena.new_node(Label::special("x"));

    let mut iter = arena.children_iter(parent).unwrap();
    iter.next();
    assert!(matches!(iter.replace(x, 0), Err(TreeError::IteratorState(_))));
    assert!(matches!(iter.replace(x, 2), Err(TreeError::IteratorState(_))));
}

#[rstest]
fn given_too_few_previous_nodes_when_replacing_then_children_are_untouched(row: Row) {
    // Arrange
    let Row { mut arena, parent, kids } = row;
    let x = arena.new_node(Label::special("x"));

    // Act
    let mut iter = arena.children_iter(parent).unwrap();
    iter.move_by(2);
    let result = iter.replace(x, 3);
    let retried = iter.replace(x, 2).expect("replace two");

    // Assert
    assert!(matches!(result, Err(TreeError::IteratorState(_))));
    assert_eq!(retried, x);
    assert_eq!(arena.children(parent).unwrap(), &[x, kids[2], kids[3], kids[4]]);
    arena.verify_integrity().expect("integrity");
}

#[rstest]
fn given_mixed_kinds_when_searching_forward_then_match_is_found() {
    init_test_setup();
    let mut arena = TreeArena::new();
    let parent = arena.new_node(Label::block("p"));
    let a = arena.new_node(Label::leaf("a"));
    let s = arena.new_node(Label::special("s"));
    let b = arena.new_node(Label::leaf("b"));
    arena.add_children(parent, &[a, s, b]).unwrap();

    let mut iter = arena.children_iter(parent).unwrap();
    assert_eq!(iter.next_of_kind(LabelKind::Special), Some(s));
    assert_eq!(iter.next_not_of_kind(LabelKind::Special), Some(b));
    assert_eq!(iter.next_matching(|n| n.content().name == "a"), None);
}
