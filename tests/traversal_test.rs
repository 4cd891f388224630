//! Tests for depth-first traversal, pruning and the lazy streams.

use rstest::{fixture, rstest};

use rstree::domain::{collect_matching, depth_iterator, kind_in, kind_is, not};
use rstree::util::testing::{init_test_setup, Label, LabelKind};
use rstree::{NodeId, TreeArena};

/// `root(s1(l1, s2(l2)), l3, s3)`
struct Nested {
    arena: TreeArena<Label>,
    root: NodeId,
    s1: NodeId,
    l1: NodeId,
    s2: NodeId,
    l2: NodeId,
    l3: NodeId,
    s3: NodeId,
}

#[fixture]
fn nested() -> Nested {
    init_test_setup();
    let mut arena = TreeArena::new();
    let root = arena.new_node(Label::block("root"));
    let s1 = arena.new_node(Label::special("s1"));
    let l1 = arena.new_node(Label::leaf("l1"));
    let s2 = arena.new_node(Label::special("s2"));
    let l2 = arena.new_node(Label::leaf("l2"));
    let l3 = arena.new_node(Label::leaf("l3"));
    let s3 = arena.new_node(Label::special("s3"));
    arena.add_child(s2, l2).unwrap();
    arena.add_children(s1, &[l1, s2]).unwrap();
    arena.add_children(root, &[s1, l3, s3]).unwrap();
    Nested {
        arena,
        root,
        s1,
        l1,
        s2,
        l2,
        l3,
        s3,
    }
}

#[rstest]
fn given_tree_when_iterating_everything_then_pre_order_without_root(nested: Nested) {
    let n = nested;

    let all: Vec<NodeId> = depth_iterator(&n.arena, n.root, |_| true, false).unwrap().collect();

    assert_eq!(all, vec![n.s1, n.l1, n.s2, n.l2, n.l3, n.s3]);
    assert_eq!(n.arena.descendants(n.root).unwrap().collect::<Vec<_>>(), all);
}

#[rstest]
fn given_nested_matches_when_pruning_then_matched_subtrees_are_skipped(nested: Nested) {
    let n = nested;

    let special = || kind_is::<Label>(LabelKind::Special);
    let pruned: Vec<NodeId> = depth_iterator(&n.arena, n.root, special(), true)
        .unwrap()
        .collect();
    let unpruned: Vec<NodeId> = depth_iterator(&n.arena, n.root, special(), false)
        .unwrap()
        .collect();

    assert_eq!(pruned, vec![n.s1, n.s3]);
    assert_eq!(unpruned, vec![n.s1, n.s2, n.s3]);
}

#[rstest]
fn given_predicate_builders_when_combining_then_filters_match(nested: Nested) {
    let n = nested;

    let leaves = collect_matching(&n.arena, n.root, kind_is::<Label>(LabelKind::Leaf)).unwrap();
    let not_leaves =
        collect_matching(&n.arena, n.root, not(kind_is::<Label>(LabelKind::Leaf))).unwrap();
    let either_kind = kind_in::<Label>(&[LabelKind::Leaf, LabelKind::Block]);
    let either = collect_matching(&n.arena, n.root, either_kind).unwrap();

    assert_eq!(leaves, vec![n.l1, n.l2, n.l3]);
    assert_eq!(not_leaves, vec![n.s1, n.s2, n.s3]);
    assert_eq!(either, leaves);
}

#[rstest]
fn given_leaf_root_when_iterating_then_sequence_is_empty(nested: Nested) {
    let n = nested;

    assert_eq!(depth_iterator(&n.arena, n.l2, |_| true, false).unwrap().count(), 0);
}

#[rstest]
fn given_tree_when_streaming_by_kind_then_views_are_consistent(nested: Nested) {
    let n = nested;
    let a = &n.arena;

    assert_eq!(a.children_of_kind(n.root, LabelKind::Special).unwrap(), vec![n.s1, n.s3]);
    assert_eq!(a.descendants_of_kind(n.s1, LabelKind::Special).unwrap(), vec![n.s2]);
    assert_eq!(a.descendants_and_self_of_kind(n.s1, LabelKind::Special).unwrap(), vec![n.s1, n.s2]);
    assert_eq!(a.first_descendant_and_self_of_kind(n.root, LabelKind::Leaf).unwrap(), Some(n.l1));
    assert_eq!(a.ascendants_and_self_of_kind(n.l2, LabelKind::Special).unwrap(), vec![n.s2, n.s1]);
    assert_eq!(a.ascendants(n.l2).unwrap().collect::<Vec<_>>(), vec![n.s2, n.s1, n.root]);
}

#[rstest]
fn given_edited_tree_when_streaming_again_then_new_shape_is_seen(nested: Nested) {
    let mut n = nested;
    let before = n.arena.descendants(n.root).unwrap().count();

    n.arena.detach(n.s1).unwrap();

    assert_eq!(before, 6);
    assert_eq!(n.arena.descendants(n.root).unwrap().collect::<Vec<_>>(), vec![n.l3, n.s3]);
    assert_eq!(n.arena.post_order(n.s1).unwrap().collect::<Vec<_>>(), vec![n.l1, n.l2, n.s2, n.s1]);
}
