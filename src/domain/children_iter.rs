//! Cursor over the children of one node that allows editing while iterating.

use tracing::{instrument, trace};

use crate::domain::arena::{NodeId, NodeRef, TreeArena};
use crate::domain::content::NodeContent;
use crate::errors::{TreeError, TreeResult};

/// Bidirectional cursor over the children of `parent`.
///
/// The cursor sits between two children, like a list iterator: `next` returns
/// the child after it, `previous` the child before it. `remove` and `set` act on
/// the child returned last, and may only be called once per movement.
///
/// The iterator borrows the arena mutably. Use [`arena`](Self::arena) for reads
/// while it is alive.
pub struct ChildrenIterator<'a, K: NodeContent> {
    arena: &'a mut TreeArena<K>,
    parent: NodeId,
    cursor: usize,
    last_returned: Option<usize>,
}

impl<K: NodeContent> TreeArena<K> {
    pub fn children_iter(&mut self, parent: NodeId) -> TreeResult<ChildrenIterator<'_, K>> {
        self.node(parent)?;
        Ok(ChildrenIterator {
            arena: self,
            parent,
            cursor: 0,
            last_returned: None,
        })
    }
}

impl<'a, K: NodeContent> ChildrenIterator<'a, K> {
    pub fn arena(&self) -> &TreeArena<K> {
        &*self.arena
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    fn len(&self) -> usize {
        self.arena.num_children(self.parent).unwrap_or(0)
    }

    fn child_at(&self, index: usize) -> Option<NodeId> {
        self.arena
            .children(self.parent)
            .ok()
            .and_then(|children| children.get(index).copied())
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.len()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    /// Index of the child `next` would return.
    pub fn next_index(&self) -> usize {
        self.cursor
    }

    /// Index of the child `previous` would return, `None` at the start.
    pub fn previous_index(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
    }

    /// Child returned by the last `next`/`previous`, if still valid.
    pub fn last_returned(&self) -> Option<NodeId> {
        self.last_returned.and_then(|index| self.child_at(index))
    }

    pub fn previous(&mut self) -> Option<NodeId> {
        let index = self.cursor.checked_sub(1)?;
        let child = self.child_at(index)?;
        self.cursor = index;
        self.last_returned = Some(index);
        Some(child)
    }

    fn require_last_returned(&self, action: &'static str) -> TreeResult<usize> {
        self.last_returned.ok_or(TreeError::IteratorState(action))
    }

    /// Removes the child returned last and clears its parent.
    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self) -> TreeResult<NodeId> {
        let index = self.require_last_returned("remove() needs a preceding next() or previous()")?;
        let removed = self.arena.remove_child(self.parent, index)?;
        if index < self.cursor {
            self.cursor -= 1;
        }
        self.last_returned = None;
        Ok(removed)
    }

    /// Replaces the child returned last with `new`, returning the node really
    /// inserted. The inserted node becomes the last returned one.
    #[instrument(level = "trace", skip(self))]
    pub fn set(&mut self, new: NodeId) -> TreeResult<NodeId> {
        let index = self.require_last_returned("set() needs a preceding next() or previous()")?;
        self.arena.set_child(self.parent, index, new)?;
        self.arena.child(self.parent, index)
    }

    /// Inserts `new` before the cursor, returning the node really inserted.
    #[instrument(level = "trace", skip(self))]
    pub fn add(&mut self, new: NodeId) -> TreeResult<NodeId> {
        let inserted = self.arena.insert_child(self.parent, self.cursor, new)?;
        self.cursor += 1;
        self.last_returned = None;
        Ok(inserted)
    }

    /// Moves back up to `amount` positions, stopping at the start. Returns the
    /// last child visited.
    pub fn back(&mut self, amount: usize) -> Option<NodeId> {
        let mut visited = None;
        for _ in 0..amount {
            match self.previous() {
                Some(child) => visited = Some(child),
                None => break,
            }
        }
        visited
    }

    /// Relative move: forward for positive amounts, backward for negative ones.
    /// 0 returns the child returned last.
    pub fn move_by(&mut self, amount: isize) -> Option<NodeId> {
        if amount == 0 {
            return self.last_returned();
        }

        let mut visited = None;
        for _ in 0..amount.unsigned_abs() {
            let step = if amount > 0 { self.next() } else { self.previous() };
            match step {
                Some(child) => visited = Some(child),
                None => break,
            }
        }
        visited
    }

    /// Advances to the next child satisfying `predicate`.
    pub fn next_matching<P>(&mut self, predicate: P) -> Option<NodeId>
    where
        P: Fn(NodeRef<'_, K>) -> bool,
    {
        while let Some(child) = self.next() {
            if self.arena.node_ref(child).map(&predicate).unwrap_or(false) {
                return Some(child);
            }
        }
        None
    }

    pub fn next_of_kind(&mut self, kind: K::Kind) -> Option<NodeId> {
        self.next_matching(|node| node.kind() == kind)
    }

    pub fn next_not_of_kind(&mut self, kind: K::Kind) -> Option<NodeId> {
        self.next_matching(|node| node.kind() != kind)
    }

    /// Collapses the last `number_of_previous_nodes` children up to and
    /// including the one returned last into `new`.
    ///
    /// Returns the node really inserted. Afterwards the cursor sits right before
    /// it, so the next call to `next` returns it.
    #[instrument(level = "trace", skip(self))]
    pub fn replace(&mut self, new: NodeId, number_of_previous_nodes: usize) -> TreeResult<NodeId> {
        if number_of_previous_nodes == 0 {
            return Err(TreeError::IteratorState(
                "replace() needs at least one previous node",
            ));
        }
        let last = self.require_last_returned("replace() needs a preceding next() or previous()")?;
        if last + 1 < number_of_previous_nodes {
            return Err(TreeError::IteratorState(
                "replace() ran out of previous nodes",
            ));
        }

        for _ in 1..number_of_previous_nodes {
            self.remove()?;
            if self.previous().is_none() {
                return Err(TreeError::IteratorState(
                    "replace() ran out of previous nodes",
                ));
            }
        }

        let inserted = self.set(new)?;
        if let Some(index) = self.last_returned {
            if self.cursor > index {
                self.previous();
            }
        }
        trace!("collapsed {} nodes into {}", number_of_previous_nodes, inserted);
        Ok(inserted)
    }
}

impl<K: NodeContent> Iterator for ChildrenIterator<'_, K> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.child_at(self.cursor)?;
        self.last_returned = Some(self.cursor);
        self.cursor += 1;
        Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{Label, LabelKind};

    fn parent_with(arena: &mut TreeArena<Label>, names: &[&str]) -> (NodeId, Vec<NodeId>) {
        let parent = arena.new_node(Label::block("p"));
        let children = names
            .iter()
            .map(|name| {
                let child = arena.new_node(Label::leaf(*name));
                arena.add_child(parent, child).unwrap()
            })
            .collect();
        (parent, children)
    }

    #[test]
    fn test_remove_without_movement_fails() {
        let mut arena = TreeArena::new();
        let (parent, _) = parent_with(&mut arena, &["a"]);
        let mut iter = arena.children_iter(parent).unwrap();

        assert!(matches!(iter.remove(), Err(TreeError::IteratorState(_))));
    }

    #[test]
    fn test_second_remove_fails() {
        let mut arena = TreeArena::new();
        let (parent, _) = parent_with(&mut arena, &["a", "b"]);
        let mut iter = arena.children_iter(parent).unwrap();

        iter.next();
        iter.remove().unwrap();
        assert!(matches!(iter.remove(), Err(TreeError::IteratorState(_))));
    }

    #[test]
    fn test_next_and_previous_walk_both_ways() {
        let mut arena = TreeArena::new();
        let (parent, c) = parent_with(&mut arena, &["a", "b"]);
        let mut iter = arena.children_iter(parent).unwrap();

        assert!(!iter.has_previous());
        assert_eq!(iter.next(), Some(c[0]));
        assert_eq!(iter.next(), Some(c[1]));
        assert!(!iter.has_next());
        assert_eq!(iter.previous_index(), Some(1));
        assert_eq!(iter.previous(), Some(c[1]));
        assert_eq!(iter.previous(), Some(c[0]));
        assert_eq!(iter.previous(), None);
    }

    #[test]
    fn test_next_of_kind_skips_other_kinds() {
        let mut arena = TreeArena::new();
        let parent = arena.new_node(Label::block("p"));
        let leaf = arena.new_node(Label::leaf("a"));
        let block = arena.new_node(Label::block("b"));
        arena.add_children(parent, &[leaf, block]).unwrap();

        let mut iter = arena.children_iter(parent).unwrap();
        assert_eq!(iter.next_of_kind(LabelKind::Block), Some(block));
        assert_eq!(iter.next_not_of_kind(LabelKind::Block), None);
    }
}
