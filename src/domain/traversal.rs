//! Depth-first traversal with predicates and pruning, plus lazy descendant and
//! ascendant streams.
//!
//! Every stream borrows the arena immutably, so the tree cannot change while it
//! is consumed. Each call starts from the current shape of the tree.

use tracing::instrument;

use crate::domain::arena::{NodeId, NodeRef, TreeArena};
use crate::domain::content::NodeContent;
use crate::errors::TreeResult;

/// Predicate matching nodes of one kind.
pub fn kind_is<K: NodeContent>(kind: K::Kind) -> impl Fn(NodeRef<'_, K>) -> bool {
    move |node: NodeRef<'_, K>| node.kind() == kind
}

/// Predicate matching nodes whose kind is one of `kinds`.
pub fn kind_in<K: NodeContent>(kinds: &[K::Kind]) -> impl Fn(NodeRef<'_, K>) -> bool {
    let kinds = kinds.to_vec();
    move |node: NodeRef<'_, K>| kinds.contains(&node.kind())
}

pub fn not<K, P>(predicate: P) -> impl Fn(NodeRef<'_, K>) -> bool
where
    K: NodeContent,
    P: Fn(NodeRef<'_, K>) -> bool,
{
    move |node: NodeRef<'_, K>| !predicate(node)
}

/// Pre-order sequence over the descendants of `root`, `root` excluded.
///
/// A node is yielded iff `predicate` holds for it. With `prune`, the subtree of
/// a yielded node is skipped, even where it holds matching nodes.
pub fn depth_iterator<K, P>(
    arena: &TreeArena<K>,
    root: NodeId,
    predicate: P,
    prune: bool,
) -> TreeResult<DepthIterator<'_, K, P>>
where
    K: NodeContent,
    P: Fn(NodeRef<'_, K>) -> bool,
{
    let stack = arena.children(root)?.iter().rev().copied().collect();
    Ok(DepthIterator {
        arena,
        stack,
        predicate,
        prune,
    })
}

/// All descendants of `root` satisfying `predicate`, in pre-order.
#[instrument(level = "debug", skip(arena, predicate))]
pub fn collect_matching<K, P>(
    arena: &TreeArena<K>,
    root: NodeId,
    predicate: P,
) -> TreeResult<Vec<NodeId>>
where
    K: NodeContent,
    P: Fn(NodeRef<'_, K>) -> bool,
{
    Ok(depth_iterator(arena, root, predicate, false)?.collect())
}

pub struct DepthIterator<'a, K, P> {
    arena: &'a TreeArena<K>,
    stack: Vec<NodeId>,
    predicate: P,
    prune: bool,
}

impl<K, P> Iterator for DepthIterator<'_, K, P>
where
    K: NodeContent,
    P: Fn(NodeRef<'_, K>) -> bool,
{
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            let Ok(node) = self.arena.node_ref(current) else {
                continue;
            };
            let matched = (self.predicate)(node);
            if !(matched && self.prune) {
                let children = self.arena.children(current).unwrap_or_default();
                self.stack.extend(children.iter().rev());
            }
            if matched {
                return Some(current);
            }
        }
        None
    }
}

/// Pre-order walk, children pushed in reverse for left-to-right order.
pub struct Descendants<'a, K> {
    arena: &'a TreeArena<K>,
    stack: Vec<NodeId>,
}

impl<K: NodeContent> Iterator for Descendants<'_, K> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(node) = self.arena.get_node(current) {
            self.stack.extend(node.children().iter().rev());
        }
        Some(current)
    }
}

pub struct PostOrder<'a, K> {
    arena: &'a TreeArena<K>,
    stack: Vec<(NodeId, bool)>,
}

impl<K: NodeContent> Iterator for PostOrder<'_, K> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if visited {
                return Some(current);
            }
            if let Some(node) = self.arena.get_node(current) {
                self.stack.push((current, true));
                for &child in node.children().iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}

/// Walk up the parent chain.
pub struct Ascendants<'a, K> {
    arena: &'a TreeArena<K>,
    next: Option<NodeId>,
}

impl<K: NodeContent> Iterator for Ascendants<'_, K> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.arena.get_node(current).and_then(|node| node.parent());
        Some(current)
    }
}

impl<K: NodeContent> TreeArena<K> {
    /// Pre-order descendants of `id`, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> TreeResult<Descendants<'_, K>> {
        Ok(Descendants {
            arena: self,
            stack: self.children(id)?.iter().rev().copied().collect(),
        })
    }

    pub fn descendants_and_self(&self, id: NodeId) -> TreeResult<Descendants<'_, K>> {
        self.node(id)?;
        Ok(Descendants {
            arena: self,
            stack: vec![id],
        })
    }

    /// Subtree of `id` in post-order, `id` last.
    pub fn post_order(&self, id: NodeId) -> TreeResult<PostOrder<'_, K>> {
        self.node(id)?;
        Ok(PostOrder {
            arena: self,
            stack: vec![(id, false)],
        })
    }

    /// Ancestors of `id` from its parent up to the root.
    pub fn ascendants(&self, id: NodeId) -> TreeResult<Ascendants<'_, K>> {
        Ok(Ascendants {
            arena: self,
            next: self.parent(id)?,
        })
    }

    pub fn ascendants_and_self(&self, id: NodeId) -> TreeResult<Ascendants<'_, K>> {
        self.node(id)?;
        Ok(Ascendants {
            arena: self,
            next: Some(id),
        })
    }

    pub fn children_of_kind(&self, id: NodeId, kind: K::Kind) -> TreeResult<Vec<NodeId>> {
        Ok(self
            .children(id)?
            .iter()
            .copied()
            .filter(|&child| self.is_kind(child, kind))
            .collect())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn descendants_of_kind(&self, id: NodeId, kind: K::Kind) -> TreeResult<Vec<NodeId>> {
        Ok(self
            .descendants(id)?
            .filter(|&node| self.is_kind(node, kind))
            .collect())
    }

    pub fn descendants_and_self_of_kind(
        &self,
        id: NodeId,
        kind: K::Kind,
    ) -> TreeResult<Vec<NodeId>> {
        Ok(self
            .descendants_and_self(id)?
            .filter(|&node| self.is_kind(node, kind))
            .collect())
    }

    pub fn first_descendant_and_self_of_kind(
        &self,
        id: NodeId,
        kind: K::Kind,
    ) -> TreeResult<Option<NodeId>> {
        Ok(self
            .descendants_and_self(id)?
            .find(|&node| self.is_kind(node, kind)))
    }

    pub fn ascendants_and_self_of_kind(
        &self,
        id: NodeId,
        kind: K::Kind,
    ) -> TreeResult<Vec<NodeId>> {
        Ok(self
            .ascendants_and_self(id)?
            .filter(|&node| self.is_kind(node, kind))
            .collect())
    }

    fn is_kind(&self, id: NodeId, kind: K::Kind) -> bool {
        self.kind(id).map(|k| k == kind).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{Label, LabelKind};

    #[test]
    fn test_post_order_visits_children_first() {
        let mut arena = TreeArena::new();
        let a = arena.new_node(Label::block("a"));
        let b = arena.new_node(Label::block("b"));
        let c = arena.new_node(Label::leaf("c"));
        let d = arena.new_node(Label::leaf("d"));
        arena.add_child(a, b).unwrap();
        arena.add_child(b, c).unwrap();
        arena.add_child(a, d).unwrap();

        let order: Vec<NodeId> = arena.post_order(a).unwrap().collect();
        assert_eq!(order, vec![c, b, d, a]);
    }

    #[test]
    fn test_not_inverts_predicate() {
        let mut arena = TreeArena::new();
        let a = arena.new_node(Label::block("a"));
        let node = arena.node_ref(a).unwrap();

        assert!(kind_is::<Label>(LabelKind::Block)(node));
        assert!(!not(kind_is::<Label>(LabelKind::Block))(node));
        assert!(kind_in::<Label>(&[LabelKind::Leaf, LabelKind::Block])(node));
    }

    #[test]
    fn test_ascendants_stop_at_root() {
        let mut arena = TreeArena::new();
        let a = arena.new_node(Label::block("a"));
        let b = arena.new_node(Label::block("b"));
        arena.add_child(a, b).unwrap();

        assert_eq!(arena.ascendants(b).unwrap().collect::<Vec<_>>(), vec![a]);
        assert_eq!(arena.ascendants_and_self(b).unwrap().collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(arena.ascendants(a).unwrap().count(), 0);
    }
}
