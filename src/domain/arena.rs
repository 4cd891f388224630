use generational_arena::{Arena, Index};
use std::fmt;
use tracing::{debug, instrument, trace, warn};

use crate::config::Settings;
use crate::domain::content::NodeContent;
use crate::errors::{TreeError, TreeResult};

/// Generation-checked handle of a node stored in a [`TreeArena`].
///
/// A handle outlives the node it points to: once the node is disposed, every
/// lookup through the handle fails with [`TreeError::InvalidHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "#{}v{}", index, generation)
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode<K> {
    /// Opaque payload of this node
    pub content: K,
    /// Handle of the owning node, None for parentless nodes
    pub(crate) parent: Option<NodeId>,
    /// Handles of child nodes, in sibling order
    pub(crate) children: Vec<NodeId>,
}

impl<K: NodeContent> TreeNode<K> {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// `name` or `name: content` when the content string is not empty.
    pub fn to_node_string(&self) -> String {
        let name = self.content.node_name();
        let content = self.content.to_content_string();
        if content.is_empty() {
            name
        } else {
            format!("{}: {}", name, content)
        }
    }
}

/// Arena-based forest holding every node of one editing session.
///
/// Any number of parentless nodes can live in the arena at the same time; each
/// of them is the root of its own tree. Parent links are plain handles, so the
/// arena is the single owner of all nodes and no reference cycles can exist.
#[derive(Debug)]
pub struct TreeArena<K> {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode<K>>,
    /// Engine policy (sanitizing, default traversal)
    settings: Settings,
}

impl<K: NodeContent> Default for TreeArena<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: NodeContent> TreeArena<K> {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            arena: Arena::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Allocates a new parentless node without children.
    #[instrument(level = "trace", skip(self, content))]
    pub fn new_node(&mut self, content: K) -> NodeId {
        let id = NodeId(self.arena.insert(TreeNode {
            content,
            parent: None,
            children: Vec::new(),
        }));
        trace!("allocated node {}", id);
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode<K>> {
        self.arena.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> TreeResult<&TreeNode<K>> {
        self.arena.get(id.0).ok_or(TreeError::InvalidHandle(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut TreeNode<K>> {
        self.arena.get_mut(id.0).ok_or(TreeError::InvalidHandle(id))
    }

    pub fn content(&self, id: NodeId) -> TreeResult<&K> {
        Ok(&self.node(id)?.content)
    }

    /// Mutable access to the payload. The structure of the tree cannot be
    /// changed through it.
    pub fn content_mut(&mut self, id: NodeId) -> TreeResult<&mut K> {
        Ok(&mut self.node_mut(id)?.content)
    }

    pub fn kind(&self, id: NodeId) -> TreeResult<K::Kind> {
        Ok(self.node(id)?.content.kind())
    }

    pub fn node_ref(&self, id: NodeId) -> TreeResult<NodeRef<'_, K>> {
        let node = self.node(id)?;
        Ok(NodeRef {
            arena: self,
            id,
            node,
        })
    }

    pub fn to_node_string(&self, id: NodeId) -> TreeResult<String> {
        Ok(self.node(id)?.to_node_string())
    }

    /// Diagnostic name of a node that never fails, used in logs and errors.
    pub(crate) fn describe(&self, id: NodeId) -> String {
        self.get_node(id)
            .map(TreeNode::to_node_string)
            .unwrap_or_else(|| format!("<invalid {}>", id))
    }

    /// Handles of all nodes currently stored, in arena order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.arena.iter().map(|(index, _)| NodeId(index))
    }

    /// Parentless nodes, i.e. the roots of all trees in the arena.
    pub fn roots(&self) -> Vec<NodeId> {
        self.arena
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    // Children //////////////////////////////////////////////////////////////

    pub fn children(&self, id: NodeId) -> TreeResult<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn num_children(&self, id: NodeId) -> TreeResult<usize> {
        Ok(self.node(id)?.children.len())
    }

    pub fn has_children(&self, id: NodeId) -> TreeResult<bool> {
        Ok(!self.node(id)?.children.is_empty())
    }

    pub(crate) fn index_error(&self, id: NodeId, index: usize) -> TreeError {
        TreeError::IndexOutOfBounds {
            node: self.describe(id),
            index,
            len: self.get_node(id).map_or(0, |n| n.children.len()),
        }
    }

    /// Returns the child at `index`.
    pub fn child(&self, id: NodeId, index: usize) -> TreeResult<NodeId> {
        let node = self.node(id)?;
        if node.children.is_empty() {
            return Err(TreeError::NoChildren {
                node: self.describe(id),
                action: "get a child",
            });
        }
        node.children
            .get(index)
            .copied()
            .ok_or_else(|| self.index_error(id, index))
    }

    /// Returns the child at `index` if it is of the given kind.
    pub fn child_of_kind_try(
        &self,
        id: NodeId,
        kind: K::Kind,
        index: usize,
    ) -> TreeResult<Option<NodeId>> {
        let child = self.child(id, index)?;
        if self.kind(child)? == kind {
            Ok(Some(child))
        } else {
            Ok(None)
        }
    }

    /// Like [`child_of_kind_try`](Self::child_of_kind_try) but a child of another
    /// kind is an error.
    pub fn child_of_kind(&self, id: NodeId, kind: K::Kind, index: usize) -> TreeResult<NodeId> {
        self.child_of_kind_try(id, kind, index)?.ok_or_else(|| {
            TreeError::NotFound(format!(
                "wanted a {:?} at index {} of '{}', but it was '{}'",
                kind,
                index,
                self.describe(id),
                self.child(id, index)
                    .map(|c| self.describe(c))
                    .unwrap_or_default()
            ))
        })
    }

    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn has_parent(&self, id: NodeId) -> TreeResult<bool> {
        Ok(self.node(id)?.parent.is_some())
    }

    // Linking ///////////////////////////////////////////////////////////////

    /// Sets `parent` as the parent of `child`.
    ///
    /// Only the back-reference is written, the caller places `child` in the
    /// children list. Fails if `child` already has a parent or if linking would
    /// make a node its own ancestor.
    #[instrument(level = "trace", skip(self))]
    pub fn set_as_parent_of(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.node(parent)?;
        if let Some(current) = self.node(child)?.parent {
            return Err(TreeError::AlreadyOwned {
                node: self.describe(child),
                parent: self.describe(current),
            });
        }
        self.ensure_acyclic(parent, child)?;
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Fails if attaching `child` under `parent` would create a cycle.
    pub(crate) fn ensure_acyclic(&self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if parent == child {
            return Err(TreeError::CycleDetected(self.describe(child)));
        }
        // a childless node is nobody's ancestor
        if self.has_children(child)? && self.is_ancestor(parent, child)? {
            return Err(TreeError::CycleDetected(self.describe(child)));
        }
        Ok(())
    }

    /// Clears the back-reference of a node, leaving its former parent untouched.
    pub(crate) fn remove_parent(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let node = self.node_mut(id)?;
        match node.parent.take() {
            Some(parent) => Ok(parent),
            None => Err(TreeError::NoParent(self.describe(id))),
        }
    }

    // Insertion /////////////////////////////////////////////////////////////

    /// Appends `child` to the children of `parent`.
    ///
    /// Returns the node that was really inserted: if `child` already had a
    /// parent, a copy of it is inserted instead (see [`sanitize`](Self::sanitize)).
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<NodeId> {
        let len = self.num_children(parent)?;
        self.insert_child(parent, len, child)
    }

    /// Inserts `child` at `index` among the children of `parent`.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> TreeResult<NodeId> {
        let len = self.num_children(parent)?;
        if index > len {
            return Err(self.index_error(parent, index));
        }
        let inserted = self.sanitize(child)?;
        self.set_as_parent_of(parent, inserted)?;
        self.node_mut(parent)?.children.insert(index, inserted);
        debug!(
            "inserted '{}' at {} of '{}'",
            self.describe(inserted),
            index,
            self.describe(parent)
        );
        Ok(inserted)
    }

    pub fn add_child_left_of(
        &mut self,
        parent: NodeId,
        child: NodeId,
        sibling: NodeId,
    ) -> TreeResult<NodeId> {
        let index = self.sibling_index(parent, sibling)?;
        self.insert_child(parent, index, child)
    }

    pub fn add_child_right_of(
        &mut self,
        parent: NodeId,
        child: NodeId,
        sibling: NodeId,
    ) -> TreeResult<NodeId> {
        let index = self.sibling_index(parent, sibling)?;
        self.insert_child(parent, index + 1, child)
    }

    fn sibling_index(&self, parent: NodeId, sibling: NodeId) -> TreeResult<usize> {
        self.index_of_child(parent, sibling)?.ok_or_else(|| {
            TreeError::NotFound(format!(
                "sibling '{}' is not a child of '{}'",
                self.describe(sibling),
                self.describe(parent)
            ))
        })
    }

    /// Appends every node of `children`, returning the nodes really inserted.
    #[instrument(level = "trace", skip(self))]
    pub fn add_children(&mut self, parent: NodeId, children: &[NodeId]) -> TreeResult<Vec<NodeId>> {
        let children = children.to_vec();
        if !children.is_empty() && self.children(parent)? == children.as_slice() {
            warn!("Adding the children of '{}' to itself", self.describe(parent));
        }
        children
            .into_iter()
            .map(|child| self.add_child(parent, child))
            .collect()
    }

    // Removal ///////////////////////////////////////////////////////////////

    /// Removes the child at `index` and unlinks it from `parent`.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> TreeResult<NodeId> {
        let len = self.num_children(parent)?;
        if len == 0 {
            return Err(TreeError::NoChildren {
                node: self.describe(parent),
                action: "remove a child",
            });
        }
        if index >= len {
            return Err(self.index_error(parent, index));
        }

        let child = self.node_mut(parent)?.children.remove(index);
        self.remove_parent(child)?;
        debug!(
            "removed '{}' at {} of '{}'",
            self.describe(child),
            index,
            self.describe(parent)
        );
        Ok(child)
    }

    /// Removes `child` from `parent`, returning its former index, or `None` if
    /// it is not a child of `parent`.
    pub fn remove_child_node(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> TreeResult<Option<usize>> {
        match self.index_of_child(parent, child)? {
            Some(index) => {
                self.remove_child(parent, index)?;
                Ok(Some(index))
            }
            None => {
                warn!("Could not find child '{}'", self.describe(child));
                Ok(None)
            }
        }
    }

    /// Removes all children, returning them in their former order.
    pub fn remove_children(&mut self, parent: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut removed = Vec::new();
        while self.has_children(parent)? {
            removed.push(self.remove_child(parent, 0)?);
        }
        Ok(removed)
    }

    /// Removes the children in `start..end`, returning them in their former order.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_children_range(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
    ) -> TreeResult<Vec<NodeId>> {
        let len = self.num_children(parent)?;
        if end < start {
            return Err(self.index_error(parent, start));
        }
        if end > len {
            return Err(self.index_error(parent, end));
        }

        let mut removed = Vec::with_capacity(end - start);
        for index in (start..end).rev() {
            removed.push(self.remove_child(parent, index)?);
        }
        removed.reverse();
        Ok(removed)
    }

    /// Removes the children of the given kind.
    pub fn remove_children_of_kind(
        &mut self,
        parent: NodeId,
        kind: K::Kind,
    ) -> TreeResult<Vec<NodeId>> {
        let mut removed = Vec::new();
        let mut iter = self.children_iter(parent)?;
        while let Some(child) = iter.next() {
            if iter.arena().kind(child)? == kind {
                removed.push(iter.remove()?);
            }
        }
        Ok(removed)
    }

    /// Detaches this node from its parent. Does nothing for parentless nodes.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        let Some(parent) = self.parent(id)? else {
            trace!("'{}' has no parent, nothing to detach", self.describe(id));
            return Ok(());
        };

        match self.index_of_child(parent, id)? {
            Some(index) => {
                self.remove_child(parent, index)?;
            }
            None => {
                warn!(
                    "'{}' is not among the children of its parent '{}', clearing parent reference",
                    self.describe(id),
                    self.describe(parent)
                );
                self.remove_parent(id)?;
            }
        }
        Ok(())
    }

    // Replacement ///////////////////////////////////////////////////////////

    /// Replaces the child at `index` with `new`, returning the previous
    /// occupant, which no longer has a parent.
    #[instrument(level = "trace", skip(self))]
    pub fn set_child(&mut self, parent: NodeId, index: usize, new: NodeId) -> TreeResult<NodeId> {
        let len = self.num_children(parent)?;
        if len == 0 {
            return Err(TreeError::NoChildren {
                node: self.describe(parent),
                action: "set a child",
            });
        }
        if index >= len {
            return Err(self.index_error(parent, index));
        }
        let inserted = self.sanitize(new)?;
        self.set_as_parent_of(parent, inserted)?;
        let previous = std::mem::replace(&mut self.node_mut(parent)?.children[index], inserted);
        self.remove_parent(previous)?;
        debug!(
            "replaced '{}' with '{}' at {} of '{}'",
            self.describe(previous),
            self.describe(inserted),
            index,
            self.describe(parent)
        );
        Ok(previous)
    }

    /// Replaces `old` with `new` among the children of `parent`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> TreeResult<NodeId> {
        let index = self.index_of_child(parent, old)?.ok_or_else(|| {
            TreeError::NotFound(format!(
                "'{}' is not a child of '{}'",
                self.describe(old),
                self.describe(parent)
            ))
        })?;
        self.set_child(parent, index, new)
    }

    /// Replaces all children of `parent` with `children`, returning the nodes
    /// really inserted.
    #[instrument(level = "trace", skip(self))]
    pub fn set_children(&mut self, parent: NodeId, children: &[NodeId]) -> TreeResult<Vec<NodeId>> {
        let children = children.to_vec();
        self.remove_children(parent)?;
        children
            .into_iter()
            .map(|child| self.add_child(parent, child))
            .collect()
    }

    /// Sets `new` at `start` and removes the children in `start + 1..end`.
    ///
    /// Returns the node really inserted.
    #[instrument(level = "trace", skip(self))]
    pub fn set_child_and_remove(
        &mut self,
        parent: NodeId,
        new: NodeId,
        start: usize,
        end: usize,
    ) -> TreeResult<NodeId> {
        if end <= start {
            return Err(self.index_error(parent, start));
        }
        if end > self.num_children(parent)? {
            return Err(self.index_error(parent, end));
        }

        self.set_child(parent, start, new)?;
        for index in (start + 1..end).rev() {
            self.remove_child(parent, index)?;
        }
        self.child(parent, start)
    }

    // Copies ////////////////////////////////////////////////////////////////

    /// New node with the same content and kind, without children or parent.
    pub fn copy_shallow(&mut self, id: NodeId) -> TreeResult<NodeId> {
        K::copy_shallow(self, id)
    }

    /// Deep copy of the subtree rooted at `id`. The copy has no parent.
    ///
    /// On failure every node allocated for the copy is freed again.
    #[instrument(level = "trace", skip(self))]
    pub fn copy(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let copied = self.checked_copy_shallow(id)?;
        if let Err(e) = self.copy_descendants(id, copied) {
            self.release(copied);
            return Err(e);
        }
        Ok(copied)
    }

    fn checked_copy_shallow(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let copied = self.copy_shallow(id)?;

        let shallow = self.node(copied)?;
        if !shallow.children.is_empty() || shallow.parent.is_some() {
            let err = TreeError::InvariantViolation(format!(
                "node '{}' still has children or a parent after copy_shallow(), \
                 check implementation",
                self.describe(copied)
            ));
            self.release(copied);
            return Err(err);
        }
        Ok(copied)
    }

    /// Copies the descendants of `source` below `target`, top-down.
    fn copy_descendants(&mut self, source: NodeId, target: NodeId) -> TreeResult<()> {
        let mut stack: Vec<(NodeId, NodeId)> = self
            .children(source)?
            .iter()
            .rev()
            .map(|&child| (child, target))
            .collect();

        while let Some((original, parent)) = stack.pop() {
            let copied = self.checked_copy_shallow(original)?;
            if let Err(e) = self.add_child(parent, copied) {
                self.release(copied);
                return Err(e);
            }
            stack.extend(self.children(original)?.iter().rev().map(|&child| (child, copied)));
        }
        Ok(())
    }

    /// Detaches and frees a subtree that never reached the caller.
    fn release(&mut self, id: NodeId) {
        if let Err(e) = self.detach(id).and_then(|()| self.dispose(id)) {
            warn!("Could not free partial copy {}: {}", id, e);
        }
    }

    /// Frees the storage of a parentless subtree. Returns the number of nodes
    /// removed; their handles become invalid.
    #[instrument(level = "debug", skip(self))]
    pub fn dispose(&mut self, id: NodeId) -> TreeResult<usize> {
        if let Some(parent) = self.parent(id)? {
            return Err(TreeError::AlreadyOwned {
                node: self.describe(id),
                parent: self.describe(parent),
            });
        }

        let subtree: Vec<NodeId> = self.descendants_and_self(id)?.collect();
        for node in &subtree {
            self.arena.remove(node.0);
        }
        debug!("disposed {} nodes", subtree.len());
        Ok(subtree.len())
    }

    // Navigation ////////////////////////////////////////////////////////////

    /// The uppermost ancestor of `id`, or `id` itself when it has no parent.
    pub fn root_of(&self, id: NodeId) -> TreeResult<NodeId> {
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// Tests whether `candidate` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, id: NodeId, candidate: NodeId) -> TreeResult<bool> {
        let mut current = self.parent(id)?;
        while let Some(ancestor) = current {
            if ancestor == candidate {
                return Ok(true);
            }
            current = self.parent(ancestor)?;
        }
        Ok(false)
    }

    /// Nearest strict ancestor satisfying `predicate`.
    pub fn ancestor_try<P>(&self, id: NodeId, predicate: P) -> TreeResult<Option<NodeId>>
    where
        P: Fn(NodeRef<'_, K>) -> bool,
    {
        let mut current = self.parent(id)?;
        while let Some(ancestor) = current {
            let node = self.node_ref(ancestor)?;
            if predicate(node) {
                return Ok(Some(ancestor));
            }
            current = node.parent_id();
        }
        Ok(None)
    }

    pub fn ancestor<P>(&self, id: NodeId, predicate: P) -> TreeResult<NodeId>
    where
        P: Fn(NodeRef<'_, K>) -> bool,
    {
        self.ancestor_try(id, predicate)?.ok_or_else(|| {
            TreeError::NotFound(format!(
                "could not find a matching ancestor of '{}'",
                self.describe(id)
            ))
        })
    }

    pub fn ancestor_of_kind_try(&self, id: NodeId, kind: K::Kind) -> TreeResult<Option<NodeId>> {
        self.ancestor_try(id, |node| node.kind() == kind)
    }

    pub fn ancestor_of_kind(&self, id: NodeId, kind: K::Kind) -> TreeResult<NodeId> {
        self.ancestor_of_kind_try(id, kind)?.ok_or_else(|| {
            TreeError::NotFound(format!(
                "could not find ancestor of kind {:?} for '{}'",
                kind,
                self.describe(id)
            ))
        })
    }

    /// 0 for a parentless node, 1 for a child of a root, and so on.
    pub fn depth(&self, id: NodeId) -> TreeResult<usize> {
        Ok(self.ascendants(id)?.count())
    }

    /// Number of levels of the subtree rooted at `id`, 1 for a leaf.
    #[instrument(level = "trace", skip(self))]
    pub fn height(&self, id: NodeId) -> TreeResult<usize> {
        let mut max = 0;
        let mut stack = vec![(id, 1)];
        while let Some((current, level)) = stack.pop() {
            max = max.max(level);
            stack.extend(self.children(current)?.iter().map(|&child| (child, level + 1)));
        }
        Ok(max)
    }

    /// Leaf nodes of the subtree rooted at `id`, left to right.
    #[instrument(level = "trace", skip(self))]
    pub fn leaves(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut leaves = Vec::new();
        for node in self.descendants_and_self(id)? {
            if !self.has_children(node)? {
                leaves.push(node);
            }
        }
        Ok(leaves)
    }

    /// Position of `id` among its siblings, `None` when parentless.
    pub fn index_of_self(&self, id: NodeId) -> TreeResult<Option<usize>> {
        match self.parent(id)? {
            None => Ok(None),
            Some(parent) => self.index_of_child(parent, id),
        }
    }

    /// Position of `child` among the children of `parent`, by identity.
    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> TreeResult<Option<usize>> {
        Ok(self.children(parent)?.iter().position(|&c| c == child))
    }

    /// Index of the first child of the given kind.
    pub fn child_index_of_kind(&self, parent: NodeId, kind: K::Kind) -> TreeResult<Option<usize>> {
        for (index, &child) in self.children(parent)?.iter().enumerate() {
            if self.kind(child)? == kind {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Siblings to the left of `id`.
    pub fn left_siblings(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        self.siblings(id, |children, index| children[..index].to_vec())
    }

    /// Siblings to the right of `id`.
    pub fn right_siblings(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        self.siblings(id, |children, index| children[index + 1..].to_vec())
    }

    fn siblings<F>(&self, id: NodeId, select: F) -> TreeResult<Vec<NodeId>>
    where
        F: Fn(&[NodeId], usize) -> Vec<NodeId>,
    {
        let Some(parent) = self.parent(id)? else {
            warn!("Asked for siblings of '{}', which does not have a parent", self.describe(id));
            return Ok(Vec::new());
        };
        let children = self.children(parent)?;
        match children.iter().position(|&c| c == id) {
            Some(index) => Ok(select(children, index)),
            None => Err(TreeError::NotFound(format!(
                "'{}' is not among the children of its parent '{}'",
                self.describe(id),
                self.describe(parent)
            ))),
        }
    }

    /// Skips over nodes whose kind is in `bypass`; each of them must have
    /// exactly one child. Returns the first node whose kind is not bypassed.
    #[instrument(level = "trace", skip(self))]
    pub fn normalize(&self, id: NodeId, bypass: &[K::Kind]) -> TreeResult<NodeId> {
        let mut current = id;
        while bypass.contains(&self.kind(current)?) {
            let children = self.children(current)?;
            if children.len() != 1 {
                return Err(TreeError::InvariantViolation(format!(
                    "expected only one child in bypassed node '{}', found {}",
                    self.describe(current),
                    children.len()
                )));
            }
            current = children[0];
        }
        Ok(current)
    }

    // Integrity /////////////////////////////////////////////////////////////

    /// Checks single ownership and acyclicity over every node in the arena.
    #[instrument(level = "debug", skip(self))]
    pub fn verify_integrity(&self) -> TreeResult<()> {
        for (index, node) in self.arena.iter() {
            let id = NodeId(index);

            if let Some(parent) = node.parent {
                let parent_node = self.get_node(parent).ok_or_else(|| {
                    TreeError::InvariantViolation(format!(
                        "'{}' points to a missing parent {}",
                        self.describe(id),
                        parent
                    ))
                })?;
                let occurrences = parent_node.children.iter().filter(|&&c| c == id).count();
                if occurrences != 1 {
                    return Err(TreeError::InvariantViolation(format!(
                        "'{}' appears {} times among the children of its parent '{}'",
                        self.describe(id),
                        occurrences,
                        self.describe(parent)
                    )));
                }
            }

            for &child in &node.children {
                let child_node = self.get_node(child).ok_or_else(|| {
                    TreeError::InvariantViolation(format!(
                        "'{}' has a missing child {}",
                        self.describe(id),
                        child
                    ))
                })?;
                if child_node.parent != Some(id) {
                    return Err(TreeError::InvariantViolation(format!(
                        "child '{}' of '{}' does not point back to it",
                        self.describe(child),
                        self.describe(id)
                    )));
                }
            }

            let mut steps = 0;
            let mut current = node.parent;
            while let Some(ancestor) = current {
                if ancestor == id || steps > self.arena.len() {
                    return Err(TreeError::CycleDetected(self.describe(id)));
                }
                steps += 1;
                current = self.get_node(ancestor).and_then(|n| n.parent);
            }
        }
        Ok(())
    }
}

/// Borrowed view of one node, handed to predicates and traversal callbacks.
pub struct NodeRef<'a, K> {
    arena: &'a TreeArena<K>,
    id: NodeId,
    node: &'a TreeNode<K>,
}

impl<K> Clone for NodeRef<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for NodeRef<'_, K> {}

impl<K: NodeContent> fmt::Debug for NodeRef<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("content", &self.node.content)
            .finish()
    }
}

impl<'a, K: NodeContent> NodeRef<'a, K> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn arena(&self) -> &'a TreeArena<K> {
        self.arena
    }

    pub fn content(&self) -> &'a K {
        &self.node.content
    }

    pub fn kind(&self) -> K::Kind {
        self.node.content.kind()
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.node.parent
    }

    pub fn parent(&self) -> Option<NodeRef<'a, K>> {
        self.node.parent.and_then(|p| self.arena.node_ref(p).ok())
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, K>> + 'a {
        let arena = self.arena;
        let node = self.node;
        node.children
            .iter()
            .filter_map(move |&child| arena.node_ref(child).ok())
    }

    pub fn num_children(&self) -> usize {
        self.node.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.node.children.is_empty()
    }

    pub fn to_node_string(&self) -> String {
        self.node.to_node_string()
    }
}
