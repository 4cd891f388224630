//! Index paths into a tree and kind lookups over node lists.

use tracing::instrument;

use crate::domain::arena::{NodeId, TreeArena};
use crate::domain::content::NodeContent;
use crate::errors::{TreeError, TreeResult};

/// Positions in `list` of the nodes of the given kind, in order.
pub fn indexes_of<K: NodeContent>(
    arena: &TreeArena<K>,
    list: &[NodeId],
    kind: K::Kind,
) -> TreeResult<Vec<usize>> {
    let mut indexes = Vec::new();
    for (index, &node) in list.iter().enumerate() {
        if arena.kind(node)? == kind {
            indexes.push(index);
        }
    }
    Ok(indexes)
}

/// Follows `path` from `root`, one child index per step. An empty path
/// returns `root`.
#[instrument(level = "debug", skip(arena))]
pub fn get_child<K: NodeContent>(
    arena: &TreeArena<K>,
    root: NodeId,
    path: &[usize],
) -> TreeResult<NodeId> {
    let mut current = root;
    for &index in path {
        let children = arena.children(current)?;
        current = children.get(index).copied().ok_or_else(|| TreeError::IndexOutOfBounds {
            node: arena.describe(current),
            index,
            len: children.len(),
        })?;
    }
    Ok(current)
}

/// Puts `new` at `path` below `root`, returning the previous occupant. An
/// empty path changes nothing.
#[instrument(level = "debug", skip(arena))]
pub fn replace_child<K: NodeContent>(
    arena: &mut TreeArena<K>,
    root: NodeId,
    new: NodeId,
    path: &[usize],
) -> TreeResult<Option<NodeId>> {
    let Some((&last, parent_path)) = path.split_last() else {
        return Ok(None);
    };
    let parent = get_child(arena, root, parent_path)?;
    arena.set_child(parent, last, new).map(Some)
}

/// Index of the last node of the given kind.
pub fn last_index_of<K: NodeContent>(
    arena: &TreeArena<K>,
    list: &[NodeId],
    kind: K::Kind,
) -> TreeResult<Option<usize>> {
    for (index, &node) in list.iter().enumerate().rev() {
        if arena.kind(node)? == kind {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Index of the last node whose kind is not in `excluded`.
pub fn last_index_except<K: NodeContent>(
    arena: &TreeArena<K>,
    list: &[NodeId],
    excluded: &[K::Kind],
) -> TreeResult<Option<usize>> {
    for (index, &node) in list.iter().enumerate().rev() {
        if !excluded.contains(&arena.kind(node)?) {
            return Ok(Some(index));
        }
    }
    Ok(None)
}
