//! Structural edits relative to an existing node: insertion next to it,
//! replacement, deletion, children transplant, ranking and swapping.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::domain::arena::{NodeId, NodeRef, TreeArena};
use crate::domain::content::NodeContent;
use crate::domain::traversal::depth_iterator;
use crate::errors::{TreeError, TreeResult};

/// Inserts `new` as the sibling right before `base`.
///
/// With `move_node`, `new` is detached from its current position first and
/// inserted as is; otherwise an owned `new` is replaced by a copy. Returns the
/// node really inserted, or `new` untouched when `base` has no parent.
#[instrument(level = "debug", skip(arena))]
pub fn insert_before<K: NodeContent>(
    arena: &mut TreeArena<K>,
    base: NodeId,
    new: NodeId,
    move_node: bool,
) -> TreeResult<NodeId> {
    insert_next_to(arena, base, new, move_node, 0)
}

/// Inserts `new` as the sibling right after `base`. See [`insert_before`].
#[instrument(level = "debug", skip(arena))]
pub fn insert_after<K: NodeContent>(
    arena: &mut TreeArena<K>,
    base: NodeId,
    new: NodeId,
    move_node: bool,
) -> TreeResult<NodeId> {
    insert_next_to(arena, base, new, move_node, 1)
}

fn insert_next_to<K: NodeContent>(
    arena: &mut TreeArena<K>,
    base: NodeId,
    new: NodeId,
    move_node: bool,
    offset: usize,
) -> TreeResult<NodeId> {
    let Some(parent) = arena.parent(base)? else {
        warn!(
            "Tried to insert a node next to '{}', which does not have a parent",
            arena.describe(base)
        );
        return Ok(new);
    };

    if move_node {
        ensure_not_moving_ancestor(arena, base, new)?;
        arena.detach(new)?;
    }

    let index = position_in(arena, parent, base)?;
    arena.insert_child(parent, index + offset, new)
}

/// Puts `new` in the place of `base`, which is left without a parent.
///
/// Returns the node really inserted, or `new` untouched when `base` has no
/// parent.
#[instrument(level = "debug", skip(arena))]
pub fn replace<K: NodeContent>(
    arena: &mut TreeArena<K>,
    base: NodeId,
    new: NodeId,
    move_node: bool,
) -> TreeResult<NodeId> {
    let Some(parent) = arena.parent(base)? else {
        warn!("Tried to replace '{}', which does not have a parent", arena.describe(base));
        return Ok(new);
    };
    if new == base {
        return Ok(base);
    }

    if move_node && arena.has_parent(new)? {
        ensure_not_moving_ancestor(arena, base, new)?;
        arena.detach(new)?;
    }

    let index = position_in(arena, parent, base)?;
    arena.set_child(parent, index, new)?;
    arena.child(parent, index)
}

/// Removes `base` from its parent. Does nothing for parentless nodes.
#[instrument(level = "debug", skip(arena))]
pub fn delete<K: NodeContent>(arena: &mut TreeArena<K>, base: NodeId) -> TreeResult<()> {
    let Some(parent) = arena.parent(base)? else {
        warn!("Tried to delete '{}', which does not have a parent", arena.describe(base));
        return Ok(());
    };

    let index = position_in(arena, parent, base)?;
    arena.remove_child(parent, index)?;
    Ok(())
}

/// Replaces `base` with `new`, handing the children of `base` over to `new`.
///
/// Children `new` already has are discarded: they are detached and left as
/// parentless roots in the arena, like `base` itself afterwards. They stay
/// valid, and the caller owns them (see [`TreeArena::dispose`]).
///
/// Unlike [`replace`], a parentless `base` is an error.
#[instrument(level = "debug", skip(arena))]
pub fn set<K: NodeContent>(
    arena: &mut TreeArena<K>,
    base: NodeId,
    new: NodeId,
) -> TreeResult<NodeId> {
    let parent = arena
        .parent(base)?
        .ok_or_else(|| TreeError::NoParent(arena.describe(base)))?;
    if new == base {
        return Ok(base);
    }
    ensure_not_moving_ancestor(arena, base, new)?;

    if arena.has_children(new)? {
        let discarded = arena.remove_children(new)?;
        warn!(
            "New node '{}' had {} children, detached as roots: {:?}",
            arena.describe(new),
            discarded.len(),
            discarded
        );
    }
    arena.detach(new)?;

    for child in arena.remove_children(base)? {
        arena.add_child(new, child)?;
    }

    let mut iter = arena.children_iter(parent)?;
    while let Some(child) = iter.next() {
        if child == base {
            return iter.set(new);
        }
    }
    Err(TreeError::InvariantViolation(format!(
        "could not find '{}' among the children of its parent '{}'",
        arena.describe(base),
        arena.describe(parent)
    )))
}

/// Positional address of `node` among nodes satisfying `predicate`.
///
/// Element 0 is the 1-based position of `node` among the matching, pruned
/// descendants of its nearest matching ancestor; each following element does
/// the same for that ancestor, up to the outermost matching ancestor.
#[instrument(level = "debug", skip(arena, predicate))]
pub fn get_rank<K, P>(arena: &TreeArena<K>, node: NodeId, predicate: P) -> TreeResult<Vec<usize>>
where
    K: NodeContent,
    P: Fn(NodeRef<'_, K>) -> bool,
{
    let mut rank = Vec::new();
    let mut current = node;

    while let Some(scope) = arena.ancestor_try(current, &predicate)? {
        let position = depth_iterator(arena, scope, &predicate, true)?
            .position(|candidate| candidate == current)
            .ok_or_else(|| {
                TreeError::NotFound(format!(
                    "could not find '{}' inside the scope of '{}'",
                    arena.describe(current),
                    arena.describe(scope)
                ))
            })?;
        rank.push(position + 1);
        current = scope;
    }
    Ok(rank)
}

/// Exchanges the positions of two nodes. Returns whether anything changed.
///
/// With `swap_subtrees`, each node takes its children along. Nodes where one is
/// an ancestor of the other, or where one has no parent, are left alone.
///
/// Without `swap_subtrees`, only the nodes trade places: each position keeps
/// its children and parent. This also works for an ancestor and its descendant.
#[instrument(level = "debug", skip(arena))]
pub fn swap<K: NodeContent>(
    arena: &mut TreeArena<K>,
    first: NodeId,
    second: NodeId,
    swap_subtrees: bool,
) -> TreeResult<bool> {
    if first == second {
        arena.node(first)?;
        return Ok(false);
    }
    if swap_subtrees {
        swap_subtrees_of(arena, first, second)
    } else {
        swap_positions(arena, first, second)?;
        Ok(true)
    }
}

fn swap_subtrees_of<K: NodeContent>(
    arena: &mut TreeArena<K>,
    first: NodeId,
    second: NodeId,
) -> TreeResult<bool> {
    if arena.is_ancestor(first, second)? || arena.is_ancestor(second, first)? {
        warn!(
            "Cannot swap '{}' and '{}', one is an ancestor of the other",
            arena.describe(first),
            arena.describe(second)
        );
        return Ok(false);
    }
    if !arena.has_parent(first)? || !arena.has_parent(second)? {
        warn!(
            "Cannot swap '{}' and '{}', both need a parent",
            arena.describe(first),
            arena.describe(second)
        );
        return Ok(false);
    }

    let placeholder = arena.copy_shallow(first)?;
    replace(arena, first, placeholder, true)?;
    replace(arena, second, first, true)?;
    replace(arena, placeholder, second, true)?;
    arena.dispose(placeholder)?;
    debug!("swapped subtrees of {} and {}", first, second);
    Ok(true)
}

/// Relabels every link that mentions one of the two nodes.
fn swap_positions<K: NodeContent>(
    arena: &mut TreeArena<K>,
    first: NodeId,
    second: NodeId,
) -> TreeResult<()> {
    let exchange = |id: NodeId| {
        if id == first {
            second
        } else if id == second {
            first
        } else {
            id
        }
    };

    let mut affected = vec![first, second];
    for id in [first, second] {
        affected.extend(arena.parent(id)?);
        affected.extend_from_slice(arena.children(id)?);
    }
    let affected: Vec<NodeId> = affected.into_iter().unique().collect();

    let mut links = HashMap::with_capacity(affected.len());
    for &id in &affected {
        let node = arena.node(id)?;
        let parent = node.parent().map(exchange);
        let children: Vec<NodeId> = node.children().iter().copied().map(exchange).collect();
        links.insert(exchange(id), (parent, children));
    }

    for (id, (parent, children)) in links {
        let node = arena.node_mut(id)?;
        node.parent = parent;
        node.children = children;
    }
    debug!("swapped positions of {} and {}", first, second);
    Ok(())
}

fn position_in<K: NodeContent>(
    arena: &TreeArena<K>,
    parent: NodeId,
    child: NodeId,
) -> TreeResult<usize> {
    arena.index_of_child(parent, child)?.ok_or_else(|| {
        TreeError::NotFound(format!(
            "'{}' is not among the children of its parent '{}'",
            arena.describe(child),
            arena.describe(parent)
        ))
    })
}

/// Moving `new` into the place of `base` must not take `base` along with it.
fn ensure_not_moving_ancestor<K: NodeContent>(
    arena: &TreeArena<K>,
    base: NodeId,
    new: NodeId,
) -> TreeResult<()> {
    if new == base || arena.is_ancestor(base, new)? {
        return Err(TreeError::CycleDetected(arena.describe(new)));
    }
    Ok(())
}
