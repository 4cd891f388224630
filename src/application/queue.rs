//! Deferred structural edits.
//!
//! Rules record edits while a tree is being walked and run them afterwards, so
//! the walk never sees a tree that changes under it.

use std::fmt;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::arena::{NodeId, TreeArena};
use crate::domain::content::NodeContent;
use crate::domain::insert;
use crate::errors::TreeResult;

/// One recorded edit and the nodes it operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTransform {
    /// Puts `replacement` in the place of `base`; an owned replacement is copied
    Replace { base: NodeId, replacement: NodeId },
    /// Moves `node` right before `base`
    MoveBefore { base: NodeId, node: NodeId },
    /// Moves `node` right after `base`
    MoveAfter { base: NodeId, node: NodeId },
    Delete { node: NodeId },
    /// Adds `child` to `parent`, at the end when `position` is None
    AddChild {
        parent: NodeId,
        child: NodeId,
        position: Option<usize>,
    },
    Swap {
        first: NodeId,
        second: NodeId,
        swap_subtrees: bool,
    },
}

impl NodeTransform {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeTransform::Replace { .. } => "replace",
            NodeTransform::MoveBefore { .. } => "move-before",
            NodeTransform::MoveAfter { .. } => "move-after",
            NodeTransform::Delete { .. } => "delete",
            NodeTransform::AddChild { .. } => "add-child",
            NodeTransform::Swap { .. } => "swap",
        }
    }

    pub fn operands(&self) -> Vec<NodeId> {
        match *self {
            NodeTransform::Replace { base, replacement } => vec![base, replacement],
            NodeTransform::MoveBefore { base, node } | NodeTransform::MoveAfter { base, node } => {
                vec![base, node]
            }
            NodeTransform::Delete { node } => vec![node],
            NodeTransform::AddChild { parent, child, .. } => vec![parent, child],
            NodeTransform::Swap { first, second, .. } => vec![first, second],
        }
    }

    #[instrument(level = "debug", skip(arena))]
    pub fn execute<K: NodeContent>(&self, arena: &mut TreeArena<K>) -> TreeResult<()> {
        match *self {
            NodeTransform::Replace { base, replacement } => {
                insert::replace(arena, base, replacement, false)?;
            }
            NodeTransform::MoveBefore { base, node } => {
                insert::insert_before(arena, base, node, true)?;
            }
            NodeTransform::MoveAfter { base, node } => {
                insert::insert_after(arena, base, node, true)?;
            }
            NodeTransform::Delete { node } => insert::delete(arena, node)?,
            NodeTransform::AddChild {
                parent,
                child,
                position,
            } => {
                match position {
                    Some(index) => arena.insert_child(parent, index, child)?,
                    None => arena.add_child(parent, child)?,
                };
            }
            NodeTransform::Swap {
                first,
                second,
                swap_subtrees,
            } => {
                insert::swap(arena, first, second, swap_subtrees)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for NodeTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.operands().iter().join(", "))
    }
}

/// Ordered list of pending transforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformQueue {
    id: String,
    transforms: Vec<NodeTransform>,
}

impl TransformQueue {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transforms: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transforms(&self) -> &[NodeTransform] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn push(&mut self, transform: NodeTransform) -> &mut Self {
        self.transforms.push(transform);
        self
    }

    pub fn replace(&mut self, base: NodeId, replacement: NodeId) -> &mut Self {
        self.push(NodeTransform::Replace { base, replacement })
    }

    pub fn move_before(&mut self, base: NodeId, node: NodeId) -> &mut Self {
        self.push(NodeTransform::MoveBefore { base, node })
    }

    pub fn move_after(&mut self, base: NodeId, node: NodeId) -> &mut Self {
        self.push(NodeTransform::MoveAfter { base, node })
    }

    pub fn delete(&mut self, node: NodeId) -> &mut Self {
        self.push(NodeTransform::Delete { node })
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> &mut Self {
        self.push(NodeTransform::AddChild {
            parent,
            child,
            position: None,
        })
    }

    pub fn add_child_at(&mut self, parent: NodeId, child: NodeId, position: usize) -> &mut Self {
        self.push(NodeTransform::AddChild {
            parent,
            child,
            position: Some(position),
        })
    }

    pub fn add_child_head(&mut self, parent: NodeId, child: NodeId) -> &mut Self {
        self.add_child_at(parent, child, 0)
    }

    /// Swaps two nodes together with their subtrees.
    pub fn swap(&mut self, first: NodeId, second: NodeId) -> &mut Self {
        self.swap_with(first, second, true)
    }

    pub fn swap_with(&mut self, first: NodeId, second: NodeId, swap_subtrees: bool) -> &mut Self {
        self.push(NodeTransform::Swap {
            first,
            second,
            swap_subtrees,
        })
    }

    /// Runs the transforms in the order they were added and empties the queue.
    ///
    /// Stops at the first failing transform; the remaining ones are dropped.
    #[instrument(
        level = "debug",
        skip(self, arena),
        fields(id = %self.id, len = self.transforms.len())
    )]
    pub fn apply<K: NodeContent>(&mut self, arena: &mut TreeArena<K>) -> TreeResult<()> {
        for transform in self.transforms.drain(..) {
            debug!("applying {}", transform);
            transform.execute(arena)?;
        }
        Ok(())
    }

    /// Runs the transforms last to first and empties the queue.
    #[instrument(
        level = "debug",
        skip(self, arena),
        fields(id = %self.id, len = self.transforms.len())
    )]
    pub fn apply_reverse<K: NodeContent>(&mut self, arena: &mut TreeArena<K>) -> TreeResult<()> {
        for transform in self.transforms.drain(..).rev() {
            debug!("applying {}", transform);
            transform.execute(arena)?;
        }
        Ok(())
    }
}

impl fmt::Display for TransformQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.transforms.iter().join(", "))
    }
}
