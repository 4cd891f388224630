//! Contract between concrete node types and the tree engine.

use std::fmt;
use std::hash::Hash;

use crate::domain::arena::{NodeId, TreeArena};
use crate::errors::TreeResult;

/// Payload stored in every node of a [`TreeArena`].
///
/// The engine never interprets the payload. It only asks for a [`kind`](Self::kind)
/// tag when a caller filters by kind, and for strings when it reports problems.
pub trait NodeContent: Clone + fmt::Debug + Sized {
    /// Tag identifying the variant of a node, used by kind-filtered queries.
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;

    /// String representation of the node content, empty by default.
    fn to_content_string(&self) -> String {
        String::new()
    }

    /// Name of the node type, the debug form of its kind by default.
    fn node_name(&self) -> String {
        format!("{:?}", self.kind())
    }

    /// Creates a copy of `source` with the same content and kind but without
    /// children or parent.
    ///
    /// Implementations that override this must keep the new node childless;
    /// [`TreeArena::copy`] rejects copies that come back with children.
    fn copy_shallow(arena: &mut TreeArena<Self>, source: NodeId) -> TreeResult<NodeId> {
        let content = arena.content(source)?.clone();
        Ok(arena.new_node(content))
    }
}
