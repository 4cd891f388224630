//! Domain layer: the tree and the algorithms that edit it
//!
//! This layer is independent of external concerns (no I/O, no config loading).

pub mod arena;
pub mod children_iter;
pub mod content;
pub mod display;
pub mod index;
pub mod insert;
pub mod sanitize;
pub mod traversal;

pub use arena::{NodeId, NodeRef, TreeArena, TreeNode};
pub use children_iter::ChildrenIterator;
pub use content::NodeContent;
pub use display::TreeNodeConvert;
pub use traversal::{collect_matching, depth_iterator, kind_in, kind_is, not, DepthIterator};
