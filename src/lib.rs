//! Ownership-strict mutable trees.
//!
//! Nodes live in a [`TreeArena`] and are addressed by [`NodeId`] handles. A node
//! belongs to at most one parent: inserting a node that already has one inserts
//! a copy instead, and every insertion returns the node really inserted.

pub mod application;
pub mod config;
pub mod domain;
pub mod errors;
pub mod util;

pub use application::{TransformQueue, TransformRule, TraversalStrategy};
pub use config::{SanitizePolicy, Settings};
pub use domain::{ChildrenIterator, NodeContent, NodeId, NodeRef, TreeArena, TreeNode};
pub use errors::{TreeError, TreeResult};
