//! Application layer: deferred transforms driven by tree walks
//!
//! Rules walk a tree through the domain layer and record edits in a queue;
//! the queue runs them afterwards through the mutation algorithms.

pub mod queue;
pub mod rule;

pub use queue::{NodeTransform, TransformQueue};
pub use rule::{
    DefaultTransformResult, TransformContext, TransformResult, TransformRule, TraversalStrategy,
};
