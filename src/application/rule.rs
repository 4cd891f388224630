//! Rules that inspect a tree node by node and record edits in a queue.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::queue::TransformQueue;
use crate::domain::arena::{NodeId, TreeArena};
use crate::domain::content::NodeContent;
use crate::errors::TreeResult;

/// Outcome of applying a rule to one node.
pub trait TransformResult {
    /// Whether a pre-order walk should descend into the children of the node.
    fn visit_children(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTransformResult {
    visit_children: bool,
}

impl DefaultTransformResult {
    pub fn new(visit_children: bool) -> Self {
        Self { visit_children }
    }
}

impl Default for DefaultTransformResult {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TransformResult for DefaultTransformResult {
    fn visit_children(&self) -> bool {
        self.visit_children
    }
}

/// What a rule can touch while the tree is walked: the tree itself read-only,
/// and the creation of new detached nodes to use in recorded edits.
pub struct TransformContext<'a, K> {
    arena: &'a mut TreeArena<K>,
}

impl<'a, K: NodeContent> TransformContext<'a, K> {
    pub fn new(arena: &'a mut TreeArena<K>) -> Self {
        Self { arena }
    }

    pub fn arena(&self) -> &TreeArena<K> {
        &*self.arena
    }

    pub fn new_node(&mut self, content: K) -> NodeId {
        self.arena.new_node(content)
    }

    /// Detached deep copy of `id`.
    pub fn copy(&mut self, id: NodeId) -> TreeResult<NodeId> {
        self.arena.copy(id)
    }
}

pub trait TransformRule<K: NodeContent> {
    type Result: TransformResult;

    /// Inspects `node` and records the edits it wants in `queue`.
    fn apply(
        &mut self,
        ctx: &mut TransformContext<'_, K>,
        node: NodeId,
        queue: &mut TransformQueue,
    ) -> TreeResult<Self::Result>;

    /// Id of the queues this rule fills, the type name by default.
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    /// Walk order of this rule; None uses `transform.traversal` from the
    /// arena settings.
    fn traversal_strategy(&self) -> Option<TraversalStrategy> {
        None
    }

    /// Walks the subtree of `root` and applies the recorded edits.
    fn visit(&mut self, arena: &mut TreeArena<K>, root: NodeId) -> TreeResult<()> {
        let strategy = self
            .traversal_strategy()
            .unwrap_or(arena.settings().transform.traversal);
        strategy.apply(arena, root, self)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraversalStrategy {
    /// Node before its children; a result can stop the descent
    #[default]
    PreOrder,
    /// Children before their node; every node is visited
    PostOrder,
}

impl TraversalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalStrategy::PreOrder => "pre_order",
            TraversalStrategy::PostOrder => "post_order",
        }
    }

    /// Walks the subtree of `root` and collects the edits of `rule` without
    /// running them.
    #[instrument(level = "debug", skip(arena, rule))]
    pub fn get_transformations<K, R>(
        &self,
        arena: &mut TreeArena<K>,
        root: NodeId,
        rule: &mut R,
    ) -> TreeResult<TransformQueue>
    where
        K: NodeContent,
        R: TransformRule<K> + ?Sized,
    {
        let mut queue = TransformQueue::new(rule.name());
        let mut ctx = TransformContext::new(arena);
        match self {
            TraversalStrategy::PreOrder => visit_pre_order(&mut ctx, root, rule, &mut queue)?,
            TraversalStrategy::PostOrder => visit_post_order(&mut ctx, root, rule, &mut queue)?,
        }
        debug!("rule '{}' recorded {} transforms", queue.id(), queue.len());
        Ok(queue)
    }

    /// Collects the edits of `rule` over the subtree of `root`, then runs them.
    pub fn apply<K, R>(
        &self,
        arena: &mut TreeArena<K>,
        root: NodeId,
        rule: &mut R,
    ) -> TreeResult<()>
    where
        K: NodeContent,
        R: TransformRule<K> + ?Sized,
    {
        let mut queue = self.get_transformations(arena, root, rule)?;
        queue.apply(arena)
    }
}

fn visit_pre_order<K, R>(
    ctx: &mut TransformContext<'_, K>,
    node: NodeId,
    rule: &mut R,
    queue: &mut TransformQueue,
) -> TreeResult<()>
where
    K: NodeContent,
    R: TransformRule<K> + ?Sized,
{
    let result = rule.apply(ctx, node, queue)?;
    if !result.visit_children() {
        return Ok(());
    }

    let children = ctx.arena().children(node)?.to_vec();
    for child in children {
        visit_pre_order(ctx, child, rule, queue)?;
    }
    Ok(())
}

fn visit_post_order<K, R>(
    ctx: &mut TransformContext<'_, K>,
    node: NodeId,
    rule: &mut R,
    queue: &mut TransformQueue,
) -> TreeResult<()>
where
    K: NodeContent,
    R: TransformRule<K> + ?Sized,
{
    let children = ctx.arena().children(node)?.to_vec();
    for child in children {
        visit_post_order(ctx, child, rule, queue)?;
    }
    rule.apply(ctx, node, queue)?;
    Ok(())
}
