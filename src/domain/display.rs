use std::collections::HashMap;

use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::{NodeId, TreeArena};
use crate::domain::content::NodeContent;
use crate::errors::{TreeError, TreeResult};

/// Rendering of a subtree as an indented text tree, for diagnostics.
pub trait TreeNodeConvert {
    fn to_tree_string(&self, id: NodeId) -> TreeResult<Tree<String>>;
}

impl<K: NodeContent> TreeNodeConvert for TreeArena<K> {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, id: NodeId) -> TreeResult<Tree<String>> {
        // reversed pre-order: every child is built before its parent
        let order: Vec<NodeId> = self.descendants_and_self(id)?.collect();
        let mut built: HashMap<NodeId, Tree<String>> = HashMap::with_capacity(order.len());
        for &node in order.iter().rev() {
            let mut tree = Tree::new(self.to_node_string(node)?);
            for child in self.children(node)? {
                if let Some(child_tree) = built.remove(child) {
                    tree.push(child_tree);
                }
            }
            built.insert(node, tree);
        }
        built.remove(&id).ok_or(TreeError::InvalidHandle(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::Label;

    #[test]
    fn test_to_tree_string_renders_nested_children() {
        let mut arena = TreeArena::new();
        let a = arena.new_node(Label::block("a"));
        let b = arena.new_node(Label::block("b"));
        let c = arena.new_node(Label::leaf("c"));
        arena.add_child(a, b).unwrap();
        arena.add_child(b, c).unwrap();

        let rendered = arena.to_tree_string(a).unwrap().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Block: a");
        assert!(lines[1].ends_with("Block: b"));
        assert!(lines[2].ends_with("Leaf: c"));
    }
}
