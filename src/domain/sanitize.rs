use tracing::{debug, instrument};

use crate::config::SanitizePolicy;
use crate::domain::arena::{NodeId, TreeArena};
use crate::domain::content::NodeContent;
use crate::errors::{TreeError, TreeResult};

impl<K: NodeContent> TreeArena<K> {
    /// Makes a node safe to insert into a tree.
    ///
    /// A parentless node is returned as is. A node that already has a parent is
    /// never linked a second time: depending on [`SanitizePolicy`] a deep copy of
    /// it is returned, or the insertion is refused.
    #[instrument(level = "trace", skip(self))]
    pub fn sanitize(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let Some(parent) = self.parent(id)? else {
            return Ok(id);
        };

        match self.settings().tree.sanitize {
            SanitizePolicy::Copy => {
                let copy = self.copy(id)?;
                debug!(
                    "'{}' already has parent '{}', inserting copy {}",
                    self.describe(id),
                    self.describe(parent),
                    copy
                );
                Ok(copy)
            }
            SanitizePolicy::Reject => Err(TreeError::AlreadyOwned {
                node: self.describe(id),
                parent: self.describe(parent),
            }),
        }
    }
}
