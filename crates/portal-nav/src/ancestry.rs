//! Per-request current/ancestor checks.
//!
//! Menu rendering asks "is this the current node?" and "is this an ancestor
//! of the current node?" for every link it draws. [`Ancestry`] memoizes the
//! URL-to-node resolutions behind those questions for one requester.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::context::RequestContext;
use crate::error::NavError;
use crate::node::{NavNode, NodeStatus};
use crate::tree::NavigationTree;

/// Upper bound on parent hops while looking for an ancestor.
const MAX_ANCESTOR_DEPTH: usize = 64;

/// Memo of resolved URLs for one requester.
///
/// Created by [`NavigationTree::ancestry`]. Safe for concurrent use.
pub struct Ancestry<'a> {
    tree: &'a NavigationTree,
    ctx: RequestContext,
    memo: RwLock<HashMap<String, Option<NavNode>>>,
}

impl<'a> Ancestry<'a> {
    pub(crate) fn new(tree: &'a NavigationTree, ctx: RequestContext) -> Self {
        Self {
            tree,
            ctx,
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a URL through the tree, memoized.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if resolution fails.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn resolve(&self, url: &str) -> Result<Option<NavNode>, NavError> {
        if let Some(node) = self.memo.read().unwrap().get(url) {
            return Ok(node.clone());
        }
        let node = self.tree.find_by_path(&self.ctx, url)?;
        self.memo
            .write()
            .unwrap()
            .insert(url.to_owned(), node.clone());
        Ok(node)
    }

    /// Whether `url` resolves to the same record as `current_url`.
    ///
    /// Fallback nodes never count as current.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if resolution fails.
    pub fn is_current(&self, url: &str, current_url: &str) -> Result<bool, NavError> {
        let (Some(node), Some(current)) = (self.resolve_ok(url)?, self.resolve_ok(current_url)?)
        else {
            return Ok(false);
        };
        Ok(node.key == current.key)
    }

    /// Whether `ancestor_url` resolves to a proper ancestor of the node at
    /// `node_url`.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if resolution fails.
    pub fn is_ancestor(&self, ancestor_url: &str, node_url: &str) -> Result<bool, NavError> {
        let (Some(ancestor), Some(mut current)) =
            (self.resolve_ok(ancestor_url)?, self.resolve_ok(node_url)?)
        else {
            return Ok(false);
        };

        for _ in 0..MAX_ANCESTOR_DEPTH {
            match self.tree.parent(&self.ctx, &current)? {
                Some(parent) if parent.status == NodeStatus::Ok => {
                    if parent.key == ancestor.key {
                        return Ok(true);
                    }
                    current = parent;
                }
                _ => return Ok(false),
            }
        }
        tracing::warn!(url = node_url, "Ancestor walk exceeded depth limit");
        Ok(false)
    }

    /// Number of memoized URLs.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.read().unwrap().len()
    }

    /// Whether nothing has been memoized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve_ok(&self, url: &str) -> Result<Option<NavNode>, NavError> {
        Ok(self
            .resolve(url)?
            .filter(|node| node.status == NodeStatus::Ok))
    }
}
