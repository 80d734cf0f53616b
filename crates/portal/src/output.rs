//! Terminal output utilities.
//!
//! Results go to stdout, either as colored text or as JSON. Diagnostics go
//! to stderr.

use console::{Style, Term};
use portal_nav::{NavItem, NavNode, NodeStatus};
use serde::Serialize;

use crate::error::CliError;

/// Terminal output formatter.
pub(crate) struct Output {
    out: Term,
    err: Term,
    json: bool,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new(json: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            json,
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.err.write_line(msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.err.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a single node.
    pub(crate) fn node(&self, node: &NavNode) -> Result<(), CliError> {
        if self.json {
            return self.write_json(node);
        }
        let _ = self.out.write_line(&self.node_line(node, 0));
        if let Some(rewrite) = &node.rewrite_url {
            let _ = self
                .out
                .write_line(&self.dim.apply_to(format!("  rewrite: {rewrite}")).to_string());
        }
        Ok(())
    }

    /// Print a list of nodes.
    pub(crate) fn nodes(&self, nodes: &[NavNode]) -> Result<(), CliError> {
        if self.json {
            return self.write_json(nodes);
        }
        if nodes.is_empty() {
            self.info("(no nodes)");
        }
        for node in nodes {
            let _ = self.out.write_line(&self.node_line(node, 0));
        }
        Ok(())
    }

    /// Print a node with its rendered descendants.
    pub(crate) fn tree(&self, root: &NavNode, items: &[NavItem]) -> Result<(), CliError> {
        if self.json {
            return self.write_json(&NavItem {
                node: root.clone(),
                children: items.to_vec(),
            });
        }
        let _ = self
            .out
            .write_line(&self.cyan_bold.apply_to(&root.title).to_string());
        self.tree_level(items, 1);
        Ok(())
    }

    fn tree_level(&self, items: &[NavItem], depth: usize) {
        for item in items {
            let _ = self.out.write_line(&self.node_line(&item.node, depth));
            self.tree_level(&item.children, depth + 1);
        }
    }

    fn node_line(&self, node: &NavNode, depth: usize) -> String {
        let style = match node.status {
            NodeStatus::Ok => &self.green,
            NodeStatus::Forbidden => &self.yellow,
            NodeStatus::NotFound => &self.red,
        };
        format!(
            "{}{} {}  {}",
            "  ".repeat(depth),
            style.apply_to(format!("[{}]", node.status_code())),
            node.title,
            self.dim.apply_to(&node.url)
        )
    }

    fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), CliError> {
        let json = serde_json::to_string_pretty(value)?;
        let _ = self.out.write_line(&json);
        Ok(())
    }
}
