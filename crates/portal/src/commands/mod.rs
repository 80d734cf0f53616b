//! CLI command implementations.

mod session;

use clap::Args;
use portal_nav::NavNode;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use session::GlobalArgs;
use session::Session;

/// Arguments for commands taking a request path.
#[derive(Args)]
pub(crate) struct PathArgs {
    /// Request path or URL (e.g. `/mysite/about/team`).
    path: String,
}

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    /// Start from the node at this path (default: the Home node).
    path: Option<String>,

    /// Number of levels to render.
    #[arg(short, long, default_value_t = 2)]
    depth: usize,
}

/// `portal resolve`: resolve a path to a node.
pub(crate) fn resolve(global: &GlobalArgs, args: &PathArgs, output: &Output) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let node = find(&session, &args.path)?;
    output.node(&node)
}

/// `portal children`: list the children of the node at a path.
pub(crate) fn children(
    global: &GlobalArgs,
    args: &PathArgs,
    output: &Output,
) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let node = find(&session, &args.path)?;
    let children = session.tree.children(&session.ctx, &node)?;
    output.nodes(&children)
}

/// `portal parent`: show the parent of the node at a path.
pub(crate) fn parent(global: &GlobalArgs, args: &PathArgs, output: &Output) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let node = find(&session, &args.path)?;
    match session.tree.parent(&session.ctx, &node)? {
        Some(parent) => output.node(&parent),
        None => {
            output.info(&format!("{} has no parent", node.url));
            Ok(())
        }
    }
}

/// `portal root`: show the Home node.
pub(crate) fn root(global: &GlobalArgs, output: &Output) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let root = session
        .tree
        .root(&session.ctx)?
        .ok_or_else(|| CliError::NotFound("Home page is not accessible".to_owned()))?;
    output.node(&root)
}

/// `portal tree`: render the navigation tree below a node.
pub(crate) fn tree(global: &GlobalArgs, args: &TreeArgs, output: &Output) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let start = match &args.path {
        Some(path) => find(&session, path)?,
        None => session
            .tree
            .root(&session.ctx)?
            .ok_or_else(|| CliError::NotFound("Home page is not accessible".to_owned()))?,
    };
    let items = session.tree.descendants(&session.ctx, &start, args.depth)?;
    output.tree(&start, &items)
}

fn find(session: &Session, path: &str) -> Result<NavNode, CliError> {
    session
        .tree
        .find_by_path(&session.ctx, path)?
        .ok_or_else(|| CliError::NotFound(format!("No node for {path}")))
}
