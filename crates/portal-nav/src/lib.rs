//! Content-path resolution and navigation for the portal.
//!
//! This crate maps incoming request paths onto a website's page/file
//! hierarchy and exposes that hierarchy as navigation nodes:
//! - [`PathCanonicalizer`]: raw path or URL to [`CanonicalPath`]
//! - [`scope`]: website path-prefix translation
//! - [`ContentLookup`]: path to record ([`RecursiveLookup`], [`IndexedLookup`])
//! - [`NodeBuilder`]: record to [`NavNode`]
//! - [`NodeValidator`]: access, listing and security chains
//! - [`NavigationTree`]: find by path, children, parent, root, fallbacks,
//!   federation through a [`TreeRegistry`]
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use portal_nav::{NavigationConfig, NavigationTree, RequestContext};
//! use portal_store::{EntityStore, MemoryStore};
//!
//! let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::load("site.yaml")?);
//! let website = store.find_website("Portal")?.ok_or("no website")?;
//! let tree = NavigationTree::new("portal", website, store, NavigationConfig::default());
//!
//! let ctx = RequestContext::anonymous();
//! let root = tree.root(&ctx)?;
//! let node = tree.find_by_path(&ctx, "/about/team")?;
//! # Ok(())
//! # }
//! ```

mod ancestry;
mod collab;
mod context;
mod error;
mod lookup;
mod node;
mod path;
mod path_index;
pub mod scope;
#[cfg(test)]
mod test_support;
mod tree;
mod validator;

pub use ancestry::Ancestry;
pub use collab::{
    AllowAllOracle, AttachmentInfo, AttachmentProvider, ContentFormatter, HierarchyUrlBuilder,
    PlainFormatter, RoleOracle, SecurityOracle, StoreAttachmentProvider, UrlBuilder,
};
pub use context::{RequestContext, User};
pub use error::NavError;
pub use lookup::{ContentLookup, RecursiveLookup};
pub use node::{NavNode, NodeBuilder, NodeStatus, PAGE_ID_PARAM, sort_by_display_order};
pub use path::{CanonicalPath, PathCanonicalizer, PathError, PathKind, QueryString};
pub use path_index::{IndexedLookup, PathIndex};
pub use tree::{
    LookupStrategy, NavItem, NavigationConfig, NavigationProvider, NavigationTree,
    RETURN_URL_PARAM, TreeRegistry, fallback_markers,
};
pub use validator::{
    AlwaysFalse, AlwaysTrue, CompositeValidator, HiddenFromNavigationValidator, NodeValidator,
    SecurityValidator, ValidatorChains, ValidatorKind, ValidatorKinds, composite_from_kinds,
};
