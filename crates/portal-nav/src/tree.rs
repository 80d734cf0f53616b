//! Navigation tree: path resolution, hierarchy traversal, fallback nodes.
//!
//! A [`NavigationTree`] answers navigation queries for one website. Each call
//! canonicalizes its input, resolves records through a [`ContentLookup`],
//! builds nodes and gates them through the validator chains. Nothing is
//! cached between calls except what the configured lookup caches itself.
//!
//! # Fallback Chain
//!
//! A record that resolves but fails the access chain is replaced by a marker
//! page, tried in [`fallback_markers`] order: Login (anonymous requesters
//! only, with a `ReturnUrl` parameter), then Access Denied. When no marker
//! page is usable the Page Not Found marker is tried, and when that is
//! missing or inaccessible the result is `None`.
//!
//! # Federation
//!
//! Trees registered in a shared [`TreeRegistry`] contribute to each other:
//! a path no local record answers is offered to every other registered
//! provider in registration order, and child listings are extended with
//! their contributions. A tree never consults a provider with its own name.

use std::sync::{Arc, RwLock, Weak};

use portal_store::{EntityKind, EntityStore, Page, Record, SiteMarker, Website};
use serde::Serialize;
use uuid::Uuid;

use crate::ancestry::Ancestry;
use crate::collab::{
    AttachmentProvider, ContentFormatter, HierarchyUrlBuilder, PlainFormatter, RoleOracle,
    SecurityOracle, StoreAttachmentProvider, UrlBuilder,
};
use crate::context::RequestContext;
use crate::error::NavError;
use crate::lookup::{ContentLookup, RecursiveLookup};
use crate::node::{NavNode, NodeBuilder, NodeStatus, PAGE_ID_PARAM, sort_by_display_order};
use crate::path::{CanonicalPath, PathCanonicalizer, PathError, PathKind};
use crate::path_index::IndexedLookup;
use crate::scope::{self, WEBSITE_PATH_PARAM};
use crate::validator::{NodeValidator, ValidatorChains, ValidatorKinds};

/// Query parameter carrying the originally requested URL on a Login node.
pub const RETURN_URL_PARAM: &str = "ReturnUrl";

/// Content lookup implementation to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LookupStrategy {
    /// [`RecursiveLookup`]: live queries, one per path segment.
    #[default]
    Recursive,
    /// [`IndexedLookup`]: cached per-website path index.
    Indexed,
}

/// Engine settings for a navigation tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationConfig {
    /// Default-document paths that normalize to `/`.
    pub root_aliases: Vec<String>,
    /// Application root that `~/` paths resolve against.
    pub app_path: String,
    /// Content lookup implementation.
    pub lookup: LookupStrategy,
    /// Validator chain composition.
    pub validators: ValidatorKinds,
    /// Role every authenticated requester implicitly holds.
    pub authenticated_role: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            root_aliases: vec!["/default.aspx".to_owned()],
            app_path: "/".to_owned(),
            lookup: LookupStrategy::default(),
            validators: ValidatorKinds::default(),
            authenticated_role: "Authenticated Users".to_owned(),
        }
    }
}

/// A source of navigation nodes that can take part in federation.
///
/// The `*_local` methods answer from the provider's own content only; they
/// never fall back to marker pages for misses and never consult other
/// providers.
pub trait NavigationProvider: Send + Sync {
    /// Provider name, unique within a registry.
    fn name(&self) -> &str;

    /// Resolve a raw path against local content.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] on a host mismatch or a failed store query.
    fn find_local(&self, ctx: &RequestContext, raw: &str) -> Result<Option<NavNode>, NavError>;

    /// Local children of a node, filtered for listing.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if a store query fails.
    fn children_local(&self, ctx: &RequestContext, node: &NavNode)
    -> Result<Vec<NavNode>, NavError>;
}

/// Ordered list of federated navigation providers.
///
/// Written during startup registration, read on every request.
#[derive(Default)]
pub struct TreeRegistry {
    providers: RwLock<Vec<Arc<dyn NavigationProvider>>>,
}

impl TreeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider. Registration order is consultation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn register(&self, provider: Arc<dyn NavigationProvider>) {
        tracing::debug!(provider = provider.name(), "Registered navigation provider");
        self.providers.write().unwrap().push(provider);
    }

    /// Snapshot of the registered providers.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn providers(&self) -> Vec<Arc<dyn NavigationProvider>> {
        self.providers.read().unwrap().clone()
    }

    /// Number of registered providers.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().unwrap().len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Node with its rendered descendants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavItem {
    /// The node itself.
    pub node: NavNode,
    /// Child items, sorted by display order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}

/// Marker pages tried, in order, when a requester is denied access.
#[must_use]
pub fn fallback_markers(ctx: &RequestContext) -> &'static [SiteMarker] {
    if ctx.is_authenticated() {
        &[SiteMarker::AccessDenied]
    } else {
        &[SiteMarker::Login, SiteMarker::AccessDenied]
    }
}

/// Navigation engine for one website.
///
/// # Example
///
/// ```ignore
/// let tree = NavigationTree::new("portal", website, store, NavigationConfig::default());
/// let node = tree.find_by_path(&RequestContext::anonymous(), "/about/team")?;
/// ```
pub struct NavigationTree {
    name: String,
    website: Website,
    store: Arc<dyn EntityStore>,
    canonicalizer: PathCanonicalizer,
    lookup: Arc<dyn ContentLookup>,
    builder: NodeBuilder,
    kinds: ValidatorKinds,
    validators: ValidatorChains,
    registry: Weak<TreeRegistry>,
}

impl NavigationTree {
    /// Create a navigation tree with the default collaborators.
    ///
    /// Defaults: [`RoleOracle`] for security, [`HierarchyUrlBuilder`] for
    /// URLs, [`PlainFormatter`] for text and [`StoreAttachmentProvider`] for
    /// file attachments.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        website: Website,
        store: Arc<dyn EntityStore>,
        config: NavigationConfig,
    ) -> Self {
        let lookup: Arc<dyn ContentLookup> = match config.lookup {
            LookupStrategy::Recursive => Arc::new(RecursiveLookup::new(Arc::clone(&store))),
            LookupStrategy::Indexed => Arc::new(IndexedLookup::new(Arc::clone(&store))),
        };
        let oracle: Arc<dyn SecurityOracle> = Arc::new(RoleOracle::new(
            Arc::clone(&store),
            config.authenticated_role,
        ));
        let builder = NodeBuilder::new(
            website.clone(),
            Arc::clone(&store),
            Arc::new(HierarchyUrlBuilder::new(Arc::clone(&store))),
            Arc::new(PlainFormatter),
            Arc::new(StoreAttachmentProvider::new(Arc::clone(&store))),
        );
        let validators = ValidatorChains::from_kinds(&config.validators, &oracle);

        Self {
            name: name.into(),
            website,
            store,
            canonicalizer: PathCanonicalizer::new(config.root_aliases, config.app_path),
            lookup,
            builder,
            kinds: config.validators,
            validators,
            registry: Weak::new(),
        }
    }

    /// Replace the security oracle. Rebuilds the validator chains from the
    /// configured validator kinds.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn SecurityOracle>) -> Self {
        self.validators = ValidatorChains::from_kinds(&self.kinds, &oracle);
        self
    }

    /// Replace the content formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn ContentFormatter>) -> Self {
        self.builder = self.builder.with_formatter(formatter);
        self
    }

    /// Replace the URL builder.
    #[must_use]
    pub fn with_url_builder(mut self, urls: Arc<dyn UrlBuilder>) -> Self {
        self.builder = self.builder.with_url_builder(urls);
        self
    }

    /// Replace the attachment provider.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentProvider>) -> Self {
        self.builder = self.builder.with_attachments(attachments);
        self
    }

    /// Replace the content lookup.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn ContentLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Replace the validator chains.
    #[must_use]
    pub fn with_validators(mut self, validators: ValidatorChains) -> Self {
        self.validators = validators;
        self
    }

    /// Take part in federation through `registry`.
    ///
    /// The tree keeps a weak reference; registering the tree itself is up to
    /// the caller.
    #[must_use]
    pub fn with_registry(mut self, registry: &Arc<TreeRegistry>) -> Self {
        self.registry = Arc::downgrade(registry);
        self
    }

    /// Tree name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Website this tree serves.
    #[must_use]
    pub fn website(&self) -> &Website {
        &self.website
    }

    /// Resolve a raw request path or URL to a node.
    ///
    /// Tries, in order: a page at the path, a file at the path, a page named
    /// by the [`PAGE_ID_PARAM`] query parameter, then every federated
    /// provider. A record that fails the access chain yields the access-denied
    /// fallback; a miss yields [`not_found_node`](Self::not_found_node).
    /// Malformed input counts as a miss.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::SecurityMismatch`] when an internal-redirect path
    /// names another host, and [`NavError::Store`] when a query fails.
    pub fn find_by_path(
        &self,
        ctx: &RequestContext,
        raw: &str,
    ) -> Result<Option<NavNode>, NavError> {
        let Some(canonical) = self.canonicalize(ctx, raw)? else {
            return self.not_found_node(ctx);
        };

        if let Some(node) = self.resolve_local(ctx, &canonical)? {
            return Ok(Some(node));
        }

        for provider in self.federated() {
            if let Some(node) = provider.find_local(ctx, raw)? {
                tracing::debug!(
                    path = raw,
                    provider = provider.name(),
                    "Resolved by federated provider"
                );
                return Ok(Some(node));
            }
        }

        tracing::debug!(path = %canonical, "Path not found");
        self.not_found_node(ctx)
    }

    /// Children of a node, in display order.
    ///
    /// Local children are the active child pages and files of the page the
    /// node's URL resolves to, filtered by the listing chain. Federated
    /// providers append their own children before sorting.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if a store query fails.
    pub fn children(&self, ctx: &RequestContext, node: &NavNode) -> Result<Vec<NavNode>, NavError> {
        let mut children = self.local_children(ctx, node)?;
        for provider in self.federated() {
            children.extend(provider.children_local(ctx, node)?);
        }
        sort_by_display_order(&mut children);
        Ok(children)
    }

    /// Accessible node for the parent of `node`, `None` at the top.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if a store query fails.
    pub fn parent(&self, ctx: &RequestContext, node: &NavNode) -> Result<Option<NavNode>, NavError> {
        let parent_id = match &node.record {
            Record::Page(_) => self.owning_page(node)?.and_then(|page| page.parent_page_id),
            Record::File(file) => Some(file.parent_page_id),
        };
        let Some(parent_id) = parent_id else {
            return Ok(None);
        };
        match self.store.find_page(parent_id)? {
            Some(parent) if self.is_live(&parent) => self.accessible(ctx, Record::Page(parent)),
            _ => Ok(None),
        }
    }

    /// Accessible node for the website's Home page.
    ///
    /// `None` means the Home page exists but the requester may not see it
    /// and no fallback page applies.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] when the website has no active
    /// Home page, and [`NavError::Store`] when a query fails.
    pub fn root(&self, ctx: &RequestContext) -> Result<Option<NavNode>, NavError> {
        let home = self
            .store
            .find_page_by_site_marker(&self.website, SiteMarker::Home)?
            .filter(|page| self.is_live(page));
        let Some(home) = home else {
            tracing::warn!(website = %self.website.name, "Website has no Home page");
            return Err(NavError::Configuration(format!(
                "website '{}' has no {} page",
                self.website.name,
                SiteMarker::Home
            )));
        };
        self.accessible(ctx, Record::Page(home))
    }

    /// Whether the requester passes the security chain for `node`.
    #[must_use]
    pub fn is_accessible(&self, ctx: &RequestContext, node: &NavNode) -> bool {
        self.validators.security.validate(ctx, node)
    }

    /// Node to show in place of a denied record.
    ///
    /// Walks [`fallback_markers`]; the Login node carries `requested_url` as
    /// its [`RETURN_URL_PARAM`]. Falls back to
    /// [`not_found_node`](Self::not_found_node).
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if a store query fails.
    pub fn access_denied_node(
        &self,
        ctx: &RequestContext,
        requested_url: &str,
    ) -> Result<Option<NavNode>, NavError> {
        for &marker in fallback_markers(ctx) {
            let Some(node) = self.marker_node(ctx, marker, NodeStatus::Forbidden)? else {
                continue;
            };
            tracing::debug!(marker = %marker, requested = requested_url, "Access denied fallback");
            return Ok(Some(if marker == SiteMarker::Login {
                node.with_query_param(RETURN_URL_PARAM, requested_url)
            } else {
                node
            }));
        }
        self.not_found_node(ctx)
    }

    /// The website's Page Not Found node, if configured and accessible.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if a store query fails.
    pub fn not_found_node(&self, ctx: &RequestContext) -> Result<Option<NavNode>, NavError> {
        self.marker_node(ctx, SiteMarker::PageNotFound, NodeStatus::NotFound)
    }

    /// Items below `node`, `depth` levels deep.
    ///
    /// # Errors
    ///
    /// Returns [`NavError`] if a store query fails.
    pub fn descendants(
        &self,
        ctx: &RequestContext,
        node: &NavNode,
        depth: usize,
    ) -> Result<Vec<NavItem>, NavError> {
        if depth == 0 {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        for child in self.children(ctx, node)? {
            items.push(NavItem {
                children: self.descendants(ctx, &child, depth - 1)?,
                node: child,
            });
        }
        Ok(items)
    }

    /// Per-request memo for current-node and ancestor checks.
    #[must_use]
    pub fn ancestry(&self, ctx: &RequestContext) -> Ancestry<'_> {
        Ancestry::new(self, ctx.clone())
    }

    fn canonicalize(
        &self,
        ctx: &RequestContext,
        raw: &str,
    ) -> Result<Option<CanonicalPath>, NavError> {
        match self.canonicalizer.canonicalize(raw, ctx.host()) {
            Ok(canonical) => Ok(Some(canonical)),
            Err(PathError::Malformed(reason)) => {
                tracing::debug!(path = raw, %reason, "Malformed path");
                Ok(None)
            }
            Err(PathError::SecurityMismatch { expected, found }) => {
                tracing::warn!(path = raw, ?expected, %found, "Internal redirect host mismatch");
                Err(NavError::SecurityMismatch { expected, found })
            }
        }
    }

    fn resolve_local(
        &self,
        ctx: &RequestContext,
        canonical: &CanonicalPath,
    ) -> Result<Option<NavNode>, NavError> {
        if canonical.kind == PathKind::External {
            tracing::debug!(path = %canonical, "External path, skipping local lookup");
            return Ok(None);
        }

        let relative = scope::to_relative(&self.website, canonical);
        tracing::debug!(
            path = %relative.path,
            website_path = ?relative.query.get(WEBSITE_PATH_PARAM),
            "Website-relative lookup"
        );

        if let Some(page) = self.lookup.find_page(&self.website, &relative.path)? {
            return self.accessible(ctx, Record::Page(page));
        }
        if let Some(file) = self.lookup.find_file(&self.website, &relative.path)? {
            return self.accessible(ctx, Record::File(file));
        }
        if let Some(page) = self.page_by_query_id(&relative)? {
            return self.accessible(ctx, Record::Page(page));
        }
        Ok(None)
    }

    fn page_by_query_id(&self, canonical: &CanonicalPath) -> Result<Option<Page>, NavError> {
        let Some(id) = canonical
            .query
            .get(PAGE_ID_PARAM)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        else {
            return Ok(None);
        };
        Ok(self
            .store
            .find_pages_by_website(&self.website)?
            .into_iter()
            .find(|page| page.id == id && self.is_live(page)))
    }

    /// Build an `Ok` node and gate it through the access chain.
    fn accessible(&self, ctx: &RequestContext, record: Record) -> Result<Option<NavNode>, NavError> {
        let node = self.builder.build(ctx, &record, NodeStatus::Ok)?;
        if self.validators.access.validate(ctx, &node) {
            return Ok(Some(node));
        }
        tracing::debug!(url = %node.url, "Access denied");
        self.access_denied_node(ctx, &node.url)
    }

    fn marker_node(
        &self,
        ctx: &RequestContext,
        marker: SiteMarker,
        status: NodeStatus,
    ) -> Result<Option<NavNode>, NavError> {
        let Some(page) = self
            .store
            .find_page_by_site_marker(&self.website, marker)?
            .filter(|page| self.is_live(page))
        else {
            return Ok(None);
        };
        let node = self.builder.build_page_node(ctx, &page, status)?;
        Ok(self.validators.access.validate(ctx, &node).then_some(node))
    }

    fn owning_page(&self, node: &NavNode) -> Result<Option<Page>, NavError> {
        let path = node.url.split_once('?').map_or(node.url.as_str(), |(path, _)| path);
        let relative = scope::relative_path(&self.website, path);
        Ok(self.lookup.find_page(&self.website, relative)?)
    }

    fn local_children(&self, ctx: &RequestContext, node: &NavNode) -> Result<Vec<NavNode>, NavError> {
        if !matches!(node.record, Record::Page(_)) {
            return Ok(Vec::new());
        }
        let Some(page) = self.owning_page(node)? else {
            return Ok(Vec::new());
        };

        let pages = self
            .store
            .find_child_pages(&page)?
            .into_iter()
            .filter(|p| self.is_live(p))
            .map(Record::Page);
        let files_filtered = self.store.reports_state(EntityKind::File);
        let files = self
            .store
            .find_child_files(&page)?
            .into_iter()
            .filter(|f| !files_filtered || f.state.is_active())
            .map(Record::File);

        let mut children = Vec::new();
        for record in pages.chain(files) {
            let child = self.builder.build(ctx, &record, NodeStatus::Ok)?;
            if self.validators.listing.validate(ctx, &child) {
                children.push(child);
            }
        }
        Ok(children)
    }

    fn is_live(&self, page: &Page) -> bool {
        !self.store.reports_state(EntityKind::Page) || page.state.is_active()
    }

    fn federated(&self) -> Vec<Arc<dyn NavigationProvider>> {
        self.registry.upgrade().map_or_else(Vec::new, |registry| {
            registry
                .providers()
                .into_iter()
                .filter(|provider| provider.name() != self.name)
                .collect()
        })
    }
}

impl NavigationProvider for NavigationTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_local(&self, ctx: &RequestContext, raw: &str) -> Result<Option<NavNode>, NavError> {
        match self.canonicalize(ctx, raw)? {
            Some(canonical) => self.resolve_local(ctx, &canonical),
            None => Ok(None),
        }
    }

    fn children_local(
        &self,
        ctx: &RequestContext,
        node: &NavNode,
    ) -> Result<Vec<NavNode>, NavError> {
        self.local_children(ctx, node)
    }
}
