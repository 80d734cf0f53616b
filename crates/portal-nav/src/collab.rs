//! Collaborator contracts consumed by the engine, with default implementations.
//!
//! - [`SecurityOracle`]: yes/no read check ([`RoleOracle`], [`AllowAllOracle`])
//! - [`ContentFormatter`]: title/summary formatting ([`PlainFormatter`])
//! - [`UrlBuilder`]: public URL of a record ([`HierarchyUrlBuilder`])
//! - [`AttachmentProvider`]: file attachment info ([`StoreAttachmentProvider`])

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_store::{EntityStore, File, Page, Record, StoreError, StoreErrorKind, Website};

use crate::context::RequestContext;
use crate::scope;

/// Read-right check for a record.
pub trait SecurityOracle: Send + Sync {
    /// Whether the requester may read the record.
    fn can_read(&self, ctx: &RequestContext, record: &Record) -> bool;
}

/// Oracle granting read access to everything.
pub struct AllowAllOracle;

impl SecurityOracle for AllowAllOracle {
    fn can_read(&self, _ctx: &RequestContext, _record: &Record) -> bool {
        true
    }
}

/// Role-based oracle driven by each page's `read_roles`.
///
/// A page with no read roles is public. Otherwise the requester must hold
/// one of the roles; every authenticated requester implicitly holds the
/// configured authenticated role. Files are checked against their parent
/// page. Store failures deny access.
pub struct RoleOracle {
    store: Arc<dyn EntityStore>,
    authenticated_role: String,
}

impl RoleOracle {
    /// Create a role oracle.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, authenticated_role: impl Into<String>) -> Self {
        Self {
            store,
            authenticated_role: authenticated_role.into(),
        }
    }

    fn can_read_page(&self, ctx: &RequestContext, page: &Page) -> bool {
        if page.read_roles.is_empty() {
            return true;
        }
        page.read_roles.iter().any(|role| {
            ctx.has_role(role)
                || (ctx.is_authenticated() && role.eq_ignore_ascii_case(&self.authenticated_role))
        })
    }
}

impl SecurityOracle for RoleOracle {
    fn can_read(&self, ctx: &RequestContext, record: &Record) -> bool {
        match record {
            Record::Page(page) => self.can_read_page(ctx, page),
            Record::File(file) => match self.store.find_page(file.parent_page_id) {
                Ok(Some(parent)) => self.can_read_page(ctx, &parent),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(file = %file.id, error = %e, "Failed to load parent page for read check");
                    false
                }
            },
        }
    }
}

/// Formats raw record text for display.
pub trait ContentFormatter: Send + Sync {
    /// Format `text` taken from `record`.
    fn format(&self, text: &str, record: &Record, ctx: &RequestContext) -> String;
}

/// Identity formatter.
pub struct PlainFormatter;

impl ContentFormatter for PlainFormatter {
    fn format(&self, text: &str, _record: &Record, _ctx: &RequestContext) -> String {
        text.to_owned()
    }
}

/// Computes the public URL of a record.
pub trait UrlBuilder: Send + Sync {
    /// Public URL of `record` on `website`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a relationship lookup fails.
    fn url(&self, website: &Website, record: &Record) -> Result<String, StoreError>;
}

/// URL builder joining path segments up the parent chain.
///
/// A page whose segment is itself rooted (the Home page's `/`) ends the walk.
/// The result carries the website prefix.
pub struct HierarchyUrlBuilder {
    store: Arc<dyn EntityStore>,
}

impl HierarchyUrlBuilder {
    /// Create a URL builder over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    fn page_path(&self, page: &Page) -> Result<String, StoreError> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut current = page.clone();
        loop {
            if !seen.insert(current.id) {
                return Err(StoreError::new(StoreErrorKind::InvalidData)
                    .with_entity(format!("page {} (parent cycle)", page.id)));
            }
            if current.partial_url.starts_with('/') {
                let base = current.partial_url.trim_end_matches('/');
                segments.reverse();
                let tail = segments.join("/");
                return Ok(match (base.is_empty(), tail.is_empty()) {
                    (true, true) => "/".to_owned(),
                    (true, false) => format!("/{tail}"),
                    (false, true) => base.to_owned(),
                    (false, false) => format!("{base}/{tail}"),
                });
            }
            segments.push(current.partial_url.trim_matches('/').to_owned());
            let Some(parent_id) = current.parent_page_id else {
                segments.reverse();
                return Ok(format!("/{}", segments.join("/")));
            };
            current = self
                .store
                .find_page(parent_id)?
                .ok_or_else(|| StoreError::not_found(format!("page {parent_id}")))?;
        }
    }

    fn file_path(&self, file: &File) -> Result<String, StoreError> {
        let parent = self
            .store
            .find_page(file.parent_page_id)?
            .ok_or_else(|| StoreError::not_found(format!("page {}", file.parent_page_id)))?;
        let parent_path = self.page_path(&parent)?;
        let segment = file.partial_url.trim_matches('/');
        Ok(if parent_path == "/" {
            format!("/{segment}")
        } else {
            format!("{parent_path}/{segment}")
        })
    }
}

impl UrlBuilder for HierarchyUrlBuilder {
    fn url(&self, website: &Website, record: &Record) -> Result<String, StoreError> {
        let path = match record {
            Record::Page(page) => self.page_path(page)?,
            Record::File(file) => self.file_path(file)?,
        };
        Ok(scope::to_absolute(website, &path))
    }
}

/// Attachment location and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// URL the resource is served from.
    pub url: String,
    /// Resource modification time.
    pub last_modified: DateTime<Utc>,
}

/// Looks up the binary resource attached to a file.
pub trait AttachmentProvider: Send + Sync {
    /// Attachment info, `None` when nothing is attached.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    fn attachment(&self, file: &File) -> Result<Option<AttachmentInfo>, StoreError>;
}

/// Attachment provider reading from the entity store.
pub struct StoreAttachmentProvider {
    store: Arc<dyn EntityStore>,
}

impl StoreAttachmentProvider {
    /// Create a provider over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

impl AttachmentProvider for StoreAttachmentProvider {
    fn attachment(&self, file: &File) -> Result<Option<AttachmentInfo>, StoreError> {
        Ok(self.store.find_attachment(file)?.map(|a| AttachmentInfo {
            url: a.url,
            last_modified: a.modified_on,
        }))
    }
}
