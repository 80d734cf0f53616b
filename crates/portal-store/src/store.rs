//! Entity store trait and error types.
//!
//! Provides the core [`EntityStore`] trait for the queries the navigation
//! engine issues, along with [`StoreError`] for unified error handling
//! across backends.
//!
//! # Query Shape
//!
//! Every method is a single round trip against the backing store. The
//! engine composes them; no method walks the page hierarchy on its own.

use uuid::Uuid;

use crate::record::{Attachment, EntityKind, File, Page, PageTemplate, SiteMarker, Website};

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// Entity does not exist.
    NotFound,
    /// Store rejected the query for the current credentials.
    PermissionDenied,
    /// Stored data could not be decoded into a record.
    InvalidData,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Query timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance for the store's own client.
#[derive(Debug, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (bad data, missing entity).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (service unavailable).
    Persistent,
}

/// Store error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StoreError {
    /// Semantic error category.
    pub kind: StoreErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Entity context (e.g. `"page 6a1f…"`, `"fixture site.yaml"`).
    pub entity: Option<String>,
    /// Backend identifier (e.g. `"Memory"`).
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Create a new store error.
    #[must_use]
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            entity: None,
            backend: None,
            source: None,
        }
    }

    /// Attach entity context.
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error for an entity.
    #[must_use]
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound).with_entity(entity)
    }

    /// Create a store error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, entity: Option<String>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StoreErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StoreErrorKind::PermissionDenied,
            std::io::ErrorKind::TimedOut => StoreErrorKind::Timeout,
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotConnected => {
                StoreErrorKind::Unavailable
            }
            _ => StoreErrorKind::Other,
        };
        let status = match err.kind() {
            std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted => ErrorStatus::Temporary,
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotConnected => {
                ErrorStatus::Persistent
            }
            _ => ErrorStatus::Permanent,
        };
        let mut error = Self::new(kind).with_status(status).with_source(err);
        if let Some(e) = entity {
            error = error.with_entity(e);
        }
        error
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (entity: page 42)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StoreErrorKind::NotFound => "Not found",
            StoreErrorKind::PermissionDenied => "Permission denied",
            StoreErrorKind::InvalidData => "Invalid data",
            StoreErrorKind::Unavailable => "Unavailable",
            StoreErrorKind::Timeout => "Timeout",
            StoreErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(entity) = &self.entity {
            write!(f, " (entity: {entity})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Query surface of the remote entity store.
///
/// Implementations return owned records; callers never observe a live
/// session. Record lists come back in store order, unfiltered: inactive
/// records are included and the caller decides whether to drop them (see
/// [`EntityStore::reports_state`]).
pub trait EntityStore: Send + Sync {
    /// Look up a website by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_website(&self, name: &str) -> Result<Option<Website>, StoreError>;

    /// All pages linked to a website.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_pages_by_website(&self, website: &Website) -> Result<Vec<Page>, StoreError>;

    /// All files linked to a website.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_files_by_website(&self, website: &Website) -> Result<Vec<File>, StoreError>;

    /// Look up a page by id (parent-page relationship traversal).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError>;

    /// Direct child pages of a page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_child_pages(&self, page: &Page) -> Result<Vec<Page>, StoreError>;

    /// Direct child files of a page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_child_files(&self, page: &Page) -> Result<Vec<File>, StoreError>;

    /// Page carrying a marker role on a website.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_page_by_site_marker(
        &self,
        website: &Website,
        marker: SiteMarker,
    ) -> Result<Option<Page>, StoreError>;

    /// Page template by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_page_template(&self, id: Uuid) -> Result<Option<PageTemplate>, StoreError>;

    /// Binary resource attached to a file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_attachment(&self, file: &File) -> Result<Option<Attachment>, StoreError>;

    /// Whether the store reports activation state for an entity type.
    ///
    /// When `false`, the `state` field of that type carries no meaning and
    /// callers must not filter on it.
    fn reports_state(&self, _kind: EntityKind) -> bool {
        true
    }
}
