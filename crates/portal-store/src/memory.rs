//! In-memory store implementation.
//!
//! Provides [`MemoryStore`] for tests, the CLI and small deployments that
//! keep their content in a YAML fixture.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{
    Attachment, EntityKind, File, Page, PageTemplate, SiteMarker, SiteMarkerBinding, Website,
};
use crate::store::{EntityStore, StoreError, StoreErrorKind};

/// Backend identifier for error messages.
const BACKEND: &str = "Memory";

/// Attachment entry in a fixture, keyed by the owning file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureAttachment {
    /// File the resource is attached to.
    pub file_id: Uuid,
    /// The resource itself.
    #[serde(flatten)]
    pub attachment: Attachment,
}

/// Serialized store content.
///
/// # Example
///
/// ```yaml
/// websites:
///   - id: 0b6f6c3e-0000-4000-8000-000000000001
///     name: Portal
///     path_prefix: mysite
/// pages:
///   - id: 0b6f6c3e-0000-4000-8000-000000000010
///     website_id: 0b6f6c3e-0000-4000-8000-000000000001
///     partial_url: /
///     title: Home
/// markers:
///   - website_id: 0b6f6c3e-0000-4000-8000-000000000001
///     marker: Home
///     page_id: 0b6f6c3e-0000-4000-8000-000000000010
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Websites.
    pub websites: Vec<Website>,
    /// Pages of all websites.
    pub pages: Vec<Page>,
    /// Files of all websites.
    pub files: Vec<File>,
    /// Page templates.
    pub templates: Vec<PageTemplate>,
    /// File attachments.
    pub attachments: Vec<FixtureAttachment>,
    /// Marker role bindings.
    pub markers: Vec<SiteMarkerBinding>,
}

/// In-memory entity store.
///
/// Stores records in insertion order. Use the builder methods to populate
/// it, or load a [`Fixture`] from YAML.
///
/// Every trait query increments a counter readable via
/// [`MemoryStore::query_count`], which lets callers observe round-trip
/// patterns.
///
/// # Example
///
/// ```ignore
/// use portal_store::{MemoryStore, Page, Website};
///
/// let website = Website { id: Uuid::new_v4(), name: "Portal".into(), path_prefix: None };
/// let home = Page::new(website.id, "/", "Home", None);
/// let store = MemoryStore::new()
///     .with_website(website.clone())
///     .with_page(home.clone())
///     .with_marker(website.id, SiteMarker::Home, home.id);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    websites: RwLock<Vec<Website>>,
    pages: RwLock<Vec<Page>>,
    files: RwLock<Vec<File>>,
    templates: RwLock<HashMap<Uuid, PageTemplate>>,
    attachments: RwLock<HashMap<Uuid, Attachment>>,
    markers: RwLock<Vec<SiteMarkerBinding>>,
    stateless_kinds: RwLock<HashSet<EntityKind>>,
    queries: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from fixture content.
    #[must_use]
    pub fn from_fixture(fixture: Fixture) -> Self {
        Self {
            websites: RwLock::new(fixture.websites),
            pages: RwLock::new(fixture.pages),
            files: RwLock::new(fixture.files),
            templates: RwLock::new(fixture.templates.into_iter().map(|t| (t.id, t)).collect()),
            attachments: RwLock::new(
                fixture
                    .attachments
                    .into_iter()
                    .map(|a| (a.file_id, a.attachment))
                    .collect(),
            ),
            markers: RwLock::new(fixture.markers),
            stateless_kinds: RwLock::new(HashSet::new()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Parse a YAML fixture.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] with [`StoreErrorKind::InvalidData`] if the YAML
    /// does not describe a [`Fixture`].
    pub fn from_yaml_str(yaml: &str) -> Result<Self, StoreError> {
        let fixture: Fixture = serde_yaml::from_str(yaml).map_err(|e| {
            StoreError::new(StoreErrorKind::InvalidData)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        tracing::debug!(
            websites = fixture.websites.len(),
            pages = fixture.pages.len(),
            files = fixture.files.len(),
            "Loaded store fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    /// Load a YAML fixture from disk.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let entity = || format!("fixture {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::io(e, Some(entity())).with_backend(BACKEND))?;
        Self::from_yaml_str(&content).map_err(|e| e.with_entity(entity()))
    }

    /// Add a website.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_website(self, website: Website) -> Self {
        self.websites.write().unwrap().push(website);
        self
    }

    /// Add a page.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, page: Page) -> Self {
        self.pages.write().unwrap().push(page);
        self
    }

    /// Add a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, file: File) -> Self {
        self.files.write().unwrap().push(file);
        self
    }

    /// Add a page template.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_template(self, template: PageTemplate) -> Self {
        self.templates
            .write()
            .unwrap()
            .insert(template.id, template);
        self
    }

    /// Attach a binary resource to a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_attachment(self, file_id: Uuid, attachment: Attachment) -> Self {
        self.attachments
            .write()
            .unwrap()
            .insert(file_id, attachment);
        self
    }

    /// Bind a marker role to a page.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_marker(self, website_id: Uuid, marker: SiteMarker, page_id: Uuid) -> Self {
        self.markers.write().unwrap().push(SiteMarkerBinding {
            website_id,
            marker,
            page_id,
        });
        self
    }

    /// Stop reporting activation state for an entity type.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn without_state_reporting(self, kind: EntityKind) -> Self {
        self.stateless_kinds.write().unwrap().insert(kind);
        self
    }

    /// Insert a page or replace the page with the same id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn upsert_page(&self, page: Page) {
        let mut pages = self.pages.write().unwrap();
        match pages.iter_mut().find(|p| p.id == page.id) {
            Some(existing) => *existing = page,
            None => pages.push(page),
        }
    }

    /// Insert a file or replace the file with the same id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn upsert_file(&self, file: File) {
        let mut files = self.files.write().unwrap();
        match files.iter_mut().find(|f| f.id == file.id) {
            Some(existing) => *existing = file,
            None => files.push(file),
        }
    }

    /// Number of trait queries served so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }
}

impl EntityStore for MemoryStore {
    fn find_website(&self, name: &str) -> Result<Option<Website>, StoreError> {
        self.record_query();
        Ok(self
            .websites
            .read()
            .unwrap()
            .iter()
            .find(|w| w.name == name)
            .cloned())
    }

    fn find_pages_by_website(&self, website: &Website) -> Result<Vec<Page>, StoreError> {
        self.record_query();
        Ok(self
            .pages
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.website_id == website.id)
            .cloned()
            .collect())
    }

    fn find_files_by_website(&self, website: &Website) -> Result<Vec<File>, StoreError> {
        self.record_query();
        Ok(self
            .files
            .read()
            .unwrap()
            .iter()
            .filter(|f| f.website_id == website.id)
            .cloned()
            .collect())
    }

    fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
        self.record_query();
        Ok(self
            .pages
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    fn find_child_pages(&self, page: &Page) -> Result<Vec<Page>, StoreError> {
        self.record_query();
        Ok(self
            .pages
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.parent_page_id == Some(page.id))
            .cloned()
            .collect())
    }

    fn find_child_files(&self, page: &Page) -> Result<Vec<File>, StoreError> {
        self.record_query();
        Ok(self
            .files
            .read()
            .unwrap()
            .iter()
            .filter(|f| f.parent_page_id == page.id)
            .cloned()
            .collect())
    }

    fn find_page_by_site_marker(
        &self,
        website: &Website,
        marker: SiteMarker,
    ) -> Result<Option<Page>, StoreError> {
        self.record_query();
        let page_id = self
            .markers
            .read()
            .unwrap()
            .iter()
            .find(|b| b.website_id == website.id && b.marker == marker)
            .map(|b| b.page_id);
        let Some(page_id) = page_id else {
            return Ok(None);
        };
        Ok(self
            .pages
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == page_id && p.website_id == website.id)
            .cloned())
    }

    fn find_page_template(&self, id: Uuid) -> Result<Option<PageTemplate>, StoreError> {
        self.record_query();
        Ok(self.templates.read().unwrap().get(&id).cloned())
    }

    fn find_attachment(&self, file: &File) -> Result<Option<Attachment>, StoreError> {
        self.record_query();
        Ok(self.attachments.read().unwrap().get(&file.id).cloned())
    }

    fn reports_state(&self, kind: EntityKind) -> bool {
        !self.stateless_kinds.read().unwrap().contains(&kind)
    }
}
