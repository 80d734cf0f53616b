//! Cached path index lookup.
//!
//! [`IndexedLookup`] materializes every resolvable page and file path of a
//! website once and answers lookups from the in-memory map. It resolves the
//! same paths to the same records as [`RecursiveLookup`](crate::RecursiveLookup)
//! as long as the store has not changed since the index was built.
//!
//! # Thread Safety
//!
//! - Index snapshots are shared as `Arc<PathIndex>`
//! - Rebuilds are serialized by a `Mutex<()>` with a double-checked generation
//! - `invalidate()` is lock-free (atomic generation counter)
//! - An index is tagged with the generation read before its build started, so
//!   an invalidation that lands mid-build leaves the result stale

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use portal_store::{EntityKind, EntityStore, File, Page, StoreError, Website};
use uuid::Uuid;

use crate::lookup::{ContentLookup, trim_path};

/// Resolved paths of one website, keyed by lowercase website-relative path.
#[derive(Debug, Default)]
pub struct PathIndex {
    pages: HashMap<String, Page>,
    files: HashMap<String, File>,
}

impl PathIndex {
    /// Build the index for a website from the store.
    ///
    /// Pages with a rooted segment are indexed under that segment. Every
    /// other page is indexed under its parent's indexed path plus its own
    /// segment; the first sibling wins a shared path and rooted pages win
    /// over hierarchical ones. Inactive records (and everything below an
    /// inactive page) are left out when the store reports state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a store query fails.
    pub fn build(store: &dyn EntityStore, website: &Website) -> Result<Self, StoreError> {
        let pages = store.find_pages_by_website(website)?;
        let files = store.find_files_by_website(website)?;
        let pages_active = |p: &Page| !store.reports_state(EntityKind::Page) || p.state.is_active();
        let files_active = |f: &File| !store.reports_state(EntityKind::File) || f.state.is_active();

        let mut index = Self::default();
        let mut page_paths: HashMap<Uuid, String> = HashMap::new();
        let mut queue = VecDeque::new();

        for page in pages.iter().filter(|p| p.partial_url.starts_with('/')) {
            if !pages_active(page) {
                continue;
            }
            let key = page.partial_url.to_ascii_lowercase();
            if !index.pages.contains_key(&key) {
                index.pages.insert(key.clone(), page.clone());
                queue.push_back((key, page.id));
            }
        }

        let mut children: HashMap<Uuid, Vec<&Page>> = HashMap::new();
        for page in pages
            .iter()
            .filter(|p| !p.partial_url.starts_with('/') && pages_active(p))
        {
            if let Some(parent_id) = page.parent_page_id {
                children.entry(parent_id).or_default().push(page);
            }
        }

        let mut visited = HashSet::new();
        while let Some((path, page_id)) = queue.pop_front() {
            if !visited.insert(page_id) {
                tracing::warn!(page = %page_id, %path, "Page hierarchy cycle, skipping subtree");
                continue;
            }
            for child in children.get(&page_id).into_iter().flatten() {
                let key = join(&path, &child.partial_url.to_ascii_lowercase());
                if index.pages.contains_key(&key) {
                    continue;
                }
                index.pages.insert(key.clone(), (*child).clone());
                queue.push_back((key, child.id));
            }
            page_paths.insert(page_id, path);
        }

        for file in files.iter().filter(|f| files_active(f)) {
            let Some(parent_path) = page_paths.get(&file.parent_page_id) else {
                continue;
            };
            let key = join(parent_path, &file.partial_url.to_ascii_lowercase());
            index.files.entry(key).or_insert_with(|| file.clone());
        }

        Ok(index)
    }

    /// Number of indexed pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of indexed files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn page(&self, path: &str) -> Option<&Page> {
        self.pages.get(&path.to_ascii_lowercase())
    }

    fn file(&self, path: &str) -> Option<&File> {
        self.files.get(&path.to_ascii_lowercase())
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

/// Lookup answering from a per-website cached [`PathIndex`].
pub struct IndexedLookup {
    store: Arc<dyn EntityStore>,
    /// Mutex for serializing rebuilds.
    rebuild_lock: Mutex<()>,
    /// Index snapshots by website id, with the generation they belong to.
    indexes: RwLock<HashMap<Uuid, (u64, Arc<PathIndex>)>>,
    /// Bumped by every invalidation.
    generation: AtomicU64,
}

impl IndexedLookup {
    /// Create an indexed lookup over a store. The index is built on first use.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            rebuild_lock: Mutex::new(()),
            indexes: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Mark all cached indexes stale. The next lookup rebuilds.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn cached(&self, website_id: Uuid, generation: u64) -> Option<Arc<PathIndex>> {
        self.indexes
            .read()
            .unwrap()
            .get(&website_id)
            .filter(|(built, _)| *built == generation)
            .map(|(_, index)| Arc::clone(index))
    }

    /// Current index for a website, building it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if building the index fails.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn index(&self, website: &Website) -> Result<Arc<PathIndex>, StoreError> {
        // Fast path: website indexed in the current generation
        if let Some(index) = self.cached(website.id, self.generation.load(Ordering::Acquire)) {
            return Ok(index);
        }

        let _guard = self.rebuild_lock.lock().unwrap();

        let generation = self.generation.load(Ordering::Acquire);
        if let Some(index) = self.cached(website.id, generation) {
            return Ok(index);
        }

        let index = Arc::new(PathIndex::build(self.store.as_ref(), website)?);
        tracing::info!(
            website = %website.name,
            generation,
            pages = index.page_count(),
            files = index.file_count(),
            "Built path index"
        );
        let mut indexes = self.indexes.write().unwrap();
        indexes.retain(|_, (built, _)| *built == generation);
        indexes.insert(website.id, (generation, Arc::clone(&index)));

        Ok(index)
    }
}

impl ContentLookup for IndexedLookup {
    fn find_page(&self, website: &Website, path: &str) -> Result<Option<Page>, StoreError> {
        let index = self.index(website)?;
        Ok(index.page(trim_path(path)).cloned())
    }

    fn find_file(&self, website: &Website, path: &str) -> Result<Option<File>, StoreError> {
        let index = self.index(website)?;
        Ok(index.file(trim_path(path)).cloned())
    }
}
