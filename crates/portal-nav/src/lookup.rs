//! Path-to-record lookup.
//!
//! [`ContentLookup`] resolves a website-relative path to the page or file it
//! names. [`RecursiveLookup`] peels segments off the right end of the path and
//! resolves each parent against live store data, issuing one child query per
//! segment. [`IndexedLookup`](crate::IndexedLookup) answers the same
//! questions from a cached path index.
//!
//! Lookups never translate website scope: callers strip the website prefix
//! once (see [`scope::to_relative`](crate::scope::to_relative)) and pass the
//! remainder. A segment that happens to equal the prefix is an ordinary
//! segment here.

use std::sync::Arc;

use portal_store::{EntityKind, EntityStore, File, Page, StoreError, Website};

/// Resolves website-relative paths to records.
///
/// Segment matching is case-insensitive. Inactive records are skipped
/// whenever the store reports record state for the entity kind.
pub trait ContentLookup: Send + Sync {
    /// Find the page at the website-relative `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a store query fails.
    fn find_page(&self, website: &Website, path: &str) -> Result<Option<Page>, StoreError>;

    /// Find the file at the website-relative `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a store query fails.
    fn find_file(&self, website: &Website, path: &str) -> Result<Option<File>, StoreError>;
}

/// `path` without a trailing slash (except `/`).
pub(crate) fn trim_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Split a rooted path at its final slash into parent path and last segment.
///
/// Returns `None` for `/` and for unrooted paths.
pub(crate) fn split_last(path: &str) -> Option<(&str, &str)> {
    let (parent, segment) = path.rsplit_once('/')?;
    if segment.is_empty() {
        return None;
    }
    Some((if parent.is_empty() { "/" } else { parent }, segment))
}

/// Segment-by-segment lookup against live store data.
pub struct RecursiveLookup {
    store: Arc<dyn EntityStore>,
}

impl RecursiveLookup {
    /// Create a lookup over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    fn resolve_page(
        &self,
        website_pages: &[Page],
        path: &str,
        filter_state: bool,
    ) -> Result<Option<Page>, StoreError> {
        if let Some(page) = website_pages.iter().find(|p| {
            p.partial_url.eq_ignore_ascii_case(path) && (!filter_state || p.state.is_active())
        }) {
            return Ok(Some(page.clone()));
        }

        let Some((parent_path, segment)) = split_last(path) else {
            return Ok(None);
        };
        let Some(parent) = self.resolve_page(website_pages, parent_path, filter_state)? else {
            return Ok(None);
        };

        Ok(self.store.find_child_pages(&parent)?.into_iter().find(|p| {
            p.partial_url.eq_ignore_ascii_case(segment) && (!filter_state || p.state.is_active())
        }))
    }
}

impl ContentLookup for RecursiveLookup {
    fn find_page(&self, website: &Website, path: &str) -> Result<Option<Page>, StoreError> {
        let path = trim_path(path);
        let website_pages = self.store.find_pages_by_website(website)?;
        let filter_state = self.store.reports_state(EntityKind::Page);

        let page = self.resolve_page(&website_pages, path, filter_state)?;
        tracing::debug!(path, found = page.is_some(), "Page lookup");
        Ok(page)
    }

    fn find_file(&self, website: &Website, path: &str) -> Result<Option<File>, StoreError> {
        let path = trim_path(path);
        let Some((parent_path, segment)) = split_last(path) else {
            return Ok(None);
        };
        let Some(parent) = self.find_page(website, parent_path)? else {
            return Ok(None);
        };
        let filter_state = self.store.reports_state(EntityKind::File);

        let file = self.store.find_child_files(&parent)?.into_iter().find(|f| {
            f.partial_url.eq_ignore_ascii_case(segment) && (!filter_state || f.state.is_active())
        });
        tracing::debug!(path, found = file.is_some(), "File lookup");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use portal_store::{MemoryStore, RecordState};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    struct Fixture {
        memory: Arc<MemoryStore>,
        website: Website,
        home: Page,
        about: Page,
        team: Page,
        logo: File,
    }

    fn fixture() -> Fixture {
        let website = Website {
            id: Uuid::new_v4(),
            name: "Portal".to_owned(),
            path_prefix: Some("mysite".to_owned()),
        };
        let home = Page::new(website.id, "/", "Home", None);
        let about = Page::new(website.id, "about", "About", Some(home.id));
        let team = Page::new(website.id, "team", "Team", Some(about.id));
        let logo = File::new(website.id, "logo.png", "Logo", about.id);
        let memory = Arc::new(
            MemoryStore::new()
                .with_website(website.clone())
                .with_page(home.clone())
                .with_page(about.clone())
                .with_page(team.clone())
                .with_file(logo.clone()),
        );
        Fixture {
            memory,
            website,
            home,
            about,
            team,
            logo,
        }
    }

    fn lookup(f: &Fixture) -> RecursiveLookup {
        let store = Arc::clone(&f.memory) as Arc<dyn EntityStore>;
        RecursiveLookup::new(store)
    }

    #[test]
    fn test_split_last() {
        assert_eq!(split_last("/about/team"), Some(("/about", "team")));
        assert_eq!(split_last("/about"), Some(("/", "about")));
        assert_eq!(split_last("/"), None);
        assert_eq!(split_last("about"), None);
    }

    #[test]
    fn test_find_page_root() {
        let f = fixture();

        let page = lookup(&f).find_page(&f.website, "/").unwrap();

        assert_eq!(page.map(|p| p.id), Some(f.home.id));
    }

    #[test]
    fn test_find_page_nested_case_insensitive() {
        let f = fixture();

        let page = lookup(&f).find_page(&f.website, "/About/TEAM").unwrap();

        assert_eq!(page.map(|p| p.id), Some(f.team.id));
    }

    #[test]
    fn test_find_page_trailing_slash() {
        let f = fixture();

        let page = lookup(&f).find_page(&f.website, "/about/").unwrap();

        assert_eq!(page.map(|p| p.id), Some(f.about.id));
    }

    #[test]
    fn test_find_page_prefix_is_an_ordinary_segment() {
        let f = fixture();

        let page = lookup(&f).find_page(&f.website, "/mysite/about").unwrap();

        assert!(page.is_none());
    }

    #[test]
    fn test_find_page_missing_segment_is_none() {
        let f = fixture();

        let page = lookup(&f).find_page(&f.website, "/about/bogus").unwrap();

        assert!(page.is_none());
    }

    #[test]
    fn test_find_page_missing_parent_is_none() {
        let f = fixture();

        let page = lookup(&f).find_page(&f.website, "/bogus/team").unwrap();

        assert!(page.is_none());
    }

    #[test]
    fn test_find_page_rooted_partial_url_matches_full_path() {
        let f = fixture();
        let mut landing = Page::new(f.website.id, "/campaigns/spring", "Spring", Some(f.home.id));
        landing.display_order = Some(1);
        f.memory.upsert_page(landing.clone());

        let page = lookup(&f)
            .find_page(&f.website, "/campaigns/spring")
            .unwrap();

        assert_eq!(page.map(|p| p.id), Some(landing.id));
    }

    #[test]
    fn test_find_page_skips_inactive() {
        let f = fixture();
        let mut about = f.about.clone();
        about.state = RecordState::Inactive;
        f.memory.upsert_page(about);

        assert!(lookup(&f).find_page(&f.website, "/about").unwrap().is_none());
        assert!(
            lookup(&f)
                .find_page(&f.website, "/about/team")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_find_page_without_state_reporting_keeps_inactive() {
        let website = Website {
            id: Uuid::new_v4(),
            name: "Portal".to_owned(),
            path_prefix: None,
        };
        let home = Page::new(website.id, "/", "Home", None);
        let mut archived = Page::new(website.id, "archive", "Archive", Some(home.id));
        archived.state = RecordState::Inactive;
        let store: Arc<dyn EntityStore> = Arc::new(
            MemoryStore::new()
                .with_page(home)
                .with_page(archived.clone())
                .without_state_reporting(EntityKind::Page),
        );

        let page = RecursiveLookup::new(store)
            .find_page(&website, "/archive")
            .unwrap();

        assert_eq!(page.map(|p| p.id), Some(archived.id));
    }

    #[test]
    fn test_find_page_first_matching_sibling_wins() {
        let f = fixture();
        let duplicate = Page::new(f.website.id, "TEAM", "Team copy", Some(f.about.id));
        f.memory.upsert_page(duplicate);

        let page = lookup(&f).find_page(&f.website, "/about/team").unwrap();

        assert_eq!(page.map(|p| p.id), Some(f.team.id));
    }

    #[test]
    fn test_find_page_is_idempotent() {
        let f = fixture();
        let lookup = lookup(&f);

        let first = lookup.find_page(&f.website, "/about/team").unwrap();
        let second = lookup.find_page(&f.website, "/about/team").unwrap();

        assert_eq!(first.map(|p| p.id), second.map(|p| p.id));
    }

    #[test]
    fn test_find_page_queries_once_per_segment() {
        let f = fixture();
        let lookup = lookup(&f);
        let before = f.memory.query_count();

        lookup.find_page(&f.website, "/about/team").unwrap();

        // website pages + one child query per segment
        assert_eq!(f.memory.query_count() - before, 3);
    }

    #[test]
    fn test_find_file() {
        let f = fixture();

        let file = lookup(&f).find_file(&f.website, "/about/Logo.PNG").unwrap();

        assert_eq!(file.map(|f| f.id), Some(f.logo.id));
    }

    #[test]
    fn test_find_file_is_not_a_page() {
        let f = fixture();

        assert!(lookup(&f).find_page(&f.website, "/about/logo.png").unwrap().is_none());
        assert!(lookup(&f).find_file(&f.website, "/about/team").unwrap().is_none());
        assert!(lookup(&f).find_file(&f.website, "/").unwrap().is_none());
    }

    #[test]
    fn test_find_file_under_root_named_like_prefix_is_none() {
        let f = fixture();
        let report = File::new(f.website.id, "x.pdf", "Report", f.home.id);
        f.memory.upsert_file(report);

        let file = lookup(&f).find_file(&f.website, "/mysite/x.pdf").unwrap();

        assert!(file.is_none());
    }

    #[test]
    fn test_find_file_under_page_named_like_prefix() {
        let f = fixture();
        let nested = Page::new(f.website.id, "mysite", "My Site", Some(f.home.id));
        let report = File::new(f.website.id, "x.pdf", "Report", nested.id);
        f.memory.upsert_page(nested);
        f.memory.upsert_file(report.clone());

        let file = lookup(&f).find_file(&f.website, "/mysite/x.pdf").unwrap();

        assert_eq!(file.map(|f| f.id), Some(report.id));
    }

    #[test]
    fn test_trim_path() {
        assert_eq!(trim_path("/about/"), "/about");
        assert_eq!(trim_path("/"), "/");
        assert_eq!(trim_path("//"), "/");
        assert_eq!(trim_path(""), "");
    }
}
