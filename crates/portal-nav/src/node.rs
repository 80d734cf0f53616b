//! Navigation nodes and their construction.
//!
//! A [`NavNode`] is built per resolution call from an owned [`Record`]
//! snapshot. It carries everything a renderer needs (public URL, internal
//! rewrite target, display text, status) and holds no reference back into
//! the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_store::{EntityStore, File, Page, Record, StoreError, Website};
use serde::Serialize;

use crate::collab::{AttachmentProvider, ContentFormatter, UrlBuilder};
use crate::context::RequestContext;
use crate::path::append_query_param;

/// Query parameter carrying the page id on a template rewrite target.
pub const PAGE_ID_PARAM: &str = "pageid";

/// HTTP-like status classification of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeStatus {
    /// Record resolved and is accessible.
    Ok,
    /// Nothing usable resolved.
    NotFound,
    /// Record resolved but the requester may not see it.
    Forbidden,
}

impl NodeStatus {
    /// HTTP status code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
            Self::Forbidden => 403,
        }
    }
}

/// Immutable navigation node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavNode {
    /// Node key (the record id).
    pub key: String,
    /// Canonical public URL, including the website prefix.
    pub url: String,
    /// Internal rewrite target, if the record renders through one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_url: Option<String>,
    /// Formatted title.
    pub title: String,
    /// Formatted summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Status classification.
    pub status: NodeStatus,
    /// Detached snapshot of the originating record.
    pub record: Record,
}

impl NavNode {
    /// HTTP status code of the node.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    /// Sort position among siblings.
    #[must_use]
    pub fn display_order(&self) -> Option<i32> {
        self.record.display_order()
    }

    /// Copy of the node with a query parameter appended to its URL.
    #[must_use]
    pub fn with_query_param(mut self, key: &str, value: &str) -> Self {
        self.url = append_query_param(&self.url, key, value);
        self
    }
}

/// Sort nodes by display order.
///
/// Ordered nodes come first in ascending order; nodes without a display
/// order trail. The sort is stable, so ties keep discovery order.
pub fn sort_by_display_order(nodes: &mut [NavNode]) {
    nodes.sort_by_key(|node| {
        let order = node.display_order();
        (order.is_none(), order)
    });
}

/// Builds [`NavNode`] values from records.
///
/// Node construction issues at most one store query of its own: the
/// page-template lookup for pages, or the attachment lookup for files.
/// Anything else goes through the injected collaborators.
pub struct NodeBuilder {
    website: Website,
    store: Arc<dyn EntityStore>,
    urls: Arc<dyn UrlBuilder>,
    formatter: Arc<dyn ContentFormatter>,
    attachments: Arc<dyn AttachmentProvider>,
}

impl NodeBuilder {
    /// Create a node builder for a website.
    #[must_use]
    pub fn new(
        website: Website,
        store: Arc<dyn EntityStore>,
        urls: Arc<dyn UrlBuilder>,
        formatter: Arc<dyn ContentFormatter>,
        attachments: Arc<dyn AttachmentProvider>,
    ) -> Self {
        Self {
            website,
            store,
            urls,
            formatter,
            attachments,
        }
    }

    /// Replace the URL builder.
    #[must_use]
    pub fn with_url_builder(mut self, urls: Arc<dyn UrlBuilder>) -> Self {
        self.urls = urls;
        self
    }

    /// Replace the content formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn ContentFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Replace the attachment provider.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentProvider>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Build a node for any record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a relationship lookup fails.
    pub fn build(
        &self,
        ctx: &RequestContext,
        record: &Record,
        status: NodeStatus,
    ) -> Result<NavNode, StoreError> {
        match record {
            Record::Page(page) => self.build_page_node(ctx, page, status),
            Record::File(file) => self.build_file_node(ctx, file, status),
        }
    }

    /// Build a page node.
    ///
    /// The rewrite target is the page template's rewrite URL with the page id
    /// appended as [`PAGE_ID_PARAM`]. Pages without a template (or with a
    /// dangling template reference) get no rewrite target.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL or template lookup fails.
    pub fn build_page_node(
        &self,
        ctx: &RequestContext,
        page: &Page,
        status: NodeStatus,
    ) -> Result<NavNode, StoreError> {
        let record = Record::Page(page.clone());
        let rewrite_url = match page.template_id {
            Some(template_id) => self.store.find_page_template(template_id)?.map(|t| {
                append_query_param(&t.rewrite_url, PAGE_ID_PARAM, &page.id.to_string())
            }),
            None => None,
        };

        Ok(NavNode {
            key: page.id.to_string(),
            url: self.urls.url(&self.website, &record)?,
            rewrite_url,
            title: self.formatter.format(&page.title, &record, ctx),
            summary: self.format_summary(ctx, &record),
            last_modified: page.modified_on,
            status,
            record,
        })
    }

    /// Build a file node.
    ///
    /// The rewrite target is the attachment URL and the timestamp is the
    /// attachment's. A file without an attachment always yields a
    /// [`NodeStatus::NotFound`] node, whatever `status` was requested.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL or attachment lookup fails.
    pub fn build_file_node(
        &self,
        ctx: &RequestContext,
        file: &File,
        status: NodeStatus,
    ) -> Result<NavNode, StoreError> {
        let record = Record::File(file.clone());
        let url = self.urls.url(&self.website, &record)?;
        let (rewrite_url, last_modified, status) = match self.attachments.attachment(file)? {
            Some(info) => (Some(info.url), info.last_modified, status),
            None => {
                tracing::debug!(file = %file.id, "File has no attachment");
                (None, file.modified_on, NodeStatus::NotFound)
            }
        };

        Ok(NavNode {
            key: file.id.to_string(),
            url,
            rewrite_url,
            title: self.formatter.format(&file.title, &record, ctx),
            summary: self.format_summary(ctx, &record),
            last_modified,
            status,
            record,
        })
    }

    fn format_summary(&self, ctx: &RequestContext, record: &Record) -> Option<String> {
        record
            .summary()
            .map(|summary| self.formatter.format(summary, record, ctx))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use portal_store::{Attachment, MemoryStore, PageTemplate};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;
    use crate::collab::{HierarchyUrlBuilder, PlainFormatter, StoreAttachmentProvider};

    struct UpperFormatter;

    impl ContentFormatter for UpperFormatter {
        fn format(&self, text: &str, _record: &Record, _ctx: &RequestContext) -> String {
            text.to_uppercase()
        }
    }

    fn website() -> Website {
        Website {
            id: Uuid::new_v4(),
            name: "Portal".to_owned(),
            path_prefix: Some("mysite".to_owned()),
        }
    }

    fn builder(website: &Website, store: Arc<dyn EntityStore>) -> NodeBuilder {
        NodeBuilder::new(
            website.clone(),
            Arc::clone(&store),
            Arc::new(HierarchyUrlBuilder::new(Arc::clone(&store))),
            Arc::new(PlainFormatter),
            Arc::new(StoreAttachmentProvider::new(store)),
        )
    }

    fn node_with_order(order: Option<i32>, title: &str) -> NavNode {
        let mut page = Page::new(Uuid::new_v4(), title, title, None);
        page.display_order = order;
        NavNode {
            key: page.id.to_string(),
            url: format!("/{title}"),
            rewrite_url: None,
            title: title.to_owned(),
            summary: None,
            last_modified: DateTime::<Utc>::default(),
            status: NodeStatus::Ok,
            record: page.into(),
        }
    }

    #[test]
    fn test_node_status_codes() {
        assert_eq!(NodeStatus::Ok.code(), 200);
        assert_eq!(NodeStatus::NotFound.code(), 404);
        assert_eq!(NodeStatus::Forbidden.code(), 403);
    }

    #[test]
    fn test_build_page_node_with_template() {
        let site = website();
        let template = PageTemplate {
            id: Uuid::new_v4(),
            name: "Page".to_owned(),
            rewrite_url: "/Pages/Page.aspx".to_owned(),
        };
        let mut home = Page::new(site.id, "/", "Home", None);
        home.template_id = Some(template.id);
        home.summary = Some("Welcome".to_owned());
        home.modified_on = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let store: Arc<dyn EntityStore> = Arc::new(
            MemoryStore::new()
                .with_page(home.clone())
                .with_template(template),
        );

        let node = builder(&site, store)
            .build_page_node(&RequestContext::anonymous(), &home, NodeStatus::Ok)
            .unwrap();

        assert_eq!(node.key, home.id.to_string());
        assert_eq!(node.url, "/mysite/");
        assert_eq!(
            node.rewrite_url,
            Some(format!("/Pages/Page.aspx?pageid={}", home.id))
        );
        assert_eq!(node.title, "Home");
        assert_eq!(node.summary.as_deref(), Some("Welcome"));
        assert_eq!(node.last_modified, home.modified_on);
        assert_eq!(node.status, NodeStatus::Ok);
        assert_eq!(node.record, Record::Page(home));
    }

    #[test]
    fn test_build_page_node_without_template_has_no_rewrite() {
        let site = website();
        let home = Page::new(site.id, "/", "Home", None);
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new().with_page(home.clone()));

        let node = builder(&site, store)
            .build_page_node(&RequestContext::anonymous(), &home, NodeStatus::Forbidden)
            .unwrap();

        assert!(node.rewrite_url.is_none());
        assert_eq!(node.status_code(), 403);
    }

    #[test]
    fn test_build_file_node_uses_attachment() {
        let site = website();
        let home = Page::new(site.id, "/", "Home", None);
        let file = File::new(site.id, "logo.png", "Logo", home.id);
        let uploaded = Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap();
        let store: Arc<dyn EntityStore> = Arc::new(
            MemoryStore::new()
                .with_page(home)
                .with_file(file.clone())
                .with_attachment(
                    file.id,
                    Attachment {
                        file_name: "logo.png".to_owned(),
                        url: "/_files/logo.png".to_owned(),
                        modified_on: uploaded,
                    },
                ),
        );

        let node = builder(&site, store)
            .build_file_node(&RequestContext::anonymous(), &file, NodeStatus::Ok)
            .unwrap();

        assert_eq!(node.url, "/mysite/logo.png");
        assert_eq!(node.rewrite_url.as_deref(), Some("/_files/logo.png"));
        assert_eq!(node.last_modified, uploaded);
        assert_eq!(node.status, NodeStatus::Ok);
    }

    #[test]
    fn test_build_file_node_without_attachment_is_not_found() {
        let site = website();
        let home = Page::new(site.id, "/", "Home", None);
        let file = File::new(site.id, "missing.pdf", "Missing", home.id);
        let store: Arc<dyn EntityStore> =
            Arc::new(MemoryStore::new().with_page(home).with_file(file.clone()));
        let builder = builder(&site, store);

        for requested in [NodeStatus::Ok, NodeStatus::Forbidden, NodeStatus::NotFound] {
            let node = builder
                .build_file_node(&RequestContext::anonymous(), &file, requested)
                .unwrap();

            assert_eq!(node.status, NodeStatus::NotFound);
            assert!(node.rewrite_url.is_none());
        }
    }

    #[test]
    fn test_build_formats_title_and_summary() {
        let site = website();
        let mut home = Page::new(site.id, "/", "Home", None);
        home.summary = Some("start here".to_owned());
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new().with_page(home.clone()));
        let builder = NodeBuilder::new(
            site.clone(),
            Arc::clone(&store),
            Arc::new(HierarchyUrlBuilder::new(Arc::clone(&store))),
            Arc::new(UpperFormatter),
            Arc::new(StoreAttachmentProvider::new(store)),
        );

        let node = builder
            .build(&RequestContext::anonymous(), &home.into(), NodeStatus::Ok)
            .unwrap();

        assert_eq!(node.title, "HOME");
        assert_eq!(node.summary.as_deref(), Some("START HERE"));
    }

    #[test]
    fn test_node_snapshot_is_detached_from_store() {
        let site = website();
        let home = Page::new(site.id, "/", "Home", None);
        let memory = Arc::new(MemoryStore::new().with_page(home.clone()));
        let store = Arc::clone(&memory) as Arc<dyn EntityStore>;
        let node = builder(&site, store)
            .build_page_node(&RequestContext::anonymous(), &home, NodeStatus::Ok)
            .unwrap();

        let mut renamed = home.clone();
        renamed.title = "Renamed".to_owned();
        memory.upsert_page(renamed);

        assert_eq!(node.record.title(), "Home");
        assert_eq!(node.title, "Home");
    }

    #[test]
    fn test_with_query_param_appends_to_url() {
        let node = node_with_order(None, "login");

        let node = node.with_query_param("ReturnUrl", "/mysite/about/team");

        assert_eq!(node.url, "/login?ReturnUrl=%2Fmysite%2Fabout%2Fteam");
    }

    #[test]
    fn test_sort_by_display_order_ordered_first_unordered_trailing() {
        let mut nodes = vec![
            node_with_order(Some(3), "c"),
            node_with_order(None, "x"),
            node_with_order(Some(1), "a"),
            node_with_order(None, "y"),
        ];

        sort_by_display_order(&mut nodes);

        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "x", "y"]);
    }

    #[test]
    fn test_sort_by_display_order_ties_keep_discovery_order() {
        let mut nodes = vec![
            node_with_order(Some(2), "first"),
            node_with_order(Some(1), "one"),
            node_with_order(Some(2), "second"),
        ];

        sort_by_display_order(&mut nodes);

        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "first", "second"]);
    }
}
