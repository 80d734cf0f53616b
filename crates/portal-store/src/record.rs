//! Typed entity records.
//!
//! Records are plain owned values populated once at the store boundary.
//! The navigation engine never holds a live query session; everything it
//! needs travels inside these structs.
//!
//! # Path Segments
//!
//! Each [`Page`] and [`File`] carries a `partial_url`: the single path
//! segment it contributes below its parent page (e.g. `"about"`). The
//! website's Home page usually carries `"/"`, i.e. a full path rather than
//! a segment, which is why lookups first try an exact full-path match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root of one path namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
    /// Website identifier.
    pub id: Uuid,
    /// Display name, also used to select the website in configuration.
    pub name: String,
    /// Path prefix distinguishing this website on a shared host (e.g. `"mysite"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

/// Activation state reported by the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Record is live.
    #[default]
    Active,
    /// Record was deactivated and must not be resolved.
    Inactive,
}

impl RecordState {
    /// Check whether the record is active.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Entity types the engine queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Hierarchical content page.
    Page,
    /// Leaf file below a page.
    File,
}

/// Well-known page roles used as navigation targets and fallbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteMarker {
    /// Website root page.
    Home,
    /// Sign-in page offered to anonymous requesters.
    Login,
    /// Page shown to authenticated requesters lacking read access.
    #[serde(rename = "Access Denied")]
    AccessDenied,
    /// Page shown when nothing resolves.
    #[serde(rename = "Page Not Found")]
    PageNotFound,
}

impl SiteMarker {
    /// Marker name as stored in the entity store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Login => "Login",
            Self::AccessDenied => "Access Denied",
            Self::PageNotFound => "Page Not Found",
        }
    }
}

impl std::fmt::Display for SiteMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hierarchical content page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier.
    pub id: Uuid,
    /// Owning website.
    pub website_id: Uuid,
    /// Internal name.
    #[serde(default)]
    pub name: String,
    /// Path segment below the parent page (`"/"` for the Home page).
    pub partial_url: String,
    /// Parent page, `None` for the tree root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_page_id: Option<Uuid>,
    /// Explicit sort position among siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    /// Page template supplying the internal rewrite target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<Uuid>,
    /// Raw title (before content formatting).
    pub title: String,
    /// Raw summary (before content formatting).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Last modification time.
    #[serde(default)]
    pub modified_on: DateTime<Utc>,
    /// Activation state.
    #[serde(default)]
    pub state: RecordState,
    /// Excludes the page from navigation listings when `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_from_navigation: Option<bool>,
    /// Roles allowed to read the page. Empty means public.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_roles: Vec<String>,
}

impl Page {
    /// Create an active page with the required fields set.
    #[must_use]
    pub fn new(
        website_id: Uuid,
        partial_url: impl Into<String>,
        title: impl Into<String>,
        parent_page_id: Option<Uuid>,
    ) -> Self {
        let title = title.into();
        Self {
            id: Uuid::new_v4(),
            website_id,
            name: title.clone(),
            partial_url: partial_url.into(),
            parent_page_id,
            display_order: None,
            template_id: None,
            title,
            summary: None,
            modified_on: DateTime::<Utc>::default(),
            state: RecordState::Active,
            hidden_from_navigation: None,
            read_roles: Vec::new(),
        }
    }
}

/// Leaf node below a page, fronting one attached binary resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// File identifier.
    pub id: Uuid,
    /// Owning website.
    pub website_id: Uuid,
    /// Internal name.
    #[serde(default)]
    pub name: String,
    /// Path segment below the parent page.
    pub partial_url: String,
    /// Parent page. A file's path always runs through it.
    pub parent_page_id: Uuid,
    /// Explicit sort position among siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    /// Raw title.
    pub title: String,
    /// Raw summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Last modification time of the record (not the attachment).
    #[serde(default)]
    pub modified_on: DateTime<Utc>,
    /// Activation state.
    #[serde(default)]
    pub state: RecordState,
    /// Excludes the file from navigation listings when `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_from_navigation: Option<bool>,
}

impl File {
    /// Create an active file below `parent_page_id`.
    #[must_use]
    pub fn new(
        website_id: Uuid,
        partial_url: impl Into<String>,
        title: impl Into<String>,
        parent_page_id: Uuid,
    ) -> Self {
        let title = title.into();
        Self {
            id: Uuid::new_v4(),
            website_id,
            name: title.clone(),
            partial_url: partial_url.into(),
            parent_page_id,
            display_order: None,
            title,
            summary: None,
            modified_on: DateTime::<Utc>::default(),
            state: RecordState::Active,
            hidden_from_navigation: None,
        }
    }
}

/// Binary resource attached to a [`File`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name.
    pub file_name: String,
    /// URL the resource is served from.
    pub url: String,
    /// Resource modification time.
    #[serde(default)]
    pub modified_on: DateTime<Utc>,
}

/// Template a page is rendered through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTemplate {
    /// Template identifier.
    pub id: Uuid,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Internal path the template renders from (e.g. `"/Pages/Page.aspx"`).
    pub rewrite_url: String,
}

/// Association of a marker role with a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMarkerBinding {
    /// Website the marker belongs to.
    pub website_id: Uuid,
    /// Marker role.
    pub marker: SiteMarker,
    /// Target page.
    pub page_id: Uuid,
}

/// Owned snapshot of a resolved page or file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    /// Page record.
    Page(Page),
    /// File record.
    File(File),
}

impl Record {
    /// Record identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Page(page) => page.id,
            Self::File(file) => file.id,
        }
    }

    /// Entity type of the record.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Page(_) => EntityKind::Page,
            Self::File(_) => EntityKind::File,
        }
    }

    /// Raw title.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Page(page) => &page.title,
            Self::File(file) => &file.title,
        }
    }

    /// Raw summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Page(page) => page.summary.as_deref(),
            Self::File(file) => file.summary.as_deref(),
        }
    }

    /// Path segment below the parent page.
    #[must_use]
    pub fn partial_url(&self) -> &str {
        match self {
            Self::Page(page) => &page.partial_url,
            Self::File(file) => &file.partial_url,
        }
    }

    /// Parent page, if any.
    #[must_use]
    pub fn parent_page_id(&self) -> Option<Uuid> {
        match self {
            Self::Page(page) => page.parent_page_id,
            Self::File(file) => Some(file.parent_page_id),
        }
    }

    /// Sort position among siblings.
    #[must_use]
    pub fn display_order(&self) -> Option<i32> {
        match self {
            Self::Page(page) => page.display_order,
            Self::File(file) => file.display_order,
        }
    }

    /// The "hidden from navigation" flag, `None` when unset.
    #[must_use]
    pub fn hidden_from_navigation(&self) -> Option<bool> {
        match self {
            Self::Page(page) => page.hidden_from_navigation,
            Self::File(file) => file.hidden_from_navigation,
        }
    }

    /// Record modification time.
    #[must_use]
    pub fn modified_on(&self) -> DateTime<Utc> {
        match self {
            Self::Page(page) => page.modified_on,
            Self::File(file) => file.modified_on,
        }
    }

    /// Activation state.
    #[must_use]
    pub fn state(&self) -> RecordState {
        match self {
            Self::Page(page) => page.state,
            Self::File(file) => file.state,
        }
    }
}

impl From<Page> for Record {
    fn from(page: Page) -> Self {
        Self::Page(page)
    }
}

impl From<File> for Record {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}
