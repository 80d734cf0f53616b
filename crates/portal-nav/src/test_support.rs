//! Shared site fixture for engine tests.

use std::sync::Arc;

use portal_store::{
    Attachment, EntityStore, File, MemoryStore, Page, PageTemplate, SiteMarker, Website,
};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::tree::{NavigationConfig, NavigationTree};

/// `/mysite` website:
///
/// ```text
/// /                   Home
/// ├── about           (1)
/// │   ├── team        (3, authenticated only)
/// │   │   └── roster
/// │   ├── history
/// │   └── mission     (1)
/// ├── login           (2, hidden, Login marker)
/// ├── access-denied   (hidden, Access Denied marker)
/// ├── page-not-found  (hidden, Page Not Found marker)
/// ├── secret          (5, Staff only)
/// ├── brochure.pdf    (attached)
/// └── missing.pdf     (no attachment)
/// ```
pub(crate) struct SiteFixture {
    pub memory: Arc<MemoryStore>,
    pub store: Arc<dyn EntityStore>,
    pub website: Website,
    pub home: Page,
    pub about: Page,
    pub team: Page,
    pub history: Page,
    pub login: Page,
    pub denied: Page,
    pub not_found: Page,
    pub secret: Page,
    pub brochure: File,
    pub missing: File,
}

fn page(
    website: &Website,
    segment: &str,
    title: &str,
    parent: Option<&Page>,
    order: Option<i32>,
    template: &PageTemplate,
) -> Page {
    let mut page = Page::new(website.id, segment, title, parent.map(|p| p.id));
    page.display_order = order;
    page.template_id = Some(template.id);
    page
}

pub(crate) fn site() -> SiteFixture {
    let website = Website {
        id: Uuid::new_v4(),
        name: "Portal".to_owned(),
        path_prefix: Some("mysite".to_owned()),
    };
    let template = PageTemplate {
        id: Uuid::new_v4(),
        name: "Page".to_owned(),
        rewrite_url: "/Pages/Page.aspx".to_owned(),
    };
    let t = &template;

    let home = page(&website, "/", "Home", None, None, t);
    let about = page(&website, "about", "About", Some(&home), Some(1), t);
    let mut login = page(&website, "login", "Login", Some(&home), Some(2), t);
    login.hidden_from_navigation = Some(true);
    let mut denied = page(&website, "access-denied", "Access Denied", Some(&home), None, t);
    denied.hidden_from_navigation = Some(true);
    let mut not_found = page(&website, "page-not-found", "Page Not Found", Some(&home), None, t);
    not_found.hidden_from_navigation = Some(true);
    let mut secret = page(&website, "secret", "Secret", Some(&home), Some(5), t);
    secret.read_roles = vec!["Staff".to_owned()];
    let mut team = page(&website, "team", "Team", Some(&about), Some(3), t);
    team.read_roles = vec!["Authenticated Users".to_owned()];
    let history = page(&website, "history", "History", Some(&about), None, t);
    let mission = page(&website, "mission", "Mission", Some(&about), Some(1), t);
    let roster = page(&website, "roster", "Roster", Some(&team), None, t);

    let brochure = File::new(website.id, "brochure.pdf", "Brochure", home.id);
    let missing = File::new(website.id, "missing.pdf", "Missing", home.id);

    let memory = Arc::new(
        MemoryStore::new()
            .with_website(website.clone())
            .with_template(template.clone())
            .with_page(home.clone())
            .with_page(about.clone())
            .with_page(login.clone())
            .with_page(denied.clone())
            .with_page(not_found.clone())
            .with_page(secret.clone())
            .with_page(team.clone())
            .with_page(history.clone())
            .with_page(mission)
            .with_page(roster)
            .with_file(brochure.clone())
            .with_file(missing.clone())
            .with_attachment(
                brochure.id,
                Attachment {
                    file_name: "brochure.pdf".to_owned(),
                    url: "/_files/brochure.pdf".to_owned(),
                    modified_on: brochure.modified_on,
                },
            )
            .with_marker(website.id, SiteMarker::Home, home.id)
            .with_marker(website.id, SiteMarker::Login, login.id)
            .with_marker(website.id, SiteMarker::AccessDenied, denied.id)
            .with_marker(website.id, SiteMarker::PageNotFound, not_found.id),
    );
    let store = Arc::clone(&memory) as Arc<dyn EntityStore>;

    SiteFixture {
        memory,
        store,
        website,
        home,
        about,
        team,
        history,
        login,
        denied,
        not_found,
        secret,
        brochure,
        missing,
    }
}

/// Tree over the fixture with the default configuration.
pub(crate) fn tree(f: &SiteFixture) -> NavigationTree {
    NavigationTree::new(
        "portal",
        f.website.clone(),
        Arc::clone(&f.store),
        NavigationConfig::default(),
    )
}

/// Authenticated requester without explicit roles.
pub(crate) fn member() -> RequestContext {
    RequestContext::authenticated("bob", Vec::new())
}

/// Authenticated requester holding the Staff role.
pub(crate) fn staff() -> RequestContext {
    RequestContext::authenticated("alice", vec!["Staff".to_owned()])
}
