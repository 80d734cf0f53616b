//! Per-request security context.

use serde::Serialize;

/// Authenticated requester.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    /// User name.
    pub name: String,
    /// Roles the user holds.
    pub roles: Vec<String>,
}

/// Who is asking, and through which host.
///
/// Node resolution outcomes depend on this value, so nodes are never shared
/// across contexts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Host of the incoming request (e.g. `"portal.example.com"`).
    pub host: Option<String>,
    /// Authenticated user, `None` for anonymous requests.
    pub user: Option<User>,
}

impl RequestContext {
    /// Anonymous request without a known host.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Request by an authenticated user.
    #[must_use]
    pub fn authenticated(name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            host: None,
            user: Some(User {
                name: name.into(),
                roles,
            }),
        }
    }

    /// Set the request host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Request host, if known.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Check whether the requester is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Check whether the requester holds a role (case-insensitive).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.roles.iter().any(|r| r.eq_ignore_ascii_case(role)))
    }
}
