//! Engine error types.

use portal_store::StoreError;

/// Error returned by navigation operations.
///
/// Expected misses (nothing resolves, access denied) are not errors; they
/// surface as fallback nodes or `None`. Only conditions that indicate a
/// misconfigured website, a spoofing attempt, or a failed store query end up
/// here.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// Website is misconfigured (e.g. no Home page).
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Internal-redirect path names a different host than the outer request.
    #[error(
        "Internal redirect host mismatch: expected {}, found {found}",
        .expected.as_deref().unwrap_or("<unknown>")
    )]
    SecurityMismatch {
        /// Host of the outer request, if known.
        expected: Option<String>,
        /// Host embedded in the redirect.
        found: String,
    },
    /// Entity store query failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
