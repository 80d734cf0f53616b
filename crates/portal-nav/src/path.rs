//! Request path canonicalization.
//!
//! Turns a raw request path or URL into a [`CanonicalPath`]: a normalized,
//! percent-decoded absolute path plus its query string. Canonicalization is a
//! pure function; it performs no lookups.
//!
//! # Accepted Forms
//!
//! - `/about/team?tab=1` - absolute path ([`PathKind::Absolute`])
//! - `~/about/team` - app-relative path, resolved against the configured
//!   application root ([`PathKind::AppRelative`])
//! - `https://portal.example.com/about` - absolute URL; treated as an absolute
//!   path when the host matches the request host, otherwise
//!   [`PathKind::External`]
//! - `/error?404;https://portal.example.com/about` - internal-redirect
//!   encoding: the server rewrote a failed request to an error handler and
//!   embedded the original URL after a status code and `;`

use std::fmt;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use url::Url;

/// Internal-redirect query: three-digit status, `;`, original URL.
static INTERNAL_REDIRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3});(.+)$").unwrap());

/// Characters escaped in query keys and values.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Form of the raw input a [`CanonicalPath`] was produced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// `~/`-prefixed path relative to the application root.
    AppRelative,
    /// Rooted path on the request host.
    Absolute,
    /// URL on a foreign host. Never resolved locally.
    External,
}

/// Error produced while canonicalizing a path.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Input cannot be interpreted as a path.
    #[error("Malformed path: {0}")]
    Malformed(String),
    /// Internal-redirect URL names a host other than the outer request's.
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
}

/// Ordered query-string parameters.
///
/// Keys are matched case-insensitively; duplicates are kept in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// `+` decodes to a space; invalid UTF-8 escapes are replaced lossily.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let decode = |s: &str| {
            let spaced = s.replace('+', " ");
            percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
        };
        let pairs = raw
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((key, value)) => (decode(key), decode(value)),
                None => (decode(part), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// First value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Append a parameter.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Check whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(
                f,
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )?;
        }
        Ok(())
    }
}

/// Canonical request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalPath {
    /// Form of the original input.
    pub kind: PathKind,
    /// Decoded path, always rooted, no trailing slash except for `/`.
    /// For [`PathKind::External`] this is the full URL without its query.
    pub path: String,
    /// Query parameters.
    pub query: QueryString,
}

impl CanonicalPath {
    /// Absolute path without query parameters.
    #[must_use]
    pub fn absolute(path: impl Into<String>) -> Self {
        Self {
            kind: PathKind::Absolute,
            path: path.into(),
            query: QueryString::default(),
        }
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Append a query parameter to a URL that may already carry a query.
pub(crate) fn append_query_param(url: &str, key: &str, value: &str) -> String {
    let (base, query) = url.split_once('?').unwrap_or((url, ""));
    let mut query = QueryString::parse(query);
    query.append(key, value);
    format!("{base}?{query}")
}

/// Converts raw request paths into [`CanonicalPath`] values.
#[derive(Clone, Debug)]
pub struct PathCanonicalizer {
    root_aliases: Vec<String>,
    app_path: String,
}

impl Default for PathCanonicalizer {
    fn default() -> Self {
        Self {
            root_aliases: vec!["/default.aspx".to_owned()],
            app_path: "/".to_owned(),
        }
    }
}

impl PathCanonicalizer {
    /// Create a canonicalizer.
    ///
    /// # Arguments
    ///
    /// * `root_aliases` - Default-document paths that normalize to `/`
    /// * `app_path` - Application root that `~/` paths resolve against
    #[must_use]
    pub fn new(root_aliases: Vec<String>, app_path: impl Into<String>) -> Self {
        Self {
            root_aliases,
            app_path: app_path.into(),
        }
    }

    /// Canonicalize a raw request path or URL.
    ///
    /// # Arguments
    ///
    /// * `raw` - Raw path or URL as received
    /// * `request_host` - Host of the outer request, used to classify absolute
    ///   URLs and to vet internal-redirect paths
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Malformed`] for input that is not a path, and
    /// [`PathError::SecurityMismatch`] when an internal-redirect URL names a
    /// host other than `request_host` (or when `request_host` is unknown and
    /// the embedded host therefore cannot be vetted).
    pub fn canonicalize(
        &self,
        raw: &str,
        request_host: Option<&str>,
    ) -> Result<CanonicalPath, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Malformed("empty path".to_owned()));
        }

        let without_fragment = raw.split_once('#').map_or(raw, |(before, _)| before);

        let (path, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));

        if path.contains("://") {
            return self.canonicalize_url(without_fragment, request_host);
        }

        if let Some(embedded) = INTERNAL_REDIRECT_RE
            .captures(query)
            .and_then(|caps| caps.get(2))
        {
            return self.canonicalize_redirect(embedded.as_str(), request_host);
        }

        let (kind, rooted) = if let Some(rest) = path.strip_prefix('~') {
            if !rest.is_empty() && !rest.starts_with('/') {
                return Err(PathError::Malformed(format!("invalid app-relative path: {path}")));
            }
            let app = self.app_path.trim_end_matches('/');
            (PathKind::AppRelative, format!("{app}/{}", rest.trim_start_matches('/')))
        } else if path.starts_with('/') {
            (PathKind::Absolute, path.to_owned())
        } else {
            return Err(PathError::Malformed(format!("path is not rooted: {path}")));
        };

        Ok(CanonicalPath {
            kind,
            path: self.normalize(&rooted)?,
            query: QueryString::parse(query),
        })
    }

    fn canonicalize_url(
        &self,
        raw: &str,
        request_host: Option<&str>,
    ) -> Result<CanonicalPath, PathError> {
        let url = Url::parse(raw).map_err(|e| PathError::Malformed(format!("{raw}: {e}")))?;
        let host = url.host_str().unwrap_or_default();
        let query = url.query().unwrap_or_default();

        if let Some(embedded) = INTERNAL_REDIRECT_RE
            .captures(query)
            .and_then(|caps| caps.get(2))
        {
            // The outer URL's own host is what the client actually reached.
            return self.canonicalize_redirect(embedded.as_str(), Some(host));
        }

        let same_host = request_host.is_some_and(|h| h.eq_ignore_ascii_case(host));
        if !same_host {
            let mut external = url.clone();
            external.set_query(None);
            external.set_fragment(None);
            return Ok(CanonicalPath {
                kind: PathKind::External,
                path: external.to_string(),
                query: QueryString::parse(query),
            });
        }

        Ok(CanonicalPath {
            kind: PathKind::Absolute,
            path: self.normalize(url.path())?,
            query: QueryString::parse(query),
        })
    }

    fn canonicalize_redirect(
        &self,
        embedded: &str,
        request_host: Option<&str>,
    ) -> Result<CanonicalPath, PathError> {
        let url = Url::parse(embedded)
            .map_err(|e| PathError::Malformed(format!("internal redirect {embedded}: {e}")))?;
        let found = url.host_str().unwrap_or_default().to_owned();

        match request_host {
            Some(expected) if expected.eq_ignore_ascii_case(&found) => {}
            _ => {
                return Err(PathError::SecurityMismatch {
                    expected: request_host.map(str::to_owned),
                    found,
                });
            }
        }

        Ok(CanonicalPath {
            kind: PathKind::Absolute,
            path: self.normalize(url.path())?,
            query: QueryString::parse(url.query().unwrap_or_default()),
        })
    }

    /// Decode segments, resolve dot segments, collapse slashes, map root aliases.
    fn normalize(&self, path: &str) -> Result<String, PathError> {
        let mut segments: Vec<String> = Vec::new();
        for raw_segment in path.split('/') {
            let segment = percent_decode_str(raw_segment)
                .decode_utf8()
                .map_err(|_| PathError::Malformed(format!("invalid UTF-8 in path: {path}")))?;
            match segment.as_ref() {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::Malformed(format!("path escapes root: {path}")));
                    }
                }
                _ => segments.push(segment.into_owned()),
            }
        }

        let normalized = format!("/{}", segments.join("/"));
        if self
            .root_aliases
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(&normalized))
        {
            return Ok("/".to_owned());
        }
        Ok(normalized)
    }
}
