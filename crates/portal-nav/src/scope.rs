//! Website scope path translation.
//!
//! Several logical websites can share one physical host by giving each a
//! path prefix. These helpers move a path between its on-the-wire form
//! (`/mysite/about`) and the website-relative form the page hierarchy is
//! keyed by (`/about`).

use portal_store::Website;

use crate::path::CanonicalPath;

/// Query parameter recording the prefix stripped by [`to_relative`].
pub const WEBSITE_PATH_PARAM: &str = "websitepath";

/// Website path prefix with surrounding slashes removed, `None` when empty.
#[must_use]
pub fn website_prefix(website: &Website) -> Option<&str> {
    website
        .path_prefix
        .as_deref()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
}

/// Prepend the website prefix to a website-relative path.
///
/// Returns `path` unchanged when the website has no prefix.
#[must_use]
pub fn to_absolute(website: &Website, path: &str) -> String {
    match website_prefix(website) {
        Some(prefix) if path.starts_with('/') => format!("/{prefix}{path}"),
        Some(prefix) => format!("/{prefix}/{path}"),
        None => path.to_owned(),
    }
}

/// Split a leading website prefix off `path`.
///
/// Returns the remaining path (rooted) and the prefix text as it appeared in
/// `path`, or `None` when `path` does not start with the prefix segment(s).
/// Matching is case-insensitive and whole-segment.
#[must_use]
pub fn strip_prefix<'a>(website: &Website, path: &'a str) -> Option<(&'a str, &'a str)> {
    let prefix = website_prefix(website)?;
    let rest = path.strip_prefix('/')?;
    let candidate = rest.get(..prefix.len())?;
    if !candidate.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let remainder = &rest[prefix.len()..];
    if remainder.is_empty() {
        Some(("/", candidate))
    } else if remainder.starts_with('/') {
        Some((remainder, candidate))
    } else {
        None
    }
}

/// Remove the website prefix from a canonical path.
///
/// When the prefix is stripped, the stripped text is recorded on the result
/// as the [`WEBSITE_PATH_PARAM`] query parameter. Otherwise the path is
/// returned unchanged.
#[must_use]
pub fn to_relative(website: &Website, path: &CanonicalPath) -> CanonicalPath {
    let Some((remainder, stripped)) = strip_prefix(website, &path.path) else {
        return path.clone();
    };
    let mut relative = CanonicalPath {
        kind: path.kind,
        path: remainder.to_owned(),
        query: path.query.clone(),
    };
    relative.query.append(WEBSITE_PATH_PARAM, stripped);
    relative
}

/// Website-relative form of a bare path string.
#[must_use]
pub fn relative_path<'a>(website: &Website, path: &'a str) -> &'a str {
    strip_prefix(website, path).map_or(path, |(remainder, _)| remainder)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    fn website(prefix: Option<&str>) -> Website {
        Website {
            id: Uuid::new_v4(),
            name: "Portal".to_owned(),
            path_prefix: prefix.map(str::to_owned),
        }
    }

    #[test]
    fn test_to_absolute_without_prefix_is_identity() {
        let site = website(None);

        assert_eq!(to_absolute(&site, "/about"), "/about");
        assert_eq!(to_absolute(&website(Some("//")), "/about"), "/about");
    }

    #[test]
    fn test_to_absolute_trims_prefix_slashes() {
        let site = website(Some("/mysite/"));

        assert_eq!(to_absolute(&site, "/about/team"), "/mysite/about/team");
        assert_eq!(to_absolute(&site, "/"), "/mysite/");
    }

    #[test]
    fn test_to_relative_strips_prefix_and_records_it() {
        let site = website(Some("mysite"));

        let relative = to_relative(&site, &CanonicalPath::absolute("/MySite/about"));

        assert_eq!(relative.path, "/about");
        assert_eq!(relative.query.get(WEBSITE_PATH_PARAM), Some("MySite"));
    }

    #[test]
    fn test_to_relative_prefix_only_is_root() {
        let site = website(Some("mysite"));

        assert_eq!(to_relative(&site, &CanonicalPath::absolute("/mysite")).path, "/");
    }

    #[test]
    fn test_to_relative_requires_whole_segment() {
        let site = website(Some("mysite"));

        let relative = to_relative(&site, &CanonicalPath::absolute("/mysiteabout"));

        assert_eq!(relative.path, "/mysiteabout");
        assert!(relative.query.get(WEBSITE_PATH_PARAM).is_none());
    }

    #[test]
    fn test_to_relative_non_matching_unchanged() {
        let site = website(Some("mysite"));
        let path = CanonicalPath::absolute("/other/about");

        assert_eq!(to_relative(&site, &path), path);
    }

    #[test]
    fn test_to_relative_multi_segment_prefix() {
        let site = website(Some("sites/mysite"));

        assert_eq!(relative_path(&site, "/sites/mysite/about"), "/about");
    }

    #[test]
    fn test_relative_of_absolute_roundtrips() {
        let paths = ["/", "/about", "/about/team", "/mysite", "/a/b/c/d"];
        for prefix in [None, Some("mysite"), Some("/nested/site/")] {
            let site = website(prefix);
            for path in paths {
                let absolute = CanonicalPath::absolute(to_absolute(&site, path));

                let relative = to_relative(&site, &absolute);

                assert_eq!(relative.path, path, "prefix {prefix:?}");
            }
        }
    }
}
