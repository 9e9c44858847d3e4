//! Request path normalization and URL building.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Url;

use crate::error::{HttpClientError, Result};

/// A validated request path: exactly one leading `/`, no empty segments,
/// no traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize `path`. Any occurrence of `..` is rejected, as is any
/// segment that percent-decodes to a dot-segment.
pub fn normalize_path(path: &str) -> Result<NormalizedPath> {
    let traversal = || HttpClientError::InvalidUrl(format!("path traversal is not allowed: {path}"));
    if path.contains("..") {
        return Err(traversal());
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in &segments {
        let decoded = urlencoding::decode(segment).map_err(|_| traversal())?;
        if decoded == "." || decoded == ".." {
            return Err(traversal());
        }
    }
    Ok(NormalizedPath(format!("/{}", segments.join("/"))))
}

/// Join a normalized path and query onto `base_url`.
///
/// The base URL's own path is kept as a prefix (`https://h/v1` + `/users`
/// gives `https://h/v1/users`). Query pairs already on the base URL are kept;
/// request pairs follow them in key order.
pub fn build_url(
    base_url: &Url,
    path: &NormalizedPath,
    query: &BTreeMap<String, String>,
) -> Result<Url> {
    if base_url.cannot_be_a_base() {
        return Err(HttpClientError::InvalidUrl(format!(
            "base URL cannot carry a path: {base_url}"
        )));
    }
    let mut url = base_url.clone();
    let prefix = base_url.path().trim_end_matches('/');
    let full_path = if path.as_str() == "/" && !prefix.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}{path}")
    };
    url.set_path(&full_path);
    if !url.path().starts_with(prefix) {
        return Err(HttpClientError::InvalidUrl(format!(
            "path escapes the base URL: {path}"
        )));
    }
    url.set_fragment(None);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(url)
}

/// Parse a base URL, mapping failures to `InvalidUrl`.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url)
        .map_err(|e| HttpClientError::InvalidUrl(format!("invalid base URL '{base_url}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trims_and_collapses_slashes() {
        assert_eq!(normalize_path("//users///42/").unwrap().as_str(), "/users/42");
        assert_eq!(normalize_path("users/42").unwrap().as_str(), "/users/42");
    }

    #[test]
    fn empty_path_maps_to_root() {
        assert_eq!(normalize_path("").unwrap().as_str(), "/");
        assert_eq!(normalize_path("///").unwrap().as_str(), "/");
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(matches!(
            normalize_path("/users/../admin"),
            Err(HttpClientError::InvalidUrl(_))
        ));
        for path in ["%2e%2e/admin", "%2E%2E/%2e%2e/admin", ".%2e/admin", "%2e./admin", "a/%2e/b", "a/%ff"] {
            assert!(
                matches!(normalize_path(path), Err(HttpClientError::InvalidUrl(_))),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn encoded_dot_segments_cannot_leave_base_path() {
        let base = parse_base_url("https://api.test/v1/tenant-a").unwrap();
        for path in ["%2e%2e/admin", "%2E%2E/%2e%2e/admin", ".%2e/admin", "%2e./admin"] {
            let built = normalize_path(path).and_then(|p| build_url(&base, &p, &BTreeMap::new()));
            assert!(matches!(built, Err(HttpClientError::InvalidUrl(_))), "{path} escaped");

            let unchecked = NormalizedPath(format!("/{path}"));
            let built = build_url(&base, &unchecked, &BTreeMap::new());
            assert!(matches!(built, Err(HttpClientError::InvalidUrl(_))), "{path} left the base path");
        }
    }

    #[test]
    fn encoded_characters_inside_segments_are_kept() {
        let base = parse_base_url("https://api.test/v1").unwrap();
        let url = build_url(&base, &normalize_path("/files/a%20b.txt").unwrap(), &BTreeMap::new()).unwrap();
        assert_eq!(url.as_str(), "https://api.test/v1/files/a%20b.txt");
    }

    #[test]
    fn base_url_query_is_kept_before_request_query() {
        let base = parse_base_url("https://api.test/v1?api-version=2024-01").unwrap();
        let mut query = BTreeMap::new();
        query.insert("page".to_string(), "2".to_string());
        let url = build_url(&base, &normalize_path("users").unwrap(), &query).unwrap();
        assert_eq!(url.as_str(), "https://api.test/v1/users?api-version=2024-01&page=2");
    }

    #[test]
    fn build_url_joins_base_path_and_query() {
        let base = parse_base_url("https://api.test/v1/").unwrap();
        let mut query = BTreeMap::new();
        query.insert("q".to_string(), "a b".to_string());
        query.insert("page".to_string(), "2".to_string());
        let url = build_url(&base, &normalize_path("users").unwrap(), &query).unwrap();
        assert_eq!(url.as_str(), "https://api.test/v1/users?page=2&q=a+b");
    }

    #[test]
    fn build_url_on_bare_host() {
        let base = parse_base_url("https://api.test").unwrap();
        let url = build_url(&base, &normalize_path("/users/42").unwrap(), &BTreeMap::new()).unwrap();
        assert_eq!(url.as_str(), "https://api.test/users/42");
    }

    #[test]
    fn non_base_urls_are_rejected() {
        let base = parse_base_url("mailto:someone@example.com").unwrap();
        let err = build_url(&base, &normalize_path("/x").unwrap(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidUrl(_)));
    }

    proptest! {
        #[test]
        fn paths_with_dotdot_always_fail(prefix in "[a-z/]{0,12}", suffix in "[a-z/]{0,12}") {
            let path = format!("{prefix}..{suffix}");
            prop_assert!(normalize_path(&path).is_err());
        }

        #[test]
        fn encoded_dot_segments_always_fail(
            prefix in "[a-z]{0,6}(/[a-z]{1,6}){0,2}",
            dots in prop::sample::select(vec!["%2e%2e", "%2E%2E", ".%2e", "%2e.", "%2E.", "%2e"]),
            suffix in "(/[a-z]{1,6}){0,2}",
        ) {
            let path = format!("{prefix}/{dots}{suffix}");
            prop_assert!(normalize_path(&path).is_err());
        }

        #[test]
        fn normalized_paths_have_no_double_slash(path in "[a-z/]{0,32}") {
            let normalized = normalize_path(&path).unwrap();
            prop_assert!(!normalized.as_str().contains("//"));
            prop_assert!(normalized.as_str().starts_with('/'));
        }
    }
}
