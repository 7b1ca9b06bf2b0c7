use crate::url::domain::is_same_host;
use crate::{UrlError, UrlResult};
use url::Url;

/// Schemes that never point at a fetchable resource
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// A discovered link after resolution and domain filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLink {
    /// Query/fragment stripped, trailing separators trimmed; used for fetching pages
    pub url: Url,

    /// Resolved URL with its query string preserved (fragment dropped)
    pub original: Url,

    /// Canonical crawl key derived from `url`
    pub key: String,
}

impl NormalizedLink {
    /// Returns true if the original reference carried a query string
    pub fn has_query(&self) -> bool {
        self.original.query().is_some_and(|q| !q.is_empty())
    }

    /// Crawl key that keeps the query string
    ///
    /// Used for stylesheet references, where `img.png?v=1` and `img.png?v=2`
    /// are distinct files.
    pub fn query_key(&self) -> String {
        let mut url = self.original.clone();
        trim_trailing_separators(&mut url);
        url.to_string()
    }
}

/// Resolves a possibly relative link against the document it was found in
///
/// # Rejections
///
/// * Empty and fragment-only references (`UrlError::Parse`)
/// * `javascript:`, `mailto:`, `tel:` and `data:` references (`UrlError::InvalidScheme`)
/// * Anything that does not resolve to an http(s) URL with a host
///
/// # Examples
///
/// ```
/// use site_mirror::url::resolve_link;
/// use url::Url;
///
/// let doc = Url::parse("https://example.test/docs/index.html").unwrap();
/// let url = resolve_link("../about?x=1#team", &doc).unwrap();
/// assert_eq!(url.as_str(), "https://example.test/about?x=1#team");
/// ```
pub fn resolve_link(raw: &str, document_url: &Url) -> UrlResult<Url> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(UrlError::Parse("empty reference".to_string()));
    }

    if raw.starts_with('#') {
        return Err(UrlError::Parse(format!("fragment-only reference '{}'", raw)));
    }

    let lower = raw.to_ascii_lowercase();
    if let Some(scheme) = SKIPPED_SCHEMES.iter().find(|s| lower.starts_with(*s)) {
        return Err(UrlError::InvalidScheme(scheme.trim_end_matches(':').to_string()));
    }

    let url = document_url
        .join(raw)
        .map_err(|e| UrlError::Parse(format!("'{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Resolves, domain-filters and canonicalizes a discovered link
///
/// Hosts are compared case-insensitively against `base_host`; ports are not
/// part of the comparison.
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_link;
/// use url::Url;
///
/// let doc = Url::parse("https://example.test/").unwrap();
///
/// let link = normalize_link("/page/?x=1#top", &doc, "example.test").unwrap();
/// assert_eq!(link.key, "https://example.test/page");
/// assert_eq!(link.original.as_str(), "https://example.test/page/?x=1");
///
/// assert!(normalize_link("https://other.test/", &doc, "example.test").is_err());
/// ```
pub fn normalize_link(raw: &str, document_url: &Url, base_host: &str) -> UrlResult<NormalizedLink> {
    let mut original = resolve_link(raw, document_url)?;

    if !is_same_host(&original, base_host) {
        return Err(UrlError::OutOfDomain(
            original.host_str().unwrap_or_default().to_string(),
        ));
    }

    original.set_fragment(None);
    let url = canonical_url(&original);
    let key = url.as_str().trim_end_matches(['/', '\\']).to_string();

    Ok(NormalizedLink { url, original, key })
}

/// Strips query and fragment and trims trailing path separators
///
/// This intentionally collapses `/page?x=1` and `/page?x=2` into one crawl
/// entity.
pub fn canonical_url(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_query(None);
    canonical.set_fragment(None);
    trim_trailing_separators(&mut canonical);
    canonical
}

/// Canonical crawl key for a URL
pub fn crawl_key(url: &Url) -> String {
    canonical_url(url)
        .as_str()
        .trim_end_matches(['/', '\\'])
        .to_string()
}

/// Lowercase extension of the last path segment, if any
///
/// # Examples
///
/// ```
/// use site_mirror::url::path_extension;
/// use url::Url;
///
/// let url = Url::parse("https://example.test/css/Site.CSS?v=2").unwrap();
/// assert_eq!(path_extension(&url), Some("css".to_string()));
///
/// let url = Url::parse("https://example.test/about").unwrap();
/// assert_eq!(path_extension(&url), None);
/// ```
pub fn path_extension(url: &Url) -> Option<String> {
    let segment = url.path().trim_end_matches('/').rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

fn trim_trailing_separators(url: &mut Url) {
    let path = url.path();
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.len() != path.len() {
        let trimmed = trimmed.to_string();
        url.set_path(&trimmed);
    }
}
