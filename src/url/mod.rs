//! URL handling module for Site-Mirror
//!
//! This module provides link resolution, crawl-key canonicalization, domain
//! containment checks, and the extension policy that decides whether a link
//! is followed as a page or merely fetched as an auxiliary resource.

mod domain;
mod normalize;

use crate::config::CrawlSettings;

// Re-export main functions
pub use domain::{extract_domain, is_same_host};
pub use normalize::{
    canonical_url, crawl_key, normalize_link, path_extension, resolve_link, NormalizedLink,
};

/// How a resource is treated once fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Followed: fetched, then parsed for further links
    Page,
    /// Fetched but never used as a crawl root
    Auxiliary,
}

/// Which kind of markup a link was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOrigin {
    /// `<a href>`
    Anchor,
    /// `<link href>`, `<script src>`, `<img src>`
    Embedded,
}

/// Decides whether a discovered link is a page or an auxiliary resource
///
/// # Rules
///
/// | Origin | Extension | Kind |
/// |--------|-----------|------|
/// | Anchor | none or page-like | Page |
/// | Anchor | anything else | Auxiliary |
/// | Embedded | page-like | Page |
/// | Embedded | none or anything else | Auxiliary |
///
/// # Examples
///
/// ```no_run
/// use site_mirror::config::CrawlSettings;
/// use site_mirror::url::{classify_link, LinkOrigin, ResourceKind};
/// use url::Url;
///
/// # fn example(settings: &CrawlSettings) {
/// let url = Url::parse("https://example.test/report.pdf").unwrap();
/// assert_eq!(classify_link(LinkOrigin::Anchor, &url, settings), ResourceKind::Auxiliary);
/// # }
/// ```
pub fn classify_link(origin: LinkOrigin, url: &::url::Url, settings: &CrawlSettings) -> ResourceKind {
    match (origin, path_extension(url)) {
        (_, Some(ext)) if settings.is_page_extension(&ext) => ResourceKind::Page,
        (LinkOrigin::Anchor, None) => ResourceKind::Page,
        _ => ResourceKind::Auxiliary,
    }
}

/// Returns true if a fetched resource should be parsed for links
///
/// Pages are drilled into when their extension is page-like or absent.
pub fn is_drilldown_target(url: &::url::Url, settings: &CrawlSettings) -> bool {
    path_extension(url).map_or(true, |ext| settings.is_page_extension(&ext))
}

/// Returns true if the resource is a stylesheet whose `url()` references get rewritten
pub fn is_stylesheet(url: &::url::Url, settings: &CrawlSettings) -> bool {
    path_extension(url).is_some_and(|ext| settings.is_stylesheet_extension(&ext))
}
