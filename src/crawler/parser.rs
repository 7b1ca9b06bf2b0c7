//! HTML and stylesheet reference extraction
//!
//! This module handles parsing downloaded documents to extract:
//! - Links from `<a>`, `<link>`, `<script>` and `<img>` tags
//! - `url(...)` references in stylesheet text, with their byte positions
//!
//! Both extractors return raw reference text; resolution and domain
//! filtering happen in the `url` module.

use crate::url::LinkOrigin;
use scraper::{Html, Selector};
use std::ops::Range;

/// Raw link text found in an HTML document, grouped by origin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// `href` values of `<a>` tags
    pub anchors: Vec<String>,

    /// `<link href>`, `<script src>` and `<img src>` values
    pub embedded: Vec<String>,
}

impl ExtractedLinks {
    /// Iterates over every link together with where it was found
    pub fn iter(&self) -> impl Iterator<Item = (LinkOrigin, &str)> {
        self.anchors
            .iter()
            .map(|href| (LinkOrigin::Anchor, href.as_str()))
            .chain(
                self.embedded
                    .iter()
                    .map(|src| (LinkOrigin::Embedded, src.as_str())),
            )
    }

    pub fn len(&self) -> usize {
        self.anchors.len() + self.embedded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty() && self.embedded.is_empty()
    }
}

/// Tag/attribute pairs that contribute embedded links
const EMBEDDED_SOURCES: &[(&str, &str)] = &[
    ("link[href]", "href"),
    ("script[src]", "src"),
    ("img[src]", "src"),
];

/// Extracts link text from an HTML document
///
/// # Extraction Rules
///
/// **Include:**
/// - `<a href="...">`
/// - `<link href="...">`, `<script src="...">`, `<img src="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - Attributes that are empty or whitespace
///
/// Values are returned as written (trimmed); special schemes are rejected
/// later by the link resolver.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::extract_links;
///
/// let html = r#"<a href="/about">About</a><img src="logo.png"><a href=" ">x</a>"#;
/// let links = extract_links(html);
/// assert_eq!(links.anchors, vec!["/about"]);
/// assert_eq!(links.embedded, vec!["logo.png"]);
/// ```
pub fn extract_links(html: &str) -> ExtractedLinks {
    let document = Html::parse_document(html);
    let mut links = ExtractedLinks::default();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Download links are not part of the navigable site
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = non_empty(element.value().attr("href")) {
                links.anchors.push(href);
            }
        }
    }

    for (selector, attribute) in EMBEDDED_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for element in document.select(&selector) {
            if let Some(value) = non_empty(element.value().attr(attribute)) {
                links.embedded.push(value);
            }
        }
    }

    links
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A `url(...)` reference inside one line of a stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssReference {
    /// Reference text without quotes or surrounding whitespace
    pub raw: String,

    /// Byte range of the reference within the scanned line
    pub range: Range<usize>,
}

/// Lists the `url(...)` references in a single stylesheet line
///
/// Handles single-quoted, double-quoted and unquoted forms. `data:` URIs and
/// empty references are skipped. An unterminated token ends the scan.
///
/// The line is scanned as raw bytes, so stylesheets in any ASCII-compatible
/// encoding work and the returned ranges can be spliced into the original
/// bytes.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::extract_css_references;
///
/// let line = "body { background: url('img/bg.png?v=2') } .x { src: url(font.woff) }";
/// let refs = extract_css_references(line);
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].raw, "img/bg.png?v=2");
/// assert_eq!(&line[refs[1].range.clone()], "font.woff");
/// ```
pub fn extract_css_references(line: impl AsRef<[u8]>) -> Vec<CssReference> {
    let bytes = line.as_ref();
    let mut references = Vec::new();
    let mut cursor = 0;

    while let Some(found) = find_url_token(&bytes[cursor..]) {
        let mut start = cursor + found + URL_TOKEN.len();
        while start < bytes.len() && bytes[start].is_ascii_whitespace() {
            start += 1;
        }

        let (value, resume) = match bytes.get(start) {
            Some(&quote) if quote == b'\'' || quote == b'"' => {
                let Some(close) = bytes[start + 1..].iter().position(|&b| b == quote) else {
                    break;
                };
                let end = start + 1 + close;
                (start + 1..end, end + 1)
            }
            _ => {
                let Some(close) = bytes[start..].iter().position(|&b| b == b')') else {
                    break;
                };
                let mut end = start + close;
                while end > start && bytes[end - 1].is_ascii_whitespace() {
                    end -= 1;
                }
                (start..end, start + close + 1)
            }
        };
        cursor = resume;

        let raw = &bytes[value.clone()];
        let is_data = raw
            .get(..DATA_SCHEME.len())
            .map_or(false, |scheme| scheme.eq_ignore_ascii_case(DATA_SCHEME));
        if raw.is_empty() || is_data {
            continue;
        }

        references.push(CssReference {
            raw: String::from_utf8_lossy(raw).into_owned(),
            range: value,
        });
    }

    references
}

const URL_TOKEN: &[u8] = b"url(";
const DATA_SCHEME: &[u8] = b"data:";

fn find_url_token(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(URL_TOKEN.len())
        .position(|window| window.eq_ignore_ascii_case(URL_TOKEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_by_tag() {
        let html = r#"
            <html>
            <head>
                <link rel="stylesheet" href="/css/site.css">
                <script src="/js/app.js"></script>
                <script>inline()</script>
            </head>
            <body>
                <a href="/about">About</a>
                <a href="docs/guide.html">Guide</a>
                <a href="/files/report.pdf" download>Report</a>
                <img src="/img/logo.png">
                <a>No href</a>
            </body>
            </html>
        "#;

        let links = extract_links(html);

        assert_eq!(links.anchors, vec!["/about", "docs/guide.html"]);
        assert_eq!(
            links.embedded,
            vec!["/css/site.css", "/js/app.js", "/img/logo.png"]
        );
        assert_eq!(links.len(), 5);
    }

    #[test]
    fn test_extract_links_keeps_special_schemes_for_resolver() {
        let html = r##"<a href="mailto:a@b.test">m</a><a href="#top">t</a>"##;
        let links = extract_links(html);
        assert_eq!(links.anchors, vec!["mailto:a@b.test", "#top"]);
    }

    #[test]
    fn test_iter_tags_origin() {
        let links = ExtractedLinks {
            anchors: vec!["/a".to_string()],
            embedded: vec!["/b.js".to_string()],
        };

        let collected: Vec<_> = links.iter().collect();
        assert_eq!(
            collected,
            vec![(LinkOrigin::Anchor, "/a"), (LinkOrigin::Embedded, "/b.js")]
        );
    }

    #[test]
    fn test_empty_document() {
        assert!(extract_links("").is_empty());
    }

    #[test]
    fn test_css_quoted_and_unquoted() {
        let line = r#"a{b:url("one.png")} c{d:URL( two.png )} e{f:url('three.png?v=1')}"#;
        let refs = extract_css_references(line);

        let raws: Vec<_> = refs.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(raws, vec!["one.png", "two.png", "three.png?v=1"]);

        for reference in &refs {
            assert_eq!(&line[reference.range.clone()], reference.raw);
        }
    }

    #[test]
    fn test_css_skips_data_and_empty() {
        let line = "a{b:url(data:image/png;base64,AAAA)} c{d:url('')} e{f:url(DATA:x)} g{h:url(ok.gif)}";
        let refs = extract_css_references(line);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].raw, "ok.gif");
    }

    #[test]
    fn test_css_unterminated_stops_scan() {
        assert!(extract_css_references("a{b:url('broken.png}").is_empty());
        assert!(extract_css_references("a{b:url(broken.png").is_empty());
    }

    #[test]
    fn test_css_no_references() {
        assert!(extract_css_references("body { color: red; }\n").is_empty());
    }

    #[test]
    fn test_css_references_in_non_utf8_line() {
        let line = b"/* caf\xe9 */ a { background: URL( i.png?v=1 ) }";
        let refs = extract_css_references(&line[..]);

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].raw, "i.png?v=1");
        assert_eq!(&line[refs[0].range.clone()], b"i.png?v=1");
    }
}
