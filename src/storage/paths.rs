//! Mapping of URLs onto the local mirror layout

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

/// File name used when a URL maps onto the output root itself
pub const ROOT_INDEX_FILE: &str = "index.html";

/// Characters the `url` crate percent-encodes inside path segments
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%');

/// Maps an absolute URL to its destination under `root`
///
/// Path segments are percent-decoded and appended with the host separator.
/// Empty, `.` and `..` segments are dropped so the result always stays under
/// `root`. The site root maps to `<root>/index.html`.
///
/// # Examples
///
/// ```
/// use site_mirror::storage::map_url_to_local_path;
/// use std::path::Path;
/// use url::Url;
///
/// let root = Path::new("out");
/// let url = Url::parse("https://example.test/css/site.css?v=3").unwrap();
/// assert_eq!(map_url_to_local_path(root, &url), root.join("css").join("site.css"));
///
/// let url = Url::parse("https://example.test/").unwrap();
/// assert_eq!(map_url_to_local_path(root, &url), root.join("index.html"));
/// ```
pub fn map_url_to_local_path(root: &Path, url: &Url) -> PathBuf {
    let mut path = root.to_path_buf();

    for segment in url.path().split(['/', '\\']) {
        let decoded = percent_decode_str(segment).decode_utf8_lossy();
        if decoded.is_empty() || decoded == "." || decoded == ".." {
            continue;
        }
        path.push(decoded.replace(['/', '\\'], "_"));
    }

    if path.as_path() == root {
        path.push(ROOT_INDEX_FILE);
    }

    path
}

/// Derives a unique file name for a query-string variant of a resource
///
/// A random token is inserted before the extension of `original_path`'s file
/// name, and the same file name is swapped into `original_url` (the reference
/// text as it appeared in the stylesheet). The query string and fragment of
/// `original_url` are left untouched.
///
/// If the file name cannot be located in `original_url` the URL is returned
/// unchanged; callers treat that as "no rewrite possible".
///
/// # Examples
///
/// ```
/// use site_mirror::storage::derive_collision_safe_path;
/// use std::path::Path;
///
/// let (url, path) = derive_collision_safe_path("img/logo.png?v=1", Path::new("out/img/logo.png"));
/// let name = path.file_name().unwrap().to_str().unwrap().to_string();
/// assert!(name.starts_with("logo_") && name.ends_with(".png"));
/// assert_eq!(url, format!("img/{}?v=1", name));
/// ```
pub fn derive_collision_safe_path(original_url: &str, original_path: &Path) -> (String, PathBuf) {
    let token = Uuid::new_v4().simple().to_string();

    let file_name = original_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ROOT_INDEX_FILE.to_string());

    let new_name = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, token, ext),
        _ => format!("{}_{}", file_name, token),
    };

    let modified_path = original_path.with_file_name(&new_name);
    let modified_url = rename_reference(original_url, original_path, &modified_path);

    (modified_url, modified_path)
}

/// Points `reference` at `renamed_path` instead of `original_path`
///
/// Only the file name changes; the rest of the reference text (directories,
/// query string, fragment) is kept. Returns `reference` unchanged when the
/// original file name does not appear in it.
pub fn rename_reference(reference: &str, original_path: &Path, renamed_path: &Path) -> String {
    let file_name = |path: &Path| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ROOT_INDEX_FILE.to_string())
    };

    replace_file_name(reference, &file_name(original_path), &file_name(renamed_path))
        .unwrap_or_else(|| reference.to_string())
}

/// Swaps the last occurrence of `old` in the path part of `url` for `new`
///
/// Tries the literal file name first, then its percent-encoded form.
fn replace_file_name(url: &str, old: &str, new: &str) -> Option<String> {
    let split = url.find(['?', '#']).unwrap_or(url.len());
    let (head, tail) = url.split_at(split);

    let encoded_old = utf8_percent_encode(old, PATH_SEGMENT).to_string();
    let encoded_new = utf8_percent_encode(new, PATH_SEGMENT).to_string();

    let renamed = [(old, new.to_string()), (encoded_old.as_str(), encoded_new)]
        .into_iter()
        .find_map(|(needle, replacement)| {
            head.rfind(needle).map(|idx| {
                format!(
                    "{}{}{}{}",
                    &head[..idx],
                    replacement,
                    &head[idx + needle.len()..],
                    tail
                )
            })
        });
    renamed
}
