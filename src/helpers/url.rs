//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for("/blog/", "/post/hello") // -> "/blog/post/hello"
/// ```
pub fn url_for(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// URL of a post page
pub fn post_url(root: &str, uid: &str) -> String {
    url_for(root, &format!("post/{}", encode_segment(uid)))
}

/// URL of a listing page (page 1 is the home page)
pub fn listing_url(root: &str, page: u32) -> String {
    if page <= 1 {
        url_for(root, "")
    } else {
        url_for(root, &format!("page/{}", page))
    }
}

/// Percent-encode one path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
