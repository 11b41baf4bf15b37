//! Incoming HTTP request type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::Method;
use tracing::debug;

/// An incoming HTTP request with its body already buffered.
///
/// The server builds these from hyper requests; hosts embedding the chain in
/// another stack (and tests) build them with [`Request::new`] and the `with_*`
/// methods.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) files: HashMap<String, PathBuf>,
}

impl Request {
    /// Builds a request for `target`, a path with an optional `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            method,
            path: path.to_owned(),
            query: query.to_owned(),
            headers: Vec::new(),
            body: Bytes::new(),
            files: HashMap::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let headers = parts.headers.iter()
            .map(|(k, v)| (k.as_str().to_owned(), header_text(k.as_str(), v)))
            .collect();
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().unwrap_or_default().to_owned(),
            headers,
            body,
            files: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query-string parameter, percent-decoded.
    pub fn query(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Records an uploaded file that an upstream middleware has already
    /// written to disk, keyed by its form field name.
    ///
    /// The default [`UploadResolver`](crate::UploadResolver) streams the file
    /// staged under `package` when a publish request arrives.
    pub fn stage_file(&mut self, field: &str, path: impl Into<PathBuf>) {
        self.files.insert(field.to_owned(), path.into());
    }

    pub fn staged_file(&self, field: &str) -> Option<&Path> {
        self.files.get(field).map(PathBuf::as_path)
    }
}

/// Non-UTF-8 bytes become U+FFFD so the header stays present.
fn header_text(name: &str, value: &http::HeaderValue) -> String {
    match value.to_str() {
        Ok(text) => text.to_owned(),
        Err(_) => {
            debug!(header = name, "header value is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(value.as_bytes()).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_query_from_path() {
        let req = Request::new(Method::GET, "/p?page=1&size=4");
        assert_eq!(req.path(), "/p");
        assert_eq!(req.query("page").as_deref(), Some("1"));
        assert_eq!(req.query("size").as_deref(), Some("4"));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::GET, "/").with_header("X-KPM-Key", "123");
        assert_eq!(req.header("x-kpm-key"), Some("123"));
    }

    #[test]
    fn decodes_query_values() {
        let req = Request::new(Method::GET, "/p?q=left%20pad");
        assert_eq!(req.query("q").as_deref(), Some("left pad"));
    }

    #[test]
    fn keeps_headers_that_are_not_utf8() {
        let (parts, ()) = http::Request::builder()
            .uri("/p/foo")
            .header("x-kpm-key", http::HeaderValue::from_bytes(b"k\xe9y").unwrap())
            .body(())
            .unwrap()
            .into_parts();
        let req = Request::from_parts(parts, Bytes::new());
        assert_eq!(req.header("x-kpm-key"), Some("k\u{fffd}y"));
    }
}
