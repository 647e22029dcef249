//! Request boundary types.
//!
//! The transport layer owns sockets and parsing; it hands the core a
//! [`Request`] carrying at least a method and a path.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Trace,
    Connect,
}

impl Method {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }

    pub(crate) fn order(self) -> u8 {
        match self {
            Self::Get => 0,
            Self::Head => 1,
            Self::Post => 2,
            Self::Put => 3,
            Self::Delete => 4,
            Self::Patch => 5,
            Self::Options => 6,
            Self::Trace => 7,
            Self::Connect => 8,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    /// Parses a method name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            "CONNECT" => Self::Connect,
            _ => return Err(format!("unknown method `{s}`")),
        };
        Ok(method)
    }
}

/// HTTP headers collection.
///
/// Names are stored lower-cased; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.inner.remove(&name.to_ascii_lowercase())
    }

    /// Copies every header of `other` into `self`.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Iterate over all headers as (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// An incoming request as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    root_path: String,
    query: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl Request {
    /// Create a new request.
    ///
    /// A `?query` suffix on `path` is split off into [`Request::query`].
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        let query = path.find('?').map(|idx| {
            let query = path[idx + 1..].to_owned();
            path.truncate(idx);
            query
        });
        if path.is_empty() {
            path.push('/');
        }
        Self {
            method,
            path,
            root_path: String::new(),
            query,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Shorthand for a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Get the headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get the body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Prefixes stripped by the mounts this request went through.
    ///
    /// Empty unless the request was delegated to a mounted application;
    /// `root_path() + path()` is always the path the client requested.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Moves `prefix` from the path to the root path.
    pub(crate) fn enter_mount(&mut self, prefix: &str, path: String) {
        self.root_path.push_str(prefix);
        self.path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("FETCH".parse::<Method>().is_err());
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.remove("Content-type").as_deref(), Some("text/plain"));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_request_splits_query() {
        let req = Request::get("/search?q=cats&page=2");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=cats&page=2"));

        let req = Request::get("");
        assert_eq!(req.path(), "/");
        assert_eq!(req.query(), None);
    }

    #[test]
    fn test_enter_mount_accumulates_root_path() {
        let mut req = Request::get("/api/v1/items");
        assert_eq!(req.root_path(), "");
        req.enter_mount("/api", "/v1/items".into());
        req.enter_mount("/v1", "/items".into());
        assert_eq!(req.root_path(), "/api/v1");
        assert_eq!(req.path(), "/items");
    }
}
