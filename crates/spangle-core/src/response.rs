//! Response type.

use serde::Serialize;

use crate::request::Headers;

/// An outgoing response.
///
/// Handlers either return a fresh `Response` or mutate the one carried by
/// the [`Exchange`](crate::Exchange).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

impl Response {
    /// An empty `200 OK`.
    #[must_use]
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    /// An empty response with the given status.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// A redirect to `location`.
    #[must_use]
    pub fn redirect(location: impl Into<String>, status: u16) -> Self {
        Self::with_status(status).header("location", location)
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a plain-text body.
    #[must_use]
    pub fn body_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Sets a JSON body.
    pub fn body_json<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = serde_json::to_vec(value)?;
        self.headers.insert("content-type", "application/json");
        Ok(self)
    }

    /// Returns the status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Replaces the status code.
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns mutable headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body as text, if it is valid UTF-8.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Replaces the body with plain text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.body = text.into().into_bytes();
        self.headers.insert("content-type", "text/plain; charset=utf-8");
    }

    /// Drops the body, keeping status and headers.
    pub fn clear_body(&mut self) {
        self.body.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let resp = Response::ok().status(201).header("X-Id", "7").body_text("made");
        assert_eq!(resp.status_code(), 201);
        assert_eq!(resp.headers().get("x-id"), Some("7"));
        assert_eq!(resp.text(), Some("made"));
        assert_eq!(
            resp.headers().get("content-type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_redirect() {
        let resp = Response::redirect("/route", 308);
        assert_eq!(resp.status_code(), 308);
        assert_eq!(resp.headers().get("Location"), Some("/route"));
        assert!(resp.body().is_empty());
    }

    #[test]
    fn test_json_body() {
        let resp = Response::ok()
            .body_json(&serde_json::json!({ "id": 1 }))
            .unwrap();
        assert_eq!(resp.text(), Some(r#"{"id":1}"#));
        assert_eq!(resp.headers().get("content-type"), Some("application/json"));
    }
}
