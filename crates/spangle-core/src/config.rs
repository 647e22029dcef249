//! Application configuration.
//!
//! ```
//! use spangle_core::{AppConfig, TrailingSlash};
//!
//! let config = AppConfig::from_json(r#"{"routing": "strict", "default_route": "/help"}"#).unwrap();
//! assert_eq!(config.routing, TrailingSlash::Strict);
//! assert_eq!(config.name, "spangle");
//! ```

use serde::{Deserialize, Serialize};
use spangle_router::TrailingSlash;

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name used in log fields.
    pub name: String,
    /// Default trailing-slash policy for routes without an override.
    pub routing: TrailingSlash,
    /// Path served when lookup finds nothing.
    pub default_route: Option<String>,
    /// Logs the route table when the application is built.
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "spangle".to_string(),
            routing: TrailingSlash::default(),
            default_route: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input or unknown
    /// policy names.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn routing(mut self, policy: TrailingSlash) -> Self {
        self.routing = policy;
        self
    }

    /// Sets the fallback path.
    #[must_use]
    pub fn default_route(mut self, path: impl Into<String>) -> Self {
        self.default_route = Some(path.into());
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.name, "spangle");
        assert_eq!(config.routing, TrailingSlash::NoSlash);
        assert!(config.default_route.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn test_from_json_partial() {
        let config = AppConfig::from_json(r#"{"name": "blog", "routing": "clone"}"#).unwrap();
        assert_eq!(config.name, "blog");
        assert_eq!(config.routing, TrailingSlash::Clone);
        assert!(!config.debug);
    }

    #[test]
    fn test_from_json_rejects_unknown_policy() {
        assert!(AppConfig::from_json(r#"{"routing": "sometimes"}"#).is_err());
    }

    #[test]
    fn test_serializes_policy_in_snake_case() {
        let json = serde_json::to_value(AppConfig::new().routing(TrailingSlash::NoSlash)).unwrap();
        assert_eq!(json["routing"], "no_slash");
        assert_eq!(json["default_route"], serde_json::Value::Null);
    }

    #[test]
    fn test_builder_setters() {
        let config = AppConfig::new()
            .name("shop")
            .routing(TrailingSlash::Strict)
            .default_route("/help")
            .debug(true);
        assert_eq!(config.name, "shop");
        assert_eq!(config.default_route.as_deref(), Some("/help"));
        assert!(config.debug);
    }
}
