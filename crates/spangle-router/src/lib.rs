//! Segment trie router.
//!
//! This crate provides the path-matching half of the spangle framework.
//! It is generic over the value bound to a route, so it knows nothing about
//! requests, responses, or handlers.
//!
//! # Features
//!
//! - Route templates with `{name}` / `{name:converter}` placeholders
//! - Typed converters (`int`, `float`, `str`, `rest_string`) plus user converters
//! - Wildcard segments (`{path:*rest_string}`) that may span separators
//! - Literal-over-dynamic precedence with backtracking
//! - Four trailing-slash policies (`no_slash`, `slash`, `strict`, `clone`)
//!
//! # Example
//!
//! ```
//! use spangle_router::{ConverterRegistry, ParamValue, RouteLookup, Router};
//!
//! let mut router = Router::new();
//! router
//!     .insert("/items/{id:int}", "item", &ConverterRegistry::new(), None)
//!     .unwrap();
//!
//! match router.at("/items/42") {
//!     RouteLookup::Match(m) => {
//!         assert_eq!(*m.value, "item");
//!         assert_eq!(m.params.get("id"), Some(&ParamValue::Int(42)));
//!     }
//!     other => panic!("unexpected lookup: {other:?}"),
//! }
//! ```

#![warn(unsafe_code)]

mod converter;
mod r#match;
mod pattern;
mod slash;
mod trie;

pub use converter::{ConversionError, Converter, ConverterRegistry, ConverterScope, ParamValue};
pub use r#match::{PathParams, RouteLookup, RouteMatch};
pub use pattern::{
    CompiledPattern, PatternError, Placeholder, RenderError, RoutePattern, Segment, split_path,
};
pub use slash::{
    BindingKind, PERMANENT_REDIRECT, Resolution, SlashVariant, TrailingSlash, resolve as resolve_slash,
};
pub use trie::{RouteConflictError, RouteEntry, Router, RouterError};
