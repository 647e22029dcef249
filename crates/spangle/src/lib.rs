//! Routing and per-request component resolution for async Rust services.
//!
//! spangle provides:
//!
//! - **Typed path routing**: a segment trie with converters, wildcards and
//!   four trailing-slash policies
//! - **Capability handlers**: a handler exposes the verbs it serves
//! - **Ambient components**: singletons reachable from anywhere inside a
//!   request through [`use_component`]
//! - **Blueprints**: prefixable bundles of routes, hooks and error handlers
//!
//! # Quick Start
//!
//! ```
//! use spangle::prelude::*;
//!
//! #[derive(Debug)]
//! struct Motd(&'static str);
//! impl Component for Motd {}
//!
//! #[derive(Default)]
//! struct Item;
//!
//! impl Handler for Item {
//!     fn as_get(&self) -> Option<&dyn OnGet> {
//!         Some(self)
//!     }
//! }
//!
//! impl OnGet for Item {
//!     fn on_get<'a>(&'a self, ex: &'a mut Exchange) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             let motd = use_component::<Motd>()?;
//!             let id = ex.params.get("id").and_then(ParamValue::as_int).unwrap_or_default();
//!             Ok(Some(Response::ok().body_text(format!("{} #{id}", motd.0))))
//!         })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = App::builder()
//!     .component(Motd("item"))
//!     .blueprint("/shop", Blueprint::new().route::<Item>("/items/{id:int}"))
//!     .build()
//!     .unwrap();
//!
//! let resp = app.dispatch(Request::get("/shop/items/42")).await.unwrap();
//! assert_eq!(resp.text(), Some("item #42"));
//! # }
//! ```
//!
//! # Crate Structure
//!
//! - [`spangle_router`]: pattern compiler, converters, trie, slash policies
//! - [`spangle_core`]: handlers, components, context, blueprints, dispatch

#![forbid(unsafe_code)]

// Re-export crates
pub use spangle_core as core;
pub use spangle_router as router;

// Re-export commonly used types
pub use spangle_core::{
    App, AppBuilder, AppConfig, AppContext, Blueprint, BoxError, BoxFuture, BuildError, Component,
    ComponentError, Connection, ErrorHandler, Exchange, Flow, Handler, HandlerResult, Hook,
    HttpError, Method, OnDelete, OnGet, OnPatch, OnPost, OnPut, OnRequest, OnWs, Request,
    RequestContext, Response, RouteInfo, RouteOptions, Session, current_app, current_request,
    find_cause, use_component,
};
pub use spangle_router::{Converter, ParamValue, PathParams, Router, TrailingSlash};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        App, AppConfig, Blueprint, BoxError, BoxFuture, Component, ErrorHandler, Exchange, Flow,
        Handler, HandlerResult, Hook, HttpError, Method, OnDelete, OnGet, OnPatch, OnPost, OnPut,
        OnRequest, OnWs, ParamValue, PathParams, Request, Response, RouteOptions, Session,
        TrailingSlash, use_component,
    };
    pub use serde::{Deserialize, Serialize};
}
