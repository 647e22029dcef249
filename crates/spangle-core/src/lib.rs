//! Core types and dispatch for spangle.
//!
//! This crate provides the request-serving half of the framework:
//! - [`Request`] and [`Response`] boundary types handed over by a transport
//! - handler capabilities ([`Handler`], [`OnGet`], [`OnPost`], ...)
//! - the [`ComponentRegistry`] and ambient lookup through [`use_component`]
//! - [`Blueprint`]s, the [`AppBuilder`] and the built [`App`]
//! - request and streaming dispatch, hooks and error handlers
//!
//! # Design Principles
//!
//! - Routes, handlers and components are frozen at build time and shared
//!   read-only while serving
//! - One ambient frame per request, released on every exit path
//! - Every handler and hook invocation is a future
//! - All types support `Send + Sync`

#![forbid(unsafe_code)]

mod app;
mod blueprint;
mod component;
mod config;
mod context;
mod dispatch;
pub mod error;
mod handler;
mod hooks;
mod request;
mod response;
mod ws;

pub use app::{App, AppBuilder, RouteInfo};
pub use blueprint::{Blueprint, LifespanFn, RouteOptions};
pub use component::{Component, ComponentRegistry};
pub use config::AppConfig;
pub use context::{AppContext, RequestContext, current_app, current_request, use_component};
pub use error::{
    BoxError, BuildError, ComponentError, HttpError, LifespanError, LifespanPhase, UrlError,
    find_cause,
};
pub use handler::{
    AllowedMethods, BoxFuture, Exchange, Handler, HandlerResult, OnDelete, OnGet, OnPatch, OnPost,
    OnPut, OnRequest, OnWs,
};
pub use hooks::{ErrorHandler, ErrorHandlers, Flow, Hook};
pub use request::{Headers, Method, Request};
pub use response::Response;
pub use ws::{CLOSE_GOING_AWAY, CLOSE_NORMAL, CLOSE_PROTOCOL_ERROR, Connection, Session};

// Re-export the router types that appear in this crate's API
pub use spangle_router::{
    Converter, ConverterRegistry, ParamValue, PathParams, PatternError, RouterError, Segment,
    TrailingSlash,
};
