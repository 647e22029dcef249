//! Request dispatch.
//!
//! One HTTP request moves through these stages:
//!
//! ```text
//! Received -> Routed -> ContextPushed -> BeforeHooksRun -> HandlerRun
//!          -> AfterHooksRun -> ContextPopped -> Done
//! ```
//!
//! A failure at any stage after the context is pushed diverts to
//! `ErrorHandlerLookup`, which either runs a matching error handler or
//! propagates the error after the context is popped. The context frame is
//! a task-local scope, so it is popped on every exit path, including the
//! caller dropping the dispatch future.

use tracing::Instrument;

use spangle_router::{PathParams, RouteLookup};

use crate::app::{App, Route};
use crate::blueprint::normalize_prefix;
use crate::context::{Frame, enter};
use crate::error::{BoxError, HttpError};
use crate::handler::{BoxFuture, Exchange, Handler, invoke};
use crate::hooks::Flow;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::ws::{CLOSE_GOING_AWAY, CLOSE_NORMAL, CLOSE_PROTOCOL_ERROR, Connection, Session};

#[derive(Debug, Clone, Copy)]
enum Stage {
    Received,
    Routed,
    ContextPushed,
    BeforeHooksRun,
    ShortCircuited,
    HandlerRun,
    AfterHooksRun,
    ErrorHandlerLookup,
    ErrorHandlerRun,
    ContextPopped,
}

fn stage(stage: Stage) {
    tracing::trace!(?stage, "dispatch");
}

enum Target<'r> {
    Handler(&'r Route),
    Redirect { location: String, status: u16 },
    Missing,
}

impl App {
    /// Dispatches one HTTP request.
    ///
    /// Errors that no error handler claims are returned unchanged, except
    /// [`HttpError`], which is rendered into its response.
    pub fn dispatch(&self, request: Request) -> BoxFuture<'_, Result<Response, BoxError>> {
        Box::pin(self.serve(request))
    }

    /// Dispatches one streaming connection to the handler bound to `path`.
    ///
    /// Close codes: `1002` when nothing streams at `path`, `1000` after the
    /// handler returns with the connection still open, `1001` after a
    /// failure.
    pub fn dispatch_ws<'a>(
        &'a self,
        path: &'a str,
        conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.serve_ws(path, conn))
    }

    /// Finds the mounted application serving `path`, with the prefix it
    /// strips and the path it sees.
    fn mounted(&self, path: &str) -> Option<(&App, &str, String)> {
        let normalized = normalize_prefix(path);
        let (prefix, app) = self
            .inner
            .mounts
            .iter()
            .find(|(prefix, _)| normalized.starts_with(prefix.as_str()))?;
        let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
        let rest = path.replacen(trimmed, "", 1);
        let rest = if rest.is_empty() { "/".to_string() } else { rest };
        Some((app, trimmed, rest))
    }

    fn lookup(&self, path: &str) -> RouteLookup<'_, Route> {
        let found = self.inner.router.at(path);
        if found.is_not_found() {
            if let Some(fallback) = &self.inner.config.default_route {
                return self.inner.router.at(fallback);
            }
        }
        found
    }

    async fn serve(&self, mut request: Request) -> Result<Response, BoxError> {
        if let Some((app, prefix, path)) = self.mounted(request.path()) {
            tracing::trace!(from = request.path(), to = %path, "delegating to mounted app");
            request.enter_mount(prefix, path);
            return app.dispatch(request).await;
        }

        let ctx = self.next_request();
        let span = tracing::trace_span!(
            "request",
            app = %self.inner.config.name,
            request_id = ctx.request_id(),
            method = %request.method(),
            path = request.path(),
        );
        let result = async move {
            stage(Stage::Received);
            let (params, target) = match self.lookup(request.path()) {
                RouteLookup::Match(found) => (found.params, Target::Handler(found.value)),
                RouteLookup::Redirect { location, status } => (
                    PathParams::new(),
                    Target::Redirect { location, status },
                ),
                RouteLookup::NotFound => (PathParams::new(), Target::Missing),
            };
            stage(Stage::Routed);
            let ex = Exchange::new(request, params, ctx.clone());
            enter(Frame::for_request(ctx), self.run(ex, target)).await
        }
        .instrument(span.clone())
        .await;
        span.in_scope(|| stage(Stage::ContextPopped));
        result
    }

    async fn run(&self, mut ex: Exchange, target: Target<'_>) -> Result<Response, BoxError> {
        stage(Stage::ContextPushed);
        match self.drive(&mut ex, target).await {
            Ok(()) => Ok(ex.response),
            Err(err) => self.recover(ex, err).await,
        }
    }

    async fn drive(&self, ex: &mut Exchange, target: Target<'_>) -> Result<(), BoxError> {
        for hook in &self.inner.before {
            if let Flow::Respond(resp) = hook.on_request(ex).await? {
                ex.response = resp;
                stage(Stage::ShortCircuited);
                return Ok(());
            }
        }
        stage(Stage::BeforeHooksRun);

        match target {
            Target::Missing => return Err(HttpError::not_found(ex.request.path()).into()),
            Target::Redirect { location, status } => {
                let root = ex.request.root_path();
                let location = match ex.request.query() {
                    Some(query) => format!("{root}{location}?{query}"),
                    None => format!("{root}{location}"),
                };
                ex.response = Response::redirect(location, status);
            }
            Target::Handler(route) => {
                let method = ex.request.method();
                if !route.allowed.contains(method) {
                    return Err(HttpError::method_not_allowed(method, &route.allowed).into());
                }
                if method == Method::Options {
                    ex.response
                        .headers_mut()
                        .insert("allow", route.allowed.header_value());
                }
                invoke(route.handler.as_ref(), ex).await?;
            }
        }
        stage(Stage::HandlerRun);

        for hook in &self.inner.after {
            if let Flow::Respond(resp) = hook.on_request(ex).await? {
                ex.response = resp;
            }
        }
        stage(Stage::AfterHooksRun);
        Ok(())
    }

    async fn recover(&self, mut ex: Exchange, err: BoxError) -> Result<Response, BoxError> {
        stage(Stage::ErrorHandlerLookup);
        ex.response = Response::with_status(500);
        if let Some(result) = self.inner.errors.dispatch_http(&mut ex, &err).await {
            stage(Stage::ErrorHandlerRun);
            return Ok(result?.unwrap_or(ex.response));
        }
        if let Some(http) = err.downcast_ref::<HttpError>() {
            tracing::debug!(status = http.status(), "rendering http error");
            return Ok(http.to_response());
        }
        tracing::warn!(error = %err, "unhandled error");
        Err(err)
    }

    async fn serve_ws(&self, path: &str, conn: &mut dyn Connection) -> Result<(), BoxError> {
        if let Some((app, _, rest)) = self.mounted(path) {
            return app.dispatch_ws(&rest, conn).await;
        }

        let found = match self.inner.router.at(path) {
            RouteLookup::Match(found) if found.value.handler.as_ws().is_some() => found,
            _ => {
                conn.close(CLOSE_PROTOCOL_ERROR).await?;
                return Err(HttpError::not_found(path).into());
            }
        };

        let ctx = self.next_request();
        let span = tracing::trace_span!(
            "websocket",
            app = %self.inner.config.name,
            request_id = ctx.request_id(),
            path,
        );
        let handler = found.value.handler.as_ref();
        let mut session = Session {
            conn,
            params: found.params,
            ctx: ctx.clone(),
        };
        enter(Frame::for_request(ctx), self.run_ws(handler, &mut session))
            .instrument(span)
            .await
    }

    async fn run_ws(&self, handler: &dyn Handler, session: &mut Session<'_>) -> Result<(), BoxError> {
        let mut outcome = match self.drive_ws(handler, session).await {
            Ok(()) => session.close_if_open(CLOSE_NORMAL).await,
            Err(err) => self.recover_ws(session, err).await,
        };
        for hook in &self.inner.after {
            if let Some(fut) = hook.on_ws(session) {
                if let Err(err) = fut.await {
                    if outcome.is_ok() {
                        outcome = Err(err);
                    }
                }
            }
        }
        outcome
    }

    async fn drive_ws(&self, handler: &dyn Handler, session: &mut Session<'_>) -> Result<(), BoxError> {
        for hook in &self.inner.before {
            if let Some(fut) = hook.on_ws(session) {
                fut.await?;
            }
        }
        if session.conn.is_closed() {
            tracing::debug!("connection closed by a before-hook");
            return Ok(());
        }
        match handler.as_ws() {
            Some(cap) => cap.on_ws(session).await,
            None => Ok(()),
        }
    }

    async fn recover_ws(&self, session: &mut Session<'_>, err: BoxError) -> Result<(), BoxError> {
        if session.conn.is_closed() {
            return Err(err);
        }
        if let Some(result) = self.inner.errors.dispatch_ws(session, &err).await {
            result?;
            return session.close_if_open(CLOSE_GOING_AWAY).await;
        }
        session.close_if_open(CLOSE_GOING_AWAY).await?;
        tracing::warn!(error = %err, "unhandled websocket error");
        Err(err)
    }
}
