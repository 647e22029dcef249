//! Streaming dispatch tests against an in-memory connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use spangle_core::{
    App, BoxError, BoxFuture, CLOSE_GOING_AWAY, CLOSE_NORMAL, CLOSE_PROTOCOL_ERROR, Connection,
    ErrorHandler, Exchange, Flow, Handler, Hook, HttpError, OnWs, Session, use_component,
};
use thiserror::Error;

#[derive(Debug, Default)]
struct MockConn {
    closed_with: Option<u16>,
    sent: Vec<String>,
}

impl MockConn {
    fn send(&mut self, text: impl Into<String>) {
        self.sent.push(text.into());
    }
}

impl Connection for MockConn {
    fn close(&mut self, code: u16) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(async move {
            self.closed_with = Some(code);
            Ok(())
        })
    }

    fn is_closed(&self) -> bool {
        self.closed_with.is_some()
    }
}

#[derive(Debug, Error)]
#[error("peer misbehaved")]
struct PeerError;

#[derive(Default)]
struct Echo;

impl Handler for Echo {
    fn as_ws(&self) -> Option<&dyn OnWs> {
        Some(self)
    }
}

impl OnWs for Echo {
    fn on_ws<'a>(&'a self, session: &'a mut Session<'_>) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async move {
            match session.params.get("room") {
                Some(room) if room.as_str() == Some("broken") => Err(PeerError.into()),
                Some(room) if room.as_str() == Some("quiet") => {
                    session.conn.close(4000).await?;
                    Err(PeerError.into())
                }
                _ => Ok(()),
            }
        })
    }
}

#[derive(Default)]
struct HttpOnly;
impl Handler for HttpOnly {}

struct CloseGently;

impl ErrorHandler for CloseGently {
    fn on_ws_error<'a>(
        &'a self,
        session: &'a mut Session<'_>,
        _error: &'a BoxError,
    ) -> Option<BoxFuture<'a, Result<(), BoxError>>> {
        Some(Box::pin(async move { session.conn.close(4001).await }))
    }
}

#[derive(Default)]
struct Counter(AtomicUsize);
impl spangle_core::Component for Counter {}

struct CountAfter;

impl Hook for CountAfter {
    fn on_request<'a>(&'a self, _ex: &'a mut Exchange) -> BoxFuture<'a, Result<Flow, BoxError>> {
        Box::pin(async { Ok(Flow::Continue) })
    }

    fn on_ws<'a>(
        &'a self,
        _session: &'a mut Session<'_>,
    ) -> Option<BoxFuture<'a, Result<(), BoxError>>> {
        Some(Box::pin(async {
            use_component::<Counter>()?.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }
}

fn app() -> App {
    App::builder()
        .component(Counter::default())
        .after(CountAfter)
        .route::<Echo>("/rooms/{room}")
        .route::<HttpOnly>("/plain")
        .build()
        .unwrap()
}

fn after_hook_runs(app: &App) -> usize {
    let counter: Arc<Counter> = app.component().unwrap();
    counter.0.load(Ordering::SeqCst)
}

// ============================================================================
// ROUTING
// ============================================================================

#[tokio::test]
async fn test_unknown_path_closes_with_protocol_error() {
    let app = app();
    let mut conn = MockConn::default();
    let err = app.dispatch_ws("/nowhere", &mut conn).await.unwrap_err();
    assert_eq!(conn.closed_with, Some(CLOSE_PROTOCOL_ERROR));
    assert_eq!(err.downcast_ref::<HttpError>().map(HttpError::status), Some(404));
    assert_eq!(after_hook_runs(&app), 0);
}

#[tokio::test]
async fn test_handler_without_stream_capability_is_rejected() {
    let app = app();
    let mut conn = MockConn::default();
    assert!(app.dispatch_ws("/plain", &mut conn).await.is_err());
    assert_eq!(conn.closed_with, Some(CLOSE_PROTOCOL_ERROR));
}

// ============================================================================
// CLOSE CODES
// ============================================================================

#[tokio::test]
async fn test_normal_close_after_success() {
    let app = app();
    let mut conn = MockConn::default();
    conn.send("hello");
    app.dispatch_ws("/rooms/lobby", &mut conn).await.unwrap();
    assert_eq!(conn.closed_with, Some(CLOSE_NORMAL));
    assert_eq!(conn.sent, vec!["hello"]);
    assert_eq!(after_hook_runs(&app), 1);
}

#[tokio::test]
async fn test_unhandled_failure_closes_going_away() {
    let app = app();
    let mut conn = MockConn::default();
    let err = app.dispatch_ws("/rooms/broken", &mut conn).await.unwrap_err();
    assert!(err.downcast_ref::<PeerError>().is_some());
    assert_eq!(conn.closed_with, Some(CLOSE_GOING_AWAY));
    assert_eq!(after_hook_runs(&app), 1);
}

#[tokio::test]
async fn test_failure_after_close_propagates_untouched() {
    let app = app();
    let mut conn = MockConn::default();
    assert!(app.dispatch_ws("/rooms/quiet", &mut conn).await.is_err());
    assert_eq!(conn.closed_with, Some(4000));
}

#[tokio::test]
async fn test_error_handler_closes_connection() {
    let app = App::builder()
        .route::<Echo>("/rooms/{room}")
        .handle::<PeerError>(CloseGently)
        .build()
        .unwrap();
    let mut conn = MockConn::default();
    app.dispatch_ws("/rooms/broken", &mut conn).await.unwrap();
    assert_eq!(conn.closed_with, Some(4001));
}

#[tokio::test]
async fn test_mounted_streaming_route() {
    let app = App::builder().mount("/chat", app()).build().unwrap();
    let mut conn = MockConn::default();
    app.dispatch_ws("/chat/rooms/lobby", &mut conn).await.unwrap();
    assert_eq!(conn.closed_with, Some(CLOSE_NORMAL));
}
