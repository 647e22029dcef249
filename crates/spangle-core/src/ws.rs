//! Streaming (WebSocket) connections.
//!
//! The transport owns the socket; the core only needs to close it.

use spangle_router::PathParams;

use crate::context::RequestContext;
use crate::error::BoxError;
use crate::handler::BoxFuture;

/// Close code after a handler returned normally.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code after a handler failed.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close code for a path with no streaming handler.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;

/// A transport-owned streaming connection.
pub trait Connection: Send {
    /// Closes the connection with `code`.
    fn close(&mut self, code: u16) -> BoxFuture<'_, Result<(), BoxError>>;

    /// Whether the connection has been closed.
    fn is_closed(&self) -> bool;
}

/// Everything one streaming invocation sees.
pub struct Session<'c> {
    /// The connection.
    pub conn: &'c mut dyn Connection,
    /// Converted path parameters.
    pub params: PathParams,
    /// The request's context.
    pub ctx: RequestContext,
}

impl Session<'_> {
    /// Closes the connection unless it is already closed.
    pub async fn close_if_open(&mut self, code: u16) -> Result<(), BoxError> {
        if !self.conn.is_closed() {
            self.conn.close(code).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("closed", &self.conn.is_closed())
            .field("params", &self.params)
            .field("ctx", &self.ctx)
            .finish()
    }
}
