//! Interface to the streaming source.
//!
//! The pipeline never touches sockets. A transport implementation reports
//! lifecycle signals as [`TransportEvent`]s and accepts outbound text through
//! an [`Outbound`] handle.

use crate::error::TransportError;

/// WebSocket-style close code for an orderly shutdown.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code for a connection that dropped without a close handshake.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Lifecycle signals from the source, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    /// A message the transport could not deliver as text (invalid UTF-8, or
    /// longer than the transport's line limit). Carries the reason.
    Undecodable(String),
    Error(String),
    Close {
        code: u16,
        reason: String,
        was_clean: bool,
    },
}

impl TransportEvent {
    pub fn clean_close(reason: impl Into<String>) -> Self {
        Self::Close {
            code: CLOSE_NORMAL,
            reason: reason.into(),
            was_clean: true,
        }
    }

    pub fn abnormal_close(reason: impl Into<String>) -> Self {
        Self::Close {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

/// Write half of a transport.
pub trait Outbound: Send {
    /// Hand one text message to the transport. Must not block.
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Release the connection. Idempotent.
    fn close(&mut self);
}

/// Outbound sink for pipelines that have no upstream channel (replay, tests).
#[derive(Debug, Default)]
pub struct NullOutbound;

impl Outbound for NullOutbound {
    fn send_text(&mut self, _text: String) -> Result<(), TransportError> {
        Err(TransportError::Closed)
    }

    fn close(&mut self) {}
}
