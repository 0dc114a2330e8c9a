//! Error types for the waterfall pipeline and its transports.
//!
//! None of these are fatal to the pipeline. [`PipelineError`] values are
//! produced and recovered inside the frame path; [`TransportError`] values
//! surface as a connection-state transition or a logged send failure.

use std::io;

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Recoverable failures inside the frame-to-pixel path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// An inbound message failed decoding or shape validation.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Fewer PSD samples than display columns; the frame renders no row.
    #[error("insufficient data: {samples} samples for {width} columns")]
    InsufficientData { samples: usize, width: usize },

    /// Downsampling to zero columns was requested.
    #[error("invalid target width: {0}")]
    InvalidWidth(usize),

    /// A colour row does not match the pixel buffer width.
    #[error("row width mismatch: expected {expected}, got {actual}")]
    RowWidthMismatch { expected: usize, actual: usize },
}

impl PipelineError {
    /// Whether the banner should show this error to the user.
    ///
    /// Insufficient data and width mismatches happen routinely during
    /// resizes and are only logged.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::MalformedFrame(_))
    }
}

/// Failures raised by a transport implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The connection is gone; the message was not delivered.
    #[error("transport closed")]
    Closed,

    /// Underlying socket failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// Outbound message could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Bad address or other setup problem.
    #[error("transport configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_malformed_frames_reach_the_banner() {
        assert!(PipelineError::MalformedFrame("x".into()).is_user_visible());
        assert!(
            !PipelineError::InsufficientData {
                samples: 3,
                width: 10
            }
            .is_user_visible()
        );
        assert!(!PipelineError::InvalidWidth(0).is_user_visible());
    }

    #[test]
    fn display_messages_carry_context() {
        let e = PipelineError::InsufficientData {
            samples: 5,
            width: 80,
        };
        assert_eq!(e.to_string(), "insufficient data: 5 samples for 80 columns");
        let e = PipelineError::RowWidthMismatch {
            expected: 4,
            actual: 2,
        };
        assert_eq!(e.to_string(), "row width mismatch: expected 4, got 2");
    }
}
