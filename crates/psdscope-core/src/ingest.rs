//! Stream ingest: connection state machine, frame validation, outbound sends.
//!
//! ```text
//!   Connecting ──open──▸ Connected ──close(clean)───▸ Disconnected
//!       │                    └──error / close(unclean)──▸ Errored(msg)
//!       └──error / close──▸ Disconnected | Errored(msg)
//! ```
//!
//! Terminal states never transition again; a new connection means a new
//! [`StreamIngest`].

use std::fmt;

use crate::colormap::Rgba;
use crate::error::PipelineError;
use crate::frame::{Frame, OutboundMessage, decode_frame};
use crate::transport::{Outbound, TransportEvent};

/// Connection status as observed by the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Errored(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Errored(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Errored(_) => "Error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting..."),
            Self::Errored(msg) => write!(f, "Error: {msg}"),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Most recently observed classification label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationState {
    label: String,
}

impl ClassificationState {
    pub fn new(default_label: impl Into<String>) -> Self {
        Self {
            label: default_label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn set(&mut self, label: String) {
        self.label = label;
    }
}

impl Default for ClassificationState {
    fn default() -> Self {
        Self::new("Unknown")
    }
}

/// Badge colour for a classification label.
pub fn badge_color(label: &str) -> Rgba {
    match label {
        "WiFi" => Rgba::opaque(0x1E, 0x88, 0xE5),
        "Bluetooth" => Rgba::opaque(0x43, 0xA0, 0x47),
        _ => Rgba::opaque(0x75, 0x75, 0x75),
    }
}

/// What became of one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Valid frame; classification already updated.
    Accepted(Frame),
    /// Failed decoding; the banner carries the notice.
    Rejected(PipelineError),
    /// Arrived outside the `Connected` state and was discarded.
    Ignored,
}

/// Result of a best-effort [`StreamIngest::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    NotConnected,
    Failed,
}

/// Per-connection message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub accepted: u64,
    pub malformed: u64,
    pub ignored: u64,
}

/// Owner of connection and classification state for one connection attempt.
pub struct StreamIngest {
    state: ConnectionState,
    classification: ClassificationState,
    banner: Option<String>,
    outbound: Box<dyn Outbound>,
    max_frame_bytes: usize,
    stats: IngestStats,
}

impl StreamIngest {
    pub fn new(
        outbound: Box<dyn Outbound>,
        default_classification: impl Into<String>,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            state: ConnectionState::Connecting,
            classification: ClassificationState::new(default_classification),
            banner: None,
            outbound,
            max_frame_bytes,
            stats: IngestStats::default(),
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn classification(&self) -> &str {
        self.classification.label()
    }

    /// Most recent non-fatal error, until dismissed.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Dispatch one lifecycle event to its transition.
    pub fn handle(&mut self, event: TransportEvent) -> Option<MessageOutcome> {
        match event {
            TransportEvent::Open => {
                self.on_open();
                None
            }
            TransportEvent::Message(text) => Some(self.on_message(&text)),
            TransportEvent::Undecodable(reason) => Some(self.on_undecodable(reason)),
            TransportEvent::Error(msg) => {
                self.on_error(msg);
                None
            }
            TransportEvent::Close {
                code,
                reason,
                was_clean,
            } => {
                self.on_close(code, &reason, was_clean);
                None
            }
        }
    }

    pub fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            log::debug!("ignoring open while {}", self.state.label());
            return;
        }
        log::info!("connected to stream source");
        self.state = ConnectionState::Connected;
    }

    pub fn on_message(&mut self, text: &str) -> MessageOutcome {
        if !self.admit_message() {
            return MessageOutcome::Ignored;
        }
        match decode_frame(text, self.max_frame_bytes) {
            Ok(frame) => {
                self.stats.accepted += 1;
                self.classification.set(frame.classification.clone());
                MessageOutcome::Accepted(frame)
            }
            Err(e) => self.reject(e),
        }
    }

    /// A message the transport could not turn into text.
    pub fn on_undecodable(&mut self, reason: String) -> MessageOutcome {
        if !self.admit_message() {
            return MessageOutcome::Ignored;
        }
        self.reject(PipelineError::MalformedFrame(reason))
    }

    /// Count an inbound message; `false` when it arrived outside `Connected`.
    fn admit_message(&mut self) -> bool {
        self.stats.received += 1;
        if self.state.is_connected() {
            return true;
        }
        self.stats.ignored += 1;
        log::warn!("discarding message received while {}", self.state.label());
        false
    }

    fn reject(&mut self, e: PipelineError) -> MessageOutcome {
        self.stats.malformed += 1;
        log::warn!("{e}");
        self.banner = Some("Received malformed data.".to_string());
        MessageOutcome::Rejected(e)
    }

    pub fn on_error(&mut self, message: String) {
        if self.state.is_terminal() {
            log::debug!("ignoring transport error after close: {message}");
            return;
        }
        let message = if message.is_empty() {
            "transport error".to_string()
        } else {
            message
        };
        log::error!("stream transport error: {message}");
        self.banner = Some(format!("Connection error: {message}"));
        self.state = ConnectionState::Errored(message);
    }

    pub fn on_close(&mut self, code: u16, reason: &str, was_clean: bool) {
        if self.state.is_terminal() {
            log::debug!("ignoring close (code={code}) in terminal state");
            return;
        }
        if was_clean {
            log::info!("connection closed cleanly, code={code} reason={reason}");
            self.state = ConnectionState::Disconnected;
        } else {
            log::warn!("connection died unexpectedly, code={code} reason={reason}");
            let message = if reason.is_empty() {
                format!("connection lost (code {code})")
            } else {
                format!("connection lost: {reason} (code {code})")
            };
            self.banner = Some("Connection lost.".to_string());
            self.state = ConnectionState::Errored(message);
        }
    }

    /// Best-effort send; a no-op unless connected. Nothing is queued.
    pub fn send(&mut self, message: &OutboundMessage) -> SendOutcome {
        if !self.state.is_connected() {
            log::info!("not connected, dropping outbound {message:?}");
            return SendOutcome::NotConnected;
        }
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                log::error!("failed to encode {message:?}: {e}");
                return SendOutcome::Failed;
            }
        };
        match self.outbound.send_text(text) {
            Ok(()) => SendOutcome::Sent,
            Err(e) => {
                log::warn!("send failed: {e}");
                SendOutcome::Failed
            }
        }
    }

    /// Release the transport. Further events are the transport's last words.
    pub fn close(&mut self) {
        self.outbound.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::TransportError;

    #[derive(Default, Clone)]
    struct Recorder {
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl Outbound for Recorder {
        fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    fn ingest() -> (StreamIngest, Recorder) {
        let rec = Recorder::default();
        let ingest = StreamIngest::new(Box::new(rec.clone()), "Unknown", 1 << 20);
        (ingest, rec)
    }

    fn connected() -> (StreamIngest, Recorder) {
        let (mut i, rec) = ingest();
        i.on_open();
        (i, rec)
    }

    #[test]
    fn starts_connecting_with_default_label() {
        let (i, _) = ingest();
        assert_eq!(i.state(), &ConnectionState::Connecting);
        assert_eq!(i.classification(), "Unknown");
        assert!(i.banner().is_none());
    }

    #[test]
    fn open_connects() {
        let (i, _) = connected();
        assert!(i.state().is_connected());
    }

    #[test]
    fn valid_frame_updates_classification() {
        let (mut i, _) = connected();
        let out = i.on_message(r#"{"psd":[1,2,3],"classification":"WiFi"}"#);
        assert!(matches!(out, MessageOutcome::Accepted(ref f) if f.psd.len() == 3));
        assert_eq!(i.classification(), "WiFi");
    }

    #[test]
    fn missing_psd_is_malformed_and_state_unchanged() {
        let (mut i, _) = connected();
        let out = i.on_message(r#"{"classification":"WiFi"}"#);
        assert!(matches!(
            out,
            MessageOutcome::Rejected(PipelineError::MalformedFrame(_))
        ));
        assert_eq!(i.state(), &ConnectionState::Connected);
        assert_eq!(i.classification(), "Unknown");
        assert_eq!(i.banner(), Some("Received malformed data."));
        assert_eq!(i.stats().malformed, 1);
    }

    #[test]
    fn undecodable_bytes_are_malformed() {
        let (mut i, _) = connected();
        let out = i.handle(TransportEvent::Undecodable("invalid utf-8 at byte 33".into()));
        assert!(matches!(
            out,
            Some(MessageOutcome::Rejected(PipelineError::MalformedFrame(_)))
        ));
        assert_eq!(i.state(), &ConnectionState::Connected);
        assert_eq!(i.classification(), "Unknown");
        assert_eq!(i.banner(), Some("Received malformed data."));
        assert_eq!(i.stats().received, 1);
        assert_eq!(i.stats().malformed, 1);
    }

    #[test]
    fn banner_is_dismissable() {
        let (mut i, _) = connected();
        i.on_message("garbage");
        assert!(i.banner().is_some());
        i.dismiss_banner();
        assert!(i.banner().is_none());
    }

    #[test]
    fn messages_before_open_are_ignored() {
        let (mut i, _) = ingest();
        let out = i.on_message(r#"{"psd":[1],"classification":"WiFi"}"#);
        assert_eq!(out, MessageOutcome::Ignored);
        assert_eq!(i.classification(), "Unknown");
    }

    #[test]
    fn clean_close_disconnects() {
        let (mut i, _) = connected();
        i.on_close(1000, "bye", true);
        assert_eq!(i.state(), &ConnectionState::Disconnected);
        assert!(i.banner().is_none());
    }

    #[test]
    fn unclean_close_errors_with_message() {
        let (mut i, _) = connected();
        i.on_close(1006, "", false);
        match i.state() {
            ConnectionState::Errored(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Errored, got {other:?}"),
        }
        assert_eq!(i.banner(), Some("Connection lost."));
    }

    #[test]
    fn transport_error_is_errored() {
        let (mut i, _) = connected();
        i.on_error("connection reset".into());
        assert_eq!(
            i.state(),
            &ConnectionState::Errored("connection reset".into())
        );
    }

    #[test]
    fn empty_error_message_is_replaced() {
        let (mut i, _) = connected();
        i.on_error(String::new());
        assert_eq!(
            i.state(),
            &ConnectionState::Errored("transport error".into())
        );
    }

    #[test]
    fn terminal_states_do_not_resurrect() {
        let (mut i, _) = connected();
        i.on_close(1000, "", true);
        i.on_open();
        assert_eq!(i.state(), &ConnectionState::Disconnected);
        i.on_error("late".into());
        assert_eq!(i.state(), &ConnectionState::Disconnected);

        let (mut j, _) = connected();
        j.on_error("boom".into());
        j.on_close(1006, "", false);
        assert_eq!(j.state(), &ConnectionState::Errored("boom".into()));
    }

    #[test]
    fn connect_failure_goes_straight_to_errored() {
        let (mut i, _) = ingest();
        i.on_error("connection refused".into());
        assert!(matches!(i.state(), ConnectionState::Errored(_)));
    }

    #[test]
    fn send_while_connected_reaches_transport() {
        let (mut i, rec) = connected();
        assert_eq!(i.send(&OutboundMessage::RequestUpdate), SendOutcome::Sent);
        assert_eq!(
            rec.sent.lock().unwrap().as_slice(),
            [r#"{"type":"request_update"}"#.to_string()]
        );
    }

    #[test]
    fn send_while_not_connected_is_noop() {
        let (mut i, rec) = ingest();
        assert_eq!(
            i.send(&OutboundMessage::RequestUpdate),
            SendOutcome::NotConnected
        );
        i.on_open();
        i.on_close(1000, "", true);
        assert_eq!(
            i.send(&OutboundMessage::RequestUpdate),
            SendOutcome::NotConnected
        );
        assert!(rec.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn handle_dispatches_each_event() {
        let (mut i, _) = ingest();
        assert!(i.handle(TransportEvent::Open).is_none());
        assert!(matches!(
            i.handle(TransportEvent::Message(
                r#"{"psd":[1],"classification":"Bluetooth"}"#.into()
            )),
            Some(MessageOutcome::Accepted(_))
        ));
        i.handle(TransportEvent::clean_close("done"));
        assert_eq!(i.state(), &ConnectionState::Disconnected);
    }

    #[test]
    fn close_releases_outbound() {
        let (mut i, rec) = connected();
        i.close();
        assert!(*rec.closed.lock().unwrap());
    }

    #[test]
    fn status_text() {
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting...");
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionState::Errored("x".into()).to_string(),
            "Error: x"
        );
    }

    #[test]
    fn badge_colors() {
        assert_eq!(badge_color("WiFi"), Rgba::opaque(0x1E, 0x88, 0xE5));
        assert_eq!(badge_color("Bluetooth"), Rgba::opaque(0x43, 0xA0, 0x47));
        assert_eq!(badge_color("Unknown"), badge_color("Zigbee"));
    }
}
