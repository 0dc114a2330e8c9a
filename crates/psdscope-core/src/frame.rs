//! Wire records exchanged with the streaming source.
//!
//! Inbound text messages are JSON objects carrying a `psd` array of numbers
//! and a `classification` string. Extra fields are ignored. Outbound messages
//! are tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// One PSD time slice plus the upstream classifier's label for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub psd: Vec<f64>,
    pub classification: String,
}

impl Frame {
    pub fn new(psd: Vec<f64>, classification: impl Into<String>) -> Self {
        Self {
            psd,
            classification: classification.into(),
        }
    }

    /// Serialize as a single-line JSON record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Decode and shape-check one inbound text message.
///
/// Messages longer than `max_bytes` are rejected before parsing.
pub fn decode_frame(text: &str, max_bytes: usize) -> PipelineResult<Frame> {
    if text.len() > max_bytes {
        return Err(PipelineError::MalformedFrame(format!(
            "message of {} bytes exceeds the {max_bytes} byte limit",
            text.len()
        )));
    }
    serde_json::from_str::<Frame>(text).map_err(|e| PipelineError::MalformedFrame(e.to_string()))
}

/// Messages the client may send upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Ask the source to push a fresh frame now.
    RequestUpdate,
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1 << 20;

    #[test]
    fn decodes_valid_frame() {
        let f = decode_frame(r#"{"psd":[0.1,2,3.5],"classification":"WiFi"}"#, LIMIT).unwrap();
        assert_eq!(f.psd, vec![0.1, 2.0, 3.5]);
        assert_eq!(f.classification, "WiFi");
    }

    #[test]
    fn ignores_unknown_fields() {
        let f = decode_frame(
            r#"{"psd":[1],"classification":"Bluetooth","ts":123}"#,
            LIMIT,
        )
        .unwrap();
        assert_eq!(f.classification, "Bluetooth");
    }

    #[test]
    fn missing_psd_is_malformed() {
        let err = decode_frame(r#"{"classification":"WiFi"}"#, LIMIT).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedFrame(ref m) if m.contains("psd")));
    }

    #[test]
    fn missing_classification_is_malformed() {
        assert!(matches!(
            decode_frame(r#"{"psd":[1,2]}"#, LIMIT),
            Err(PipelineError::MalformedFrame(_))
        ));
    }

    #[test]
    fn wrong_types_are_malformed() {
        for bad in [
            r#"{"psd":"nope","classification":"WiFi"}"#,
            r#"{"psd":[1,"x"],"classification":"WiFi"}"#,
            r#"{"psd":[1],"classification":7}"#,
            r#"[1,2,3]"#,
            "not json",
            "",
        ] {
            assert!(
                matches!(decode_frame(bad, LIMIT), Err(PipelineError::MalformedFrame(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn oversized_message_is_malformed() {
        let text = r#"{"psd":[1,2,3],"classification":"WiFi"}"#;
        assert!(matches!(
            decode_frame(text, 8),
            Err(PipelineError::MalformedFrame(_))
        ));
    }

    #[test]
    fn request_update_wire_format() {
        assert_eq!(
            OutboundMessage::RequestUpdate.to_json().unwrap(),
            r#"{"type":"request_update"}"#
        );
        let parsed: OutboundMessage = serde_json::from_str(r#"{"type":"request_update"}"#).unwrap();
        assert_eq!(parsed, OutboundMessage::RequestUpdate);
    }

    #[test]
    fn frame_json_is_single_line() {
        let json = Frame::new(vec![0.0, 1.0], "WiFi").to_json().unwrap();
        assert!(!json.contains('\n'));
        assert_eq!(decode_frame(&json, LIMIT).unwrap().classification, "WiFi");
    }
}
