//! Pipeline configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::colormap::Rgba;

/// Tunables for a [`crate::Waterfall`]. Missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterfallConfig {
    /// Render cadence window in milliseconds.
    pub cadence_ms: u64,
    /// Colour the raster is cleared to.
    pub background: Rgba,
    /// Label shown before the first valid frame arrives.
    pub default_classification: String,
    /// Inbound messages longer than this are treated as malformed.
    pub max_frame_bytes: usize,
}

impl Default for WaterfallConfig {
    fn default() -> Self {
        Self {
            cadence_ms: 50,
            background: Rgba::BLACK,
            default_classification: "Unknown".to_string(),
            max_frame_bytes: 1 << 20,
        }
    }
}

impl WaterfallConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }

    /// Load from a JSON file. A zero cadence window is rejected.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if config.cadence_ms == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "cadence_ms must be at least 1",
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = WaterfallConfig::default();
        assert_eq!(c.cadence(), Duration::from_millis(50));
        assert_eq!(c.background, Rgba::BLACK);
        assert_eq!(c.default_classification, "Unknown");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let c: WaterfallConfig = serde_json::from_str(r#"{"cadence_ms": 100}"#).unwrap();
        assert_eq!(c.cadence_ms, 100);
        assert_eq!(c.max_frame_bytes, 1 << 20);
    }

    #[test]
    fn background_from_json() {
        let c: WaterfallConfig =
            serde_json::from_str(r#"{"background": {"r": 1, "g": 2, "b": 3, "a": 255}}"#).unwrap();
        assert_eq!(c.background, Rgba::opaque(1, 2, 3));
    }

    #[test]
    fn zero_cadence_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("psdscope-cfg-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"cadence_ms": 0}"#).unwrap();
        let err = WaterfallConfig::from_path(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(WaterfallConfig::from_path(Path::new("/nonexistent/psdscope.json")).is_err());
    }
}
