//! # psdscope-core
//!
//! **Streaming spectra in, scrolling spectrogram out.**
//!
//! `psdscope-core` turns a live stream of power-spectral-density frames into a
//! waterfall raster: each accepted frame becomes one row at the bottom of the
//! image and older rows scroll up and off the top.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::{Duration, Instant};
//! use psdscope_core::{NullOutbound, TransportEvent, Waterfall, WaterfallConfig};
//!
//! let mut wf = Waterfall::new(&WaterfallConfig::default(), Box::new(NullOutbound), 64, 32);
//! let t0 = Instant::now();
//! wf.handle_event(TransportEvent::Open, t0);
//! let text = r#"{"psd":[0.5,0.5,0.5,0.5],"classification":"WiFi"}"#;
//! wf.handle_event(TransportEvent::Message(text.to_string()), t0);
//! // 4 samples cannot fill 64 columns, so nothing is drawn, but the label updates.
//! wf.tick(t0 + Duration::from_millis(50));
//! assert_eq!(wf.classification(), "WiFi");
//! ```
//!
//! ## Architecture
//!
//! Source → StreamIngest → FrameScheduler → downsample → ColorMap → ScrollCompositor
//!
//! - **StreamIngest** validates frames and owns connection / classification state.
//! - **FrameScheduler** admits the first frame per cadence window and drops the rest.
//! - **downsample** block-averages a frame to the raster width.
//! - **ColorMap** maps each column's magnitude to a jet-ramp colour.
//! - **ScrollCompositor** shifts the raster up one row and writes the new row.
//!
//! Nothing here does I/O. Transports live in `psdscope-stream` and talk to the
//! pipeline through [`TransportEvent`] and [`Outbound`].

pub mod colormap;
pub mod compositor;
pub mod config;
pub mod downsample;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod scheduler;
pub mod transport;
pub mod waterfall;

pub use colormap::{ColorMapTable, Rgba, intensity_index, jet};
pub use compositor::{PixelBuffer, ScrollCompositor};
pub use config::WaterfallConfig;
pub use downsample::downsample;
pub use error::{PipelineError, PipelineResult, TransportError};
pub use frame::{Frame, OutboundMessage, decode_frame};
pub use ingest::{
    ClassificationState, ConnectionState, IngestStats, MessageOutcome, SendOutcome, StreamIngest,
    badge_color,
};
pub use scheduler::{Admission, DEFAULT_CADENCE, FrameScheduler, SchedulerStats};
pub use transport::{CLOSE_ABNORMAL, CLOSE_NORMAL, NullOutbound, Outbound, TransportEvent};
pub use waterfall::{PipelineStats, RenderStats, Waterfall};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
