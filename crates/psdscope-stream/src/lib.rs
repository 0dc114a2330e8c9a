//! Streaming transports for psdscope.
//!
//! - [`client`]: newline-delimited JSON over TCP, surfaced to the pipeline as
//!   [`psdscope_core::TransportEvent`]s with a [`client::TcpLink`] for outbound
//!   messages.
//! - [`feed`]: a synthetic PSD source that speaks the same protocol, for demos
//!   and tests.
//!
//! ```no_run
//! use psdscope_core::{Waterfall, WaterfallConfig};
//! use psdscope_stream::client::{LinkConfig, connect};
//!
//! let (link, events) = connect("127.0.0.1:8000", LinkConfig::default())?;
//! let mut wf = Waterfall::new(&WaterfallConfig::default(), Box::new(link), 256, 128);
//! for event in events.iter() {
//!     wf.handle_event(event, std::time::Instant::now());
//! }
//! # Ok::<(), psdscope_core::TransportError>(())
//! ```

pub mod client;
pub mod feed;
pub mod synth;

pub use client::{LinkConfig, TcpLink, connect};
pub use feed::{FeedConfig, run_feed, serve};
pub use synth::{Scene, SpectrumSynth};
