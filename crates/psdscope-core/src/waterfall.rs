//! The assembled pipeline.
//!
//! [`Waterfall`] owns one of each stage and is driven from a single loop:
//! feed it transport events with [`Waterfall::handle_event`], call
//! [`Waterfall::tick`] whenever [`Waterfall::next_deadline`] passes, and read
//! the raster back through [`Waterfall::buffer`].

use std::time::Instant;

use crate::colormap::{ColorMapTable, jet};
use crate::compositor::{PixelBuffer, ScrollCompositor};
use crate::config::WaterfallConfig;
use crate::downsample::downsample;
use crate::error::{PipelineError, PipelineResult};
use crate::frame::{Frame, OutboundMessage};
use crate::ingest::{ConnectionState, IngestStats, MessageOutcome, SendOutcome, StreamIngest};
use crate::scheduler::{Admission, FrameScheduler, SchedulerStats};
use crate::transport::{Outbound, TransportEvent};

/// Render-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub rendered: u64,
    pub skipped: u64,
}

/// Everything the status line needs, gathered in one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub ingest: IngestStats,
    pub scheduler: SchedulerStats,
    pub render: RenderStats,
}

/// Ingest → schedule → downsample → colour → composite.
pub struct Waterfall {
    ingest: StreamIngest,
    scheduler: FrameScheduler<Frame>,
    compositor: ScrollCompositor,
    colormap: &'static ColorMapTable,
    render: RenderStats,
    shut_down: bool,
}

impl Waterfall {
    pub fn new(
        config: &WaterfallConfig,
        outbound: Box<dyn Outbound>,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            ingest: StreamIngest::new(
                outbound,
                config.default_classification.clone(),
                config.max_frame_bytes,
            ),
            scheduler: FrameScheduler::new(config.cadence()),
            compositor: ScrollCompositor::new(width, height, config.background),
            colormap: jet(),
            render: RenderStats::default(),
            shut_down: false,
        }
    }

    /// Apply one transport event. Valid frames go to the scheduler; the
    /// classification is updated whether or not the frame gets rendered.
    ///
    /// A frame whose window has already elapsed is rendered first, so an
    /// arrival after the deadline always finds the gate open.
    pub fn handle_event(&mut self, event: TransportEvent, now: Instant) {
        if self.shut_down {
            return;
        }
        if let Some(MessageOutcome::Accepted(frame)) = self.ingest.handle(event) {
            self.tick(now);
            if self.scheduler.submit(frame, now) == Admission::Accepted {
                log::trace!("frame accepted, render due in {:?}", self.scheduler.cadence());
            }
        }
    }

    /// When the loop must wake to render, if a frame is in flight.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Render the in-flight frame if its window has elapsed.
    ///
    /// Returns `true` when a row was appended.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(frame) = self.scheduler.poll(now) else {
            return false;
        };
        match self.render_frame(&frame) {
            Ok(()) => {
                self.render.rendered += 1;
                true
            }
            Err(e) => {
                self.render.skipped += 1;
                log::debug!("skipping frame: {e}");
                false
            }
        }
    }

    fn render_frame(&mut self, frame: &Frame) -> PipelineResult<()> {
        let width = self.compositor.width();
        if width == 0 || self.compositor.height() == 0 {
            return Err(PipelineError::InvalidWidth(width));
        }
        let columns = downsample(&frame.psd, width)?;
        let colors = self.colormap.colorize(&columns);
        self.compositor.render_row(&colors)
    }

    /// Viewport changed: reallocate and clear the raster.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.compositor.width(), self.compositor.height()) {
            self.compositor.resize(width, height);
        }
    }

    pub fn clear(&mut self) {
        self.compositor.clear();
    }

    pub fn request_update(&mut self) -> SendOutcome {
        self.ingest.send(&OutboundMessage::RequestUpdate)
    }

    pub fn dismiss_banner(&mut self) {
        self.ingest.dismiss_banner();
    }

    /// Tear down: drop any pending render and release the transport.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.scheduler.cancel();
        self.ingest.close();
        log::info!("waterfall pipeline shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn buffer(&self) -> &PixelBuffer {
        self.compositor.buffer()
    }

    pub fn connection_state(&self) -> &ConnectionState {
        self.ingest.state()
    }

    pub fn classification(&self) -> &str {
        self.ingest.classification()
    }

    pub fn banner(&self) -> Option<&str> {
        self.ingest.banner()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            ingest: self.ingest.stats(),
            scheduler: self.scheduler.stats(),
            render: self.render,
        }
    }
}

impl Drop for Waterfall {
    fn drop(&mut self) {
        self.shutdown();
    }
}
