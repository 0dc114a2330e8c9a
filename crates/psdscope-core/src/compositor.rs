//! Scrolling raster ownership.
//!
//! [`ScrollCompositor`] is the only writer of the [`PixelBuffer`]. Every
//! mutation takes `&mut self`, so a reader holding `&PixelBuffer` can never
//! observe a half-shifted frame.

use crate::colormap::Rgba;
use crate::error::{PipelineError, PipelineResult};

/// Row-major RGBA raster, always fully initialized.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, fill: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    pub fn row(&self, y: usize) -> Option<&[Rgba]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        Some(&self.pixels[start..start + self.width])
    }

    /// Rows from top (oldest) to bottom (newest).
    pub fn rows(&self) -> impl Iterator<Item = &[Rgba]> {
        // chunks_exact panics on a zero chunk size
        self.pixels.chunks_exact(self.width.max(1))
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Flattened RGBA bytes, suitable for blitting or image encoding.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_array()).collect()
    }

    fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }
}

/// Owns the waterfall raster and performs the scroll-and-append.
#[derive(Debug, Clone)]
pub struct ScrollCompositor {
    buffer: PixelBuffer,
    background: Rgba,
    rows_written: u64,
}

impl ScrollCompositor {
    pub fn new(width: usize, height: usize, background: Rgba) -> Self {
        Self {
            buffer: PixelBuffer::new(width, height, background),
            background,
            rows_written: 0,
        }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn width(&self) -> usize {
        self.buffer.width
    }

    pub fn height(&self) -> usize {
        self.buffer.height
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    /// Rows appended since the last clear or resize.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Shift every row up by one and write `colors` as the new bottom row.
    ///
    /// A row of the wrong width is rejected and the buffer is left untouched.
    pub fn render_row(&mut self, colors: &[Rgba]) -> PipelineResult<()> {
        let width = self.buffer.width;
        if colors.len() != width {
            return Err(PipelineError::RowWidthMismatch {
                expected: width,
                actual: colors.len(),
            });
        }
        if self.buffer.is_empty() {
            return Ok(());
        }

        let pixels = &mut self.buffer.pixels;
        let total = pixels.len();
        pixels.copy_within(width.., 0);
        pixels[total - width..].copy_from_slice(colors);
        self.rows_written += 1;
        Ok(())
    }

    /// Reset every pixel to the background colour.
    pub fn clear(&mut self) {
        self.buffer.fill(self.background);
        self.rows_written = 0;
    }

    /// Reallocate at the new size. History is not carried over.
    pub fn resize(&mut self, width: usize, height: usize) {
        log::debug!(
            "resizing waterfall {}x{} -> {width}x{height}",
            self.buffer.width,
            self.buffer.height
        );
        self.buffer = PixelBuffer::new(width, height, self.background);
        self.rows_written = 0;
    }
}
