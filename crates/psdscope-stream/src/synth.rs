//! Synthetic spectrum source.
//!
//! Builds a block of complex baseband samples for a small scene (wideband
//! OFDM-like burst, a frequency-hopping narrowband tone, or a slow drifting
//! carrier), windows it, takes an FFT and reports the shifted power spectrum
//! scaled into `[0, 1]`. Scenes follow the active classification label so the
//! waterfall and the badge agree with each other.

use std::f64::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use psdscope_core::Frame;

use crate::feed::FeedConfig;

/// Power in dB mapped to 0.0.
const FLOOR_DB: f64 = -40.0;
/// Power in dB mapped to 1.0.
const CEIL_DB: f64 = 30.0;

const NOISE_AMPLITUDE: f64 = 0.05;
const HOP_CHANNELS: usize = 79;
const OFDM_SUBCARRIERS: usize = 48;

/// Signal content drawn for a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    Wideband,
    Hopping,
    Drift,
}

impl Scene {
    pub fn for_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("wifi") || lower.contains("wi-fi") {
            Scene::Wideband
        } else if lower.contains("bluetooth") {
            Scene::Hopping
        } else {
            Scene::Drift
        }
    }
}

/// Generates one PSD frame per call.
pub struct SpectrumSynth {
    size: usize,
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
    window: Vec<f64>,
    rng: StdRng,
    labels: Vec<String>,
    frames_per_label: u64,
    frame_index: u64,
    drift_phase: f64,
    wideband_center: f64,
}

impl SpectrumSynth {
    /// `seed` makes the output reproducible; `None` seeds from the OS.
    pub fn new(config: &FeedConfig, seed: Option<u64>) -> Self {
        let size = config.bins.max(16);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let window = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
            .collect();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let labels = if config.labels.is_empty() {
            vec!["Unknown".to_string()]
        } else {
            config.labels.clone()
        };

        Self {
            size,
            fft,
            scratch,
            window,
            rng,
            labels,
            frames_per_label: config.frames_per_label.max(1),
            frame_index: 0,
            drift_phase: 0.0,
            wideband_center: 0.25,
        }
    }

    pub fn bins(&self) -> usize {
        self.size
    }

    /// Label for the frame about to be generated.
    pub fn current_label(&self) -> &str {
        let slot = (self.frame_index / self.frames_per_label) as usize % self.labels.len();
        &self.labels[slot]
    }

    pub fn next_frame(&mut self) -> Frame {
        let label = self.current_label().to_string();
        let mut samples = self.noise();
        match Scene::for_label(&label) {
            Scene::Wideband => self.add_wideband(&mut samples),
            Scene::Hopping => self.add_hopping(&mut samples),
            Scene::Drift => self.add_drift(&mut samples),
        }
        let psd = self.power_spectrum(samples);
        self.frame_index += 1;
        Frame::new(psd, label)
    }

    fn noise(&mut self) -> Vec<Complex64> {
        (0..self.size)
            .map(|_| {
                Complex64::new(
                    self.rng.random_range(-1.0..1.0) * NOISE_AMPLITUDE,
                    self.rng.random_range(-1.0..1.0) * NOISE_AMPLITUDE,
                )
            })
            .collect()
    }

    fn add_tone(&self, samples: &mut [Complex64], freq: f64, amplitude: f64, phase: f64) {
        // freq is in cycles per sample, -0.5..0.5
        for (n, s) in samples.iter_mut().enumerate() {
            let arg = 2.0 * PI * freq * n as f64 + phase;
            *s += Complex64::from_polar(amplitude, arg);
        }
    }

    fn add_wideband(&mut self, samples: &mut [Complex64]) {
        self.wideband_center += self.rng.random_range(-0.002..0.002);
        self.wideband_center = self.wideband_center.clamp(0.1, 0.4);
        let span = 0.08;
        for k in 0..OFDM_SUBCARRIERS {
            let offset = span * (k as f64 / (OFDM_SUBCARRIERS - 1) as f64 - 0.5);
            let phase = self.rng.random_range(0.0..2.0 * PI);
            self.add_tone(samples, self.wideband_center + offset, 0.12, phase);
        }
    }

    fn add_hopping(&mut self, samples: &mut [Complex64]) {
        let channel = self.rng.random_range(0..HOP_CHANNELS);
        let freq = -0.45 + 0.4 * channel as f64 / HOP_CHANNELS as f64;
        let phase = self.rng.random_range(0.0..2.0 * PI);
        self.add_tone(samples, freq, 0.8, phase);
    }

    fn add_drift(&mut self, samples: &mut [Complex64]) {
        self.drift_phase = (self.drift_phase + 0.01) % (2.0 * PI);
        let freq = 0.3 * self.drift_phase.sin();
        self.add_tone(samples, freq, 0.3, 0.0);
    }

    /// Window, transform, shift DC to the centre and scale into `[0, 1]`.
    fn power_spectrum(&mut self, mut samples: Vec<Complex64>) -> Vec<f64> {
        for (s, w) in samples.iter_mut().zip(&self.window) {
            *s *= *w;
        }
        self.fft.process_with_scratch(&mut samples, &mut self.scratch);

        let n = self.size;
        (0..n)
            .map(|i| {
                let bin = samples[(i + n / 2) % n];
                let power = bin.norm_sqr() / n as f64;
                let db = 10.0 * (power + 1e-12).log10();
                ((db - FLOOR_DB) / (CEIL_DB - FLOOR_DB)).clamp(0.0, 1.0)
            })
            .collect()
    }
}
