//! Synthetic PSD feed server.
//!
//! Accepts any number of TCP clients and pushes one JSON frame per line to
//! each at a fixed rate. A `{"type":"request_update"}` line from a client gets
//! an extra frame immediately.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::MissedTickBehavior;

use psdscope_core::OutboundMessage;

use crate::synth::SpectrumSynth;

/// Feed generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// PSD samples per frame.
    pub bins: usize,
    /// Frames pushed per second to each client.
    pub rate_hz: f64,
    /// Fixed RNG seed. Each client derives its own stream from it.
    pub seed: Option<u64>,
    /// Classification labels, cycled in order.
    pub labels: Vec<String>,
    /// Consecutive frames carrying the same label.
    pub frames_per_label: u64,
    /// Close each connection after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bins: 1024,
            rate_hz: 20.0,
            seed: None,
            labels: vec!["WiFi".into(), "Bluetooth".into(), "Unknown".into()],
            frames_per_label: 40,
            max_frames: None,
        }
    }
}

impl FeedConfig {
    /// Time between pushed frames. Rates are held to 0.1..=1000 Hz.
    pub fn interval(&self) -> Duration {
        let rate = if self.rate_hz.is_finite() {
            self.rate_hz.clamp(0.1, 1000.0)
        } else {
            20.0
        };
        Duration::from_nanos((1e9 / rate).round() as u64)
    }
}

/// Bind `host:port` and serve until Ctrl-C.
pub async fn run_feed(config: FeedConfig, host: &str, port: u16) -> io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    log::info!(
        "feed listening on {} ({} bins @ {} Hz)",
        listener.local_addr()?,
        config.bins,
        config.rate_hz
    );
    tokio::select! {
        res = serve(listener, config) => res,
        _ = tokio::signal::ctrl_c() => {
            log::info!("feed shutting down");
            Ok(())
        }
    }
}

/// Accept loop on an already bound listener.
pub async fn serve(listener: TcpListener, config: FeedConfig) -> io::Result<()> {
    let mut client_id: u64 = 0;
    loop {
        let (stream, peer) = listener.accept().await?;
        client_id += 1;
        let seed = config.seed.map(|s| s.wrapping_add(client_id));
        let config = config.clone();
        log::info!("client {client_id} connected from {peer}");
        tokio::spawn(async move {
            match serve_client(stream, &config, seed).await {
                Ok(sent) => log::info!("client {client_id} done after {sent} frames"),
                Err(e) => log::warn!("client {client_id} dropped: {e}"),
            }
        });
    }
}

async fn serve_client(
    stream: TcpStream,
    config: &FeedConfig,
    seed: Option<u64>,
) -> io::Result<u64> {
    stream.set_nodelay(true)?;
    let mut synth = SpectrumSynth::new(config, seed);
    let (read_half, mut write_half) = stream.into_split();
    let mut requests = BufReader::new(read_half).lines();
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sent: u64 = 0;
    loop {
        if config.max_frames.is_some_and(|max| sent >= max) {
            write_half.shutdown().await?;
            return Ok(sent);
        }
        tokio::select! {
            _ = ticker.tick() => {
                push_frame(&mut write_half, &mut synth).await?;
                sent += 1;
            }
            line = requests.next_line() => match line? {
                Some(text) => match serde_json::from_str::<OutboundMessage>(&text) {
                    Ok(OutboundMessage::RequestUpdate) => {
                        log::debug!("update requested");
                        push_frame(&mut write_half, &mut synth).await?;
                        sent += 1;
                    }
                    Err(e) => log::warn!("ignoring client message: {e}"),
                },
                None => return Ok(sent),
            }
        }
    }
}

async fn push_frame(writer: &mut OwnedWriteHalf, synth: &mut SpectrumSynth) -> io::Result<()> {
    let frame = synth.next_frame();
    let mut line = frame
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await
}
