//! TCP client transport.
//!
//! One JSON record per line in both directions. The socket lives on a
//! dedicated thread running a current-thread tokio runtime; the UI side only
//! sees a [`Receiver`] of [`TransportEvent`]s and a [`TcpLink`] handle.
//!
//! A read of EOF on a line boundary is reported as a clean close. EOF in the
//! middle of a line, or any socket error, is reported as an error followed by
//! an abnormal close. Writes run on their own task so a stalled peer never
//! holds up [`TcpLink::close`].

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use psdscope_core::{Outbound, TransportError, TransportEvent};

/// Client-side transport settings.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Longest inbound line forwarded; longer lines are skipped and reported
    /// as undecodable.
    pub max_line_bytes: usize,
    pub connect_timeout: Duration,
    /// A single outbound line taking longer than this fails the link.
    pub write_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 1 << 20,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

enum Command {
    Send(String),
    Close,
}

/// Write half and owner of the connection thread.
pub struct TcpLink {
    commands: UnboundedSender<Command>,
    worker: Option<JoinHandle<()>>,
}

/// Start connecting to `addr` in the background.
///
/// Returns immediately. The first event on the receiver is either
/// [`TransportEvent::Open`] or an error followed by a close.
pub fn connect(
    addr: impl Into<String>,
    config: LinkConfig,
) -> Result<(TcpLink, Receiver<TransportEvent>), TransportError> {
    let addr = addr.into();
    if addr.trim().is_empty() {
        return Err(TransportError::Config("empty address".to_string()));
    }
    let (event_tx, event_rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = unbounded_channel();

    let worker = thread::Builder::new()
        .name("psdscope-link".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = event_tx.send(TransportEvent::Error(format!("runtime: {e}")));
                    let _ = event_tx.send(TransportEvent::abnormal_close(e.to_string()));
                    return;
                }
            };
            rt.block_on(run_link(addr, config, event_tx, cmd_rx));
        })?;

    Ok((
        TcpLink {
            commands: cmd_tx,
            worker: Some(worker),
        },
        event_rx,
    ))
}

impl Outbound for TcpLink {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.commands
            .send(Command::Send(text))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        let _ = self.commands.send(Command::Close);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("link thread panicked");
            }
        }
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_link(
    addr: String,
    config: LinkConfig,
    events: Sender<TransportEvent>,
    mut commands: UnboundedReceiver<Command>,
) {
    log::info!("connecting to {addr}");
    let connect = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr));
    let stream = tokio::select! {
        res = connect => match res {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let msg = format!("connect to {addr} failed: {e}");
                let _ = events.send(TransportEvent::Error(msg.clone()));
                let _ = events.send(TransportEvent::abnormal_close(msg));
                return;
            }
            Err(_) => {
                let msg = format!("connect to {addr} timed out");
                let _ = events.send(TransportEvent::Error(msg.clone()));
                let _ = events.send(TransportEvent::abnormal_close(msg));
                return;
            }
        },
        _ = wait_for_close(&mut commands) => {
            let _ = events.send(TransportEvent::clean_close("closed before connecting"));
            return;
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        log::debug!("set_nodelay failed: {e}");
    }
    let _ = events.send(TransportEvent::Open);

    let (read_half, write_half) = stream.into_split();
    let mut reader = tokio::spawn(read_loop(
        BufReader::new(read_half),
        events.clone(),
        config.max_line_bytes,
    ));
    let (line_tx, line_rx) = unbounded_channel();
    let mut writer = tokio::spawn(write_loop(
        write_half,
        line_rx,
        events.clone(),
        config.write_timeout,
    ));

    loop {
        tokio::select! {
            _ = &mut reader => {
                writer.abort();
                break;
            }
            _ = &mut writer => {
                reader.abort();
                break;
            }
            cmd = commands.recv() => match cmd {
                Some(Command::Send(text)) => {
                    if line_tx.send(text).is_err() {
                        log::debug!("writer gone, dropping outbound line");
                    }
                }
                Some(Command::Close) | None => {
                    // Dropping the write half shuts down our side of the socket,
                    // even if a write is still pending.
                    reader.abort();
                    writer.abort();
                    let _ = events.send(TransportEvent::clean_close("client closed"));
                    break;
                }
            }
        }
    }
    log::debug!("link to {addr} finished");
}

async fn wait_for_close(commands: &mut UnboundedReceiver<Command>) {
    // Sends before the connection exists are dropped, never replayed.
    while let Some(cmd) = commands.recv().await {
        if matches!(cmd, Command::Close) {
            return;
        }
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut lines: UnboundedReceiver<String>,
    events: Sender<TransportEvent>,
    timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(text) = lines.recv().await {
        let reason = match tokio::time::timeout(timeout, write_line(&mut writer, &text)).await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("write failed: {e}"),
            Err(_) => format!("write stalled for {timeout:?}"),
        };
        log::warn!("{reason}");
        let _ = events.send(TransportEvent::Error(reason.clone()));
        let _ = events.send(TransportEvent::abnormal_close(reason));
        return;
    }
}

async fn write_line<W>(writer: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

fn ended_mid_message(events: &Sender<TransportEvent>) {
    let reason = "stream ended mid-message";
    let _ = events.send(TransportEvent::Error(reason.to_string()));
    let _ = events.send(TransportEvent::abnormal_close(reason));
}

async fn read_loop<R>(mut reader: R, events: Sender<TransportEvent>, max_line: usize)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(4096);
    loop {
        buf.clear();
        let limit = max_line as u64 + 1;
        match (&mut reader).take(limit).read_until(b'\n', &mut buf).await {
            Ok(0) => {
                let _ = events.send(TransportEvent::clean_close("server closed the connection"));
                return;
            }
            Ok(_) => {
                let complete = buf.last() == Some(&b'\n');
                if !complete && buf.len() > max_line {
                    log::warn!("inbound line exceeds {max_line} bytes, skipping it");
                    match skip_line(&mut reader).await {
                        Ok(true) => {}
                        Ok(false) => {
                            ended_mid_message(&events);
                            return;
                        }
                        Err(e) => {
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            let _ = events.send(TransportEvent::abnormal_close(e.to_string()));
                            return;
                        }
                    }
                    let reason = format!("line exceeds {max_line} bytes");
                    if events.send(TransportEvent::Undecodable(reason)).is_err() {
                        return;
                    }
                    continue;
                } else if !complete {
                    ended_mid_message(&events);
                    return;
                }

                let event = match std::str::from_utf8(&buf) {
                    Ok(text) => {
                        let text = text.trim_end_matches(['\n', '\r']);
                        if text.is_empty() {
                            continue;
                        }
                        TransportEvent::Message(text.to_string())
                    }
                    Err(e) => {
                        log::warn!("inbound line is not UTF-8: {e}");
                        TransportEvent::Undecodable(format!("invalid UTF-8: {e}"))
                    }
                };
                if events.send(event).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                let _ = events.send(TransportEvent::abnormal_close(e.to_string()));
                return;
            }
        }
    }
}

/// Discard input through the next newline. `Ok(false)` on EOF first.
async fn skip_line<R>(reader: &mut R) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (consumed, found) = {
            let avail = reader.fill_buf().await?;
            if avail.is_empty() {
                return Ok(false);
            }
            match avail.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (avail.len(), false),
            }
        };
        reader.consume(consumed);
        if found {
            return Ok(true);
        }
    }
}
