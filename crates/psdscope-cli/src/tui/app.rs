//! TUI application state and event loop.
//!
//! Single-threaded: each pass drains transport events into the pipeline,
//! renders whatever row is due, draws, then waits for a key until the next
//! render deadline. The socket itself lives on the link thread.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant, SystemTime};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use psdscope_core::{
    Outbound, PixelBuffer, SendOutcome, TransportEvent, Waterfall, WaterfallConfig,
};

/// Longest a transport event waits in the channel before being drained.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct App {
    waterfall: Waterfall,
    events: Receiver<TransportEvent>,
    link_open: bool,
    source: String,
    running: bool,
    snapshot_dir: PathBuf,
    /// Last user action result, shown under the title.
    note: Option<String>,
}

impl App {
    pub fn new(
        config: &WaterfallConfig,
        outbound: Box<dyn Outbound>,
        events: Receiver<TransportEvent>,
        source: &str,
        snapshot_dir: &Path,
    ) -> Self {
        Self {
            // Sized on the first pass once the terminal area is known.
            waterfall: Waterfall::new(config, outbound, 0, 0),
            events,
            link_open: true,
            source: source.to_string(),
            running: true,
            snapshot_dir: snapshot_dir.to_path_buf(),
            note: None,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal before the panic message is printed.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        self.waterfall.shutdown();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        let stats = self.waterfall.stats();
        println!(
            "{} frames received, {} rows drawn, {} dropped by cadence, {} malformed",
            stats.ingest.received,
            stats.render.rendered,
            stats.scheduler.dropped,
            stats.ingest.malformed
        );
        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            let size = terminal.size()?;
            self.fit(Rect::new(0, 0, size.width, size.height));
            self.pump(Instant::now());

            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(self.poll_timeout(Instant::now()))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    /// Match the raster to the waterfall panel. Each terminal cell shows two
    /// pixel rows.
    pub fn fit(&mut self, screen: Rect) {
        let panel = super::ui::waterfall_inner(screen);
        self.waterfall
            .resize(panel.width as usize, panel.height as usize * 2);
    }

    /// Drain pending transport events, then render if a frame is due.
    pub fn pump(&mut self, now: Instant) -> bool {
        while self.link_open {
            match self.events.try_recv() {
                Ok(event) => self.waterfall.handle_event(event, now),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("link event channel closed");
                    self.link_open = false;
                }
            }
        }
        self.waterfall.tick(now)
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        match self.waterfall.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(POLL_INTERVAL),
            None => POLL_INTERVAL,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('c') => {
                self.waterfall.clear();
                self.note = Some("cleared".to_string());
            }
            KeyCode::Char('u') => {
                let note = match self.waterfall.request_update() {
                    SendOutcome::Sent => "update requested",
                    SendOutcome::NotConnected => "not connected, update not sent",
                    SendOutcome::Failed => "update request failed",
                };
                self.note = Some(note.to_string());
            }
            KeyCode::Char('d') => {
                self.waterfall.dismiss_banner();
                self.note = None;
            }
            KeyCode::Char('s') => self.export_snapshot(),
            _ => {}
        }
    }

    fn export_snapshot(&mut self) {
        let buffer = self.waterfall.buffer();
        if buffer.is_empty() {
            self.note = Some("nothing to save".to_string());
            return;
        }
        let epoch = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let path = self.snapshot_dir.join(format!("psdscope-{epoch}.png"));

        self.note = Some(match save_png(buffer, &path) {
            Ok(()) => {
                log::info!("snapshot written to {}", path.display());
                format!("saved {}", path.display())
            }
            Err(e) => {
                log::warn!("snapshot failed: {e}");
                format!("snapshot failed: {e}")
            }
        });
    }

    pub fn waterfall(&self) -> &Waterfall {
        &self.waterfall
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Write the raster as an RGBA PNG, creating the directory if needed.
pub fn save_png(buffer: &PixelBuffer, path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let image = image::RgbaImage::from_raw(
        buffer.width() as u32,
        buffer.height() as u32,
        buffer.to_rgba_bytes(),
    )
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "raster size mismatch"))?;
    image.save(path).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use psdscope_core::{Frame, NullOutbound, Rgba, jet};
    use std::sync::mpsc;

    fn app() -> (App, mpsc::Sender<TransportEvent>) {
        let (tx, rx) = mpsc::channel();
        let app = App::new(
            &WaterfallConfig::default(),
            Box::new(NullOutbound),
            rx,
            "test:0",
            &std::env::temp_dir(),
        );
        (app, tx)
    }

    fn frame(level: f64, bins: usize, label: &str) -> TransportEvent {
        TransportEvent::Message(Frame::new(vec![level; bins], label).to_json().unwrap())
    }

    #[test]
    fn fit_uses_two_pixel_rows_per_cell() {
        let (mut app, _tx) = app();
        app.fit(Rect::new(0, 0, 80, 24));
        let inner = crate::tui::ui::waterfall_inner(Rect::new(0, 0, 80, 24));
        let buffer = app.waterfall().buffer();
        assert_eq!(buffer.width(), inner.width as usize);
        assert_eq!(buffer.height(), inner.height as usize * 2);
    }

    #[test]
    fn pump_feeds_pipeline_and_renders_when_due() {
        let (mut app, tx) = app();
        app.fit(Rect::new(0, 0, 40, 12));
        let width = app.waterfall().buffer().width();
        let t0 = Instant::now();

        tx.send(TransportEvent::Open).unwrap();
        tx.send(frame(1.0, width * 2, "Bluetooth")).unwrap();
        assert!(!app.pump(t0));
        assert_eq!(app.waterfall().classification(), "Bluetooth");

        assert!(app.pump(t0 + Duration::from_millis(50)));
        let buffer = app.waterfall().buffer();
        let bottom = buffer.row(buffer.height() - 1).unwrap();
        assert!(bottom.iter().all(|&p| p == jet().color_for(255)));
    }

    #[test]
    fn matched_rate_feed_draws_every_frame() {
        let (mut app, tx) = app();
        app.fit(Rect::new(0, 0, 40, 12));
        let t0 = Instant::now();
        tx.send(TransportEvent::Open).unwrap();

        // 20 Hz feed, loop wakes 2 ms after each arrival.
        for k in 0..10u64 {
            tx.send(frame(0.5, 1000, "WiFi")).unwrap();
            app.pump(t0 + Duration::from_millis(k * 50 + 2));
        }
        app.pump(t0 + Duration::from_millis(600));

        let stats = app.waterfall().stats();
        assert_eq!(stats.render.rendered, 10);
        assert_eq!(stats.scheduler.dropped, 0);
    }

    #[test]
    fn dropped_link_stops_draining() {
        let (mut app, tx) = app();
        drop(tx);
        app.pump(Instant::now());
        assert!(!app.link_open);
    }

    #[test]
    fn poll_timeout_tracks_render_deadline() {
        let (mut app, tx) = app();
        app.fit(Rect::new(0, 0, 40, 12));
        let t0 = Instant::now();
        assert_eq!(app.poll_timeout(t0), POLL_INTERVAL);

        tx.send(TransportEvent::Open).unwrap();
        tx.send(frame(0.5, 1000, "WiFi")).unwrap();
        app.pump(t0);
        assert_eq!(
            app.poll_timeout(t0 + Duration::from_millis(45)),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn keys_drive_controls() {
        let (mut app, tx) = app();
        app.fit(Rect::new(0, 0, 40, 12));
        let t0 = Instant::now();
        tx.send(TransportEvent::Open).unwrap();
        tx.send(frame(1.0, 1000, "WiFi")).unwrap();
        app.pump(t0);
        app.pump(t0 + Duration::from_millis(50));

        app.handle_key(KeyCode::Char('c'));
        assert!(
            app.waterfall()
                .buffer()
                .pixels()
                .iter()
                .all(|&p| p == Rgba::BLACK)
        );

        // NullOutbound has nowhere to send
        app.handle_key(KeyCode::Char('u'));
        assert_eq!(app.note(), Some("update request failed"));

        app.handle_key(KeyCode::Char('q'));
        assert!(!app.is_running());
    }

    #[test]
    fn malformed_banner_dismissed_with_d() {
        let (mut app, tx) = app();
        tx.send(TransportEvent::Open).unwrap();
        tx.send(TransportEvent::Message("{not json".into())).unwrap();
        app.pump(Instant::now());
        assert!(app.waterfall().banner().is_some());
        app.handle_key(KeyCode::Char('d'));
        assert!(app.waterfall().banner().is_none());
    }

    #[test]
    fn png_snapshot_round_trips_pixels() {
        let mut compositor = psdscope_core::ScrollCompositor::new(3, 2, Rgba::BLACK);
        compositor
            .render_row(&[jet().color_for(0), jet().color_for(128), jet().color_for(255)])
            .unwrap();
        let dir = std::env::temp_dir().join(format!("psdscope-test-{}", std::process::id()));
        let path = dir.join("snap.png");
        save_png(compositor.buffer(), &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, jet().color_for(255).to_array());
        assert_eq!(img.get_pixel(0, 0).0, Rgba::BLACK.to_array());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
