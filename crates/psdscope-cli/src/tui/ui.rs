//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────┐
//! │  📡 psdscope  127.0.0.1:8000  Connected  WiFi │
//! │  rx 812  ok 811  bad 1   drawn 640  drop 171 │
//! ├──────────────────────────────────────────────┤
//! │  Received malformed data.   (d to dismiss)   │
//! ┌──────────────────────────────────────────────┐
//! │▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀│
//! │▀▀▀▀▀▀▀▀▀▀▀▀▀▀ waterfall, newest at bottom ▀▀▀│
//! └──────────────────────────────────────────────┘
//!   c: clear   u: update   d: dismiss   s: snap  q

use super::app::App;
use psdscope_core::{ConnectionState, PixelBuffer, Rgba, badge_color};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &App) {
    let [title, banner, main, keys] = layout(f.area());

    draw_title(f, title, app);
    draw_banner(f, banner, app);
    draw_waterfall(f, main, app);
    draw_keys(f, keys);
}

/// Title, banner line, waterfall panel, key bar.
///
/// The banner line is always reserved so showing or hiding a message never
/// resizes (and so clears) the waterfall.
pub fn layout(area: Rect) -> [Rect; 4] {
    Layout::vertical([
        Constraint::Length(3), // title
        Constraint::Length(1), // banner
        Constraint::Min(3),    // waterfall
        Constraint::Length(1), // keys
    ])
    .areas(area)
}

/// Cell area available to the waterfall raster.
pub fn waterfall_inner(area: Rect) -> Rect {
    Block::bordered().inner(layout(area)[2])
}

fn rgb(c: Rgba) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

fn state_style(state: &ConnectionState) -> Style {
    match state {
        ConnectionState::Connecting => Style::default().fg(Color::Yellow),
        ConnectionState::Connected => Style::default().fg(Color::Green).bold(),
        ConnectionState::Disconnected => Style::default().fg(Color::DarkGray),
        ConnectionState::Errored(_) => Style::default().fg(Color::Red).bold(),
    }
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let wf = app.waterfall();
    let label = wf.classification();
    let state = wf.connection_state();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" 📡 psdscope ", Style::default().bold().fg(Color::Cyan)),
            Span::raw(" "),
            Span::styled(app.source(), Style::default().fg(Color::White)),
            Span::raw("  "),
            Span::styled(state.to_string(), state_style(state)),
            Span::raw("  "),
            Span::styled(
                format!(" {label} "),
                Style::default()
                    .bg(rgb(badge_color(label)))
                    .fg(Color::White)
                    .bold(),
            ),
            Span::raw(" "),
        ]));

    let stats = wf.stats();
    let line = Line::from(vec![Span::styled(
        format!(
            " rx {}  ok {}  bad {}   drawn {}  dropped {}  skipped {}",
            stats.ingest.received,
            stats.ingest.accepted,
            stats.ingest.malformed,
            stats.render.rendered,
            stats.scheduler.dropped,
            stats.render.skipped,
        ),
        Style::default().fg(Color::DarkGray),
    )]);

    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_banner(f: &mut Frame, area: Rect, app: &App) {
    let p = if let Some(msg) = app.waterfall().banner() {
        Paragraph::new(format!(" ⚠ {msg}   (d to dismiss)"))
            .style(Style::default().bg(Color::Red).fg(Color::White).bold())
    } else if let Some(note) = app.note() {
        Paragraph::new(format!(" {note}")).style(Style::default().fg(Color::Yellow))
    } else {
        Paragraph::new("")
    };
    f.render_widget(p, area);
}

fn draw_waterfall(f: &mut Frame, area: Rect, app: &App) {
    let wf = app.waterfall();
    let block = Block::bordered().title(" Waterfall (newest at bottom) ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if wf.stats().render.rendered == 0 {
        let hint = match wf.connection_state() {
            ConnectionState::Connected => "waiting for frames…".to_string(),
            other => other.to_string(),
        };
        let p = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(p, inner);
        return;
    }
    f.render_widget(WaterfallView::new(wf.buffer()), inner);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(
        " c: clear   u: request update   d: dismiss banner   s: save PNG   q: quit",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

/// Raster drawn with upper half blocks: foreground is the even pixel row,
/// background the odd one below it.
pub struct WaterfallView<'a> {
    buffer: &'a PixelBuffer,
}

impl<'a> WaterfallView<'a> {
    pub fn new(buffer: &'a PixelBuffer) -> Self {
        Self { buffer }
    }
}

impl Widget for WaterfallView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for cy in 0..area.height {
            for cx in 0..area.width {
                let x = cx as usize;
                let y = cy as usize * 2;
                let Some(top) = self.buffer.pixel(x, y) else {
                    continue;
                };
                let bottom = self.buffer.pixel(x, y + 1).unwrap_or(top);
                buf[(area.x + cx, area.y + cy)]
                    .set_char('▀')
                    .set_fg(rgb(top))
                    .set_bg(rgb(bottom));
            }
        }
    }
}
