use std::path::Path;

use log::LevelFilter;
use psdscope_core::WaterfallConfig;
use psdscope_stream::{LinkConfig, connect};

pub struct MonitorCommandConfig<'a> {
    pub addr: &'a str,
    pub cadence_ms: Option<u64>,
    pub config_path: Option<&'a Path>,
    pub log_file: Option<&'a Path>,
    pub snapshot_dir: &'a Path,
    pub verbose: u8,
}

pub fn run(cfg: MonitorCommandConfig<'_>) {
    let level = super::level_for(cfg.verbose, LevelFilter::Info);
    if let Err(e) = super::init_logging(level, cfg.log_file, true) {
        eprintln!("Failed to set up logging: {e}");
        std::process::exit(1);
    }

    let mut config = match cfg.config_path {
        Some(path) => match WaterfallConfig::from_path(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to read config {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => WaterfallConfig::default(),
    };
    if let Some(ms) = cfg.cadence_ms {
        config.cadence_ms = ms;
    }

    let link_config = LinkConfig {
        max_line_bytes: config.max_frame_bytes,
        ..LinkConfig::default()
    };
    let (link, events) = match connect(cfg.addr, link_config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Cannot connect to {}: {e}", cfg.addr);
            std::process::exit(1);
        }
    };
    log::info!(
        "monitoring {} at {} ms cadence",
        cfg.addr,
        config.cadence_ms
    );

    let mut app = crate::tui::app::App::new(
        &config,
        Box::new(link),
        events,
        cfg.addr,
        cfg.snapshot_dir,
    );
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
