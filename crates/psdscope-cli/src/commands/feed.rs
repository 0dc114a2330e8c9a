use std::path::Path;

use log::LevelFilter;
use psdscope_stream::{FeedConfig, run_feed};

pub struct FeedCommandConfig<'a> {
    pub host: &'a str,
    pub port: u16,
    pub config_path: Option<&'a Path>,
    pub bins: Option<usize>,
    pub rate_hz: Option<f64>,
    pub seed: Option<u64>,
    pub labels: Option<&'a str>,
    pub max_frames: Option<u64>,
    pub verbose: u8,
}

pub fn run(cfg: FeedCommandConfig<'_>) {
    let level = super::level_for(cfg.verbose, LevelFilter::Info);
    if let Err(e) = super::init_logging(level, None, false) {
        eprintln!("Failed to set up logging: {e}");
        std::process::exit(1);
    }

    let mut config = match cfg.config_path {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to read config {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => FeedConfig::default(),
    };
    apply_overrides(&mut config, &cfg);

    println!("psdscope feed v{}", psdscope_core::VERSION);
    println!("   tcp://{}:{}", cfg.host, cfg.port);
    println!(
        "   {} bins @ {} Hz, labels: {}",
        config.bins,
        config.rate_hz,
        config.labels.join(", ")
    );
    println!();
    println!("   Watch it with:");
    println!("     psdscope monitor --addr {}:{}", cfg.host, cfg.port);
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run_feed(config, cfg.host, cfg.port)) {
        eprintln!("Feed error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> std::io::Result<FeedConfig> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn apply_overrides(config: &mut FeedConfig, cfg: &FeedCommandConfig<'_>) {
    if let Some(bins) = cfg.bins {
        config.bins = bins;
    }
    if let Some(rate) = cfg.rate_hz {
        config.rate_hz = rate;
    }
    if cfg.seed.is_some() {
        config.seed = cfg.seed;
    }
    if cfg.max_frames.is_some() {
        config.max_frames = cfg.max_frames;
    }
    if let Some(labels) = cfg.labels {
        let parsed = parse_labels(labels);
        if !parsed.is_empty() {
            config.labels = parsed;
        }
    }
}

fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
