//! CLI for psdscope: live PSD waterfall in the terminal.

mod commands;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "psdscope")]
#[command(about = "psdscope: streaming spectra in, scrolling spectrogram out")]
#[command(version = psdscope_core::VERSION)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live waterfall of a PSD stream (TUI)
    Monitor {
        /// Stream source as host:port
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,

        /// Render cadence window in milliseconds (overrides the config file)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        cadence_ms: Option<u64>,

        /// Pipeline settings as JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write logs here while the TUI owns the terminal
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Directory for PNG snapshots taken with 's'
        #[arg(long, default_value = ".")]
        snapshot_dir: PathBuf,
    },

    /// Serve a synthetic PSD stream for testing the monitor
    Feed {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Generator settings as JSON; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// PSD samples per frame
        #[arg(long)]
        bins: Option<usize>,

        /// Frames per second per client
        #[arg(long)]
        rate_hz: Option<f64>,

        /// Fixed RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Comma-separated classification labels to cycle through
        #[arg(long)]
        labels: Option<String>,

        /// Close each connection after this many frames
        #[arg(long)]
        max_frames: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor {
            addr,
            cadence_ms,
            config,
            log_file,
            snapshot_dir,
        } => commands::monitor::run(commands::monitor::MonitorCommandConfig {
            addr: &addr,
            cadence_ms,
            config_path: config.as_deref(),
            log_file: log_file.as_deref(),
            snapshot_dir: &snapshot_dir,
            verbose: cli.verbose,
        }),
        Commands::Feed {
            host,
            port,
            config,
            bins,
            rate_hz,
            seed,
            labels,
            max_frames,
        } => commands::feed::run(commands::feed::FeedCommandConfig {
            host: &host,
            port,
            config_path: config.as_deref(),
            bins,
            rate_hz,
            seed,
            labels: labels.as_deref(),
            max_frames,
            verbose: cli.verbose,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cadence_is_rejected() {
        let err = Cli::try_parse_from(["psdscope", "monitor", "--cadence-ms", "0"])
            .err()
            .expect("zero cadence parsed");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn cadence_flag_parses() {
        let cli = Cli::try_parse_from(["psdscope", "monitor", "--cadence-ms", "50"]).unwrap();
        match cli.command {
            Commands::Monitor { cadence_ms, .. } => assert_eq!(cadence_ms, Some(50)),
            Commands::Feed { .. } => panic!("parsed as feed"),
        }
    }
}
