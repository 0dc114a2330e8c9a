pub mod feed;
pub mod monitor;

use std::fs::File;
use std::io;
use std::path::Path;

use log::LevelFilter;

/// Map `-v` repetitions onto a level, starting from `base`.
pub fn level_for(verbose: u8, base: LevelFilter) -> LevelFilter {
    match (base, verbose) {
        (base, 0) => base,
        (LevelFilter::Off | LevelFilter::Error | LevelFilter::Warn, 1) => LevelFilter::Info,
        (LevelFilter::Off | LevelFilter::Error | LevelFilter::Warn, 2) => LevelFilter::Debug,
        (LevelFilter::Info, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install env_logger. `RUST_LOG` wins over `level` when set.
///
/// With `log_file` the output goes there. A TUI without a log file gets
/// logging switched off entirely so records never scribble over the screen.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>, tui: bool) -> io::Result<()> {
    let env = env_logger::Env::default().default_filter_or(level.to_string());
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().map_err(io::Error::other)?;

    if tui && log_file.is_none() {
        log::set_max_level(LevelFilter::Off);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_steps_up_from_warn() {
        assert_eq!(level_for(0, LevelFilter::Warn), LevelFilter::Warn);
        assert_eq!(level_for(1, LevelFilter::Warn), LevelFilter::Info);
        assert_eq!(level_for(2, LevelFilter::Warn), LevelFilter::Debug);
        assert_eq!(level_for(3, LevelFilter::Warn), LevelFilter::Trace);
    }

    #[test]
    fn verbosity_steps_up_from_info() {
        assert_eq!(level_for(0, LevelFilter::Info), LevelFilter::Info);
        assert_eq!(level_for(1, LevelFilter::Info), LevelFilter::Debug);
        assert_eq!(level_for(5, LevelFilter::Info), LevelFilter::Trace);
    }
}
