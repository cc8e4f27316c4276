use std::error::Error;

use log::LevelFilter;
use simple_logger::SimpleLogger;

pub fn init(verbosity: usize) -> Result<(), Box<dyn Error>> {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level("stress_test", level)
        .with_utc_timestamps()
        .init()?;

    Ok(())
}

/// Receiver of per-request failures.
///
/// Failed requests are never recorded into the report, so this is the only
/// place where they become visible.
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, err: &anyhow::Error);
}

/// Sink that forwards errors to the process-wide logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    #[inline]
    fn on_error(&self, err: &anyhow::Error) {
        log::error!("{err:#}");
    }
}
