use core::error::Error;
use std::sync::Arc;

use crate::{
    cfg::Config,
    engine::{http::HttpTask, Engine},
    logging::{ErrorSink, LogSink},
    stat::Report,
};

/// Single stress test run.
pub struct Runtime {
    cfg: Config,
    sink: Arc<dyn ErrorSink>,
}

impl Runtime {
    pub fn new(cfg: Config) -> Self {
        Self { cfg, sink: Arc::new(LogSink) }
    }

    /// Replaces the sink receiving per-request errors.
    #[inline]
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Performs all requests and returns the final report.
    pub async fn run(self) -> Result<Report, Box<dyn Error>> {
        let task = HttpTask::new(&self.cfg)?;
        let engine = Engine::new(task, self.cfg.requests, self.cfg.concurrency, self.sink);

        log::debug!(
            "running {} requests against {} with concurrency {}",
            self.cfg.requests,
            self.cfg.target,
            self.cfg.concurrency
        );

        Ok(engine.run().await)
    }
}
