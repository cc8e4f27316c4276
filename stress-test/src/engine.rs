use core::{future::Future, num::NonZero};
use std::{sync::Arc, time::Instant};

use anyhow::Error;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    logging::ErrorSink,
    stat::{Report, Stat},
};

pub mod http;

/// Single request attempt.
pub trait Task: Send + Sync + 'static {
    /// Executes this task once, returning the response status code.
    ///
    /// The future must resolve only after the response has been fully
    /// received.
    fn execute(&self) -> impl Future<Output = Result<u16, Error>> + Send;
}

/// Dispatches a fixed number of attempts with bounded concurrency.
///
/// Each attempt runs as a separate tokio task, started only after acquiring
/// one of `concurrency` admission permits. The permit is released when the
/// attempt finishes, regardless of its outcome.
pub struct Engine<T> {
    task: Arc<T>,
    requests: NonZero<usize>,
    concurrency: NonZero<usize>,
    stat: Arc<Stat>,
    sink: Arc<dyn ErrorSink>,
}

impl<T> Engine<T>
where
    T: Task,
{
    pub fn new(task: T, requests: NonZero<usize>, concurrency: NonZero<usize>, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            task: Arc::new(task),
            requests,
            concurrency,
            stat: Arc::new(Stat::default()),
            sink,
        }
    }

    /// Runs all attempts and waits for every one of them to complete.
    ///
    /// No attempt failure is propagated: failed attempts are reported to the
    /// error sink and are not recorded.
    pub async fn run(self) -> Report {
        let now = Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.concurrency.get()));
        let mut jobs = JoinSet::new();

        for idx in 0..self.requests.get() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore is never closed");

            let task = self.task.clone();
            let stat = self.stat.clone();
            let sink = self.sink.clone();
            jobs.spawn(async move {
                let _permit = permit;
                log::trace!("request #{idx} started");

                match task.execute().await {
                    Ok(code) => {
                        log::trace!("request #{idx} finished with {code}");
                        stat.on_response(code);
                    }
                    Err(err) => sink.on_error(&err),
                }
            });

            // Reap finished attempts early to keep the set small.
            while let Some(rc) = jobs.try_join_next() {
                self.on_join(rc);
            }
        }

        while let Some(rc) = jobs.join_next().await {
            self.on_join(rc);
        }

        let report = self.stat.report(now.elapsed());
        log::debug!("{} of {} requests recorded", report.recorded(), self.requests);

        report
    }

    #[inline]
    fn on_join(&self, rc: Result<(), tokio::task::JoinError>) {
        if let Err(err) = rc {
            self.sink.on_error(&Error::new(err).context("request task failed"));
        }
    }
}
