//! Periodic polling of an entity feed

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::entity::EntityDescriptor;
use super::writer::WriteQueue;
use crate::Error;

/// Source of dynamically reported entities, such as a vehicle sharing API
pub trait EntityFeed: Send {
    fn name(&self) -> &str;

    /// Everything the source currently reports
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedError`] if the source could not be read
    fn fetch(&mut self) -> Result<Vec<EntityDescriptor>, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub interval_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl UpdaterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// # Errors
    ///
    /// Returns an error if the interval is zero
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fetches a feed at a fixed interval and queues a reconciliation per fetch
pub struct PollingUpdater<F> {
    feed: F,
    queue: WriteQueue,
    config: UpdaterConfig,
}

impl<F: EntityFeed + 'static> PollingUpdater<F> {
    pub fn new(feed: F, queue: WriteQueue, config: UpdaterConfig) -> Self {
        Self {
            feed,
            queue,
            config,
        }
    }

    /// Fetches once and queues the result, returning the number of entities fetched
    ///
    /// # Errors
    ///
    /// Returns the feed's error, or [`Error::WriterClosed`]
    pub fn poll_once(&mut self) -> Result<usize, Error> {
        let entities = self.feed.fetch()?;
        let count = entities.len();
        self.queue.reconcile(entities)?;
        Ok(count)
    }

    /// Starts polling on a dedicated thread.
    ///
    /// Feed errors are logged and the cycle skipped. Polling ends when the
    /// handle is stopped or the writer shuts down.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the thread
    /// cannot be spawned
    pub fn spawn(mut self) -> Result<UpdaterHandle, Error> {
        self.config.validate()?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(format!("updater-{}", self.feed.name()))
            .spawn(move || {
                log::info!(
                    "Polling {} every {} s",
                    self.feed.name(),
                    self.config.interval_secs
                );
                while !stop_flag.load(Ordering::Acquire) {
                    match self.poll_once() {
                        Ok(count) => log::debug!("{}: fetched {count} entities", self.feed.name()),
                        Err(Error::WriterClosed) => {
                            log::warn!("{}: graph writer closed, stopping", self.feed.name());
                            break;
                        }
                        Err(e) => log::warn!("{}: skipping update: {e}", self.feed.name()),
                    }
                    sleep_unless_stopped(self.config.interval(), &stop_flag);
                }
            })?;
        Ok(UpdaterHandle {
            stop,
            thread: Some(thread),
        })
    }
}

fn sleep_unless_stopped(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::park_timeout(deadline - now);
    }
}

/// Handle to a running [`PollingUpdater`]
pub struct UpdaterHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl UpdaterHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops polling and waits for the thread to exit
    ///
    /// # Errors
    ///
    /// Returns an error if the polling thread panicked
    pub fn stop(mut self) -> Result<(), Error> {
        self.halt()
    }

    fn halt(&mut self) -> Result<(), Error> {
        self.stop.store(true, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread.thread().unpark();
        thread
            .join()
            .map_err(|_| Error::UnrecoverableError("updater thread panicked"))
    }
}

impl Drop for UpdaterHandle {
    fn drop(&mut self) {
        if let Err(e) = self.halt() {
            log::error!("{e}");
        }
    }
}
