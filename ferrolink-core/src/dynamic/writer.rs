//! Single writer for shared dynamic state.
//!
//! All mutations of the tracked-entity table run as tasks on one dedicated
//! thread, strictly one after another in submission order. After each
//! reconciliation the writer publishes a new [`DynamicSnapshot`]; readers
//! clone the current `Arc` and never wait for a batch to finish.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use super::entity::EntityDescriptor;
use super::reconciler::{DynamicSnapshot, EntityReconciler, ReconcileOutcome};
use crate::{
    Error,
    linking::{LinkerConfig, TemporaryLinker},
    model::StreetGraph,
};

type Task = Box<dyn FnOnce(&mut WriterState) + Send>;

enum Message {
    Task(Task),
    Shutdown,
}

type Published = Arc<RwLock<Arc<DynamicSnapshot>>>;

/// State owned by the writer thread
pub struct WriterState {
    streets: Arc<StreetGraph>,
    config: LinkerConfig,
    reconciler: EntityReconciler,
    published: Published,
}

impl WriterState {
    pub fn streets(&self) -> &StreetGraph {
        &self.streets
    }

    pub fn reconciler(&self) -> &EntityReconciler {
        &self.reconciler
    }

    /// Reconciles the entity table with `current` and publishes the result
    pub fn reconcile(&mut self, current: Vec<EntityDescriptor>) -> ReconcileOutcome {
        let linker = TemporaryLinker::new(&self.streets, &self.config);
        let outcome = self.reconciler.reconcile(&linker, current);
        self.publish();
        outcome
    }

    fn publish(&self) {
        let snapshot = Arc::new(self.reconciler.snapshot());
        match self.published.write() {
            Ok(mut current) => *current = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

/// Read handle to the latest published snapshot
#[derive(Clone)]
pub struct SnapshotReader {
    published: Published,
}

impl SnapshotReader {
    pub fn load(&self) -> Arc<DynamicSnapshot> {
        match self.published.read() {
            Ok(current) => Arc::clone(&current),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

/// Sending side of the writer's task queue
#[derive(Clone)]
pub struct WriteQueue {
    sender: Sender<Message>,
}

impl WriteQueue {
    /// Queues `task` to run on the writer thread
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriterClosed`] if the writer has shut down
    pub fn execute<F>(&self, task: F) -> Result<(), Error>
    where
        F: FnOnce(&mut WriterState) + Send + 'static,
    {
        self.sender
            .send(Message::Task(Box::new(task)))
            .map_err(|_| Error::WriterClosed)
    }

    /// Queues a reconciliation without waiting for it
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriterClosed`] if the writer has shut down
    pub fn reconcile(&self, current: Vec<EntityDescriptor>) -> Result<(), Error> {
        self.execute(move |state| {
            let outcome = state.reconcile(current);
            log::info!(
                "Dynamic entities updated: {} added, {} removed, {} unlinked",
                outcome.added.len(),
                outcome.removed.len(),
                outcome.unlinked
            );
        })
    }

    /// Queues a reconciliation and waits for its outcome
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriterClosed`] if the writer has shut down or the
    /// task did not complete
    pub fn reconcile_blocking(
        &self,
        current: Vec<EntityDescriptor>,
    ) -> Result<ReconcileOutcome, Error> {
        let (reply, outcome) = mpsc::channel();
        self.execute(move |state| {
            let _ = reply.send(state.reconcile(current));
        })?;
        outcome.recv().map_err(|_| Error::WriterClosed)
    }
}

/// Owner of the writer thread
pub struct GraphWriter {
    queue: WriteQueue,
    reader: SnapshotReader,
    handle: Option<JoinHandle<()>>,
}

impl GraphWriter {
    /// Starts the writer thread for entities linked against `streets`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the thread
    /// cannot be spawned
    pub fn spawn(streets: Arc<StreetGraph>, config: LinkerConfig) -> Result<Self, Error> {
        config.validate()?;
        let published: Published = Arc::new(RwLock::new(Arc::new(DynamicSnapshot::default())));
        let state = WriterState {
            streets,
            config,
            reconciler: EntityReconciler::new(),
            published: Arc::clone(&published),
        };
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("graph-writer".to_string())
            .spawn(move || run(state, &receiver))?;

        Ok(Self {
            queue: WriteQueue { sender },
            reader: SnapshotReader { published },
            handle: Some(handle),
        })
    }

    pub fn queue(&self) -> WriteQueue {
        self.queue.clone()
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<DynamicSnapshot> {
        self.reader.load()
    }

    /// # Errors
    ///
    /// See [`WriteQueue::execute`]
    pub fn execute<F>(&self, task: F) -> Result<(), Error>
    where
        F: FnOnce(&mut WriterState) + Send + 'static,
    {
        self.queue.execute(task)
    }

    /// # Errors
    ///
    /// See [`WriteQueue::reconcile`]
    pub fn reconcile(&self, current: Vec<EntityDescriptor>) -> Result<(), Error> {
        self.queue.reconcile(current)
    }

    /// Runs the tasks already queued, then stops the thread
    ///
    /// # Errors
    ///
    /// Returns an error if the writer thread panicked outside a task
    pub fn shutdown(mut self) -> Result<(), Error> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), Error> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.queue.sender.send(Message::Shutdown);
        handle
            .join()
            .map_err(|_| Error::UnrecoverableError("graph writer thread panicked"))
    }
}

impl Drop for GraphWriter {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{e}");
        }
    }
}

fn run(mut state: WriterState, receiver: &Receiver<Message>) {
    log::debug!("Graph writer started");
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Task(task) => {
                // The entity table is replaced only when a batch completes,
                // so a panicking task leaves the previous state in place
                if panic::catch_unwind(AssertUnwindSafe(|| task(&mut state))).is_err() {
                    log::error!("Graph writer task panicked, previous state kept");
                }
            }
            Message::Shutdown => break,
        }
    }
    log::debug!("Graph writer stopped");
}
