//! Debounced re-filtering on top of [`SerialTaskQueue`].
//!
//! Every request cancels whatever pass is queued or running, then queues a
//! new one that waits out the debounce delay before doing any work. Each
//! request gets a generation number; a pass whose generation is no longer
//! the latest drops its output, both after the delay and before handing
//! its result back.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::TaskError;
use crate::markers::MarkerSet;
use crate::pipeline::{self, ActiveFilter, Line, Palette, PassInput, PassOutput};
use crate::queue::{SerialTaskQueue, TaskHandle};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(20);

pub struct Refilter {
    queue: SerialTaskQueue,
    issued: Arc<AtomicU64>,
    passes: Arc<AtomicU64>,
    debounce: Duration,
}

impl Refilter {
    pub fn new(debounce: Duration) -> Self {
        Self {
            queue: SerialTaskQueue::new("refilter"),
            issued: Arc::new(AtomicU64::new(0)),
            passes: Arc::new(AtomicU64::new(0)),
            debounce,
        }
    }

    /// Generation of the most recent request.
    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest()
    }

    /// Passes that got past the debounce delay and started matching.
    pub fn passes_started(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Request a pass over a snapshot of the document and filters.
    pub fn submit(
        &self,
        lines: Arc<[Line]>,
        markers: Arc<MarkerSet>,
        filters: Vec<ActiveFilter>,
        palette: Palette,
    ) -> TaskHandle<PassOutput> {
        self.queue.cancel_all();
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let input = PassInput {
            generation,
            lines,
            markers,
            filters,
            palette,
        };
        let issued = self.issued.clone();
        let passes = self.passes.clone();
        let debounce = self.debounce;

        self.queue.submit(move |token| async move {
            tokio::select! {
                _ = token.cancelled() => return Err(TaskError::Cancelled),
                _ = sleep(debounce) => {}
            }
            if issued.load(Ordering::SeqCst) != generation {
                debug!(generation, "pass superseded during debounce");
                return Err(TaskError::Superseded);
            }

            passes.fetch_add(1, Ordering::SeqCst);
            let pass_token = token.clone();
            let joined =
                tokio::task::spawn_blocking(move || pipeline::run(&input, &pass_token)).await;
            let output = match joined {
                Ok(Some(output)) => output,
                Ok(None) => return Err(TaskError::Cancelled),
                Err(e) => return Err(TaskError::Failed(format!("pass {generation}: {e}"))),
            };

            if issued.load(Ordering::SeqCst) != generation {
                debug!(generation, "pass superseded before publishing");
                return Err(TaskError::Superseded);
            }
            Ok(output)
        })
    }

    /// Cancel the running pass and anything queued behind it.
    pub fn cancel_all(&self) {
        self.queue.cancel_all();
    }
}

impl Drop for Refilter {
    fn drop(&mut self) {
        self.queue.cancel_all();
    }
}
