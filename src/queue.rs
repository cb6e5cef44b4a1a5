//! A background worker that runs submitted units of work one at a time.
//!
//! Units run in submission order on a single worker task. Cancellation is
//! cooperative: every unit receives a [`CancellationToken`] it should check
//! at safe points, and any result produced after cancellation is discarded.
//! A unit that fails or panics is logged and the worker moves on.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::TaskError;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct QueuedTask {
    token: CancellationToken,
    job: Job,
}

#[derive(Default)]
struct State {
    pending: VecDeque<QueuedTask>,
    running: Option<CancellationToken>,
}

struct Shared {
    name: &'static str,
    state: Mutex<State>,
    wake: Notify,
    closed: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a submitted unit of work.
pub struct TaskHandle<T> {
    token: CancellationToken,
    result: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Ask the unit to stop. A unit still queued never starts.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the unit's result.
    pub async fn join(self) -> Result<T, TaskError> {
        match self.result.await {
            Ok(result) => result,
            Err(_) if self.token.is_cancelled() => Err(TaskError::Cancelled),
            Err(_) => Err(TaskError::Aborted),
        }
    }
}

/// Single-worker FIFO task queue.
///
/// Must be created inside a tokio runtime. Queues are independent of each
/// other. Dropping a queue stops it accepting work; units already submitted
/// still run unless cancelled.
pub struct SerialTaskQueue {
    shared: Arc<Shared>,
}

impl SerialTaskQueue {
    pub fn new(name: &'static str) -> Self {
        let shared = Arc::new(Shared {
            name,
            state: Mutex::new(State::default()),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
        });
        tokio::spawn(run_worker(shared.clone()));
        Self { shared }
    }

    /// Queue a unit of work behind everything already submitted.
    pub fn submit<F, Fut, T>(&self, work: F) -> TaskHandle<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let unit_token = token.clone();
        let name = self.shared.name;

        let job: Job = Box::pin(async move {
            let mut result = work(unit_token.clone()).await;
            if result.is_ok() && unit_token.is_cancelled() {
                result = Err(TaskError::Cancelled);
            }
            match &result {
                Ok(_) => {}
                Err(TaskError::Failed(reason)) => {
                    error!(queue = name, %reason, "unit of work failed");
                }
                Err(e) => debug!(queue = name, error = %e, "unit of work dropped its result"),
            }
            let _ = tx.send(result);
        });

        self.shared.lock().pending.push_back(QueuedTask {
            token: token.clone(),
            job,
        });
        self.shared.wake.notify_one();

        TaskHandle { token, result: rx }
    }

    /// Cancel the running unit and discard everything still queued.
    pub fn cancel_all(&self) {
        let mut state = self.shared.lock();
        if let Some(running) = &state.running {
            running.cancel();
        }
        drop(Self::drain(&mut state));
    }

    /// Discard queued units, leaving the running one alone.
    pub fn cancel_pending(&self) {
        let mut state = self.shared.lock();
        drop(Self::drain(&mut state));
    }

    /// Whether a unit is running or waiting.
    pub fn is_busy(&self) -> bool {
        let state = self.shared.lock();
        state.running.is_some() || !state.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    fn drain(state: &mut State) -> Vec<QueuedTask> {
        let discarded: Vec<QueuedTask> = state.pending.drain(..).collect();
        for task in &discarded {
            task.token.cancel();
        }
        discarded
    }
}

impl Drop for SerialTaskQueue {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }
}

async fn run_worker(shared: Arc<Shared>) {
    debug!(queue = shared.name, "worker started");
    loop {
        let next = {
            let mut state = shared.lock();
            let next = state.pending.pop_front();
            state.running = next.as_ref().map(|task| task.token.clone());
            next
        };

        let Some(task) = next else {
            if shared.closed.load(Ordering::SeqCst) {
                break;
            }
            shared.wake.notified().await;
            continue;
        };

        if task.token.is_cancelled() {
            shared.lock().running = None;
            continue;
        }

        // Each unit gets its own task so a panic stays contained.
        match tokio::spawn(task.job).await {
            Ok(()) => {}
            Err(e) if e.is_panic() => error!(queue = shared.name, "unit of work panicked"),
            Err(e) => warn!(queue = shared.name, error = %e, "unit of work did not complete"),
        }

        shared.lock().running = None;
    }
    debug!(queue = shared.name, "worker stopped");
}
