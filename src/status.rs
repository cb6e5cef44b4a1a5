use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::sleep;

use crate::queue::SerialTaskQueue;

pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Short-lived messages shown in the status bar.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    messages: Arc<Mutex<Vec<String>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `message`, removing it again after `timeout` if one is given.
    ///
    /// Removal runs on a queue of its own that is dropped straight away;
    /// the submitted unit still runs to completion.
    pub fn post(&self, message: impl Into<String>, timeout: Option<Duration>) {
        let message = message.into();
        self.lock().push(message.clone());

        let Some(timeout) = timeout else {
            return;
        };
        let messages = self.messages.clone();
        let queue = SerialTaskQueue::new("status");
        let _ = queue.submit(move |_| async move {
            sleep(timeout).await;
            let mut messages = messages.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(pos) = messages.iter().position(|m| *m == message) {
                messages.remove(pos);
            }
            Ok(())
        });
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Most recent message, if any.
    pub fn latest(&self) -> Option<String> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
