//! Deferred actions for runtime-attached threads.
//!
//! Detours and background threads must not call into the managed side at
//! arbitrary times. They enqueue closures here instead, and a thread that
//! is known to be attached drains them by calling [`ActionQueue::pump`].

use std::collections::VecDeque;
use std::mem;
use std::sync::Mutex;

type Action = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct ActionQueue {
    pending: Mutex<VecDeque<Action>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        ActionQueue::default()
    }

    /// Queue an action from any thread.
    pub fn enqueue<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.lock().push_back(Box::new(action));
    }

    /// Run every queued action in FIFO order on the calling thread.
    ///
    /// The backlog is swapped out under the lock and executed after it is
    /// released, so actions may enqueue further actions without
    /// deadlocking; those run on the next pump. Returns how many actions
    /// ran.
    pub fn pump(&self) -> usize {
        let batch = mem::take(&mut *self.lock());
        let count = batch.len();
        for action in batch {
            action();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Action>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
