//! Per-target FIFO of operations with at most one active at a time.

use std::collections::VecDeque;

use crate::operation::Operation;

/// The operation currently running on a target, with its start time.
#[derive(Debug)]
pub struct ActiveJob<I> {
    /// The running operation.
    pub operation: Operation,
    /// When it became active.
    pub started: I,
}

/// FIFO of operations for one target.
///
/// `I` is the clock's instant type, used to time the active job.
#[derive(Debug)]
pub struct JobQueue<I> {
    active: Option<ActiveJob<I>>,
    pending: VecDeque<Operation>,
}

impl<I> Default for JobQueue<I> {
    fn default() -> Self {
        Self {
            active: None,
            pending: VecDeque::new(),
        }
    }
}

impl<I> JobQueue<I> {
    /// An empty, idle queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no operation is active.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Whether nothing is active and nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.pending.is_empty()
    }

    /// Operations waiting behind the active one.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append an operation.
    pub fn push(&mut self, operation: Operation) {
        self.pending.push_back(operation);
    }

    /// The active job, if any.
    pub const fn active_mut(&mut self) -> Option<&mut ActiveJob<I>> {
        self.active.as_mut()
    }

    /// If idle, promote the oldest pending operation to active.
    ///
    /// Returns the newly active job, or `None` if the queue was busy or
    /// had nothing waiting.
    pub fn start_next(&mut self, now: I) -> Option<&mut ActiveJob<I>> {
        if self.active.is_some() {
            return None;
        }
        let operation = self.pending.pop_front()?;
        self.active = Some(ActiveJob {
            operation,
            started: now,
        });
        self.active.as_mut()
    }

    /// Drop the active job, making the queue idle.
    pub fn finish_active(&mut self) -> Option<ActiveJob<I>> {
        self.active.take()
    }
}
