//! Scheduler queues
//!
//! The ready queue is strict FIFO: insert at the tail, remove at the head,
//! nothing else. The waiting list is unordered; waking a task implies no
//! relative order among the remaining waiters. Both are plain containers:
//! the scheduler runs on one OS thread, so no synchronization is involved.

use std::collections::VecDeque;

use indexmap::IndexMap;

use super::task::{Task, TaskId};

/// Strict FIFO queue of runnable tasks.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    inner: VecDeque<Task>,
}

impl ReadyQueue {
    /// Create an empty ready queue.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: VecDeque::new(),
        }
    }

    /// Append a task at the tail.
    #[inline]
    pub fn push(
        &mut self,
        task: Task,
    ) {
        self.inner.push_back(task);
    }

    /// Remove the task at the head.
    #[inline]
    pub fn pop(&mut self) -> Option<Task> {
        self.inner.pop_front()
    }

    /// Number of queued tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Unordered set of tasks parked until an external wake.
#[derive(Debug, Default)]
pub struct WaitSet {
    inner: IndexMap<TaskId, Task>,
}

impl WaitSet {
    /// Create an empty wait set.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    /// Park a task.
    #[inline]
    pub fn insert(
        &mut self,
        task: Task,
    ) {
        self.inner.insert(task.id(), task);
    }

    /// Remove a task by id. Order among the remaining waiters is not
    /// preserved.
    #[inline]
    pub fn remove(
        &mut self,
        id: TaskId,
    ) -> Option<Task> {
        self.inner.swap_remove(&id)
    }

    /// Whether a task is parked here.
    #[inline]
    pub fn contains(
        &self,
        id: TaskId,
    ) -> bool {
        self.inner.contains_key(&id)
    }

    /// Number of parked tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
