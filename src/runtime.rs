//! Runtime instance and component lifecycle
//!
//! One [`Runtime`] is owned by the program entry point: it ties the heap
//! and the scheduler together with the same init-at-start /
//! teardown-at-completion lifecycle the generated component `main` drives.

use tracing::debug;

use crate::errors::RuntimeResult;
use crate::heap::{BlockHeader, Heap};
use crate::sched::{Scheduler, Step, TaskContext, TaskId};
use crate::util::config::RuntimeConfig;

/// The heap and scheduler of one component instance.
#[derive(Debug, Default)]
pub struct Runtime {
    heap: Heap,
    scheduler: Scheduler,
}

impl Runtime {
    /// Create a runtime with the default configuration. This is the
    /// component-main start point: empty queues, empty heap, no pending
    /// garbage.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::default())
    }

    /// Create a runtime from a configuration.
    pub fn with_config(config: &RuntimeConfig) -> Self {
        Self {
            heap: Heap::new(),
            scheduler: Scheduler::with_stack_size(config.stack_size),
        }
    }

    /// Borrow the heap.
    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutably borrow the heap.
    #[inline]
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Borrow the scheduler.
    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Spawn a task onto the shared scheduler.
    pub fn spawn<F>(
        &mut self,
        body: F,
    ) -> TaskId
    where
        F: FnMut(&mut TaskContext<'_>) -> Step + 'static,
    {
        self.scheduler.spawn(&mut self.heap, body)
    }

    /// External wake of a parked task.
    #[inline]
    pub fn wake(
        &mut self,
        id: TaskId,
    ) -> bool {
        self.scheduler.wake(id)
    }

    /// Component-main end: the top level has finished, so drive every
    /// remaining task to completion and reclaim the last pending stack.
    /// A deadlock among the remaining tasks is fatal at the ABI.
    pub fn finish(&mut self) -> RuntimeResult<()> {
        self.scheduler.run(&mut self.heap)?;
        let heap = self.heap.stats();
        let sched = self.scheduler.stats();
        debug!(
            "component done: {} tasks, {} blocks allocated, {} live",
            sched.completed,
            heap.allocs,
            heap.live()
        );
        Ok(())
    }

    /// Fixed per-task stack footprint in bytes, header overhead included.
    #[inline]
    pub fn stacksize(&self) -> usize {
        self.scheduler.stack_size() + std::mem::size_of::<BlockHeader>()
    }
}
