//! Cooperative task scheduler
//!
//! Multiplexes lightweight tasks onto the one OS thread the runtime owns.
//! There is no preemption: a task runs until its body returns a [`Step`],
//! the explicit yield point. State is exactly one running slot, a strict
//! FIFO ready queue, an unordered waiting list and a one-slot garbage
//! reference holding a just-finished task's stack — a task cannot free the
//! stack it runs on, so reclamation happens one scheduling step later.

pub mod queue;
pub mod task;

pub use queue::{ReadyQueue, WaitSet};
pub use task::{Step, Task, TaskBody, TaskContext, TaskId, TaskIdGenerator, TaskState};

use tracing::debug;

use crate::errors::{RuntimeError, RuntimeResult};
use crate::heap::{Heap, Ref};

/// Default per-task stack size in bytes.
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024;

/// Scheduler counters.
///
/// Plain integers; the scheduler never leaves its thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchedStats {
    /// Total tasks spawned.
    pub spawned: usize,
    /// Total tasks run to completion.
    pub completed: usize,
    /// Total resume slices executed.
    pub switches: usize,
    /// Total task stacks reclaimed.
    pub stacks_freed: usize,
}

/// Outcome of one scheduling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A task was resumed.
    Ran,
    /// No task remains; the scheduled portion of the program is complete.
    Complete,
}

/// Cooperative scheduler instance.
///
/// One instance is owned by the runtime entry point; it shares the heap
/// with everything else to allocate and reclaim task stacks.
#[derive(Debug)]
pub struct Scheduler {
    /// FIFO queue of runnable tasks.
    ready: ReadyQueue,
    /// Unordered parked tasks.
    waiting: WaitSet,
    /// The single running slot (only occupied during a resume slice).
    running: Option<TaskId>,
    /// A finished task's stack pending deferred reclamation.
    garbage: Option<Ref>,
    /// Stack size for spawned tasks.
    stack_size: usize,
    /// Task ID generator.
    ids: TaskIdGenerator,
    /// Counters.
    stats: SchedStats,
}

impl Scheduler {
    /// Create a scheduler with the default stack size.
    #[inline]
    pub fn new() -> Self {
        Self::with_stack_size(DEFAULT_STACK_SIZE)
    }

    /// Create a scheduler with a custom per-task stack size.
    pub fn with_stack_size(stack_size: usize) -> Self {
        Self {
            ready: ReadyQueue::new(),
            waiting: WaitSet::new(),
            running: None,
            garbage: None,
            stack_size,
            ids: TaskIdGenerator::new(),
            stats: SchedStats::default(),
        }
    }

    /// Spawn a task: allocate its stack from the shared heap and append it
    /// to the tail of the ready queue.
    pub fn spawn<F>(
        &mut self,
        heap: &mut Heap,
        body: F,
    ) -> TaskId
    where
        F: FnMut(&mut TaskContext<'_>) -> Step + 'static,
    {
        self.spawn_boxed(heap, Box::new(body))
    }

    /// Spawn a task from an already boxed body.
    pub fn spawn_boxed(
        &mut self,
        heap: &mut Heap,
        body: TaskBody,
    ) -> TaskId {
        let id = self.ids.next();
        let stack = heap.alloc(self.stack_size);
        let task = Task::new(id, stack, body);
        debug!("spawn {id} (stack {stack})");
        self.stats.spawned += 1;
        self.ready.push(task);
        id
    }

    /// External wake: move a parked task back to the tail of the ready
    /// queue. Returns false if the task is not waiting.
    pub fn wake(
        &mut self,
        id: TaskId,
    ) -> bool {
        match self.waiting.remove(id) {
            Some(mut task) => {
                task.set_state(TaskState::Ready);
                self.ready.push(task);
                true
            }
            None => false,
        }
    }

    /// Free a stack left behind by a finished task. Deferred because a
    /// task cannot free the stack it runs on; the next step (or the final
    /// collection at completion) performs it.
    fn collect_garbage(
        &mut self,
        heap: &mut Heap,
    ) -> RuntimeResult<()> {
        if let Some(stack) = self.garbage.take() {
            heap.release(stack, None)?;
            self.stats.stacks_freed += 1;
            debug!("reclaimed stack {stack}");
        }
        Ok(())
    }

    /// Execute one scheduling step: reclaim pending garbage, take the head
    /// of the ready queue, resume it and file it according to its
    /// [`Step`].
    ///
    /// With nothing schedulable, an empty waiting list means top-level
    /// completion; a non-empty one is a deadlock — every extant task is
    /// parked and nothing can wake it.
    pub fn step(
        &mut self,
        heap: &mut Heap,
    ) -> RuntimeResult<Status> {
        self.collect_garbage(heap)?;

        let Some(mut task) = self.ready.pop() else {
            if self.waiting.is_empty() {
                return Ok(Status::Complete);
            }
            return Err(RuntimeError::Deadlock {
                waiting: self.waiting.len(),
            });
        };

        task.set_state(TaskState::Running);
        self.running = Some(task.id());
        self.stats.switches += 1;

        let mut ctx = TaskContext::new(heap, task.id(), task.stack());
        let step = task.resume(&mut ctx);
        let (spawned, wakes) = ctx.into_effects();

        for body in spawned {
            self.spawn_boxed(heap, body);
        }
        for id in wakes {
            self.wake(id);
        }
        self.running = None;

        match step {
            Step::Yield => {
                task.set_state(TaskState::Ready);
                self.ready.push(task);
            }
            Step::Wait => {
                task.set_state(TaskState::Waiting);
                self.waiting.insert(task);
            }
            Step::Done => {
                task.set_state(TaskState::Finished);
                debug!("{} finished", task.id());
                self.stats.completed += 1;
                self.garbage = Some(task.into_stack());
            }
        }
        Ok(Status::Ran)
    }

    /// Drive the scheduler until every task has finished, then perform the
    /// final garbage collection. Fails with [`RuntimeError::Deadlock`]
    /// when all extant tasks are waiting.
    pub fn run(
        &mut self,
        heap: &mut Heap,
    ) -> RuntimeResult<()> {
        loop {
            match self.step(heap)? {
                Status::Ran => {}
                Status::Complete => break,
            }
        }
        self.collect_garbage(heap)
    }

    /// Id of the task currently being resumed, if any.
    #[inline]
    pub fn current(&self) -> Option<TaskId> {
        self.running
    }

    /// Number of runnable tasks.
    #[inline]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Number of parked tasks.
    #[inline]
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Whether any task (ready, waiting or pending reclamation) remains.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty() && self.waiting.is_empty() && self.garbage.is_none()
    }

    /// Per-task stack size in bytes.
    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Scheduler counters.
    #[inline]
    pub fn stats(&self) -> &SchedStats {
        &self.stats
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
