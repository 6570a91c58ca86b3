//! Task definitions for the cooperative scheduler.
//!
//! A task is an independently owned stack block plus a resumable body. The
//! scheduler resumes the body one slice at a time; the returned [`Step`]
//! says how the slice ended, replacing an in-stack context switch.

use std::fmt;

use smallvec::SmallVec;

use crate::heap::{Heap, Ref};

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> usize {
        self.0
    }
}

impl From<usize> for TaskId {
    fn from(val: usize) -> Self {
        Self(val)
    }
}

impl From<TaskId> for usize {
    fn from(val: TaskId) -> Self {
        val.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued in the ready list.
    Ready,
    /// Currently executing.
    Running,
    /// Parked in the waiting list until an external wake.
    Waiting,
    /// Completed; its stack is pending deferred reclamation.
    Finished,
}

/// How a resume slice ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Cooperative yield: go to the tail of the ready queue and let the
    /// head run (`yield(wait = false)`).
    Yield,
    /// Park in the waiting list until woken (`yield(wait = true)`).
    Wait,
    /// The task finished; its stack becomes garbage for the next step.
    Done,
}

/// Resumable task body.
pub type TaskBody = Box<dyn FnMut(&mut TaskContext<'_>) -> Step>;

/// Execution context handed to a task body for one slice.
///
/// Spawn and wake requests are deferred effects: the scheduler drains them
/// after the slice, since a task cannot mutate the scheduler that is
/// currently resuming it.
pub struct TaskContext<'a> {
    heap: &'a mut Heap,
    current: TaskId,
    stack: Ref,
    spawned: SmallVec<[TaskBody; 2]>,
    wakes: SmallVec<[TaskId; 4]>,
}

impl<'a> TaskContext<'a> {
    /// Create a context for one resume slice.
    pub fn new(
        heap: &'a mut Heap,
        current: TaskId,
        stack: Ref,
    ) -> Self {
        Self {
            heap,
            current,
            stack,
            spawned: SmallVec::new(),
            wakes: SmallVec::new(),
        }
    }

    /// The shared heap.
    #[inline]
    pub fn heap(&mut self) -> &mut Heap {
        self.heap
    }

    /// Id of the task being resumed.
    #[inline]
    pub fn current(&self) -> TaskId {
        self.current
    }

    /// The running task's own stack block.
    #[inline]
    pub fn stack(&self) -> Ref {
        self.stack
    }

    /// Request a new task; it enters the tail of the ready queue after this
    /// slice.
    pub fn spawn<F>(
        &mut self,
        body: F,
    ) where
        F: FnMut(&mut TaskContext<'_>) -> Step + 'static,
    {
        self.spawned.push(Box::new(body));
    }

    /// Request an external wake: move a waiting task back to the ready
    /// tail after this slice.
    pub fn wake(
        &mut self,
        id: TaskId,
    ) {
        self.wakes.push(id);
    }

    /// Split the context into its deferred effects.
    pub(crate) fn into_effects(self) -> (SmallVec<[TaskBody; 2]>, SmallVec<[TaskId; 4]>) {
        (self.spawned, self.wakes)
    }
}

/// A cooperatively scheduled task.
pub struct Task {
    /// Unique task ID.
    id: TaskId,
    /// Task name for diagnostics.
    name: String,
    /// Current state.
    state: TaskState,
    /// The task's stack block in the shared heap.
    stack: Ref,
    /// Resumable body.
    body: TaskBody,
}

impl fmt::Debug for Task {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("stack", &self.stack)
            .finish()
    }
}

impl Task {
    /// Create a task owning `stack` with the given body.
    pub fn new(
        id: TaskId,
        stack: Ref,
        body: TaskBody,
    ) -> Self {
        Self {
            id,
            name: format!("Task({})", id.inner()),
            state: TaskState::Ready,
            stack,
            body,
        }
    }

    /// Get the task ID.
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the task name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current state.
    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Set the task state.
    #[inline]
    pub fn set_state(
        &mut self,
        state: TaskState,
    ) {
        self.state = state;
    }

    /// The task's stack block.
    #[inline]
    pub fn stack(&self) -> Ref {
        self.stack
    }

    /// Run one slice of the task body.
    #[inline]
    pub fn resume(
        &mut self,
        ctx: &mut TaskContext<'_>,
    ) -> Step {
        (self.body)(ctx)
    }

    /// Consume the task, handing its stack to deferred reclamation.
    #[inline]
    pub fn into_stack(self) -> Ref {
        self.stack
    }
}

/// Iterator for generating task IDs.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    next_id: usize,
}

impl TaskIdGenerator {
    /// Create a new task ID generator.
    #[inline]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate the next task ID.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        TaskId(id)
    }
}
