//! Scheduler unit tests

mod queue;

use crate::sched::{TaskId, TaskIdGenerator, TaskState};

#[test]
fn test_task_id_display() {
    assert_eq!(TaskId(5).to_string(), "Task(5)");
    assert_eq!(TaskId(5).inner(), 5);
}

#[test]
fn test_task_id_generator_is_sequential() {
    let mut ids = TaskIdGenerator::new();
    assert_eq!(ids.next(), TaskId(0));
    assert_eq!(ids.next(), TaskId(1));
    assert_eq!(ids.next(), TaskId(2));
}

#[test]
fn test_task_state_partial_eq() {
    assert_eq!(TaskState::Ready, TaskState::Ready);
    assert_ne!(TaskState::Ready, TaskState::Running);
    assert_ne!(TaskState::Waiting, TaskState::Finished);
}
