//! Queue tests: FIFO discipline and the unordered wait set

use crate::heap::Ref;
use crate::sched::queue::{ReadyQueue, WaitSet};
use crate::sched::task::{Step, Task, TaskId};

fn dummy_task(id: usize) -> Task {
    Task::new(TaskId(id), Ref::new(id as u64 + 1), Box::new(|_| Step::Done))
}

#[test]
fn test_ready_queue_is_fifo() {
    let mut queue = ReadyQueue::new();
    queue.push(dummy_task(1));
    queue.push(dummy_task(2));
    queue.push(dummy_task(3));

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.pop().unwrap().id(), TaskId(1));
    assert_eq!(queue.pop().unwrap().id(), TaskId(2));
    assert_eq!(queue.pop().unwrap().id(), TaskId(3));
    assert!(queue.pop().is_none());
    assert!(queue.is_empty());
}

#[test]
fn test_ready_queue_interleaved() {
    let mut queue = ReadyQueue::new();
    queue.push(dummy_task(1));
    queue.push(dummy_task(2));
    assert_eq!(queue.pop().unwrap().id(), TaskId(1));
    queue.push(dummy_task(3));
    assert_eq!(queue.pop().unwrap().id(), TaskId(2));
    assert_eq!(queue.pop().unwrap().id(), TaskId(3));
}

#[test]
fn test_wait_set_remove_by_id() {
    let mut waiting = WaitSet::new();
    waiting.insert(dummy_task(1));
    waiting.insert(dummy_task(2));
    waiting.insert(dummy_task(3));

    assert!(waiting.contains(TaskId(2)));
    let task = waiting.remove(TaskId(2)).unwrap();
    assert_eq!(task.id(), TaskId(2));
    assert!(!waiting.contains(TaskId(2)));
    assert_eq!(waiting.len(), 2);

    assert!(waiting.remove(TaskId(2)).is_none());
}

#[test]
fn test_wait_set_empty() {
    let mut waiting = WaitSet::new();
    assert!(waiting.is_empty());
    assert!(waiting.remove(TaskId(0)).is_none());
    waiting.insert(dummy_task(0));
    assert!(!waiting.is_empty());
}
