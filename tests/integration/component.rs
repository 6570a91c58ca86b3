//! End-to-end component tests
//!
//! Exercises the runtime the way a compiled Veld component does: heap
//! traffic through the consumed interface, destructor chains, and tasks
//! cooperating over the shared heap.

use std::cell::RefCell;
use std::rc::Rc;

use veld_runtime::abi;
use veld_runtime::heap::{Heap, Ref};
use veld_runtime::sched::Step;
use veld_runtime::util::logger;
use veld_runtime::Runtime;

/// Destructor of a list node whose first word is the owned `next` node.
fn node_dtr(
    heap: &mut Heap,
    payload: &mut [u8],
) {
    let next = u64::from_ne_bytes(payload[..8].try_into().unwrap());
    abi::decref(heap, Ref::new(next), Some(node_dtr));
}

#[test]
fn test_linked_list_teardown_cascades() {
    logger::init();
    let mut rt = Runtime::new();
    let heap = rt.heap_mut();

    // head -> mid -> tail, each node owning the next.
    let tail = abi::alloc(heap, 16);
    let mid = abi::alloc(heap, 16);
    let head = abi::alloc(heap, 16);
    heap.write::<u64>(mid, 0, tail.raw()).unwrap();
    heap.write::<u64>(head, 0, mid.raw()).unwrap();
    assert_eq!(heap.live_blocks(), 3);

    abi::decref(heap, head, Some(node_dtr));
    assert_eq!(heap.live_blocks(), 0);
    assert_eq!(heap.stats().destructor_runs, 3);
}

#[test]
fn test_string_finalizer_roundtrip() {
    let mut rt = Runtime::new();
    let heap = rt.heap_mut();

    let buf = abi::alloc_arr(heap, 16, 1);
    for (i, b) in b"veld".iter().enumerate() {
        heap.write::<u8>(buf, i, *b).unwrap();
    }
    let s = abi::arr_to_str(heap, buf, buf, 4);
    assert_eq!(abi::len_str(heap, s), 4);
    assert_eq!(abi::len_arr(heap, s), 5);

    abi::decref_arr(heap, s, None);
    assert!(abi::is_null_arr(heap, s));
}

#[test]
fn test_component_lifecycle_with_cooperating_tasks() {
    let mut rt = abi::component_main_start();
    assert!(abi::stacksize(&rt) > 0);

    let counter = rt.heap_mut().alloc(8);
    let observed = Rc::new(RefCell::new(Vec::new()));

    // Producer bumps the counter once per slice.
    let mut produced = 0u64;
    rt.spawn(move |ctx| {
        produced += 1;
        ctx.heap().write::<u64>(counter, 0, produced).unwrap();
        if produced < 5 {
            Step::Yield
        } else {
            Step::Done
        }
    });

    // Consumer snapshots the counter after every producer slice.
    let log = Rc::clone(&observed);
    let mut seen = 0;
    rt.spawn(move |ctx| {
        let value = ctx.heap().read::<u64>(counter, 0).unwrap();
        log.borrow_mut().push(value);
        seen += 1;
        if seen < 5 {
            Step::Yield
        } else {
            Step::Done
        }
    });

    abi::component_main_end(&mut rt);

    assert_eq!(*observed.borrow(), vec![1, 2, 3, 4, 5]);
    assert_eq!(rt.scheduler().stats().completed, 2);
    // Task stacks are reclaimed; only the counter block remains.
    assert_eq!(rt.heap().live_blocks(), 1);
    abi::decref(rt.heap_mut(), counter, None);
    assert_eq!(rt.heap().live_blocks(), 0);
}

#[test]
fn test_pinned_block_survives_owner_exit() {
    let mut rt = Runtime::new();
    let heap = rt.heap_mut();

    let block = abi::alloc(heap, 8);
    heap.write::<u64>(block, 0, 99).unwrap();

    abi::lock(heap, block);
    abi::decref(heap, block, None);

    // Owner is gone, but the pin keeps the payload addressable.
    assert!(!abi::is_null(heap, block));
    assert_eq!(heap.read::<u64>(block, 0).unwrap(), 99);

    abi::unlock(heap, block, None);
    assert!(abi::is_null(heap, block));
    assert_eq!(heap.live_blocks(), 0);
}
