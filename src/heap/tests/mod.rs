//! Heap unit tests
//!
//! Allocation, the reference-count and lock engines, and the string
//! helpers.


use crate::heap::Heap;

#[test]
fn test_alloc_zero_initialized() {
    let mut heap = Heap::new();
    let r = heap.alloc(32);
    assert!(heap.payload(r).unwrap().iter().all(|&b| b == 0));
    assert_eq!(heap.payload(r).unwrap().len(), 32);
}

#[test]
fn test_alloc_arr_payload_size() {
    let mut heap = Heap::new();
    let r = heap.alloc_arr(5, 8).unwrap();
    assert_eq!(heap.payload(r).unwrap().len(), 40);
    assert_eq!(heap.len_arr(r).unwrap(), 5);
}

#[test]
fn test_alloc_arr_overflow_fails() {
    let mut heap = Heap::new();
    assert!(heap.alloc_arr(i64::MAX, 8).is_err());
    assert!(heap.alloc_arr(-1, 8).is_err());
}

#[test]
fn test_alloc_stats() {
    let mut heap = Heap::new();
    let a = heap.alloc(8);
    let b = heap.alloc(8);
    assert_eq!(heap.stats().allocs, 2);
    assert_eq!(heap.stats().live(), 2);
    assert_eq!(heap.live_blocks(), 2);

    heap.decref(a, None).unwrap();
    heap.decref(b, None).unwrap();
    assert_eq!(heap.stats().frees, 2);
    assert_eq!(heap.stats().live(), 0);
    assert_eq!(heap.live_blocks(), 0);
}

#[test]
fn test_handles_not_reused() {
    let mut heap = Heap::new();
    let a = heap.alloc(8);
    heap.decref(a, None).unwrap();
    let b = heap.alloc(8);
    assert_ne!(a, b);
}

#[test]
fn test_read_write_roundtrip() {
    let mut heap = Heap::new();
    let r = heap.alloc(16);
    heap.write::<u64>(r, 0, 0xdead_beef).unwrap();
    heap.write::<u32>(r, 8, 7).unwrap();
    assert_eq!(heap.read::<u64>(r, 0).unwrap(), 0xdead_beef);
    assert_eq!(heap.read::<u32>(r, 8).unwrap(), 7);
}

#[test]
fn test_read_out_of_range() {
    let mut heap = Heap::new();
    let r = heap.alloc(8);
    assert!(heap.read::<u64>(r, 1).is_err());
    assert!(heap.write::<u64>(r, 8, 0).is_err());
}
