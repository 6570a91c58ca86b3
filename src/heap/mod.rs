//! Reference-counted heap
//!
//! This module implements the allocator and reference-count engine backing
//! every allocation the Veld compiler emits. Blocks are kept in a handle
//! table; generated code holds opaque [`Ref`] handles and manipulates them
//! through incref/decref/release plus an orthogonal lock (pin) counter.
//!
//! Release discipline: a block is physically freed at the first moment its
//! ref state is terminal (`Frozen(0)`) and no lock is outstanding, and its
//! destructor runs exactly then, exactly once. Whichever of decref, release
//! or unlock last observes that condition performs the free.

mod block;
pub mod strings;

pub use block::{Block, BlockHeader, BlockKind, Ref, RefFault, RefState};

use hashbrown::HashMap;
use tracing::trace;

use crate::errors::{RuntimeError, RuntimeResult};

/// Scalar destructor: receives the heap and the dying block's payload so it
/// can release references the payload holds. It must not free the block
/// itself; the heap already detached it.
pub type Destructor = fn(&mut Heap, &mut [u8]);

/// Array destructor: additionally receives the element count for
/// per-element teardown.
pub type ArrayDestructor = fn(&mut Heap, &mut [u8], i64);

/// Heap counters.
///
/// Plain integers: the runtime is single-logical-thread by design, so no
/// atomics are involved.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapStats {
    /// Total blocks allocated.
    pub allocs: usize,
    /// Total blocks physically released.
    pub frees: usize,
    /// Total destructor invocations.
    pub destructor_runs: usize,
}

impl HeapStats {
    /// Number of blocks currently live.
    #[inline]
    pub fn live(&self) -> usize {
        self.allocs - self.frees
    }
}

/// Reference-counted heap with handle-based blocks.
#[derive(Debug, Default)]
pub struct Heap {
    /// Handle to block mapping.
    blocks: HashMap<Ref, Block>,
    /// Next handle value; handles are never reused.
    next_ref: u64,
    /// Counters.
    stats: HeapStats,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            next_ref: 0,
            stats: HeapStats::default(),
        }
    }

    fn insert(
        &mut self,
        block: Block,
    ) -> Ref {
        self.next_ref += 1;
        let r = Ref::new(self.next_ref);
        self.blocks.insert(r, block);
        self.stats.allocs += 1;
        r
    }

    fn block(
        &self,
        r: Ref,
    ) -> RuntimeResult<&Block> {
        self.blocks.get(&r).ok_or(RuntimeError::UseAfterFree(r))
    }

    fn block_mut(
        &mut self,
        r: Ref,
    ) -> RuntimeResult<&mut Block> {
        self.blocks
            .get_mut(&r)
            .ok_or(RuntimeError::UseAfterFree(r))
    }

    fn scalar_mut(
        &mut self,
        r: Ref,
    ) -> RuntimeResult<&mut Block> {
        let block = self.block_mut(r)?;
        match block.kind {
            BlockKind::Scalar => Ok(block),
            BlockKind::Array { .. } => Err(RuntimeError::KindMismatch(r)),
        }
    }

    fn array_mut(
        &mut self,
        r: Ref,
    ) -> RuntimeResult<&mut Block> {
        let block = self.block_mut(r)?;
        match block.kind {
            BlockKind::Array { .. } => Ok(block),
            BlockKind::Scalar => Err(RuntimeError::KindMismatch(r)),
        }
    }

    // === Allocation ===

    /// Allocate a scalar block of `size` zeroed payload bytes with one
    /// owner and no locks.
    pub fn alloc(
        &mut self,
        size: usize,
    ) -> Ref {
        self.insert(Block::scalar(size))
    }

    /// Allocate an array block of `count` elements of `elem_size` bytes
    /// each. The element count is fixed for the block's lifetime.
    pub fn alloc_arr(
        &mut self,
        count: i64,
        elem_size: usize,
    ) -> RuntimeResult<Ref> {
        let elements =
            usize::try_from(count).map_err(|_| RuntimeError::AllocFailed(elem_size))?;
        let payload_size = elements
            .checked_mul(elem_size)
            .ok_or(RuntimeError::AllocFailed(usize::MAX))?;
        Ok(self.insert(Block::array(count, payload_size)))
    }

    // === Reference counting (scalar) ===

    /// Add one reference. Returns the handle unchanged so call sites can
    /// chain through it; null stays null.
    pub fn incref(
        &mut self,
        r: Ref,
    ) -> RuntimeResult<Ref> {
        if r.is_null() {
            return Ok(Ref::NULL);
        }
        self.scalar_mut(r)?.header.refs.incref();
        Ok(r)
    }

    /// Remove one reference; null is a silent no-op. Runs the destructor
    /// and frees the block if this was the last hold and no lock defers it.
    pub fn decref(
        &mut self,
        r: Ref,
        dtr: Option<Destructor>,
    ) -> RuntimeResult<()> {
        if r.is_null() {
            return Ok(());
        }
        let block = self.scalar_mut(r)?;
        block.header.refs.decref().map_err(|fault| match fault {
            RefFault::Underflow => RuntimeError::RefUnderflow(r),
            RefFault::DoubleRelease => RuntimeError::DoubleRelease(r),
        })?;
        self.sweep(r, dtr)
    }

    /// The owning slot goes out of scope. With shared references still
    /// alive this freezes the block (it becomes logically dead but its
    /// storage stays until the remainder drains); otherwise it is the
    /// terminal transition.
    pub fn release(
        &mut self,
        r: Ref,
        dtr: Option<Destructor>,
    ) -> RuntimeResult<()> {
        if r.is_null() {
            return Ok(());
        }
        let block = self.scalar_mut(r)?;
        block.header.refs.release().map_err(|fault| match fault {
            RefFault::Underflow => RuntimeError::RefUnderflow(r),
            RefFault::DoubleRelease => RuntimeError::DoubleRelease(r),
        })?;
        self.sweep(r, dtr)
    }

    /// Free the block if its ref state is terminal and no lock is
    /// outstanding. The block is detached from the table before its
    /// destructor runs, so the destructor may re-enter the heap and the
    /// at-most-once property holds structurally.
    fn sweep(
        &mut self,
        r: Ref,
        dtr: Option<Destructor>,
    ) -> RuntimeResult<()> {
        let releasable = self.block(r)?.is_releasable();
        if !releasable {
            return Ok(());
        }
        let mut block = self
            .blocks
            .remove(&r)
            .ok_or(RuntimeError::UseAfterFree(r))?;
        self.stats.frees += 1;
        trace!("free {r}");
        if let Some(dtr) = dtr {
            self.stats.destructor_runs += 1;
            dtr(self, &mut block.payload);
        }
        Ok(())
    }

    // === Reference counting (array) ===

    /// Array analogue of [`Heap::incref`].
    pub fn incref_arr(
        &mut self,
        r: Ref,
    ) -> RuntimeResult<Ref> {
        if r.is_null() {
            return Ok(Ref::NULL);
        }
        self.array_mut(r)?.header.refs.incref();
        Ok(r)
    }

    /// Array analogue of [`Heap::decref`]. The destructor receives the
    /// element count for per-element teardown.
    pub fn decref_arr(
        &mut self,
        r: Ref,
        dtr: Option<ArrayDestructor>,
    ) -> RuntimeResult<()> {
        if r.is_null() {
            return Ok(());
        }
        let block = self.array_mut(r)?;
        block.header.refs.decref().map_err(|fault| match fault {
            RefFault::Underflow => RuntimeError::RefUnderflow(r),
            RefFault::DoubleRelease => RuntimeError::DoubleRelease(r),
        })?;
        self.sweep_arr(r, dtr)
    }

    /// Array analogue of [`Heap::release`].
    pub fn release_arr(
        &mut self,
        r: Ref,
        dtr: Option<ArrayDestructor>,
    ) -> RuntimeResult<()> {
        if r.is_null() {
            return Ok(());
        }
        let block = self.array_mut(r)?;
        block.header.refs.release().map_err(|fault| match fault {
            RefFault::Underflow => RuntimeError::RefUnderflow(r),
            RefFault::DoubleRelease => RuntimeError::DoubleRelease(r),
        })?;
        self.sweep_arr(r, dtr)
    }

    fn sweep_arr(
        &mut self,
        r: Ref,
        dtr: Option<ArrayDestructor>,
    ) -> RuntimeResult<()> {
        let releasable = self.block(r)?.is_releasable();
        if !releasable {
            return Ok(());
        }
        let mut block = self
            .blocks
            .remove(&r)
            .ok_or(RuntimeError::UseAfterFree(r))?;
        self.stats.frees += 1;
        trace!("free array {r}");
        if let Some(dtr) = dtr {
            let count = block.element_count().unwrap_or(0);
            self.stats.destructor_runs += 1;
            dtr(self, &mut block.payload, count);
        }
        Ok(())
    }

    // === Lock (pin) engine — scalars only ===

    /// Pin the block: its storage stays valid across the locked span
    /// independent of reference ownership. Locking a logically dead block
    /// is a liveness violation.
    pub fn lock(
        &mut self,
        r: Ref,
    ) -> RuntimeResult<()> {
        if r.is_null() {
            return Err(RuntimeError::NullDeref);
        }
        if self.is_null(r) {
            return Err(RuntimeError::LockOnDead(r));
        }
        self.scalar_mut(r)?.header.locks += 1;
        Ok(())
    }

    /// Drop one pin. If this was the last pin and the ref state already
    /// reached terminal, the deferred release happens now: the destructor
    /// fires here, not at the earlier decref.
    pub fn unlock(
        &mut self,
        r: Ref,
        dtr: Option<Destructor>,
    ) -> RuntimeResult<()> {
        if r.is_null() {
            return Err(RuntimeError::NullDeref);
        }
        let block = self.scalar_mut(r)?;
        if block.header.locks == 0 {
            return Err(RuntimeError::LockUnderflow(r));
        }
        block.header.locks -= 1;
        self.sweep(r, dtr)
    }

    // === Liveness queries ===

    /// Logically dead check: true for null, for released storage, and for
    /// blocks whose owner is gone with no lock pinning them — even if the
    /// storage has not been physically released yet.
    pub fn is_null(
        &self,
        r: Ref,
    ) -> bool {
        if r.is_null() {
            return true;
        }
        match self.blocks.get(&r) {
            None => true,
            Some(block) => block.is_dead(),
        }
    }

    /// Array analogue of [`Heap::is_null`]. Arrays carry no locks, so this
    /// is purely the frozen check.
    pub fn is_null_arr(
        &self,
        r: Ref,
    ) -> bool {
        self.is_null(r)
    }

    /// Liveness assertion: error (fatal at the ABI) when the reference is
    /// logically dead.
    pub fn notnull_ref(
        &self,
        r: Ref,
    ) -> RuntimeResult<()> {
        if self.is_null(r) {
            return Err(RuntimeError::NullDeref);
        }
        Ok(())
    }

    // === Payload access ===

    /// Borrow the payload bytes of a live block.
    pub fn payload(
        &self,
        r: Ref,
    ) -> RuntimeResult<&[u8]> {
        if r.is_null() {
            return Err(RuntimeError::NullDeref);
        }
        Ok(&self.block(r)?.payload)
    }

    /// Mutably borrow the payload bytes of a live block.
    pub fn payload_mut(
        &mut self,
        r: Ref,
    ) -> RuntimeResult<&mut [u8]> {
        if r.is_null() {
            return Err(RuntimeError::NullDeref);
        }
        Ok(&mut self.block_mut(r)?.payload)
    }

    /// Read a value from the payload at a byte offset.
    pub fn read<T: Copy>(
        &self,
        r: Ref,
        offset: usize,
    ) -> RuntimeResult<T> {
        let payload = self.payload(r)?;
        let size = std::mem::size_of::<T>();
        if offset.checked_add(size).is_none_or(|end| end > payload.len()) {
            return Err(RuntimeError::PayloadOutOfRange {
                offset,
                size,
                payload: payload.len(),
            });
        }
        // Safety: range checked above; read is unaligned-tolerant.
        Ok(unsafe { payload.as_ptr().add(offset).cast::<T>().read_unaligned() })
    }

    /// Write a value to the payload at a byte offset.
    pub fn write<T: Copy>(
        &mut self,
        r: Ref,
        offset: usize,
        value: T,
    ) -> RuntimeResult<()> {
        let payload = self.payload_mut(r)?;
        let size = std::mem::size_of::<T>();
        if offset.checked_add(size).is_none_or(|end| end > payload.len()) {
            return Err(RuntimeError::PayloadOutOfRange {
                offset,
                size,
                payload: payload.len(),
            });
        }
        // Safety: range checked above; write is unaligned-tolerant.
        unsafe {
            payload
                .as_mut_ptr()
                .add(offset)
                .cast::<T>()
                .write_unaligned(value);
        }
        Ok(())
    }

    /// Bounds assertion array accesses compile to: `index` must address an
    /// existing element.
    pub fn check_bounds(
        &self,
        r: Ref,
        index: i64,
    ) -> RuntimeResult<()> {
        if r.is_null() {
            return Err(RuntimeError::NullDeref);
        }
        let block = self.block(r)?;
        let len = block.element_count().ok_or(RuntimeError::KindMismatch(r))?;
        if index < 0 || index >= len {
            return Err(RuntimeError::IndexOutOfBounds { index, len });
        }
        Ok(())
    }

    // === Introspection ===

    /// Whether the handle still maps to physical storage. A logically dead
    /// but locked (or frozen-with-remainder) block is still present.
    #[inline]
    pub fn contains(
        &self,
        r: Ref,
    ) -> bool {
        self.blocks.contains_key(&r)
    }

    /// Number of blocks with live storage.
    #[inline]
    pub fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Heap counters.
    #[inline]
    pub fn stats(&self) -> &HeapStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests;
