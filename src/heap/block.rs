//! Heap block model
//!
//! Every allocation is a [`Block`]: a metadata header plus zero-initialized
//! payload bytes. Callers never see addresses, only opaque [`Ref`] handles
//! resolved through the block table.

use std::fmt;

/// Handle to a heap block
///
/// Handles are opaque references handed to generated code in place of raw
/// payload addresses. `Ref::NULL` is the null reference; live handles start
/// at 1 and are never reused within a heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ref(pub u64);

impl Ref {
    /// The null reference.
    pub const NULL: Ref = Ref(0);

    /// Create a handle from a raw value
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw handle value
    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Check whether this is the null reference.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Ref {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_null() {
            write!(f, "ref@null")
        } else {
            write!(f, "ref@{}", self.0)
        }
    }
}

/// Reference-count state of a block
///
/// Explicit tagged encoding of the two counter shapes:
/// - `Owned(n)`: the owning slot still holds the block, `n >= 1` active
///   owning references exist.
/// - `Frozen(n)`: the owning slot has released its hold while `n` shared
///   references persist. `Frozen(0)` is the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefState {
    /// Positive count of active owning references; no freeze occurred.
    Owned(u32),
    /// The last owner released its hold; only the remainder of shared
    /// references is left.
    Frozen(u32),
}

/// Outcome of a counter mutation that can hit an invalid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefFault {
    /// Decrement past the terminal state.
    Underflow,
    /// Owner release on a block whose owner is already gone.
    DoubleRelease,
}

impl RefState {
    /// Add one reference. Copying a shared reference to an already frozen
    /// block keeps the frozen shape.
    #[inline]
    pub fn incref(&mut self) {
        match self {
            RefState::Owned(n) | RefState::Frozen(n) => *n += 1,
        }
    }

    /// Remove one reference.
    pub fn decref(&mut self) -> Result<(), RefFault> {
        match *self {
            RefState::Owned(1) => {
                // Last holder gone without an explicit freeze.
                *self = RefState::Frozen(0);
                Ok(())
            }
            RefState::Owned(n) => {
                *self = RefState::Owned(n - 1);
                Ok(())
            }
            RefState::Frozen(0) => Err(RefFault::Underflow),
            RefState::Frozen(n) => {
                *self = RefState::Frozen(n - 1);
                Ok(())
            }
        }
    }

    /// The owning slot goes out of scope. With shared references left this
    /// is the freeze transition; with none it is the terminal transition.
    pub fn release(&mut self) -> Result<(), RefFault> {
        match *self {
            RefState::Owned(n) => {
                *self = RefState::Frozen(n - 1);
                Ok(())
            }
            RefState::Frozen(_) => Err(RefFault::DoubleRelease),
        }
    }

    /// Whether the owner contribution is gone.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        matches!(self, RefState::Frozen(_))
    }

    /// Terminal state: zero owning references, zero remainder.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RefState::Frozen(0))
    }
}

/// What a block stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// A single value.
    Scalar,
    /// A fixed-length array of `element_count` elements.
    Array {
        /// Number of elements, fixed at allocation. The string finalizer
        /// is the single sanctioned mutation (see `Heap::arr_to_str`).
        element_count: i64,
    },
}

/// Block metadata stored alongside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Reference-count state.
    pub refs: RefState,
    /// Outstanding pins; 0 = unpinned. Arrays never carry locks.
    pub locks: u32,
}

impl BlockHeader {
    /// Header of a freshly allocated block: one owner, no locks.
    #[inline]
    pub fn new() -> Self {
        Self {
            refs: RefState::Owned(1),
            locks: 0,
        }
    }
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// A heap block: header, kind and payload storage.
#[derive(Debug)]
pub struct Block {
    /// Metadata header.
    pub header: BlockHeader,
    /// Scalar or array.
    pub kind: BlockKind,
    /// Zero-initialized payload bytes.
    pub payload: Box<[u8]>,
}

impl Block {
    /// Create a scalar block with a zeroed payload of `size` bytes.
    pub fn scalar(size: usize) -> Self {
        Self {
            header: BlockHeader::new(),
            kind: BlockKind::Scalar,
            payload: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Create an array block for `element_count` elements of `payload_size`
    /// total bytes.
    pub fn array(
        element_count: i64,
        payload_size: usize,
    ) -> Self {
        Self {
            header: BlockHeader::new(),
            kind: BlockKind::Array { element_count },
            payload: vec![0u8; payload_size].into_boxed_slice(),
        }
    }

    /// Element count for array blocks.
    #[inline]
    pub fn element_count(&self) -> Option<i64> {
        match self.kind {
            BlockKind::Scalar => None,
            BlockKind::Array { element_count } => Some(element_count),
        }
    }

    /// Logically dead: the owner is gone and no pin keeps the block alive.
    /// The remainder of shared references does not count as life.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.header.refs.is_frozen() && self.header.locks == 0
    }

    /// Ready for physical release: terminal ref state and unpinned.
    #[inline]
    pub fn is_releasable(&self) -> bool {
        self.header.refs.is_terminal() && self.header.locks == 0
    }
}
