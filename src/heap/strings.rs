//! Array length queries and the byte-array-to-string finalizer
//!
//! Strings are byte arrays whose stored element count includes a trailing
//! zero terminator; `len_str` reports the logical length without it.

use super::{BlockKind, Heap, Ref};
use crate::errors::{RuntimeError, RuntimeResult};

impl Heap {
    /// Element count of an array; 0 for the null reference.
    pub fn len_arr(
        &self,
        r: Ref,
    ) -> RuntimeResult<i64> {
        if r.is_null() {
            return Ok(0);
        }
        let block = self.block(r)?;
        block.element_count().ok_or(RuntimeError::KindMismatch(r))
    }

    /// String length: the stored trailing terminator does not count.
    /// 0 for the null reference.
    pub fn len_str(
        &self,
        r: Ref,
    ) -> RuntimeResult<i64> {
        if r.is_null() {
            return Ok(0);
        }
        Ok(self.len_arr(r)? - 1)
    }

    /// Finalize a byte array into a string of `len` logical bytes.
    ///
    /// When `data` differs from `array`, the `len` payload bytes are moved
    /// from `data` into `array` first. The window must fit the allocated
    /// capacity and the byte at `len` must already be the zero terminator;
    /// violations are fatal at the ABI. On success the stored element count
    /// becomes `len + 1` (the terminator stays stored), so `len_str`
    /// reports `len` afterwards. This is the single sanctioned mutation of
    /// an array's element count.
    pub fn arr_to_str(
        &mut self,
        array: Ref,
        data: Ref,
        len: i64,
    ) -> RuntimeResult<Ref> {
        if array.is_null() {
            return Ok(Ref::NULL);
        }
        let capacity = self.len_arr(array)?;
        if len < 0 {
            return Err(RuntimeError::StrLenOutOfRange { len, capacity });
        }
        let window = len as usize;

        if array != data {
            let src = self.payload(data)?;
            if window > src.len() {
                return Err(RuntimeError::PayloadOutOfRange {
                    offset: 0,
                    size: window,
                    payload: src.len(),
                });
            }
            let bytes = src[..window].to_vec();
            let dst = self.payload_mut(array)?;
            if window > dst.len() {
                return Err(RuntimeError::PayloadOutOfRange {
                    offset: 0,
                    size: window,
                    payload: dst.len(),
                });
            }
            dst[..window].copy_from_slice(&bytes);
        }

        if len >= capacity {
            return Err(RuntimeError::StrLenOutOfRange { len, capacity });
        }
        let payload = self.payload(array)?;
        if payload[window] != 0 {
            return Err(RuntimeError::StrBadTerminator(len));
        }

        self.block_mut(array)?.kind = BlockKind::Array {
            element_count: len + 1,
        };
        Ok(array)
    }
}
