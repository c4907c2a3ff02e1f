use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{allocation_error, layout_error, Result};

/// An owned, zero-initialised block of `f64` with a caller-chosen alignment.
///
/// The buffer is released through the same layout it was allocated with, so
/// unlike a `Vec` built from a raw aligned pointer it never hands memory back
/// to the allocator with a mismatched alignment.
///
/// # Example
///
/// ```
/// use parmatmul::utils::AlignedBuf;
///
/// let buf = AlignedBuf::zeroed(16, 64).unwrap();
/// assert_eq!(buf.as_ptr() as usize % 64, 0);
/// assert!(buf.iter().all(|&x| x == 0.0));
/// ```
pub struct AlignedBuf {
    ptr: NonNull<f64>,
    len: usize,
    layout: Layout,
}

// SAFETY: AlignedBuf uniquely owns its allocation, like Vec<f64>.
unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// Allocates `len` zeroed elements aligned to `align` bytes.
    ///
    /// # Errors
    ///
    /// - `Layout` if `align` is not a power of two, is below the natural
    ///   alignment of `f64`, or if `len * 8` overflows.
    /// - `Allocation` if the allocator returns null.
    pub fn zeroed(len: usize, align: usize) -> Result<Self> {
        if !align.is_power_of_two() || align < mem::align_of::<f64>() {
            return Err(layout_error(
                len,
                align,
                "alignment must be a power of two no smaller than 8",
            ));
        }

        let size = len
            .checked_mul(mem::size_of::<f64>())
            .ok_or_else(|| layout_error(len, align, "element count overflows byte size"))?;

        if size == 0 {
            // A zero-sized layout must not reach the allocator.
            let layout = Layout::from_size_align(0, align)
                .map_err(|e| layout_error(0, align, e.to_string()))?;
            return Ok(AlignedBuf {
                ptr: NonNull::dangling(),
                len: 0,
                layout,
            });
        }

        let layout =
            Layout::from_size_align(size, align).map_err(|e| layout_error(size, align, e.to_string()))?;

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) } as *mut f64;

        match NonNull::new(raw) {
            Some(ptr) => Ok(AlignedBuf { ptr, len, layout }),
            None => Err(allocation_error(size, align, "allocator returned null")),
        }
    }

    /// Alignment the buffer was allocated with.
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            // SAFETY: allocated in `zeroed` with exactly this layout.
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, self.layout) };
        }
    }
}

impl Deref for AlignedBuf {
    type Target = [f64];
    fn deref(&self) -> &Self::Target {
        // SAFETY: ptr is valid for len initialised elements (or dangling with len 0).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as in Deref, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl std::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}
