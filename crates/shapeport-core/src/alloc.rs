use std::alloc::{alloc, dealloc, Layout};
use std::ptr::{self, NonNull};

use tracing::debug;

use crate::raw::{RawDimension, RawPartialShape};
use crate::{Dimension, Status};

/// The engine-side allocation pair for partial shape blocks.
///
/// A block is one [`RawPartialShape`] whose `dims` points at a private copy of the axis records.
/// Implementations reject a dimension list whose length disagrees with a static rank, and a
/// non-empty list under a dynamic rank.
pub trait ShapeAllocator: Send + Sync {
    fn name(&self) -> &'static str;

    fn create(
        &self,
        rank: RawDimension,
        dims: &[RawDimension],
    ) -> Result<NonNull<RawPartialShape>, Status>;

    /// Releases a block. A null `shape` is a no-op.
    ///
    /// # Safety
    ///
    /// `shape` must be null or a block returned by `create` on this allocator that has not been
    /// freed yet.
    unsafe fn free(&self, shape: *mut RawPartialShape);
}

/// Number of axis records a block with this rank record carries.
pub(crate) fn record_count(rank: RawDimension) -> Option<usize> {
    match Dimension::from_raw(rank).ok()?.fixed_value() {
        Some(len) => usize::try_from(len).ok(),
        None => Some(0),
    }
}

/// Allocates blocks from the Rust global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl HeapAllocator {
    pub fn new() -> Self {
        Self
    }
}

impl ShapeAllocator for HeapAllocator {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn create(
        &self,
        rank: RawDimension,
        dims: &[RawDimension],
    ) -> Result<NonNull<RawPartialShape>, Status> {
        let expected = record_count(rank).ok_or(Status::InvalidCParam)?;
        if expected != dims.len() {
            return Err(Status::ParameterMismatch);
        }

        let dims_layout =
            Layout::array::<RawDimension>(dims.len()).map_err(|_| Status::NotAllocated)?;
        let dims_ptr = if dims.is_empty() {
            ptr::null_mut()
        } else {
            // SAFETY: layout has non-zero size since dims is non-empty.
            let block = unsafe { alloc(dims_layout) }.cast::<RawDimension>();
            if block.is_null() {
                return Err(Status::NotAllocated);
            }
            // SAFETY: block was just allocated for exactly dims.len() records.
            unsafe { ptr::copy_nonoverlapping(dims.as_ptr(), block, dims.len()) };
            block
        };

        // SAFETY: RawPartialShape is not zero-sized.
        let shape = unsafe { alloc(Layout::new::<RawPartialShape>()) }.cast::<RawPartialShape>();
        let Some(shape) = NonNull::new(shape) else {
            if !dims_ptr.is_null() {
                // SAFETY: allocated above with dims_layout.
                unsafe { dealloc(dims_ptr.cast(), dims_layout) };
            }
            return Err(Status::NotAllocated);
        };
        // SAFETY: freshly allocated and properly aligned for RawPartialShape.
        unsafe {
            shape.as_ptr().write(RawPartialShape {
                rank,
                dims: dims_ptr,
            })
        };

        debug!(records = dims.len(), "allocated partial shape block");
        Ok(shape)
    }

    unsafe fn free(&self, shape: *mut RawPartialShape) {
        if shape.is_null() {
            return;
        }
        // SAFETY: caller guarantees `shape` came from `create` and is still live.
        let RawPartialShape { rank, dims } = unsafe { shape.read() };
        let len = record_count(rank).unwrap_or(0);
        if !dims.is_null() && len > 0 {
            if let Ok(layout) = Layout::array::<RawDimension>(len) {
                // SAFETY: `create` allocated `len` records with this layout.
                unsafe { dealloc(dims.cast(), layout) };
            }
        }
        // SAFETY: `create` allocated the record with this layout.
        unsafe { dealloc(shape.cast(), Layout::new::<RawPartialShape>()) };
        debug!(records = len, "freed partial shape block");
    }
}
