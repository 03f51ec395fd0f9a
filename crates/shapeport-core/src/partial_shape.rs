//! A shape that may be partially or totally dynamic, mirrored into an engine-owned block.
//!
//! - dynamic rank, informally `?`
//! - static rank with some dynamic axes, e.g. `{1,2,?,4}` or `{?,?,?}`
//! - static rank and static axes, e.g. `{1,2,3,4}`, `{6}` or `{}`
//!
//! The in-memory `(rank, dims)` pair is the source of truth. Every constructor serializes it into
//! a freshly allocated block and every mutation rewrites the affected record, so the block never
//! drifts from the fields.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::alloc::{HeapAllocator, ShapeAllocator};
use crate::raw::{RawDimension, RawPartialShape, RECORD_SIZE};
use crate::{Dimension, Result, Shape, ShapeError};

pub(crate) type Dims = SmallVec<[Dimension; 6]>;

/// Whether a `(rank, dims)` pair describes a dynamic shape.
///
/// Shared by the in-memory queries and by `to_shape` after it decodes the block.
fn is_dynamic_pair(rank: &Dimension, dims: &[Dimension]) -> bool {
    rank.is_dynamic() || dims.iter().any(Dimension::is_dynamic)
}

/// The axis records a block carries: `rank.min` of them for a static rank, none otherwise.
///
/// # Safety
///
/// For a static rank `n > 0`, `raw.dims` must be null or point at `n` readable records.
unsafe fn records(raw: &RawPartialShape) -> Result<&[RawDimension]> {
    let rank = Dimension::from_raw(raw.rank)?;
    let Some(len) = rank.fixed_value() else {
        return Ok(&[]);
    };
    // No readable array can hold more than isize::MAX bytes.
    let len = usize::try_from(len)
        .ok()
        .filter(|&n| {
            n.checked_mul(RECORD_SIZE)
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| {
            ShapeError::malformed(None, format!("rank {len} exceeds address space"))
        })?;
    if len == 0 {
        return Ok(&[]);
    }
    if raw.dims.is_null() {
        return Err(ShapeError::malformed(
            None,
            format!("static rank {len} with a null dimension array"),
        ));
    }
    // SAFETY: upheld by the caller.
    Ok(unsafe { std::slice::from_raw_parts(raw.dims, len) })
}

/// Reads the rank record, then the axis records if the rank is static.
///
/// # Safety
///
/// Same contract as [`records`].
unsafe fn decode(raw: &RawPartialShape) -> Result<(Dimension, Dims)> {
    let rank = Dimension::from_raw(raw.rank)?;
    // SAFETY: upheld by the caller.
    let records = unsafe { records(raw) }?;
    let dims = records
        .iter()
        .enumerate()
        .map(|(axis, record)| Dimension::from_raw(*record).map_err(|e| e.at_axis(axis)))
        .collect::<Result<Dims>>()?;
    trace!(rank = %rank, records = dims.len(), "decoded partial shape block");
    Ok((rank, dims))
}

/// Builds [`PartialShape`]s whose blocks come from one allocator.
#[derive(Clone)]
pub struct ShapeFactory {
    allocator: Arc<dyn ShapeAllocator>,
}

impl Default for ShapeFactory {
    fn default() -> Self {
        Self::new(Arc::new(HeapAllocator::new()))
    }
}

impl fmt::Debug for ShapeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeFactory")
            .field("allocator", &self.allocator.name())
            .finish()
    }
}

impl ShapeFactory {
    pub fn new(allocator: Arc<dyn ShapeAllocator>) -> Self {
        Self { allocator }
    }

    pub fn allocator_name(&self) -> &'static str {
        self.allocator.name()
    }

    /// A shape with static rank `dims.len()`.
    pub fn partial_shape<I>(&self, dims: I) -> Result<PartialShape>
    where
        I: IntoIterator<Item = Dimension>,
    {
        let dims: Dims = dims.into_iter().collect();
        let rank = Dimension::fixed(dims.len() as u64)?;
        self.bind(rank, dims)
    }

    /// A shape with an explicit rank.
    ///
    /// A static rank must match the number of dimensions. Under a dynamic rank no per-axis
    /// information exists, so `dims` is dropped.
    pub fn with_rank<I>(&self, rank: Dimension, dims: I) -> Result<PartialShape>
    where
        I: IntoIterator<Item = Dimension>,
    {
        let dims: Dims = dims.into_iter().collect();
        match rank.fixed_value() {
            Some(r) if r != dims.len() as u64 => Err(ShapeError::RankMismatch {
                rank: r,
                len: dims.len(),
            }),
            Some(_) => self.bind(rank, dims),
            None => {
                if !dims.is_empty() {
                    debug!(rank = %rank, dropped = dims.len(), "rank is dynamic, dropping dimensions");
                }
                self.bind(rank, Dims::new())
            }
        }
    }

    /// A shape whose rank is unknown.
    pub fn dynamic(&self) -> Result<PartialShape> {
        self.bind(Dimension::dynamic(), Dims::new())
    }

    /// An all-static shape from plain extents; `rank` must equal `extents.len()`.
    pub fn from_extents(&self, rank: u64, extents: &[u64]) -> Result<PartialShape> {
        if rank != extents.len() as u64 {
            return Err(ShapeError::RankMismatch {
                rank,
                len: extents.len(),
            });
        }
        let dims = extents
            .iter()
            .map(|&e| Dimension::fixed(e))
            .collect::<Result<Dims>>()?;
        self.bind(Dimension::fixed(rank)?, dims)
    }

    pub fn from_shape(&self, shape: &Shape) -> Result<PartialShape> {
        let dims = shape
            .iter()
            .map(|e| Dimension::fixed(e as u64))
            .collect::<Result<Dims>>()?;
        self.partial_shape(dims)
    }

    /// Deserializes a block owned by someone else into a new shape with its own block.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point at a readable [`RawPartialShape`]. When its rank is static and
    /// non-zero, `dims` must be null or point at `rank.min` readable records.
    pub unsafe fn from_raw(&self, raw: *const RawPartialShape) -> Result<PartialShape> {
        // SAFETY: upheld by the caller.
        let raw = unsafe { raw.as_ref() }.ok_or(ShapeError::NullPointer)?;
        // SAFETY: upheld by the caller.
        let (rank, dims) = unsafe { decode(raw) }?;
        self.bind(rank, dims)
    }

    fn bind(&self, rank: Dimension, dims: Dims) -> Result<PartialShape> {
        let records: SmallVec<[RawDimension; 6]> = dims.iter().map(Dimension::to_raw).collect();
        let block = self.allocator.create(rank.to_raw(), &records)?;
        debug!(
            allocator = self.allocator.name(),
            rank = %rank,
            "bound partial shape"
        );
        Ok(PartialShape {
            rank,
            dims,
            block: Some(block),
            allocator: Arc::clone(&self.allocator),
        })
    }
}

/// A rank and per-axis extents, either of which may be unknown, backed by one foreign block.
///
/// The block is released by [`PartialShape::dispose`] or on drop, whichever comes first. After
/// release every query fails with [`ShapeError::UseAfterFree`].
pub struct PartialShape {
    rank: Dimension,
    dims: Dims,
    block: Option<NonNull<RawPartialShape>>,
    allocator: Arc<dyn ShapeAllocator>,
}

// SAFETY: the block is owned by exactly one PartialShape and only written through `&mut self`.
unsafe impl Send for PartialShape {}
// SAFETY: shared references only read the block.
unsafe impl Sync for PartialShape {}

impl PartialShape {
    pub fn new<I>(dims: I) -> Result<Self>
    where
        I: IntoIterator<Item = Dimension>,
    {
        ShapeFactory::default().partial_shape(dims)
    }

    pub fn with_rank<I>(rank: Dimension, dims: I) -> Result<Self>
    where
        I: IntoIterator<Item = Dimension>,
    {
        ShapeFactory::default().with_rank(rank, dims)
    }

    pub fn dynamic() -> Result<Self> {
        ShapeFactory::default().dynamic()
    }

    pub fn from_extents(rank: u64, extents: &[u64]) -> Result<Self> {
        ShapeFactory::default().from_extents(rank, extents)
    }

    pub fn from_shape(shape: &Shape) -> Result<Self> {
        ShapeFactory::default().from_shape(shape)
    }

    /// See [`ShapeFactory::from_raw`].
    ///
    /// # Safety
    ///
    /// Same contract as [`ShapeFactory::from_raw`].
    pub unsafe fn from_raw(raw: *const RawPartialShape) -> Result<Self> {
        // SAFETY: upheld by the caller.
        unsafe { ShapeFactory::default().from_raw(raw) }
    }

    fn block(&self) -> Result<NonNull<RawPartialShape>> {
        self.block.ok_or(ShapeError::UseAfterFree)
    }

    fn raw(&self) -> Result<&RawPartialShape> {
        // SAFETY: a bound block stays valid until `dispose`, which needs `&mut self`.
        Ok(unsafe { self.block()?.as_ref() })
    }

    pub fn is_bound(&self) -> bool {
        self.block.is_some()
    }

    pub fn rank(&self) -> Result<Dimension> {
        self.block()?;
        Ok(self.rank)
    }

    /// Per-axis extents. Fails with [`ShapeError::DynamicRank`] when the rank is unknown.
    pub fn dimensions(&self) -> Result<&[Dimension]> {
        self.block()?;
        if self.rank.is_dynamic() {
            return Err(ShapeError::DynamicRank);
        }
        Ok(&self.dims)
    }

    pub fn get(&self, axis: usize) -> Result<Dimension> {
        let dims = self.dimensions()?;
        dims.get(axis).copied().ok_or(ShapeError::AxisOutOfRange {
            axis,
            rank: dims.len(),
        })
    }

    /// Number of axes, or [`ShapeError::DynamicRank`].
    pub fn len(&self) -> Result<usize> {
        self.dimensions().map(<[Dimension]>::len)
    }

    pub fn is_dynamic(&self) -> Result<bool> {
        self.block()?;
        Ok(is_dynamic_pair(&self.rank, &self.dims))
    }

    pub fn is_static(&self) -> Result<bool> {
        self.is_dynamic().map(|dynamic| !dynamic)
    }

    /// Replaces one axis and rewrites its record in the block.
    pub fn set(&mut self, axis: usize, dim: Dimension) -> Result<()> {
        let block = self.block()?;
        let rank = self.len()?;
        if axis >= rank {
            return Err(ShapeError::AxisOutOfRange { axis, rank });
        }
        self.dims[axis] = dim;
        // SAFETY: a static rank of `rank` axes means the block holds `rank` records.
        unsafe { (*block.as_ptr()).dims.add(axis).write(dim.to_raw()) };
        Ok(())
    }

    /// Converts to a fully static [`Shape`], reading the extents back from the block.
    pub fn to_shape(&self) -> Result<Shape> {
        // SAFETY: the block was written by the allocator from consistent fields.
        let (rank, dims) = unsafe { decode(self.raw()?) }?;
        if is_dynamic_pair(&rank, &dims) {
            return Err(ShapeError::HasDynamicDimensions);
        }
        dims.iter()
            .map(|d| {
                let v = d.fixed_value().ok_or(ShapeError::HasDynamicDimensions)?;
                usize::try_from(v).map_err(|_| ShapeError::InvalidDimension {
                    min: Some(v),
                    max: Some(v),
                    reason: "extent exceeds usize",
                })
            })
            .collect()
    }

    /// The block handed to the engine. Valid until `dispose` or drop.
    pub fn as_raw(&self) -> Result<*const RawPartialShape> {
        self.block().map(|b| b.as_ptr().cast_const())
    }

    /// Canonical bytes of the block: the rank record, then each axis record, as native-endian
    /// `(min, max)` pairs of `i64`.
    pub fn encode(&self) -> Result<Bytes> {
        let raw = self.raw()?;
        // SAFETY: the block was written by the allocator from consistent fields.
        let records = unsafe { records(raw) }?;
        let mut buf = BytesMut::with_capacity(RECORD_SIZE * (records.len() + 1));
        for record in std::iter::once(&raw.rank).chain(records) {
            buf.put_i64_ne(record.min);
            buf.put_i64_ne(record.max);
        }
        Ok(buf.freeze())
    }

    /// A copy with its own block from the same allocator.
    pub fn try_clone(&self) -> Result<Self> {
        self.block()?;
        ShapeFactory::new(Arc::clone(&self.allocator)).bind(self.rank, self.dims.clone())
    }

    /// `Shape : {2,?,4}`, or `Shape : {?}` when the rank is dynamic.
    pub fn render(&self) -> Result<String> {
        self.block()?;
        let body = if self.rank.is_dynamic() {
            "?".to_string()
        } else {
            self.dims
                .iter()
                .map(Dimension::render)
                .collect::<Vec<_>>()
                .join(",")
        };
        Ok(format!("Shape : {{{body}}}"))
    }

    /// Releases the block. Calling it again is a no-op.
    pub fn dispose(&mut self) {
        if let Some(block) = self.block.take() {
            // SAFETY: the block came from this allocator and `take` guarantees a single release.
            unsafe { self.allocator.free(block.as_ptr()) };
            debug!(allocator = self.allocator.name(), "released partial shape");
        }
    }
}

impl Drop for PartialShape {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl PartialEq for PartialShape {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.dims == other.dims
    }
}

impl Eq for PartialShape {}

impl fmt::Debug for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialShape")
            .field("rank", &self.rank)
            .field("dims", &self.dims)
            .field("bound", &self.is_bound())
            .finish()
    }
}
