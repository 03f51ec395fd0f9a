use std::fmt;
use std::ops::Index;

use smallvec::SmallVec;

use crate::raw::RawShape;
use crate::{Result, ShapeError};

/// A shape whose rank and every extent are known.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn get(&self, axis: usize) -> Option<usize> {
        self.0.get(axis).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Extents in the engine's `i64` form.
    pub fn to_record(&self) -> Result<ShapeRecord> {
        self.iter()
            .map(|d| {
                i64::try_from(d).map_err(|_| ShapeError::InvalidDimension {
                    min: Some(d as u64),
                    max: Some(d as u64),
                    reason: "extent exceeds i64::MAX",
                })
            })
            .collect::<Result<_>>()
            .map(ShapeRecord)
    }

    /// Copies a static shape out of an engine record.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point at a readable [`RawShape`] whose `dims` is null or points at
    /// `rank` readable extents.
    pub unsafe fn from_raw(raw: *const RawShape) -> Result<Self> {
        // SAFETY: upheld by the caller.
        let Some(raw) = (unsafe { raw.as_ref() }) else {
            return Err(ShapeError::NullPointer);
        };
        let len = usize::try_from(raw.rank)
            .map_err(|_| ShapeError::malformed(None, format!("negative rank {}", raw.rank)))?;
        if len
            .checked_mul(std::mem::size_of::<i64>())
            .map_or(true, |bytes| bytes > isize::MAX as usize)
        {
            return Err(ShapeError::malformed(
                None,
                format!("rank {len} exceeds address space"),
            ));
        }
        if len == 0 {
            return Ok(Self::default());
        }
        if raw.dims.is_null() {
            return Err(ShapeError::malformed(
                None,
                format!("rank {len} with a null extent array"),
            ));
        }
        // SAFETY: upheld by the caller.
        let extents = unsafe { std::slice::from_raw_parts(raw.dims, len) };
        extents
            .iter()
            .enumerate()
            .map(|(axis, &v)| match usize::try_from(v) {
                Ok(d) => Ok(d),
                Err(_) if v < 0 => Err(ShapeError::malformed(
                    Some(axis),
                    format!("negative extent {v}"),
                )),
                Err(_) => Err(ShapeError::InvalidDimension {
                    min: Some(v as u64),
                    max: Some(v as u64),
                    reason: "extent exceeds usize",
                }),
            })
            .collect()
    }
}

/// Owned `i64` extents of a [`Shape`], lent to the engine as a [`RawShape`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeRecord(SmallVec<[i64; 6]>);

impl ShapeRecord {
    pub fn extents(&self) -> &[i64] {
        &self.0
    }

    /// Borrowed view of the extents. The pointer is invalidated when the record moves or drops.
    pub fn as_raw(&mut self) -> RawShape {
        RawShape {
            // A live allocation never holds more than i64::MAX extents.
            rank: self.0.len() as i64,
            dims: self.0.as_mut_ptr(),
        }
    }
}

impl Index<usize> for Shape {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.0[axis]
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{d}")?;
        }
        f.write_str("}")
    }
}
