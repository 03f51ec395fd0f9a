//! Fixed C layout exchanged with the inference engine.
//!
//! ```text
//! RawDimension     { min: i64, max: i64 }                  16 bytes
//! RawPartialShape  { rank: RawDimension, dims: *mut RawDimension }
//! RawShape         { rank: i64, dims: *mut i64 }
//! ```
//!
//! `-1` in `min` or `max` marks an unbounded side. `dims` holds `rank.min` records when the rank is
//! static and is null otherwise. A [`RawShape`] is fully static: `dims` holds `rank` extents, each
//! non-negative.

use std::mem::{align_of, size_of};

/// Marks an unbounded side of a [`RawDimension`].
pub const UNBOUNDED: i64 = -1;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawDimension {
    pub min: i64,
    pub max: i64,
}

impl RawDimension {
    pub const DYNAMIC: Self = Self {
        min: 0,
        max: UNBOUNDED,
    };
}

#[repr(C)]
#[derive(Debug)]
pub struct RawPartialShape {
    pub rank: RawDimension,
    pub dims: *mut RawDimension,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawShape {
    pub rank: i64,
    pub dims: *mut i64,
}

/// Size of one record in the canonical byte encoding.
pub const RECORD_SIZE: usize = size_of::<RawDimension>();

const _: () = {
    assert!(size_of::<RawDimension>() == 16);
    assert!(align_of::<RawDimension>() == 8);
};

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(size_of::<RawPartialShape>() == 24);
    assert!(size_of::<RawShape>() == 16);
};
