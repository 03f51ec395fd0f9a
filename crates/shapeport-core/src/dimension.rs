use std::fmt;
use std::str::FromStr;

use crate::raw::{RawDimension, UNBOUNDED};
use crate::{Result, ShapeError};

/// Largest extent the foreign record can carry.
pub const MAX_EXTENT: u64 = i64::MAX as u64;

/// How much is known about one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Extent {
    Fixed(u64),
    /// `None` marks an unbounded side.
    Range { min: Option<u64>, max: Option<u64> },
}

/// The extent of a single axis: fixed, a bounded interval, or unknown.
///
/// Built only through the constructors below, which keep `min <= max`, keep every bound within
/// [`MAX_EXTENT`] and collapse a degenerate interval `[v, v]` into `Fixed(v)`. Equality is therefore
/// structural equality of `(min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimension(Extent);

impl Dimension {
    pub fn fixed(value: u64) -> Result<Self> {
        if value > MAX_EXTENT {
            return Err(ShapeError::InvalidDimension {
                min: Some(value),
                max: Some(value),
                reason: "extent exceeds i64::MAX",
            });
        }
        Ok(Self(Extent::Fixed(value)))
    }

    /// `[0, unbounded]`, the engine's encoding of a fully unknown axis.
    pub const fn dynamic() -> Self {
        Self(Extent::Range {
            min: Some(0),
            max: None,
        })
    }

    pub fn range(min: Option<u64>, max: Option<u64>) -> Result<Self> {
        let invalid = |reason: &'static str| ShapeError::InvalidDimension { min, max, reason };

        if [min, max].into_iter().flatten().any(|b| b > MAX_EXTENT) {
            return Err(invalid("extent exceeds i64::MAX"));
        }
        match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => Err(invalid("min exceeds max")),
            (Some(lo), Some(hi)) if lo == hi => Ok(Self(Extent::Fixed(lo))),
            _ => Ok(Self(Extent::Range { min, max })),
        }
    }

    pub fn extent(&self) -> Extent {
        self.0
    }

    pub fn min(&self) -> Option<u64> {
        match self.0 {
            Extent::Fixed(v) => Some(v),
            Extent::Range { min, .. } => min,
        }
    }

    pub fn max(&self) -> Option<u64> {
        match self.0 {
            Extent::Fixed(v) => Some(v),
            Extent::Range { max, .. } => max,
        }
    }

    pub fn fixed_value(&self) -> Option<u64> {
        match self.0 {
            Extent::Fixed(v) => Some(v),
            Extent::Range { .. } => None,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self.0, Extent::Fixed(_))
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    /// Whether `value` lies inside the interval.
    pub fn contains(&self, value: u64) -> bool {
        self.min().map_or(true, |lo| lo <= value) && self.max().map_or(true, |hi| value <= hi)
    }

    /// Decodes one foreign record. The record is only checked for the sentinel and `min <= max`.
    pub fn from_raw(raw: RawDimension) -> Result<Self> {
        let min = decode_bound(raw.min, "min")?;
        let max = decode_bound(raw.max, "max")?;
        Self::range(min, max).map_err(|_| {
            ShapeError::malformed(None, format!("min {} exceeds max {}", raw.min, raw.max))
        })
    }

    pub fn to_raw(&self) -> RawDimension {
        RawDimension {
            min: encode_bound(self.min()),
            max: encode_bound(self.max()),
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

fn decode_bound(value: i64, side: &str) -> Result<Option<u64>> {
    match value {
        UNBOUNDED => Ok(None),
        v if v < 0 => Err(ShapeError::malformed(None, format!("negative {side} {v}"))),
        v => Ok(Some(v as u64)),
    }
}

// Bounds never exceed MAX_EXTENT, so the cast is lossless.
fn encode_bound(bound: Option<u64>) -> i64 {
    bound.map_or(UNBOUNDED, |v| v as i64)
}

impl From<u32> for Dimension {
    fn from(value: u32) -> Self {
        Self(Extent::Fixed(u64::from(value)))
    }
}

impl TryFrom<RawDimension> for Dimension {
    type Error = ShapeError;

    fn try_from(raw: RawDimension) -> Result<Self> {
        Self::from_raw(raw)
    }
}

impl From<Dimension> for RawDimension {
    fn from(dim: Dimension) -> Self {
        dim.to_raw()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Extent::Fixed(v) => write!(f, "{v}"),
            Extent::Range { .. } => f.write_str("?"),
        }
    }
}

/// Accepts `?` or `-1` (fully dynamic), `N`, `a..b`, `a..` and `..b`.
impl FromStr for Dimension {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token == "?" || token == "-1" {
            return Ok(Self::dynamic());
        }
        let bound = |part: &str| -> Result<Option<u64>> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part.parse::<u64>()
                .map(Some)
                .map_err(|e| ShapeError::parse(token, e.to_string()))
        };
        let reject = |e: ShapeError| ShapeError::parse(token, e.to_string());

        match token.split_once("..") {
            Some((lo, hi)) => {
                let min = bound(lo)?.unwrap_or(0);
                Self::range(Some(min), bound(hi)?).map_err(reject)
            }
            None => match bound(token)? {
                Some(v) => Self::fixed(v).map_err(reject),
                None => Err(ShapeError::parse(token, "empty dimension")),
            },
        }
    }
}
