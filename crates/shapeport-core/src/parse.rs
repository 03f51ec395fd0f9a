//! Shape literals: `{2,?,4}`, `[1,2..8,3]`, `Shape : {2,3}`, `{}`.
//!
//! A dynamic rank is written `?`, `...`, `{...}` or `[...]`. `{?}` is a rank-1 shape with one
//! dynamic axis, even though a dynamic rank renders the same way.

use std::str::FromStr;

use crate::partial_shape::Dims;
use crate::{Dimension, PartialShape, Result, ShapeError, ShapeFactory};

const RENDER_PREFIX: &str = "Shape :";

impl ShapeFactory {
    pub fn parse(&self, input: &str) -> Result<PartialShape> {
        let body = input.trim();
        let body = body.strip_prefix(RENDER_PREFIX).unwrap_or(body).trim();
        if body == "?" || body == "..." {
            return self.dynamic();
        }

        let inner = body
            .strip_prefix('{')
            .and_then(|b| b.strip_suffix('}'))
            .or_else(|| body.strip_prefix('[').and_then(|b| b.strip_suffix(']')))
            .ok_or_else(|| ShapeError::parse(input, "expected `{...}` or `[...]`"))?
            .trim();

        if inner == "..." {
            return self.dynamic();
        }
        if inner.is_empty() {
            return self.partial_shape(Dims::new());
        }
        let dims = inner
            .split(',')
            .map(|token| {
                token
                    .parse::<Dimension>()
                    .map_err(|e| ShapeError::parse(input, e.to_string()))
            })
            .collect::<Result<Dims>>()?;
        self.partial_shape(dims)
    }
}

impl FromStr for PartialShape {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self> {
        ShapeFactory::default().parse(s)
    }
}
