//! Partially dynamic tensor shapes and the fixed C layout they are exchanged in.

pub mod alloc;
pub mod dimension;
pub mod error;
pub mod parse;
pub mod partial_shape;
pub mod raw;
pub mod shape;
pub mod status;

pub use alloc::*;
pub use dimension::*;
pub use error::*;
pub use partial_shape::{PartialShape, ShapeFactory};
pub use raw::*;
pub use shape::*;
pub use status::*;
