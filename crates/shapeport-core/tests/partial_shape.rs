use std::ptr::{self, NonNull};

use anyhow::{ensure, Result};
use shapeport_core::{
    Dimension, PartialShape, RawDimension, RawPartialShape, Shape, ShapeError, ShapeFactory,
};

fn fixed(v: u32) -> Dimension {
    Dimension::from(v)
}

#[test]
fn static_shape_round_trips_through_foreign_record() -> Result<()> {
    let shape = PartialShape::from_extents(3, &[2, 3, 4])?;
    ensure!(shape.is_static()?, "expected a static shape");
    assert_eq!(shape.render()?, "Shape : {2,3,4}");

    let copy = unsafe { PartialShape::from_raw(shape.as_raw()?) }?;
    assert_eq!(copy.rank()?, shape.rank()?);
    assert_eq!(copy.dimensions()?, shape.dimensions()?);
    assert_ne!(copy.as_raw()?, shape.as_raw()?);
    Ok(())
}

#[test]
fn dynamic_rank_renders_question_mark() -> Result<()> {
    let shape = PartialShape::dynamic()?;
    assert_eq!(shape.render()?, "Shape : {?}");
    ensure!(shape.is_dynamic()?, "dynamic rank must be dynamic");
    assert_eq!(shape.dimensions(), Err(ShapeError::DynamicRank));
    assert_eq!(shape.get(0), Err(ShapeError::DynamicRank));
    assert_eq!(shape.to_shape(), Err(ShapeError::HasDynamicDimensions));
    Ok(())
}

#[test]
fn dynamic_middle_axis() -> Result<()> {
    let shape = PartialShape::with_rank(fixed(3), [fixed(2), Dimension::dynamic(), fixed(4)])?;
    ensure!(!shape.is_static()?, "middle axis is dynamic");
    ensure!(shape.is_dynamic()?, "middle axis is dynamic");
    assert_eq!(shape.render()?, "Shape : {2,?,4}");
    assert_eq!(shape.to_shape(), Err(ShapeError::HasDynamicDimensions));
    Ok(())
}

#[test]
fn bounded_axis_is_dynamic() -> Result<()> {
    let shape = PartialShape::new([fixed(1), Dimension::range(Some(1), Some(8))?])?;
    ensure!(shape.is_dynamic()?, "bounded range is still dynamic");
    assert_eq!(shape.render()?, "Shape : {1,?}");
    Ok(())
}

#[test]
fn to_shape_and_back_is_idempotent() -> Result<()> {
    let shape = PartialShape::new([fixed(1), fixed(3), fixed(224), fixed(224)])?;
    let static_shape = shape.to_shape()?;
    assert_eq!(static_shape, Shape::from_slice(&[1, 3, 224, 224]));

    let rewrapped = PartialShape::from_shape(&static_shape)?;
    assert_eq!(rewrapped, shape);
    assert_eq!(rewrapped.to_shape()?, static_shape);
    Ok(())
}

#[test]
fn static_shape_crosses_as_engine_record() -> Result<()> {
    let shape = PartialShape::from_extents(3, &[2, 3, 4])?;
    let mut record = shape.to_shape()?.to_record()?;
    assert_eq!(record.extents(), &[2, 3, 4]);

    let raw = record.as_raw();
    let back = unsafe { Shape::from_raw(&raw) }?;
    assert_eq!(PartialShape::from_shape(&back)?, shape);
    Ok(())
}

#[test]
fn scalar_shape_is_static() -> Result<()> {
    let shape = PartialShape::new(Vec::new())?;
    ensure!(shape.is_static()?, "rank 0 is static");
    assert_eq!(shape.render()?, "Shape : {}");
    assert_eq!(shape.to_shape()?, Shape::default());
    Ok(())
}

#[test]
fn dispose_is_idempotent_and_poisons_queries() -> Result<()> {
    let mut shape = PartialShape::from_extents(2, &[4, 5])?;
    shape.dispose();
    ensure!(!shape.is_bound(), "handle must be unbound");

    assert_eq!(shape.is_dynamic(), Err(ShapeError::UseAfterFree));
    assert_eq!(shape.is_static(), Err(ShapeError::UseAfterFree));
    assert_eq!(shape.rank(), Err(ShapeError::UseAfterFree));
    assert_eq!(shape.dimensions(), Err(ShapeError::UseAfterFree));
    assert_eq!(shape.to_shape(), Err(ShapeError::UseAfterFree));
    assert_eq!(shape.render(), Err(ShapeError::UseAfterFree));
    assert_eq!(shape.encode(), Err(ShapeError::UseAfterFree));
    assert_eq!(shape.as_raw(), Err(ShapeError::UseAfterFree));
    assert!(matches!(shape.try_clone(), Err(ShapeError::UseAfterFree)));
    assert_eq!(shape.set(0, fixed(1)), Err(ShapeError::UseAfterFree));

    shape.dispose();
    Ok(())
}

#[test]
fn null_pointer_is_rejected() {
    let result = unsafe { PartialShape::from_raw(ptr::null()) };
    assert!(matches!(result, Err(ShapeError::NullPointer)));
}

#[test]
fn malformed_axis_record_reports_axis() {
    let mut records = [
        RawDimension { min: 2, max: 2 },
        RawDimension { min: 7, max: 3 },
    ];
    let raw = RawPartialShape {
        rank: RawDimension { min: 2, max: 2 },
        dims: records.as_mut_ptr(),
    };
    let result = unsafe { PartialShape::from_raw(&raw) };
    assert!(
        matches!(
            result,
            Err(ShapeError::MalformedRecord { axis: Some(1), .. })
        ),
        "{result:?}"
    );
}

#[test]
fn malformed_rank_record() {
    let raw = RawPartialShape {
        rank: RawDimension { min: -5, max: 2 },
        dims: ptr::null_mut(),
    };
    let result = unsafe { PartialShape::from_raw(&raw) };
    assert!(matches!(
        result,
        Err(ShapeError::MalformedRecord { axis: None, .. })
    ));
}

#[test]
fn rank_beyond_address_space_is_malformed() {
    let raw = RawPartialShape {
        rank: RawDimension {
            min: 1 << 60,
            max: 1 << 60,
        },
        dims: NonNull::dangling().as_ptr(),
    };
    let result = unsafe { PartialShape::from_raw(&raw) };
    assert!(
        matches!(result, Err(ShapeError::MalformedRecord { axis: None, .. })),
        "{result:?}"
    );
}

#[test]
fn static_rank_with_null_array_is_malformed() {
    let raw = RawPartialShape {
        rank: RawDimension { min: 2, max: 2 },
        dims: ptr::null_mut(),
    };
    let result = unsafe { PartialShape::from_raw(&raw) };
    assert!(matches!(result, Err(ShapeError::MalformedRecord { .. })));
}

#[test]
fn dynamic_rank_record_ignores_array() -> Result<()> {
    let raw = RawPartialShape {
        rank: RawDimension::DYNAMIC,
        dims: NonNull::dangling().as_ptr(),
    };
    let shape = unsafe { PartialShape::from_raw(&raw) }?;
    ensure!(shape.rank()?.is_dynamic(), "rank should stay dynamic");
    assert_eq!(shape.render()?, "Shape : {?}");
    Ok(())
}

#[test]
fn explicit_static_rank_must_match() {
    let result = PartialShape::with_rank(fixed(3), [fixed(1), fixed(2)]);
    assert!(matches!(
        result,
        Err(ShapeError::RankMismatch { rank: 3, len: 2 })
    ));

    let result = PartialShape::from_extents(2, &[1, 2, 3]);
    assert!(matches!(
        result,
        Err(ShapeError::RankMismatch { rank: 2, len: 3 })
    ));
}

#[test]
fn dynamic_rank_drops_dimensions() -> Result<()> {
    let shape = PartialShape::with_rank(
        Dimension::range(Some(1), Some(4))?,
        [fixed(2), fixed(3)],
    )?;
    ensure!(shape.is_dynamic()?, "ranged rank is dynamic");
    assert_eq!(shape.dimensions(), Err(ShapeError::DynamicRank));
    assert_eq!(shape.encode()?.len(), 16);
    Ok(())
}

#[test]
fn get_checks_bounds() -> Result<()> {
    let shape = PartialShape::from_extents(2, &[8, 9])?;
    assert_eq!(shape.get(1)?, fixed(9));
    assert_eq!(
        shape.get(2),
        Err(ShapeError::AxisOutOfRange { axis: 2, rank: 2 })
    );
    Ok(())
}

#[test]
fn shapes_move_across_threads() -> Result<()> {
    let shape = ShapeFactory::default().parse("{2,?,4}")?;
    let rendered = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| shape.render())).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("reader panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?;
    ensure!(rendered.iter().all(|r| r == "Shape : {2,?,4}"));

    let handle = std::thread::spawn(move || shape.to_shape());
    assert_eq!(
        handle.join().expect("worker panicked"),
        Err(ShapeError::HasDynamicDimensions)
    );
    Ok(())
}
