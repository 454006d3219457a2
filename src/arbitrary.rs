//! Utilities for fuzz and/or property testing using `arbitrary`.

use arbitrary::Unstructured;

use crate::{beachline::Beachline, geom::Point, BoundMode, BoundingBox, SiteIdx};

/// Generate an arbitrary float in some range.
pub fn float_in_range(
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let num: u32 = u.arbitrary()?;
    let t = num as f64 / u32::MAX as f64;
    Ok((1.0 - t) * start + t * end)
}

fn float(u: &mut Unstructured<'_>) -> Result<f64, arbitrary::Error> {
    float_in_range(-1e6, 1e6, u)
}

/// Generate a float in some range, but give it a chance to be close to another float.
fn another_float_in_range(
    orig: f64,
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let close: bool = u.arbitrary()?;
    if close {
        let ulps: i32 = u.int_in_range(-32..=32)?;
        let scale = 1.0f64 + ulps as f64 * f64::EPSILON;
        Ok((orig * scale).clamp(start, end))
    } else {
        float_in_range(start, end, u)
    }
}

/// Generate an arbitrary point.
pub fn point(u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    Ok(Point::new(float(u)?, float(u)?))
}

/// Generate a point, but give each of its coordinates a chance to be close to `orig`'s.
///
/// Sites sharing a coordinate (or almost sharing one) are the ones that give
/// the sweep trouble: they create simultaneous events and breakpoints
/// between foci at the same height.
pub fn another_point(orig: Point, u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    Ok(Point::new(
        another_float_in_range(orig.x, -1e6, 1e6, u)?,
        another_float_in_range(orig.y, -1e6, 1e6, u)?,
    ))
}

/// Generate an arbitrary set of points.
///
/// Some of the points are unrelated to one another, some are near earlier
/// points, and some lie on a small integer grid (which makes lots of
/// cocircular sites).
pub fn points(u: &mut Unstructured<'_>) -> Result<Vec<Point>, arbitrary::Error> {
    let len = u.int_in_range(0..=64)?;
    let mut ret: Vec<Point> = Vec::with_capacity(len);
    for _ in 0..len {
        let p = match u.int_in_range(0..=2)? {
            0 if !ret.is_empty() => {
                let orig = *u.choose(&ret)?;
                another_point(orig, u)?
            }
            1 => Point::new(
                u.int_in_range(-8..=8)? as f64,
                u.int_in_range(-8..=8)? as f64,
            ),
            _ => point(u)?,
        };
        ret.push(p);
    }
    Ok(ret)
}

/// Generate a box, not necessarily containing anything interesting.
pub fn bounding_box(u: &mut Unstructured<'_>) -> Result<BoundingBox, arbitrary::Error> {
    let (x0, x1) = (float(u)?, float(u)?);
    let (y0, y1) = (float(u)?, float(u)?);
    Ok(BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
}

/// Sweeps and bounds an arbitrary set of points, checking the diagram along the way.
///
/// Bounding is allowed to fail on inputs that are degenerate enough to
/// confuse the sweep, but it must not panic, and anything it accepts must
/// be a consistent diagram. Points on the integer grid are exact, so
/// expanding around them must always succeed.
pub fn sweep_and_bound(u: &mut Unstructured<'_>) -> Result<(), arbitrary::Error> {
    let points = points(u)?;
    let bbox = bounding_box(u)?;
    let mode = if u.arbitrary()? {
        BoundMode::Clip
    } else {
        BoundMode::Expand
    };
    let on_grid = points.iter().all(|p| {
        p.x.fract() == 0.0 && p.y.fract() == 0.0 && p.x.abs() <= 8.0 && p.y.abs() <= 8.0
    });

    let mut diagram = crate::build_diagram(points)
        .expect("finite points are always accepted")
        .into_diagram();
    diagram.check_invariants();
    let bounded = diagram.bound_to_with(bbox, mode);
    if on_grid && mode == BoundMode::Expand {
        if let Err(e) = &bounded {
            panic!("failed to bound grid points: {e}");
        }
    }
    if bounded.is_ok() {
        diagram.check_invariants();
        if mode == BoundMode::Clip {
            for (_, v) in diagram.vertices() {
                assert!(bbox.contains(v.point));
            }
        }
    }
    Ok(())
}

#[derive(arbitrary::Arbitrary, Debug)]
enum BeachlineOp {
    InsertBefore { idx: usize },
    InsertAfter { idx: usize },
    Replace { idx: usize },
    Remove { idx: usize },
}

/// Applies arbitrary edits to a beachline, checking it against a plain vector of sites.
pub fn beachline_mutations(u: &mut Unstructured<'_>) -> Result<(), arbitrary::Error> {
    let len = u.arbitrary_len::<BeachlineOp>()?;
    let mut beachline = Beachline::new();
    let mut model = Vec::new();
    for i in 0..len {
        let op: BeachlineOp = u.arbitrary()?;
        let arc = beachline.create_arc(SiteIdx(i), Point::new(i as f64, 0.0));
        if model.is_empty() {
            beachline.set_root(arc);
            model.push((arc, i));
            continue;
        }

        match op {
            BeachlineOp::InsertBefore { idx } => {
                let idx = idx % model.len();
                beachline.insert_before(model[idx].0, arc);
                model.insert(idx, (arc, i));
            }
            BeachlineOp::InsertAfter { idx } => {
                let idx = idx % model.len();
                beachline.insert_after(model[idx].0, arc);
                model.insert(idx + 1, (arc, i));
            }
            BeachlineOp::Replace { idx } => {
                let idx = idx % model.len();
                beachline.replace(model[idx].0, arc);
                beachline.release(model[idx].0);
                model[idx] = (arc, i);
            }
            BeachlineOp::Remove { idx } => {
                let idx = idx % model.len();
                beachline.release(arc);
                beachline.remove(model[idx].0);
                beachline.release(model[idx].0);
                model.remove(idx);
            }
        }
        beachline.check_invariants();

        assert_eq!(beachline.len(), model.len());
        assert!(beachline
            .iter()
            .map(|(idx, arc)| (idx, arc.site().0))
            .eq(model.iter().copied()));
    }
    Ok(())
}
