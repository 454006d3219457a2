//! Geometric primitives: points, and the box that diagrams get bounded to.

use arrayvec::ArrayVec;

/// A two-dimensional point, also used as a vector.
///
/// The `y` axis points up: the sweep line starts at the largest `y` and moves
/// down.
#[derive(Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Point {
    /// Horizontal coordinate, increasing to the right.
    pub x: f64,
    /// Vertical coordinate, increasing upwards.
    pub y: f64,
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Are both coordinates finite?
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// The dot product, treating both points as vectors.
    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The 2D cross product (the `z` component of the 3D one).
    pub fn det(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Rotates this vector a quarter turn counter-clockwise.
    pub fn orthogonal(&self) -> Point {
        Point::new(-self.y, self.x)
    }

    /// The Euclidean length of this vector.
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// The Euclidean distance between two points.
    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).norm()
    }

    /// The point halfway between `self` and `other`.
    pub fn midpoint(&self, other: Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    /// Converts this point to a `kurbo` point.
    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<kurbo::Point> for Point {
    fn from(p: kurbo::Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Mul<Point> for f64 {
    type Output = Point;

    fn mul(self, rhs: Point) -> Point {
        rhs * self
    }
}

impl std::ops::Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// One of the four sides of a [`BoundingBox`].
///
/// The sides are listed in counter-clockwise order, starting from the left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum Side {
    /// The side at `x == left`.
    Left,
    /// The side at `y == bottom`.
    Bottom,
    /// The side at `x == right`.
    Right,
    /// The side at `y == top`.
    Top,
}

impl Side {
    /// All sides, in counter-clockwise order.
    pub const ALL: [Side; 4] = [Side::Left, Side::Bottom, Side::Right, Side::Top];

    /// The position of this side in [`Side::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The next side counter-clockwise.
    pub fn next(self) -> Side {
        Side::ALL[(self.index() + 1) % 4]
    }

    /// The next side clockwise.
    pub fn prev(self) -> Side {
        Side::ALL[(self.index() + 3) % 4]
    }
}

/// A point where something crosses the boundary of a box.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Intersection {
    /// The side that was crossed.
    pub side: Side,
    /// The crossing point, lying exactly on `side`.
    pub point: Point,
}

/// An axis-aligned rectangle, with `y` increasing upwards.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct BoundingBox {
    /// The smallest `x` coordinate.
    pub left: f64,
    /// The smallest `y` coordinate.
    pub bottom: f64,
    /// The largest `x` coordinate.
    pub right: f64,
    /// The largest `y` coordinate.
    pub top: f64,
}

impl From<kurbo::Rect> for BoundingBox {
    fn from(rect: kurbo::Rect) -> Self {
        let rect = rect.abs();
        BoundingBox::new(rect.x0, rect.y0, rect.x1, rect.y1)
    }
}

impl BoundingBox {
    /// Creates a new box. The arguments are in counter-clockwise order, starting from the left.
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        debug_assert!(left <= right && bottom <= top);
        BoundingBox {
            left,
            bottom,
            right,
            top,
        }
    }

    /// The horizontal extent.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// The vertical extent.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Converts this box to a `kurbo` rectangle.
    pub fn to_kurbo(&self) -> kurbo::Rect {
        kurbo::Rect::new(self.left, self.bottom, self.right, self.top)
    }

    /// Is `p` inside the box or on its boundary?
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.bottom && p.y <= self.top
    }

    /// The smallest box containing both `self` and `p`.
    pub fn including(&self, p: Point) -> BoundingBox {
        BoundingBox {
            left: self.left.min(p.x),
            bottom: self.bottom.min(p.y),
            right: self.right.max(p.x),
            top: self.top.max(p.y),
        }
    }

    /// Grows the box by `margin` on every side.
    pub fn padded(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            left: self.left - margin,
            bottom: self.bottom - margin,
            right: self.right + margin,
            top: self.top + margin,
        }
    }

    /// The corner where `side` begins, walking counter-clockwise.
    pub fn corner(&self, side: Side) -> Point {
        match side {
            Side::Left => Point::new(self.left, self.top),
            Side::Bottom => Point::new(self.left, self.bottom),
            Side::Right => Point::new(self.right, self.bottom),
            Side::Top => Point::new(self.right, self.top),
        }
    }

    /// A coordinate along `side` that increases counter-clockwise.
    ///
    /// Only meaningful for points on that side.
    pub(crate) fn position_along(side: Side, p: Point) -> f64 {
        match side {
            Side::Left => -p.y,
            Side::Bottom => p.x,
            Side::Right => p.y,
            Side::Top => -p.x,
        }
    }

    // Builds the intersection with `side`, snapping the fixed coordinate so
    // that the result is exactly on the boundary.
    fn on_side(&self, side: Side, p: Point) -> Intersection {
        let point = match side {
            Side::Left => Point::new(self.left, p.y),
            Side::Right => Point::new(self.right, p.y),
            Side::Bottom => Point::new(p.x, self.bottom),
            Side::Top => Point::new(p.x, self.top),
        };
        Intersection { side, point }
    }

    /// Finds where the ray from `origin` in `direction` leaves the box.
    ///
    /// `origin` must be inside the box and `direction` must be non-zero.
    pub fn first_intersection(&self, origin: Point, direction: Point) -> Intersection {
        debug_assert!(self.contains(origin));
        debug_assert!(direction != Point::default());

        let mut best = (f64::INFINITY, Side::Top);
        if direction.x > 0.0 {
            best = ((self.right - origin.x) / direction.x, Side::Right);
        } else if direction.x < 0.0 {
            best = ((self.left - origin.x) / direction.x, Side::Left);
        }
        if direction.y > 0.0 {
            let t = (self.top - origin.y) / direction.y;
            if t < best.0 {
                best = (t, Side::Top);
            }
        } else if direction.y < 0.0 {
            let t = (self.bottom - origin.y) / direction.y;
            if t < best.0 {
                best = (t, Side::Bottom);
            }
        }

        let (t, side) = best;
        self.on_side(side, origin + direction * t)
    }

    /// Finds the places where the segment from `p0` to `p1` crosses the boundary of the box.
    ///
    /// The crossings are sorted by their distance from `p0`. A segment passing
    /// exactly through a corner crosses there only once.
    pub fn segment_intersections(&self, p0: Point, p1: Point) -> ArrayVec<Intersection, 2> {
        let d = p1 - p0;
        // Crossings that land a rounding error outside a side still count, so
        // that a segment through a corner is never missed.
        let slack = 1e-12 * (1.0 + self.width().max(self.height()));
        let mut hits = ArrayVec::<(f64, Intersection), 4>::new();
        let mut try_side = |side: Side, t: f64| {
            // NaN fails this check too.
            if !(0.0..=1.0).contains(&t) {
                return;
            }
            let mut hit = self.on_side(side, p0 + d * t);
            let in_range = match side {
                Side::Left | Side::Right => {
                    hit.point.y >= self.bottom - slack && hit.point.y <= self.top + slack
                }
                Side::Bottom | Side::Top => {
                    hit.point.x >= self.left - slack && hit.point.x <= self.right + slack
                }
            };
            if in_range {
                hit.point.x = hit.point.x.clamp(self.left, self.right);
                hit.point.y = hit.point.y.clamp(self.bottom, self.top);
                hits.push((t, hit));
            }
        };

        if d.x != 0.0 {
            try_side(Side::Left, (self.left - p0.x) / d.x);
            try_side(Side::Right, (self.right - p0.x) / d.x);
        }
        if d.y != 0.0 {
            try_side(Side::Bottom, (self.bottom - p0.y) / d.y);
            try_side(Side::Top, (self.top - p0.y) / d.y);
        }
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ret = ArrayVec::new();
        let mut last: Option<Point> = None;
        for (_, hit) in hits {
            if last.is_some_and(|p| p.distance(hit.point) <= slack) {
                continue;
            }
            last = Some(hit.point);
            if ret.try_push(hit).is_err() {
                break;
            }
        }
        ret
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::num::tests::Reasonable;
    use proptest::prelude::*;

    impl Reasonable for Point {
        type Strategy = BoxedStrategy<Point>;

        fn reasonable() -> Self::Strategy {
            (f64::reasonable(), f64::reasonable())
                .prop_map(|(x, y)| Point::new(x, y))
                .boxed()
        }
    }

    fn unit_box() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn vector_ops() {
        let p = Point::new(3.0, 4.0);
        let q = Point::new(1.0, -2.0);
        assert_eq!(p + q, Point::new(4.0, 2.0));
        assert_eq!(p - q, Point::new(2.0, 6.0));
        assert_eq!(2.0 * p, Point::new(6.0, 8.0));
        assert_eq!(p.dot(q), -5.0);
        assert_eq!(p.det(q), -10.0);
        assert_eq!(p.orthogonal(), Point::new(-4.0, 3.0));
        assert_eq!(p.norm(), 5.0);
        assert_eq!(p.distance(Point::default()), 5.0);
        assert_eq!(p.midpoint(q), Point::new(2.0, 1.0));
    }

    #[test]
    fn sides_wrap_around() {
        assert_eq!(Side::Top.next(), Side::Left);
        assert_eq!(Side::Left.prev(), Side::Top);
        for side in Side::ALL {
            assert_eq!(side.next().prev(), side);
        }
    }

    #[test]
    fn ray_exits() {
        let b = unit_box();
        let center = Point::new(0.5, 0.5);

        let hit = b.first_intersection(center, Point::new(1.0, 0.0));
        assert_eq!(hit.side, Side::Right);
        assert_eq!(hit.point, Point::new(1.0, 0.5));

        let hit = b.first_intersection(center, Point::new(0.0, -3.0));
        assert_eq!(hit.side, Side::Bottom);
        assert_eq!(hit.point, Point::new(0.5, 0.0));

        let hit = b.first_intersection(center, Point::new(-1.0, 0.25));
        assert_eq!(hit.side, Side::Left);
        assert_eq!(hit.point, Point::new(0.0, 0.625));

        let hit = b.first_intersection(Point::new(0.9, 0.5), Point::new(-0.1, 1.0));
        assert_eq!(hit.side, Side::Top);
        assert_eq!(hit.point.y, 1.0);
    }

    #[test]
    fn segment_crossing_twice() {
        let b = unit_box();
        let hits = b.segment_intersections(Point::new(-1.0, 0.5), Point::new(2.0, 0.5));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].side, Side::Left);
        assert_eq!(hits[0].point, Point::new(0.0, 0.5));
        assert_eq!(hits[1].side, Side::Right);
        assert_eq!(hits[1].point, Point::new(1.0, 0.5));

        // Same segment, the other way around.
        let hits = b.segment_intersections(Point::new(2.0, 0.5), Point::new(-1.0, 0.5));
        assert_eq!(hits[0].side, Side::Right);
        assert_eq!(hits[1].side, Side::Left);
    }

    #[test]
    fn segment_crossing_once() {
        let b = unit_box();
        let hits = b.segment_intersections(Point::new(0.5, 0.5), Point::new(0.5, 3.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].side, Side::Top);
        assert_eq!(hits[0].point, Point::new(0.5, 1.0));
    }

    #[test]
    fn segment_missing() {
        let b = unit_box();
        assert!(b
            .segment_intersections(Point::new(-1.0, 2.0), Point::new(2.0, 1.5))
            .is_empty());
        assert!(b
            .segment_intersections(Point::new(0.2, 0.2), Point::new(0.8, 0.7))
            .is_empty());
    }

    #[test]
    fn segment_through_corner() {
        let b = unit_box();
        let hits = b.segment_intersections(Point::new(-1.0, -1.0), Point::new(0.5, 0.5));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].point, Point::new(0.0, 0.0));
    }

    #[test]
    fn from_kurbo_rect() {
        let b = BoundingBox::from(kurbo::Rect::new(2.0, 3.0, -1.0, -1.0));
        assert_eq!(b, BoundingBox::new(-1.0, -1.0, 2.0, 3.0));
        assert_eq!(b.corner(Side::Left), Point::new(-1.0, 3.0));
        assert_eq!(b.corner(Side::Right), Point::new(2.0, -1.0));
    }

    proptest! {
        #[test]
        fn rays_from_inside_hit_the_boundary(
            origin in (0.0..1.0f64, 0.0..1.0f64),
            angle in 0.0..std::f64::consts::TAU,
        ) {
            let b = unit_box();
            let origin = Point::from(origin);
            let dir = Point::new(angle.cos(), angle.sin());
            let hit = b.first_intersection(origin, dir);
            prop_assert!(b.padded(1e-12).contains(hit.point));
            let on_side = match hit.side {
                Side::Left => hit.point.x == 0.0,
                Side::Bottom => hit.point.y == 0.0,
                Side::Right => hit.point.x == 1.0,
                Side::Top => hit.point.y == 1.0,
            };
            prop_assert!(on_side);
            // The hit is in front of the origin.
            prop_assert!((hit.point - origin).dot(dir) >= -1e-12);
        }

        #[test]
        fn crossings_are_sorted(p0 in Point::reasonable(), p1 in Point::reasonable()) {
            let b = BoundingBox::new(-100.0, -100.0, 100.0, 100.0);
            let hits = b.segment_intersections(p0, p1);
            if hits.len() == 2 {
                prop_assert!(p0.distance(hits[0].point) <= p0.distance(hits[1].point));
            }
            // Exactly one endpoint inside means exactly one crossing, unless
            // the crossing is at the outside endpoint.
            if b.contains(p0) != b.contains(p1) {
                prop_assert!(!hits.is_empty());
            }
        }
    }
}
