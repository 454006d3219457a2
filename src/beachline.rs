//! The beachline: the parabolic arcs that make up the sweep line's front.
//!
//! Arcs are kept in a red-black tree, but the tree has no stored keys. The
//! order is given by the breakpoints between neighboring arcs, which move as
//! the sweep line does and are only ever computed on demand. Alongside the
//! tree, every arc also links to its left and right neighbors, so walking the
//! beachline in order never needs to touch the tree.
//!
//! The tree lives in an arena. Slot 0 is a sentinel "nil" arc that stands in
//! for every missing child, parent and neighbor; it is always black.

use crate::diagram::{HalfEdgeIdx, SiteIdx};
use crate::geom::Point;
use crate::priority_queue::Handle;

/// A reference to an arc in a [`Beachline`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArcIdx(usize);

impl std::fmt::Debug for ArcIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_nil() {
            write!(f, "nil")
        } else {
            write!(f, "a_{}", self.0)
        }
    }
}

impl ArcIdx {
    const NIL: ArcIdx = ArcIdx(0);

    fn is_nil(self) -> bool {
        self == ArcIdx::NIL
    }

    fn non_nil(self) -> Option<ArcIdx> {
        (!self.is_nil()).then_some(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

/// One parabolic arc of the beachline.
#[derive(Clone, Debug)]
pub struct Arc {
    pub(crate) site: SiteIdx,
    pub(crate) focus: Point,
    // The half-edges traced by the breakpoints with our left and right
    // neighbors. Both belong to our site's face.
    pub(crate) left_half_edge: Option<HalfEdgeIdx>,
    pub(crate) right_half_edge: Option<HalfEdgeIdx>,
    // The circle event that would make this arc disappear, if one is scheduled.
    pub(crate) event: Option<Handle>,
    parent: ArcIdx,
    left: ArcIdx,
    right: ArcIdx,
    prev: ArcIdx,
    next: ArcIdx,
    color: Color,
}

impl Arc {
    fn new(site: SiteIdx, focus: Point) -> Self {
        Arc {
            site,
            focus,
            left_half_edge: None,
            right_half_edge: None,
            event: None,
            parent: ArcIdx::NIL,
            left: ArcIdx::NIL,
            right: ArcIdx::NIL,
            prev: ArcIdx::NIL,
            next: ArcIdx::NIL,
            color: Color::Red,
        }
    }

    /// The site whose parabola this arc is a piece of.
    pub fn site(&self) -> SiteIdx {
        self.site
    }

    /// The location of that site.
    pub fn focus(&self) -> Point {
        self.focus
    }

    /// The half-edge traced by the breakpoint with the arc on our left.
    pub fn left_half_edge(&self) -> Option<HalfEdgeIdx> {
        self.left_half_edge
    }

    /// The half-edge traced by the breakpoint with the arc on our right.
    pub fn right_half_edge(&self) -> Option<HalfEdgeIdx> {
        self.right_half_edge
    }

    /// Is there a circle event scheduled for this arc?
    pub fn has_event(&self) -> bool {
        self.event.is_some()
    }
}

/// Computes the `x` coordinate where the parabola of `left` meets the parabola of `right`.
///
/// Both parabolas have the line `y == sweep_y` as their directrix. Two such
/// parabolas generally meet twice; we return the meeting point that has the
/// `left` parabola's arc on its left.
pub fn breakpoint(left: Point, right: Point, sweep_y: f64) -> f64 {
    let (x1, y1) = (left.x, left.y);
    let (x2, y2) = (right.x, right.y);
    let l = sweep_y;

    // A focus on the sweep line has a degenerate parabola: a vertical ray
    // going up from the focus.
    match (y1 == l, y2 == l) {
        (true, true) => return 0.5 * (x1 + x2),
        (true, false) => return x1,
        (false, true) => return x2,
        (false, false) => {}
    }

    if y1 == y2 {
        // Foci at the same height: the parabolas meet only once, halfway.
        return 0.5 * (x1 + x2);
    }

    let d1 = 1.0 / (2.0 * (y1 - l));
    let d2 = 1.0 / (2.0 * (y2 - l));
    let a = d1 - d2;
    let b = 2.0 * (x2 * d2 - x1 * d1);
    let c = (y1 * y1 + x1 * x1 - l * l) * d1 - (y2 * y2 + x2 * x2 - l * l) * d2;

    if a == 0.0 {
        // The heights are too close to tell apart.
        return -c / b;
    }

    // The root we want is (-b + sqrt(disc)) / 2a. When b is positive, that
    // formula cancels catastrophically, so use the equivalent 2c / (-b - sqrt(disc)).
    let sqrt_disc = (b * b - 4.0 * a * c).max(0.0).sqrt();
    if b > 0.0 {
        2.0 * c / (-b - sqrt_disc)
    } else {
        (-b + sqrt_disc) / (2.0 * a)
    }
}

/// The height of the parabola with focus `focus` and directrix `y == sweep_y` at `x`.
#[cfg(test)]
pub(crate) fn parabola_y(focus: Point, x: f64, sweep_y: f64) -> f64 {
    let dx = x - focus.x;
    (dx * dx + focus.y * focus.y - sweep_y * sweep_y) / (2.0 * (focus.y - sweep_y))
}

/// The arcs of the beachline, in a red-black tree ordered by breakpoints.
#[derive(Debug)]
pub struct Beachline {
    arcs: Vec<Arc>,
    free: Vec<ArcIdx>,
    root: ArcIdx,
    len: usize,
}

impl Default for Beachline {
    fn default() -> Self {
        let mut nil = Arc::new(SiteIdx(usize::MAX), Point::default());
        nil.color = Color::Black;
        Beachline {
            arcs: vec![nil],
            free: Vec::new(),
            root: ArcIdx::NIL,
            len: 0,
        }
    }
}

impl std::ops::Index<ArcIdx> for Beachline {
    type Output = Arc;

    fn index(&self, index: ArcIdx) -> &Arc {
        debug_assert!(!index.is_nil());
        &self.arcs[index.0]
    }
}

impl Beachline {
    /// Creates an empty beachline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Are there no arcs?
    pub fn is_empty(&self) -> bool {
        self.root.is_nil()
    }

    /// The number of arcs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn arc_mut(&mut self, idx: ArcIdx) -> &mut Arc {
        debug_assert!(!idx.is_nil());
        &mut self.arcs[idx.0]
    }

    /// The arc immediately to the left of `idx`.
    pub fn prev(&self, idx: ArcIdx) -> Option<ArcIdx> {
        self.arcs[idx.0].prev.non_nil()
    }

    /// The arc immediately to the right of `idx`.
    pub fn next(&self, idx: ArcIdx) -> Option<ArcIdx> {
        self.arcs[idx.0].next.non_nil()
    }

    /// The leftmost arc.
    pub fn leftmost(&self) -> Option<ArcIdx> {
        self.root.non_nil().map(|root| self.minimum(root))
    }

    /// Iterates over the arcs from left to right.
    pub fn iter(&self) -> impl Iterator<Item = (ArcIdx, &Arc)> + '_ {
        std::iter::successors(self.leftmost(), |&idx| self.next(idx))
            .map(|idx| (idx, &self.arcs[idx.0]))
    }

    /// Allocates a new arc, not yet attached to the beachline.
    pub fn create_arc(&mut self, site: SiteIdx, focus: Point) -> ArcIdx {
        let arc = Arc::new(site, focus);
        match self.free.pop() {
            Some(idx) => {
                self.arcs[idx.0] = arc;
                idx
            }
            None => {
                self.arcs.push(arc);
                ArcIdx(self.arcs.len() - 1)
            }
        }
    }

    /// Returns a detached arc's slot to the arena.
    pub fn release(&mut self, idx: ArcIdx) {
        assert!(!idx.is_nil(), "releasing the nil arc");
        debug_assert!(self.arcs[idx.0].event.is_none());
        self.free.push(idx);
    }

    /// Makes `idx` the only arc of an empty beachline.
    pub fn set_root(&mut self, idx: ArcIdx) {
        assert!(self.is_empty(), "the beachline already has a root");
        self.root = idx;
        self.arcs[idx.0].color = Color::Black;
        self.len = 1;
    }

    /// Finds the arc directly above `point`, when the sweep line is at `sweep_y`.
    ///
    /// # Panics
    ///
    /// Panics if the beachline is empty.
    pub fn locate_arc_above(&self, point: Point, sweep_y: f64) -> ArcIdx {
        assert!(!self.is_empty(), "locating an arc in an empty beachline");

        let mut node = self.root;
        loop {
            let arc = &self.arcs[node.0];
            let left_bp = match arc.prev.non_nil() {
                Some(prev) => breakpoint(self.arcs[prev.0].focus, arc.focus, sweep_y),
                None => f64::NEG_INFINITY,
            };
            let right_bp = match arc.next.non_nil() {
                Some(next) => breakpoint(arc.focus, self.arcs[next.0].focus, sweep_y),
                None => f64::INFINITY,
            };

            // Everything to our left is in the left subtree, unless we don't
            // have one: then our left neighbor is an ancestor that we
            // already passed, and only rounding could send us back there.
            node = if point.x < left_bp {
                if arc.left.is_nil() {
                    arc.prev
                } else {
                    arc.left
                }
            } else if point.x > right_bp {
                if arc.right.is_nil() {
                    arc.next
                } else {
                    arc.right
                }
            } else {
                return node;
            };
        }
    }

    /// Inserts the detached arc `y` immediately to the left of `x`.
    pub fn insert_before(&mut self, x: ArcIdx, y: ArcIdx) {
        let x_prev = self.arcs[x.0].prev;
        if self.arcs[x.0].left.is_nil() {
            self.arcs[x.0].left = y;
            self.arcs[y.0].parent = x;
        } else {
            // The predecessor is the rightmost node of our left subtree.
            self.arcs[x_prev.0].right = y;
            self.arcs[y.0].parent = x_prev;
        }

        self.arcs[y.0].prev = x_prev;
        if !x_prev.is_nil() {
            self.arcs[x_prev.0].next = y;
        }
        self.arcs[y.0].next = x;
        self.arcs[x.0].prev = y;

        self.len += 1;
        self.insert_fixup(y);
    }

    /// Inserts the detached arc `y` immediately to the right of `x`.
    pub fn insert_after(&mut self, x: ArcIdx, y: ArcIdx) {
        let x_next = self.arcs[x.0].next;
        if self.arcs[x.0].right.is_nil() {
            self.arcs[x.0].right = y;
            self.arcs[y.0].parent = x;
        } else {
            self.arcs[x_next.0].left = y;
            self.arcs[y.0].parent = x_next;
        }

        self.arcs[y.0].next = x_next;
        if !x_next.is_nil() {
            self.arcs[x_next.0].prev = y;
        }
        self.arcs[y.0].prev = x;
        self.arcs[x.0].next = y;

        self.len += 1;
        self.insert_fixup(y);
    }

    /// Puts the detached arc `y` in the place of `x`, which becomes detached.
    pub fn replace(&mut self, x: ArcIdx, y: ArcIdx) {
        self.transplant(x, y);

        let Arc {
            left,
            right,
            prev,
            next,
            color,
            ..
        } = self.arcs[x.0];
        let y_arc = &mut self.arcs[y.0];
        y_arc.left = left;
        y_arc.right = right;
        y_arc.prev = prev;
        y_arc.next = next;
        y_arc.color = color;

        if !left.is_nil() {
            self.arcs[left.0].parent = y;
        }
        if !right.is_nil() {
            self.arcs[right.0].parent = y;
        }
        if !prev.is_nil() {
            self.arcs[prev.0].next = y;
        }
        if !next.is_nil() {
            self.arcs[next.0].prev = y;
        }
    }

    /// Detaches `z` from the beachline.
    ///
    /// `z` keeps its links to its old neighbors, which remain valid until
    /// the beachline is next modified.
    pub fn remove(&mut self, z: ArcIdx) {
        assert!(!z.is_nil(), "removing the nil arc");

        let mut y = z;
        let mut y_original_color = self.arcs[y.0].color;
        let x;
        let z_left = self.arcs[z.0].left;
        let z_right = self.arcs[z.0].right;
        if z_left.is_nil() {
            x = z_right;
            self.transplant(z, z_right);
        } else if z_right.is_nil() {
            x = z_left;
            self.transplant(z, z_left);
        } else {
            y = self.minimum(z_right);
            y_original_color = self.arcs[y.0].color;
            x = self.arcs[y.0].right;
            if self.arcs[y.0].parent == z {
                // `x` might be nil, but the fixup still needs its parent.
                self.arcs[x.0].parent = y;
            } else {
                self.transplant(y, x);
                let z_right = self.arcs[z.0].right;
                self.arcs[y.0].right = z_right;
                self.arcs[z_right.0].parent = y;
            }
            self.transplant(z, y);
            let z_left = self.arcs[z.0].left;
            self.arcs[y.0].left = z_left;
            self.arcs[z_left.0].parent = y;
            self.arcs[y.0].color = self.arcs[z.0].color;
        }
        if y_original_color == Color::Black {
            self.remove_fixup(x);
        }

        let Arc { prev, next, .. } = self.arcs[z.0];
        if !prev.is_nil() {
            self.arcs[prev.0].next = next;
        }
        if !next.is_nil() {
            self.arcs[next.0].prev = prev;
        }
        self.len -= 1;
    }

    fn minimum(&self, mut x: ArcIdx) -> ArcIdx {
        while !self.arcs[x.0].left.is_nil() {
            x = self.arcs[x.0].left;
        }
        x
    }

    fn transplant(&mut self, u: ArcIdx, v: ArcIdx) {
        let parent = self.arcs[u.0].parent;
        if parent.is_nil() {
            self.root = v;
        } else if self.arcs[parent.0].left == u {
            self.arcs[parent.0].left = v;
        } else {
            self.arcs[parent.0].right = v;
        }
        self.arcs[v.0].parent = parent;
    }

    fn color(&self, x: ArcIdx) -> Color {
        self.arcs[x.0].color
    }

    fn set_color(&mut self, x: ArcIdx, color: Color) {
        self.arcs[x.0].color = color;
    }

    fn parent(&self, x: ArcIdx) -> ArcIdx {
        self.arcs[x.0].parent
    }

    fn left(&self, x: ArcIdx) -> ArcIdx {
        self.arcs[x.0].left
    }

    fn right(&self, x: ArcIdx) -> ArcIdx {
        self.arcs[x.0].right
    }

    fn insert_fixup(&mut self, mut z: ArcIdx) {
        while self.color(self.parent(z)) == Color::Red {
            let parent = self.parent(z);
            let grandparent = self.parent(parent);
            if parent == self.left(grandparent) {
                let uncle = self.right(grandparent);
                if self.color(uncle) == Color::Red {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    z = grandparent;
                } else {
                    if z == self.right(parent) {
                        z = parent;
                        self.left_rotate(z);
                    }
                    let parent = self.parent(z);
                    let grandparent = self.parent(parent);
                    self.set_color(parent, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    self.right_rotate(grandparent);
                }
            } else {
                let uncle = self.left(grandparent);
                if self.color(uncle) == Color::Red {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    z = grandparent;
                } else {
                    if z == self.left(parent) {
                        z = parent;
                        self.right_rotate(z);
                    }
                    let parent = self.parent(z);
                    let grandparent = self.parent(parent);
                    self.set_color(parent, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    self.left_rotate(grandparent);
                }
            }
        }
        self.set_color(self.root, Color::Black);
    }

    fn remove_fixup(&mut self, mut x: ArcIdx) {
        while x != self.root && self.color(x) == Color::Black {
            let parent = self.parent(x);
            if x == self.left(parent) {
                let mut w = self.right(parent);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.left_rotate(parent);
                    w = self.right(self.parent(x));
                }
                if self.color(self.left(w)) == Color::Black
                    && self.color(self.right(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.right(w)) == Color::Black {
                        self.set_color(self.left(w), Color::Black);
                        self.set_color(w, Color::Red);
                        self.right_rotate(w);
                        w = self.right(self.parent(x));
                    }
                    let parent = self.parent(x);
                    self.set_color(w, self.color(parent));
                    self.set_color(parent, Color::Black);
                    self.set_color(self.right(w), Color::Black);
                    self.left_rotate(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.left(parent);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.right_rotate(parent);
                    w = self.left(self.parent(x));
                }
                if self.color(self.left(w)) == Color::Black
                    && self.color(self.right(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.left(w)) == Color::Black {
                        self.set_color(self.right(w), Color::Black);
                        self.set_color(w, Color::Red);
                        self.left_rotate(w);
                        w = self.left(self.parent(x));
                    }
                    let parent = self.parent(x);
                    self.set_color(w, self.color(parent));
                    self.set_color(parent, Color::Black);
                    self.set_color(self.left(w), Color::Black);
                    self.right_rotate(parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    fn left_rotate(&mut self, x: ArcIdx) {
        let y = self.right(x);
        let y_left = self.left(y);
        self.arcs[x.0].right = y_left;
        if !y_left.is_nil() {
            self.arcs[y_left.0].parent = x;
        }
        let x_parent = self.parent(x);
        self.arcs[y.0].parent = x_parent;
        if x_parent.is_nil() {
            self.root = y;
        } else if self.left(x_parent) == x {
            self.arcs[x_parent.0].left = y;
        } else {
            self.arcs[x_parent.0].right = y;
        }
        self.arcs[y.0].left = x;
        self.arcs[x.0].parent = y;
    }

    fn right_rotate(&mut self, y: ArcIdx) {
        let x = self.left(y);
        let x_right = self.right(x);
        self.arcs[y.0].left = x_right;
        if !x_right.is_nil() {
            self.arcs[x_right.0].parent = y;
        }
        let y_parent = self.parent(y);
        self.arcs[x.0].parent = y_parent;
        if y_parent.is_nil() {
            self.root = x;
        } else if self.left(y_parent) == y {
            self.arcs[y_parent.0].left = x;
        } else {
            self.arcs[y_parent.0].right = x;
        }
        self.arcs[x.0].right = y;
        self.arcs[y.0].parent = x;
    }

    /// Checks the red-black properties, and that the tree order agrees with the neighbor links.
    ///
    /// This is slow, and only does anything if the `slow-asserts` feature is enabled (or in tests).
    #[cfg(any(test, feature = "slow-asserts"))]
    pub fn check_invariants(&self) {
        assert_eq!(self.arcs[0].color, Color::Black, "nil must be black");
        if self.root.is_nil() {
            assert_eq!(self.len, 0);
            return;
        }
        assert_eq!(self.color(self.root), Color::Black, "root must be black");
        assert!(self.parent(self.root).is_nil());

        let mut in_order = Vec::new();
        self.check_subtree(self.root, &mut in_order);
        assert_eq!(in_order.len(), self.len);

        let linked: Vec<_> = self.iter().map(|(idx, _)| idx).collect();
        assert_eq!(in_order, linked, "tree order and neighbor links disagree");
        for pair in linked.windows(2) {
            assert_eq!(self.arcs[pair[1].0].prev, pair[0]);
        }
        assert!(self.arcs[linked[0].0].prev.is_nil());
        assert!(self.arcs[linked[linked.len() - 1].0].next.is_nil());

        for idx in &self.free {
            assert!(!linked.contains(idx), "{idx:?} is both free and in use");
        }
    }

    // Returns the black height of the subtree, pushing its nodes in order.
    #[cfg(any(test, feature = "slow-asserts"))]
    fn check_subtree(&self, x: ArcIdx, out: &mut Vec<ArcIdx>) -> usize {
        if x.is_nil() {
            return 1;
        }
        let Arc {
            left, right, color, ..
        } = self.arcs[x.0];
        if !left.is_nil() {
            assert_eq!(self.parent(left), x);
        }
        if !right.is_nil() {
            assert_eq!(self.parent(right), x);
        }
        if color == Color::Red {
            assert_eq!(self.color(left), Color::Black, "red {x:?} has a red child");
            assert_eq!(self.color(right), Color::Black, "red {x:?} has a red child");
        }

        let left_height = self.check_subtree(left, out);
        out.push(x);
        let right_height = self.check_subtree(right, out);
        assert_eq!(left_height, right_height, "unbalanced at {x:?}");
        left_height + usize::from(color == Color::Black)
    }

    /// Checks the red-black properties, and that the tree order agrees with the neighbor links.
    ///
    /// This is slow, and only does anything if the `slow-asserts` feature is enabled (or in tests).
    #[cfg(not(any(test, feature = "slow-asserts")))]
    pub fn check_invariants(&self) {}
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn site(i: usize) -> SiteIdx {
        SiteIdx(i)
    }

    fn sites(beachline: &Beachline) -> Vec<usize> {
        beachline.iter().map(|(_, arc)| arc.site.0).collect()
    }

    #[test]
    fn breakpoint_between_stacked_foci() {
        let upper = Point::new(0.0, 2.0);
        let lower = Point::new(0.0, 1.0);
        // The lower parabola is narrower, so it sits between two pieces of the upper one.
        let sqrt2 = 2.0f64.sqrt();
        assert!((breakpoint(upper, lower, 0.0) + sqrt2).abs() < 1e-12);
        assert!((breakpoint(lower, upper, 0.0) - sqrt2).abs() < 1e-12);
    }

    #[test]
    fn breakpoint_same_height() {
        let a = Point::new(0.0, 1.0);
        let b = Point::new(2.0, 1.0);
        assert!((breakpoint(a, b, 0.0) - 1.0).abs() < 1e-12);
        assert!((breakpoint(a, b, -5.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn breakpoint_on_the_sweep_line() {
        let above = Point::new(0.0, 1.0);
        let on = Point::new(3.0, 0.0);
        assert_eq!(breakpoint(above, on, 0.0), 3.0);
        assert_eq!(breakpoint(on, above, 0.0), 3.0);
        assert_eq!(breakpoint(on, Point::new(5.0, 0.0), 0.0), 4.0);
    }

    #[test]
    fn locate_single_arc() {
        let mut b = Beachline::new();
        let a = b.create_arc(site(0), Point::new(0.0, 1.0));
        b.set_root(a);
        assert_eq!(b.locate_arc_above(Point::new(-100.0, 0.0), 0.0), a);
        assert_eq!(b.locate_arc_above(Point::new(100.0, 0.0), 0.0), a);
    }

    #[test]
    fn locate_between_breakpoints() {
        // Three arcs, as after the first split: upper, lower, upper.
        let upper = Point::new(0.0, 2.0);
        let lower = Point::new(0.0, 1.0);
        let mut b = Beachline::new();
        let left = b.create_arc(site(0), upper);
        b.set_root(left);
        let middle = b.create_arc(site(1), lower);
        b.insert_after(left, middle);
        let right = b.create_arc(site(0), upper);
        b.insert_after(middle, right);
        b.check_invariants();

        assert_eq!(b.locate_arc_above(Point::new(-2.0, 0.0), 0.0), left);
        assert_eq!(b.locate_arc_above(Point::new(0.5, 0.0), 0.0), middle);
        assert_eq!(b.locate_arc_above(Point::new(1.5, 0.0), 0.0), right);
    }

    #[test]
    #[should_panic]
    fn locate_in_empty() {
        Beachline::new().locate_arc_above(Point::new(0.0, 0.0), 0.0);
    }

    #[test]
    fn replace_keeps_position() {
        let mut b = Beachline::new();
        let first = b.create_arc(site(0), Point::default());
        b.set_root(first);
        let mut last = first;
        for i in 1..6 {
            let arc = b.create_arc(site(i), Point::default());
            b.insert_after(last, arc);
            last = arc;
        }
        let third = b.iter().nth(2).map(|(idx, _)| idx).unwrap();
        let replacement = b.create_arc(site(10), Point::default());
        b.replace(third, replacement);
        b.release(third);
        b.check_invariants();
        assert_eq!(sites(&b), vec![0, 1, 10, 3, 4, 5]);
    }

    #[test]
    fn remove_everything() {
        let mut b = Beachline::new();
        let first = b.create_arc(site(0), Point::default());
        b.set_root(first);
        let mut arcs = vec![first];
        for i in 1..20 {
            let arc = b.create_arc(site(i), Point::default());
            b.insert_before(first, arc);
            arcs.push(arc);
        }
        b.check_invariants();
        assert_eq!(sites(&b), (1..20).chain([0]).collect::<Vec<_>>());

        for arc in arcs {
            b.remove(arc);
            b.release(arc);
            b.check_invariants();
        }
        assert!(b.is_empty());
        assert_eq!(b.leftmost(), None);
    }

    #[derive(Clone, Debug)]
    enum Op {
        InsertBefore(usize),
        InsertAfter(usize),
        Replace(usize),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<usize>().prop_map(Op::InsertBefore),
            any::<usize>().prop_map(Op::InsertAfter),
            any::<usize>().prop_map(Op::Replace),
            any::<usize>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        // Mirror every operation on a plain vector of site indices.
        #[test]
        fn matches_a_vec(ops in prop::collection::vec(op(), 1..200)) {
            let mut b = Beachline::new();
            let mut model: Vec<(ArcIdx, usize)> = Vec::new();
            for (i, op) in ops.into_iter().enumerate() {
                let arc = b.create_arc(site(i), Point::default());
                if model.is_empty() {
                    b.set_root(arc);
                    model.push((arc, i));
                    continue;
                }
                match op {
                    Op::InsertBefore(j) => {
                        let j = j % model.len();
                        b.insert_before(model[j].0, arc);
                        model.insert(j, (arc, i));
                    }
                    Op::InsertAfter(j) => {
                        let j = j % model.len();
                        b.insert_after(model[j].0, arc);
                        model.insert(j + 1, (arc, i));
                    }
                    Op::Replace(j) => {
                        let j = j % model.len();
                        b.replace(model[j].0, arc);
                        b.release(model[j].0);
                        model[j] = (arc, i);
                    }
                    Op::Remove(j) => {
                        let j = j % model.len();
                        b.release(arc);
                        b.remove(model[j].0);
                        b.release(model[j].0);
                        model.remove(j);
                    }
                }
                b.check_invariants();
                prop_assert_eq!(b.len(), model.len());
                prop_assert_eq!(sites(&b), model.iter().map(|(_, s)| *s).collect::<Vec<_>>());
            }
        }

        #[test]
        fn breakpoint_is_on_both_parabolas(
            x1 in -100.0..100.0f64,
            y1 in 0.01..100.0f64,
            dx in 0.01..100.0f64,
            y2 in 0.01..100.0f64,
        ) {
            let p1 = Point::new(x1, y1);
            let p2 = Point::new(x1 + dx, y2);
            let x = breakpoint(p1, p2, 0.0);
            prop_assert!(x.is_finite());
            let h1 = parabola_y(p1, x, 0.0);
            let h2 = parabola_y(p2, x, 0.0);
            prop_assert!((h1 - h2).abs() <= 1e-6 * (1.0 + h1.abs()), "{h1} vs {h2}");
        }
    }
}
