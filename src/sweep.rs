//! Fortune's sweep-line algorithm.
//!
//! The sweep line moves from the top (large `y`) to the bottom. Above the
//! line, the diagram is already decided: it's the region above the
//! [`Beachline`]. Two kinds of events change the beachline. When the line
//! reaches a site, the site's (initially degenerate) parabola splits the arc
//! above it. When three consecutive arcs have foci on a circle whose bottom
//! the line reaches, the middle arc shrinks to nothing and leaves a vertex
//! of the diagram behind.

use std::collections::HashSet;

use crate::beachline::{breakpoint, ArcIdx, Beachline};
use crate::diagram::{Diagram, HalfEdgeIdx, Ray, SiteIdx, VertexIdx};
use crate::geom::Point;
use crate::num::CheapOrderedFloat;
use crate::priority_queue::{Handle, PriorityQueue};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq)]
enum EventKind {
    Site(SiteIdx),
    Circle { arc: ArcIdx, center: Point },
}

#[derive(Clone, Copy, Debug)]
struct Event {
    y: f64,
    x: f64,
    // Insertion order, for breaking ties.
    seq: u64,
    kind: EventKind,
}

impl Event {
    fn key(&self) -> (std::cmp::Reverse<CheapOrderedFloat>, CheapOrderedFloat, u64) {
        (
            std::cmp::Reverse(self.y.into()),
            self.x.into(),
            self.seq,
        )
    }
}

// Events come out of the queue from the top down, and left to right.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Event {}

/// Counts of what happened during a sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepStats {
    /// The number of site events processed (one per distinct input point).
    pub site_events: usize,
    /// The number of circle events processed (one per Voronoi vertex).
    pub circle_events: usize,
    /// The number of circle events that passed the validity checks and were queued.
    pub circle_events_scheduled: usize,
    /// The number of queued circle events that were cancelled before they happened.
    pub circle_events_invalidated: usize,
}

/// The output of a sweep: a diagram that still has some unbounded edges.
#[derive(Clone, Debug)]
pub struct SweepResult {
    diagram: Diagram,
    stats: SweepStats,
}

impl SweepResult {
    /// The diagram built by the sweep.
    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// Takes ownership of the diagram built by the sweep.
    pub fn into_diagram(self) -> Diagram {
        self.diagram
    }

    /// What happened during the sweep.
    pub fn stats(&self) -> SweepStats {
        self.stats
    }
}

/// Runs Fortune's algorithm on a set of points.
///
/// Repeated points are only counted once: the diagram has one site for each
/// distinct point, in order of first appearance.
pub fn build_diagram<P: Into<Point>>(
    points: impl IntoIterator<Item = P>,
) -> Result<SweepResult, Error> {
    Sweeper::new(points)?.run()
}

/// The state of the sweep, which can be advanced one event at a time.
///
/// Dropping a sweeper part-way through is fine; [`build_diagram`] is the
/// easy way to run one to completion.
#[derive(Debug)]
pub struct Sweeper {
    diagram: Diagram,
    beachline: Beachline,
    events: PriorityQueue<Event>,
    next_seq: u64,
    // The y coordinate of the last event, for inspection only.
    position: Option<f64>,
    // Upward rays that start where two sites share the topmost line.
    top_rays: Vec<Ray>,
    stats: SweepStats,
}

impl Sweeper {
    /// Prepares to sweep over `points`.
    ///
    /// Fails if any coordinate is infinite or NaN.
    pub fn new<P: Into<Point>>(points: impl IntoIterator<Item = P>) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        let mut distinct = Vec::new();
        for p in points {
            let p: Point = p.into();
            if p.x.is_nan() || p.y.is_nan() {
                return Err(Error::NaN);
            }
            if p.x.is_infinite() || p.y.is_infinite() {
                return Err(Error::Infinity);
            }
            if seen.insert((CheapOrderedFloat::from(p.x), CheapOrderedFloat::from(p.y))) {
                distinct.push(p);
            }
        }

        let diagram = Diagram::with_sites(distinct);
        let mut sweeper = Sweeper {
            events: PriorityQueue::with_capacity(2 * diagram.site_count()),
            diagram,
            beachline: Beachline::new(),
            next_seq: 0,
            position: None,
            top_rays: Vec::new(),
            stats: SweepStats::default(),
        };
        let sites: Vec<_> = sweeper.diagram.sites().map(|s| (s.index, s.point)).collect();
        for (site, point) in sites {
            sweeper.push_event(point, EventKind::Site(site));
        }
        tracing::debug!(sites = sweeper.diagram.site_count(), "starting sweep");
        Ok(sweeper)
    }

    /// The `y` coordinate of the most recently processed event.
    pub fn sweep_position(&self) -> Option<f64> {
        self.position
    }

    /// The current beachline.
    pub fn beachline(&self) -> &Beachline {
        &self.beachline
    }

    /// The diagram built so far.
    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// What has happened so far.
    pub fn stats(&self) -> SweepStats {
        self.stats
    }

    /// Are there no more events?
    pub fn is_done(&self) -> bool {
        self.events.is_empty()
    }

    /// Processes the next event, returning `false` if there wasn't one.
    pub fn step(&mut self) -> Result<bool, Error> {
        let Some(event) = self.events.pop() else {
            return Ok(false);
        };
        let sweep_y = event.y;
        self.position = Some(sweep_y);

        match event.kind {
            EventKind::Site(site) => self.handle_site_event(site, sweep_y),
            EventKind::Circle { arc, center } => {
                self.handle_circle_event(arc, center, sweep_y)?
            }
        }
        self.check_invariants();
        Ok(true)
    }

    /// Processes all the remaining events.
    pub fn run(mut self) -> Result<SweepResult, Error> {
        while self.step()? {}
        Ok(self.finish())
    }

    fn finish(mut self) -> SweepResult {
        // Whatever arcs are left are separated by breakpoints that would
        // keep moving forever.
        let mut rays = std::mem::take(&mut self.top_rays);
        let arcs: Vec<_> = self.beachline.iter().map(|(idx, _)| idx).collect();
        for pair in arcs.windows(2) {
            let (left, right) = (&self.beachline[pair[0]], &self.beachline[pair[1]]);
            rays.push(Ray {
                origin: left.focus.midpoint(right.focus),
                direction: (left.focus - right.focus).orthogonal(),
                outgoing: left
                    .right_half_edge
                    .expect("neighboring arcs share an edge"),
                incoming: right
                    .left_half_edge
                    .expect("neighboring arcs share an edge"),
            });
        }
        self.diagram.rays = rays;

        tracing::debug!(
            vertices = self.diagram.vertex_count(),
            half_edges = self.diagram.half_edge_count(),
            rays = self.diagram.rays.len(),
            "sweep finished"
        );
        SweepResult {
            diagram: self.diagram,
            stats: self.stats,
        }
    }

    fn push_event(&mut self, at: Point, kind: EventKind) -> Handle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            y: at.y,
            x: at.x,
            seq,
            kind,
        })
    }

    fn handle_site_event(&mut self, site: SiteIdx, sweep_y: f64) {
        self.stats.site_events += 1;
        let point = self.diagram.site(site).point;
        tracing::trace!(?site, ?point, "site event");

        if self.beachline.is_empty() {
            let arc = self.beachline.create_arc(site, point);
            self.beachline.set_root(arc);
            return;
        }

        let above = self.beachline.locate_arc_above(point, sweep_y);
        self.delete_event(above);

        if self.beachline[above].focus.y == sweep_y {
            self.insert_beside(above, site, point, sweep_y);
            return;
        }

        let middle = self.break_arc(above, site, point);
        let left = self.prev(middle);
        let right = self.next(middle);

        self.add_edge(left, middle);
        let middle_edge = self.beachline[middle].left_half_edge;
        self.beachline.arc_mut(middle).right_half_edge = middle_edge;
        let left_edge = self.beachline[left].right_half_edge;
        self.beachline.arc_mut(right).left_half_edge = left_edge;

        if let Some(left_left) = self.beachline.prev(left) {
            self.add_event(left_left, left, middle, sweep_y);
        }
        if let Some(right_right) = self.beachline.next(right) {
            self.add_event(middle, right, right_right, sweep_y);
        }
    }

    // The arc above the new site is still a vertical ray, because its site
    // is on the sweep line too. Rather than splitting it, we put the new arc
    // next to it; the edge between them goes straight up forever.
    fn insert_beside(&mut self, above: ArcIdx, site: SiteIdx, point: Point, sweep_y: f64) {
        let arc = self.beachline.create_arc(site, point);
        let (left, right) = if point.x < self.beachline[above].focus.x {
            self.beachline.insert_before(above, arc);
            (arc, above)
        } else {
            self.beachline.insert_after(above, arc);
            (above, arc)
        };
        // Sites on the same line are processed from left to right, so the
        // new arc always ends up on the outside.
        debug_assert!(
            self.beachline.prev(left).is_none() || self.beachline.next(right).is_none()
        );

        self.add_edge(left, right);
        let (left_focus, right_focus) = (self.beachline[left].focus, self.beachline[right].focus);
        self.top_rays.push(Ray {
            origin: left_focus.midpoint(right_focus),
            direction: Point::new(0.0, 1.0),
            incoming: self.beachline[left]
                .right_half_edge
                .expect("we just added this edge"),
            outgoing: self.beachline[right]
                .left_half_edge
                .expect("we just added this edge"),
        });

        if let Some(left_left) = self.beachline.prev(left) {
            self.add_event(left_left, left, right, sweep_y);
        }
        if let Some(right_right) = self.beachline.next(right) {
            self.add_event(left, right, right_right, sweep_y);
        }
    }

    fn handle_circle_event(
        &mut self,
        arc: ArcIdx,
        center: Point,
        sweep_y: f64,
    ) -> Result<(), Error> {
        self.stats.circle_events += 1;
        tracing::trace!(?arc, ?center, "circle event");

        // This is the event we just popped.
        self.beachline.arc_mut(arc).event = None;
        if !center.is_finite() {
            return Err(Error::NumericDegeneracy);
        }

        let vertex = self.diagram.create_vertex(center);
        let left = self.prev(arc);
        let right = self.next(arc);
        self.delete_event(left);
        self.delete_event(right);

        self.remove_arc(arc, left, right, vertex);

        if let Some(left_left) = self.beachline.prev(left) {
            self.add_event(left_left, left, right, sweep_y);
        }
        if let Some(right_right) = self.beachline.next(right) {
            self.add_event(left, right, right_right, sweep_y);
        }
        Ok(())
    }

    // Replaces `arc` by three arcs: two pieces of it, with an arc for the new
    // site in the middle. Returns the middle arc.
    fn break_arc(&mut self, arc: ArcIdx, site: SiteIdx, point: Point) -> ArcIdx {
        let old = &self.beachline[arc];
        let (old_site, old_focus) = (old.site, old.focus);
        let (old_left_edge, old_right_edge) = (old.left_half_edge, old.right_half_edge);

        let middle = self.beachline.create_arc(site, point);
        let left = self.beachline.create_arc(old_site, old_focus);
        self.beachline.arc_mut(left).left_half_edge = old_left_edge;
        let right = self.beachline.create_arc(old_site, old_focus);
        self.beachline.arc_mut(right).right_half_edge = old_right_edge;

        self.beachline.replace(arc, middle);
        self.beachline.insert_before(middle, left);
        self.beachline.insert_after(middle, right);
        self.beachline.release(arc);
        middle
    }

    fn remove_arc(&mut self, arc: ArcIdx, left: ArcIdx, right: ArcIdx, vertex: VertexIdx) {
        // The two edges bounding the arc end here...
        self.set_destination(left, arc, vertex);
        self.set_destination(arc, right, vertex);
        // ...and they are consecutive around the arc's face.
        let arc_left_edge = self.left_edge(arc);
        let arc_right_edge = self.right_edge(arc);
        self.diagram.link_half_edges(arc_left_edge, arc_right_edge);

        self.beachline.remove(arc);
        self.beachline.release(arc);

        // A new edge starts here, between the arcs that are now neighbors.
        self.start_edge(left, right, vertex);
    }

    // Adds the edge between the neighbors `left` and `right`, starting at
    // `vertex`, and links it to the edges that just ended there.
    fn start_edge(&mut self, left: ArcIdx, right: ArcIdx, vertex: VertexIdx) {
        let prev_edge = self.right_edge(left);
        let next_edge = self.left_edge(right);
        self.add_edge(left, right);
        self.set_origin(left, right, vertex);
        let new_left_edge = self.right_edge(left);
        let new_right_edge = self.left_edge(right);
        self.diagram.link_half_edges(new_left_edge, prev_edge);
        self.diagram.link_half_edges(next_edge, new_right_edge);
    }

    // Schedules the circle event of `middle`, if its neighbors will ever squeeze it out.
    fn add_event(&mut self, left: ArcIdx, middle: ArcIdx, right: ArcIdx, sweep_y: f64) {
        let p1 = self.beachline[left].focus;
        let p2 = self.beachline[middle].focus;
        let p3 = self.beachline[right].focus;

        let Some((center, y)) = convergence_point(p1, p2, p3) else {
            tracing::trace!(?middle, "no circle event: foci are collinear");
            return;
        };

        // Rounding can put the bottom of a circle through a vertex we just
        // created a hair above that vertex, so allow a relative slop.
        let slop = 1e-9 * sweep_y.abs().max(1.0);
        let is_below = y <= sweep_y + slop;

        // A breakpoint moves right if the arc on its left has the lower
        // focus. It started out at the x coordinate of whichever focus came
        // second, and it has to be moving towards the center.
        let converges = |a: Point, b: Point| {
            if a.y < b.y {
                a.x < center.x
            } else {
                b.x > center.x
            }
        };
        let is_valid = converges(p1, p2) && converges(p2, p3);

        // A site right under a breakpoint splits the arc above it into a
        // piece with no width, whose neighbors already meet. Its breakpoints
        // don't move towards the center because they're already there.
        let is_squeezed = p2.y > sweep_y && y >= sweep_y - slop && {
            let lo = breakpoint(p1, p2, sweep_y);
            let hi = breakpoint(p2, p3, sweep_y);
            hi - lo <= 1e-9 * lo.abs().max(1.0)
        };

        if !(is_below && (is_valid || is_squeezed)) {
            tracing::trace!(?middle, ?center, y, is_below, is_valid, "rejected circle event");
            return;
        }

        // Events accepted by the slop happen now, so the sweep never moves back up.
        let at = Point::new(center.x, y.min(sweep_y));
        let handle = self.push_event(at, EventKind::Circle { arc: middle, center });
        self.beachline.arc_mut(middle).event = Some(handle);
        self.stats.circle_events_scheduled += 1;
    }

    fn delete_event(&mut self, arc: ArcIdx) {
        if let Some(handle) = self.beachline.arc_mut(arc).event.take() {
            self.events.remove(handle);
            self.stats.circle_events_invalidated += 1;
        }
    }

    fn prev(&self, arc: ArcIdx) -> ArcIdx {
        self.beachline
            .prev(arc)
            .unwrap_or_else(|| panic!("{arc:?} should have a left neighbor"))
    }

    fn next(&self, arc: ArcIdx) -> ArcIdx {
        self.beachline
            .next(arc)
            .unwrap_or_else(|| panic!("{arc:?} should have a right neighbor"))
    }

    // The edge traced by the breakpoint on `arc`'s left. Only the leftmost
    // arc lacks one.
    fn left_edge(&self, arc: ArcIdx) -> HalfEdgeIdx {
        self.beachline[arc]
            .left_half_edge
            .unwrap_or_else(|| panic!("{arc:?} should have a left edge"))
    }

    fn right_edge(&self, arc: ArcIdx) -> HalfEdgeIdx {
        self.beachline[arc]
            .right_half_edge
            .unwrap_or_else(|| panic!("{arc:?} should have a right edge"))
    }

    fn add_edge(&mut self, left: ArcIdx, right: ArcIdx) {
        let left_face = self.diagram.site(self.beachline[left].site).face;
        let right_face = self.diagram.site(self.beachline[right].site).face;
        let (a, b) = self.diagram.create_twins(left_face, right_face);
        self.beachline.arc_mut(left).right_half_edge = Some(a);
        self.beachline.arc_mut(right).left_half_edge = Some(b);
    }

    // The edge between `left` and `right` starts at `vertex`, as the breakpoint moves away from it.
    fn set_origin(&mut self, left: ArcIdx, right: ArcIdx, vertex: VertexIdx) {
        let a = self.right_edge(left);
        let b = self.left_edge(right);
        self.diagram.he_mut(a).destination = Some(vertex);
        self.diagram.he_mut(b).origin = Some(vertex);
    }

    // The edge between `left` and `right` ends at `vertex`, where the breakpoint stops.
    fn set_destination(&mut self, left: ArcIdx, right: ArcIdx, vertex: VertexIdx) {
        let a = self.right_edge(left);
        let b = self.left_edge(right);
        self.diagram.he_mut(a).origin = Some(vertex);
        self.diagram.he_mut(b).destination = Some(vertex);
    }

    /// Checks that the beachline and the event queue agree with each other.
    ///
    /// This is slow, and only does anything if the `slow-asserts` feature is enabled (or in tests).
    #[cfg(any(test, feature = "slow-asserts"))]
    pub fn check_invariants(&self) {
        self.beachline.check_invariants();
        self.events.check_invariants();

        let mut circle_events = 0;
        for (idx, arc) in self.beachline.iter() {
            if let Some(handle) = arc.event {
                circle_events += 1;
                let event = self
                    .events
                    .get(handle)
                    .unwrap_or_else(|| panic!("{idx:?} has a stale event"));
                assert!(
                    matches!(event.kind, EventKind::Circle { arc, .. } if arc == idx),
                    "{idx:?} points at someone else's event"
                );
            }
        }
        let site_events = self.diagram.site_count() - self.stats.site_events;
        assert_eq!(circle_events + site_events, self.events.len());
    }

    /// Checks that the beachline and the event queue agree with each other.
    ///
    /// This is slow, and only does anything if the `slow-asserts` feature is enabled (or in tests).
    #[cfg(not(any(test, feature = "slow-asserts")))]
    pub fn check_invariants(&self) {}
}

/// Finds the center of the circle through three points, and the `y` coordinate of its bottom.
///
/// Returns `None` if the points are collinear (or so close to it that the
/// center can't be represented).
fn convergence_point(p1: Point, p2: Point, p3: Point) -> Option<(Point, f64)> {
    let v1 = (p1 - p2).orthogonal();
    let v2 = (p2 - p3).orthogonal();
    let delta = 0.5 * (p3 - p1);
    let denom = v1.det(v2);
    if denom == 0.0 {
        return None;
    }
    let t = delta.det(v2) / denom;
    let center = 0.5 * (p1 + p2) + t * v1;
    let y = center.y - center.distance(p1);
    (center.is_finite() && y.is_finite()).then_some((center, y))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;
    use crate::beachline::parabola_y;
    use crate::num::tests::Reasonable;

    fn close(p: Point, q: Point) -> bool {
        p.distance(q) < 1e-9
    }

    #[test]
    fn circumcircle() {
        let (center, y) =
            convergence_point(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.5, 1.0))
                .unwrap();
        assert!(close(center, Point::new(0.5, 0.375)));
        assert!((y - (0.375 - 0.625)).abs() < 1e-12);

        assert!(convergence_point(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0)
        )
        .is_none());
    }

    #[test]
    fn event_order() {
        let mut q = PriorityQueue::new();
        let ev = |x: f64, y: f64, seq: u64| Event {
            x,
            y,
            seq,
            kind: EventKind::Site(SiteIdx(seq as usize)),
        };
        q.push(ev(0.0, 0.0, 0));
        q.push(ev(1.0, 5.0, 1));
        q.push(ev(-1.0, 5.0, 2));
        q.push(ev(-1.0, 5.0, 3));
        let order: Vec<_> = std::iter::from_fn(|| q.pop()).map(|e| e.seq).collect();
        assert_eq!(order, vec![2, 3, 1, 0]);
    }

    #[test]
    fn triangle() {
        let result = build_diagram([(0.0, 0.0), (1.0, 0.0), (0.5, 1.0)]).unwrap();
        assert_eq!(result.stats().circle_events, 1);
        let d = result.diagram();
        assert_eq!(d.site_count(), 3);
        assert_eq!(d.vertex_count(), 1);
        let (v, vertex) = d.vertices().next().unwrap();
        assert!(close(vertex.point, Point::new(0.5, 0.375)));

        // Three edges meet at the vertex, and every face touches it.
        assert_eq!(d.half_edge_count(), 6);
        for (_, face) in d.faces() {
            assert!(face.outer_component.is_some());
        }
        let mut faces_at_vertex: Vec<_> = d
            .half_edges()
            .filter(|(_, he)| he.origin == Some(v))
            .map(|(_, he)| he.incident_face)
            .collect();
        faces_at_vertex.sort();
        faces_at_vertex.dedup();
        assert_eq!(faces_at_vertex.len(), 3);
        d.check_invariants();
    }

    #[test]
    fn two_sites() {
        let result = build_diagram([(0.0, 0.0), (1.0, 0.0)]).unwrap();
        assert_eq!(result.stats().circle_events, 0);
        assert_eq!(result.stats().circle_events_scheduled, 0);
        let d = result.diagram();
        assert_eq!(d.site_count(), 2);
        assert_eq!(d.vertex_count(), 0);
        assert_eq!(d.half_edge_count(), 2);
        let (a, he) = d.half_edges().next().unwrap();
        assert_eq!(d.half_edge(he.twin.unwrap()).unwrap().twin, Some(a));
        // One ray up and one ray down.
        assert_eq!(d.rays.len(), 2);
        d.check_invariants();
    }

    #[test]
    fn one_site() {
        let d = build_diagram([(3.0, 4.0)]).unwrap().into_diagram();
        assert_eq!(d.site_count(), 1);
        assert_eq!(d.vertex_count(), 0);
        assert_eq!(d.half_edge_count(), 0);
        assert!(d.rays.is_empty());
    }

    #[test]
    fn no_sites() {
        let d = build_diagram(Vec::<Point>::new()).unwrap().into_diagram();
        assert_eq!(d.site_count(), 0);
        assert_eq!(d.vertex_count(), 0);
    }

    #[test]
    fn duplicates() {
        let d = build_diagram([(0.0, 0.0), (1.0, 2.0), (0.0, 0.0), (1.0, 2.0)])
            .unwrap()
            .into_diagram();
        assert_eq!(d.site_count(), 2);
        let points: Vec<_> = d.sites().map(|s| s.point).collect();
        assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(1.0, 2.0)]);
    }

    #[test]
    fn bad_input() {
        assert_matches!(build_diagram([(0.0, f64::NAN)]), Err(Error::NaN));
        assert_matches!(
            build_diagram([(0.0, 0.0), (f64::NEG_INFINITY, 1.0)]),
            Err(Error::Infinity)
        );
    }

    #[test]
    fn top_line() {
        // Three sites on the first line, then one below.
        let result = build_diagram([(0.0, 1.0), (2.0, 1.0), (1.0, 1.0), (1.0, -1.0)]).unwrap();
        let d = result.diagram();
        assert_eq!(d.site_count(), 4);
        // The bottom site cuts off the middle site's cell, which is the strip 0.5 <= x <= 1.5.
        assert_eq!(result.stats().circle_events, 2);
        let mut vertices: Vec<_> = d.vertices().map(|(_, v)| v.point).collect();
        vertices.sort_by(|p, q| p.x.total_cmp(&q.x));
        assert!(close(vertices[0], Point::new(0.5, 0.0)));
        assert!(close(vertices[1], Point::new(1.5, 0.0)));
        // Two edges go straight up.
        assert_eq!(
            d.rays.iter().filter(|r| r.direction == Point::new(0.0, 1.0)).count(),
            2
        );
        d.check_invariants();
    }

    #[test]
    fn circle_events_beside_the_end_arcs() {
        // The first two circle events each have an end of the beachline as a neighbor.
        let result = build_diagram([(0.0, 0.0), (10.0, 0.0), (5.0, 10.0), (5.0, 3.0)]).unwrap();
        assert_eq!(result.stats().circle_events, 3);
        let d = result.diagram();
        let mut vertices: Vec<_> = d.vertices().map(|(_, v)| v.point).collect();
        vertices.sort_by(|p, q| p.x.total_cmp(&q.x));
        assert!(close(vertices[0], Point::new(-0.5, 6.5)));
        assert!(close(vertices[1], Point::new(5.0, -8.0 / 3.0)));
        assert!(close(vertices[2], Point::new(10.5, 6.5)));
        d.check_invariants();
    }

    #[test]
    fn site_under_a_breakpoint() {
        // The bottom site is exactly below the vertical edge between the top two.
        let result = build_diagram([(-0.5, 1.0), (0.5, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(result.stats().circle_events, 1);
        let d = result.diagram();
        let (_, v) = d.vertices().next().unwrap();
        assert!(close(v.point, Point::new(0.0, 0.625)));
        // One ray up and two going down.
        assert_eq!(d.rays.len(), 3);
        d.check_invariants();
    }

    #[test]
    fn kite() {
        // The bottom site lands on the breakpoint between the middle two, just
        // as their edge reaches its lower end.
        let result = build_diagram([(0.0, 3.0), (-1.0, 1.0), (1.0, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(result.stats().circle_events, 2);
        let d = result.diagram();
        let mut vertices: Vec<_> = d.vertices().map(|(_, v)| v.point).collect();
        vertices.sort_by(|p, q| p.y.total_cmp(&q.y));
        assert!(close(vertices[0], Point::new(0.0, 1.0)));
        assert!(close(vertices[1], Point::new(0.0, 1.75)));
        assert_eq!(d.rays.len(), 4);
        d.check_invariants();
    }

    #[test]
    fn square_corners() {
        // All four sites are on one circle, so the two vertices coincide.
        let result =
            build_diagram([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]).unwrap();
        let d = result.diagram();
        assert!((1..=2).contains(&d.vertex_count()));
        for (_, v) in d.vertices() {
            assert!(close(v.point, Point::new(0.5, 0.5)));
        }
        d.check_invariants();
    }

    #[test]
    fn stepping() {
        let mut sweeper = Sweeper::new([(0.0, 0.0), (1.0, 0.0), (0.5, 1.0)]).unwrap();
        assert_eq!(sweeper.sweep_position(), None);
        assert!(sweeper.step().unwrap());
        assert_eq!(sweeper.sweep_position(), Some(1.0));
        assert_eq!(sweeper.beachline().len(), 1);
        assert!(sweeper.step().unwrap());
        assert_eq!(sweeper.beachline().len(), 3);
        assert!(sweeper.step().unwrap());
        assert_eq!(sweeper.beachline().len(), 5);
        assert!(sweeper.step().unwrap());
        assert_eq!(sweeper.beachline().len(), 4);
        assert!(!sweeper.step().unwrap());
        assert!(sweeper.is_done());
        assert_eq!(sweeper.stats().site_events, 3);
    }

    #[test]
    fn drop_midway() {
        let mut sweeper = Sweeper::new((0..20).map(|i| {
            let i = i as f64;
            (i.cos() * i, i.sin() * i)
        }))
        .unwrap();
        for _ in 0..10 {
            sweeper.step().unwrap();
        }
        drop(sweeper);
    }

    // Checks that every arc is the lowest parabola over the middle of its
    // extent, compared against every site the sweep line has passed.
    fn check_lower_envelope(sweeper: &Sweeper, sites: &[Point]) {
        let Some(l) = sweeper.sweep_position() else {
            return;
        };
        let passed: Vec<_> = sites.iter().copied().filter(|p| p.y > l + 1e-6).collect();
        let beachline = sweeper.beachline();
        for (idx, arc) in beachline.iter() {
            if arc.focus().y <= l + 1e-6 {
                continue;
            }
            let lo = beachline
                .prev(idx)
                .map_or(f64::NEG_INFINITY, |p| breakpoint(beachline[p].focus(), arc.focus(), l));
            let hi = beachline
                .next(idx)
                .map_or(f64::INFINITY, |n| breakpoint(arc.focus(), beachline[n].focus(), l));
            let x = match (lo.is_finite(), hi.is_finite()) {
                (true, true) if hi - lo > 1e-3 => 0.5 * (lo + hi),
                (true, true) => continue,
                (true, false) => lo + 1.0,
                (false, true) => hi - 1.0,
                (false, false) => arc.focus().x,
            };
            let height = parabola_y(arc.focus(), x, l);
            let lowest = passed
                .iter()
                .map(|&p| parabola_y(p, x, l))
                .fold(f64::INFINITY, f64::min);
            assert!(
                height <= lowest + 1e-6 * (1.0 + lowest.abs()),
                "{idx:?} at x = {x} is at {height}, but the envelope is at {lowest}"
            );
        }
    }

    proptest! {
        #[test]
        fn beachline_is_the_lower_envelope(
            sites in prop::collection::vec(Point::reasonable(), 1..30)
        ) {
            let mut sweeper = Sweeper::new(sites.iter().copied()).unwrap();
            while sweeper.step().unwrap() {
                check_lower_envelope(&sweeper, &sites);
            }
        }

        #[test]
        fn every_vertex_is_equidistant(
            sites in prop::collection::vec(Point::reasonable(), 3..30)
        ) {
            let result = build_diagram(sites.iter().copied()).unwrap();
            let d = result.diagram();
            d.check_invariants();
            prop_assert_eq!(result.stats().circle_events, d.vertex_count());

            // Each vertex is closer to the sites of its faces than to any other site.
            for (idx, he) in d.half_edges() {
                let Some(v) = he.origin else { continue };
                let p = d.vertex(v).unwrap().point;
                let own = d.site(d.face(he.incident_face).site).point.distance(p);
                let nearest = d
                    .sites()
                    .map(|s| s.point.distance(p))
                    .fold(f64::INFINITY, f64::min);
                prop_assert!(
                    own <= nearest + 1e-6 * (1.0 + own),
                    "{:?} starts at {:?}, {} from its site but {} from the nearest", idx, p, own, nearest
                );
            }
        }
    }
}
