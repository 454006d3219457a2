//! Closing off the unbounded cells of a diagram with a box.
//!
//! After the sweep, the edges separating neighboring cells on the outside of
//! the diagram are rays that go on forever. Bounding cuts every ray where it
//! leaves a box, and walks around the inside of the box to close each cell.

use std::collections::HashSet;

use crate::diagram::{Diagram, FaceIdx, FaceVec, HalfEdgeIdx, SiteIdx, VertexIdx};
use crate::geom::{BoundingBox, Side};

/// How [`Diagram::bound_to_with`] treats the box it's given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub enum BoundMode {
    /// Grow the box until it contains every site and every vertex, and then
    /// cut the rays against it. Nothing in the diagram is removed.
    #[default]
    Expand,
    /// Cut the whole diagram to exactly the given box, removing everything outside it.
    ///
    /// Cells that don't meet the box end up with no boundary at all.
    Clip,
}

/// The diagram couldn't be bounded.
///
/// Apart from [`ClipError::AlreadyBounded`], these indicate that numerical
/// trouble in the sweep produced a diagram with inconsistent topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipError {
    /// The diagram was bounded before, and it can only be bounded once.
    AlreadyBounded,
    /// A cell's boundary reaches a side of the box without also leaving it (or the other way around).
    UnpairedCrossings {
        /// The site whose cell is broken.
        site: SiteIdx,
        /// The side with the unmatched crossing.
        side: Side,
        /// The total number of times the cell's unbounded edges meet the box.
        count: usize,
    },
    /// A cell's edges cross the boundary of the box a number of times that no convex cell could.
    UnexpectedCrossings {
        /// The site whose cell is broken.
        site: SiteIdx,
        /// The number of crossings.
        count: usize,
    },
    /// A cell's boundary doesn't come back to where it started.
    OpenCycle {
        /// The site whose cell is broken.
        site: SiteIdx,
    },
}

impl std::fmt::Display for ClipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipError::AlreadyBounded => write!(f, "the diagram has already been bounded"),
            ClipError::UnpairedCrossings { site, side, count } => write!(
                f,
                "the cell of {site} has an unpaired crossing on the {side:?} side ({count} crossings in total)"
            ),
            ClipError::UnexpectedCrossings { site, count } => {
                write!(f, "the cell of {site} crosses the box {count} times")
            }
            ClipError::OpenCycle { site } => {
                write!(f, "the boundary of the cell of {site} isn't closed")
            }
        }
    }
}

impl std::error::Error for ClipError {}

// A vertex on the boundary of the box, seen from one cell: the half-edge
// that arrives there and the half-edge that leaves from there. Box vertices
// start out with only one of them and get the other when the box side is
// filled in.
#[derive(Clone, Copy, Debug)]
struct LinkedVertex {
    prev: Option<HalfEdgeIdx>,
    vertex: VertexIdx,
    next: Option<HalfEdgeIdx>,
}

// Where one cell's boundary runs along each side of the box: it arrives on
// the side at one linked vertex and leaves at another (walking
// counter-clockwise). These are indices into a list of `LinkedVertex`es.
#[derive(Clone, Copy, Debug, Default)]
struct SideSlots {
    arrive: [Option<usize>; 4],
    leave: [Option<usize>; 4],
}

// The box corners that have been added to the diagram so far, indexed by
// the side that starts at them.
type Corners = [Option<VertexIdx>; 4];

impl Diagram {
    /// Closes every cell of the diagram with a box, growing the box if
    /// necessary. This is the same as `bound_to_with(bbox, BoundMode::Expand)`.
    pub fn bound_to(&mut self, bbox: BoundingBox) -> Result<(), ClipError> {
        self.bound_to_with(bbox, BoundMode::default())
    }

    /// Closes every cell of the diagram with a box.
    ///
    /// Afterwards, every non-empty cell has a closed boundary and every
    /// half-edge has both endpoints. A diagram can only be bounded once.
    pub fn bound_to_with(&mut self, bbox: BoundingBox, mode: BoundMode) -> Result<(), ClipError> {
        if self.bounded {
            return Err(ClipError::AlreadyBounded);
        }
        tracing::debug!(?bbox, ?mode, rays = self.rays.len(), "bounding diagram");
        self.bounded = true;

        let result = match mode {
            BoundMode::Expand => self.close_rays(bbox, &mut [None; 4]).map(|_| ()),
            BoundMode::Clip => self.clip(bbox),
        }
        .and_then(|()| self.check_cycles());

        match &result {
            Ok(()) => tracing::debug!(
                vertices = self.vertex_count(),
                half_edges = self.half_edge_count(),
                "bounded diagram"
            ),
            Err(e) => {
                tracing::warn!(%e, "failed to bound diagram");
                #[cfg(feature = "debug-svg")]
                if let Err(e) = svg::save("bound-failure.svg", &self.dump_svg()) {
                    tracing::warn!(%e, "failed to save debug output");
                }
            }
        }
        result
    }

    // The smallest box containing `bbox`, every site and every vertex.
    fn expanded_box(&self, bbox: BoundingBox) -> BoundingBox {
        let sites = self.sites().map(|s| s.point);
        let vertices = self.vertices().map(|(_, v)| v.point);
        sites.chain(vertices).fold(bbox, |b, p| b.including(p))
    }

    fn per_face<T: Default>(&self) -> FaceVec<T> {
        let mut ret = FaceVec::with_capacity(self.faces.len());
        for _ in self.faces.indices() {
            ret.push(T::default());
        }
        ret
    }

    fn corner_vertex(&mut self, bbox: BoundingBox, side: Side, corners: &mut Corners) -> VertexIdx {
        *corners[side.index()].get_or_insert_with(|| self.create_vertex(bbox.corner(side)))
    }

    // Gives `face` the whole box as its boundary.
    fn fill_box(&mut self, face: FaceIdx, bbox: BoundingBox, corners: &mut Corners) {
        let mut edges = Vec::with_capacity(4);
        for side in Side::ALL {
            let origin = self.corner_vertex(bbox, side, corners);
            let destination = self.corner_vertex(bbox, side.next(), corners);
            let he = self.create_half_edge(face);
            self.he_mut(he).origin = Some(origin);
            self.he_mut(he).destination = Some(destination);
            edges.push(he);
        }
        for i in 0..4 {
            self.link_half_edges(edges[i], edges[(i + 1) % 4]);
        }
        self.faces[face].outer_component = Some(edges[0]);
    }

    // Cuts every ray where it leaves the (grown) box and runs new half-edges
    // along the box to close the cells. Returns the box that was used.
    fn close_rays(
        &mut self,
        bbox: BoundingBox,
        corners: &mut Corners,
    ) -> Result<BoundingBox, ClipError> {
        let bbox = self.expanded_box(bbox);
        let rays = std::mem::take(&mut self.rays);
        if rays.is_empty() {
            // With two or more sites there are always rays, so the only
            // interesting case here is a single cell covering everything.
            if self.site_count() == 1 {
                let face = self.site(SiteIdx(0)).face;
                self.fill_box(face, bbox, corners);
            }
            return Ok(bbox);
        }

        // Unbounded edges come in pairs around each cell: one going out to
        // the box and one coming back in. Most unbounded cells have one pair,
        // but when all the sites are collinear the cells are strips with two.
        let mut counts: FaceVec<usize> = self.per_face();
        for ray in &rays {
            counts[self.he(ray.incoming).incident_face] += 1;
            counts[self.he(ray.outgoing).incident_face] += 1;
        }
        for (face, &count) in counts.iter() {
            if count % 2 != 0 {
                return Err(ClipError::UnexpectedCrossings {
                    site: self.faces[face].site,
                    count,
                });
            }
        }

        let mut linked = Vec::with_capacity(2 * rays.len());
        let mut slots: FaceVec<SideSlots> = self.per_face();
        for ray in &rays {
            let hit = bbox.first_intersection(ray.origin, ray.direction);
            let vertex = self.create_vertex(hit.point);
            self.he_mut(ray.incoming).destination = Some(vertex);
            self.he_mut(ray.outgoing).origin = Some(vertex);

            let side = hit.side.index();
            let in_face = self.he(ray.incoming).incident_face;
            let out_face = self.he(ray.outgoing).incident_face;
            for (face, taken) in [
                (in_face, slots[in_face].arrive[side]),
                (out_face, slots[out_face].leave[side]),
            ] {
                if taken.is_some() {
                    return Err(ClipError::UnexpectedCrossings {
                        site: self.faces[face].site,
                        count: counts[face],
                    });
                }
            }

            linked.push(LinkedVertex {
                prev: Some(ray.incoming),
                vertex,
                next: None,
            });
            slots[in_face].arrive[side] = Some(linked.len() - 1);
            linked.push(LinkedVertex {
                prev: None,
                vertex,
                next: Some(ray.outgoing),
            });
            slots[out_face].leave[side] = Some(linked.len() - 1);
        }

        // If a cell arrives on a side but doesn't leave it, it continues
        // around the corner to the next side, and vice versa. Two laps around
        // the box are enough to reach every side from both ends.
        for face in slots.indices() {
            if counts[face] == 0 {
                continue;
            }
            for i in 0..8 {
                let side = Side::ALL[i % 4];
                let s = &slots[face];
                let (corner_side, arrive_side, leave_side) =
                    match (s.arrive[side.index()], s.leave[side.index()]) {
                        (None, Some(_)) => (side, side, side.prev()),
                        (Some(_), None) => (side.next(), side.next(), side),
                        _ => continue,
                    };
                let vertex = self.corner_vertex(bbox, corner_side, corners);
                linked.push(LinkedVertex {
                    prev: None,
                    vertex,
                    next: None,
                });
                let idx = Some(linked.len() - 1);
                slots[face].arrive[arrive_side.index()] = idx;
                slots[face].leave[leave_side.index()] = idx;
            }
        }

        for face in slots.indices() {
            for side in Side::ALL {
                let s = slots[face];
                match (s.arrive[side.index()], s.leave[side.index()]) {
                    (None, None) => {}
                    (Some(arrive), Some(leave)) => {
                        let he = self.create_half_edge(face);
                        self.he_mut(he).origin = Some(linked[arrive].vertex);
                        self.he_mut(he).destination = Some(linked[leave].vertex);

                        linked[arrive].next = Some(he);
                        if let Some(prev) = linked[arrive].prev {
                            self.link_half_edges(prev, he);
                        }
                        linked[leave].prev = Some(he);
                        if let Some(next) = linked[leave].next {
                            self.link_half_edges(he, next);
                        }
                    }
                    _ => {
                        return Err(ClipError::UnpairedCrossings {
                            site: self.faces[face].site,
                            side,
                            count: counts[face],
                        });
                    }
                }
            }
        }

        Ok(bbox)
    }

    fn clip(&mut self, bbox: BoundingBox) -> Result<(), ClipError> {
        // First close everything off in a box that's strictly bigger than
        // anything we care about, so that there's something to clip.
        let grown = self.expanded_box(bbox);
        let margin = 0.1 * grown.width().max(grown.height()).max(1.0);
        self.close_rays(grown.padded(margin), &mut [None; 4])?;
        self.check_cycles()?;
        self.intersect(bbox)
    }

    // Removes everything outside `bbox`, walking around each cell and
    // replacing the parts that leave the box with pieces of the box boundary.
    fn intersect(&mut self, bbox: BoundingBox) -> Result<(), ClipError> {
        let mut corners = [None; 4];
        // Half-edges that have already been cut, so that their twins can share their new endpoints.
        let mut processed = HashSet::new();
        let mut outside = HashSet::new();

        for face in self.faces.indices() {
            let Some(start) = self.faces[face].outer_component else {
                continue;
            };
            let site = self.faces[face].site;
            let open = ClipError::OpenCycle { site };

            let mut he = start;
            let mut inside = bbox.contains(self.point(self.he(he).origin.ok_or(open)?));
            let start_inside = inside;
            // The first half-edge that comes into the box, and the most recent one that left it.
            let mut first_in: Option<(HalfEdgeIdx, Side)> = None;
            let mut last_out: Option<(HalfEdgeIdx, Side)> = None;

            loop {
                let edge = self.he(he);
                let (Some(origin), Some(destination), Some(next)) =
                    (edge.origin, edge.destination, edge.next)
                else {
                    return Err(open);
                };
                let cut_twin = edge.twin.filter(|t| processed.contains(t));
                let (p0, p1) = (self.point(origin), self.point(destination));
                let next_inside = bbox.contains(p1);
                let crossings = bbox.segment_intersections(p0, p1);

                match (inside, next_inside) {
                    (true, true) => {}
                    (false, false) if crossings.len() < 2 => {
                        outside.insert(origin);
                        self.remove_half_edge(he);
                    }
                    (false, false) => {
                        outside.insert(origin);
                        let (entry, exit) = (crossings[0], crossings[1]);
                        let (new_origin, new_destination) = match cut_twin {
                            Some(t) => (self.he(t).destination, self.he(t).origin),
                            None => (
                                Some(self.create_vertex(entry.point)),
                                Some(self.create_vertex(exit.point)),
                            ),
                        };
                        self.he_mut(he).origin = new_origin;
                        self.he_mut(he).destination = new_destination;
                        if let Some((out, out_side)) = last_out {
                            self.link_along_box(bbox, &mut corners, out, out_side, he, entry.side);
                        }
                        first_in.get_or_insert((he, entry.side));
                        last_out = Some((he, exit.side));
                        processed.insert(he);
                    }
                    (true, false) => {
                        let exit = *crossings.last().ok_or(ClipError::UnexpectedCrossings {
                            site,
                            count: 0,
                        })?;
                        let new_destination = match cut_twin {
                            Some(t) => self.he(t).origin,
                            None => Some(self.create_vertex(exit.point)),
                        };
                        self.he_mut(he).destination = new_destination;
                        last_out = Some((he, exit.side));
                        processed.insert(he);
                    }
                    (false, true) => {
                        outside.insert(origin);
                        let entry = *crossings.first().ok_or(ClipError::UnexpectedCrossings {
                            site,
                            count: 0,
                        })?;
                        let new_origin = match cut_twin {
                            Some(t) => self.he(t).destination,
                            None => Some(self.create_vertex(entry.point)),
                        };
                        self.he_mut(he).origin = new_origin;
                        if let Some((out, out_side)) = last_out {
                            self.link_along_box(bbox, &mut corners, out, out_side, he, entry.side);
                        }
                        first_in.get_or_insert((he, entry.side));
                        processed.insert(he);
                    }
                }

                he = next;
                inside = next_inside;
                if he == start {
                    break;
                }
            }

            if !start_inside {
                match (last_out, first_in) {
                    (Some((out, out_side)), Some((first, first_side))) => {
                        self.link_along_box(bbox, &mut corners, out, out_side, first, first_side);
                    }
                    (None, None) => {}
                    _ => return Err(ClipError::UnexpectedCrossings { site, count: 1 }),
                }
                self.faces[face].outer_component = first_in.map(|(he, _)| he);
            }
        }

        for v in outside {
            self.remove_vertex(v);
        }

        // If nothing crosses the box, it's either completely inside one cell
        // or there are no cells.
        if self.faces().all(|(_, f)| f.outer_component.is_none()) {
            let center = bbox.corner(Side::Left).midpoint(bbox.corner(Side::Right));
            let nearest = self
                .sites()
                .min_by(|a, b| a.point.distance(center).total_cmp(&b.point.distance(center)))
                .map(|s| s.face);
            if let Some(face) = nearest {
                self.fill_box(face, bbox, &mut corners);
            }
        }
        Ok(())
    }

    // Adds half-edges along the box from where `start` leaves it to where
    // `end` comes back in, going counter-clockwise around the corners in
    // between.
    fn link_along_box(
        &mut self,
        bbox: BoundingBox,
        corners: &mut Corners,
        start: HalfEdgeIdx,
        start_side: Side,
        end: HalfEdgeIdx,
        end_side: Side,
    ) {
        let face = self.he(start).incident_face;
        let from = self.he(start).destination.expect("cut edges have both ends");
        let to = self.he(end).origin.expect("cut edges have both ends");
        let steps = if start_side == end_side {
            // Coming back in behind the exit means going all the way around.
            let from = BoundingBox::position_along(start_side, self.point(from));
            let to = BoundingBox::position_along(start_side, self.point(to));
            if to < from {
                4
            } else {
                0
            }
        } else {
            (end_side.index() + 4 - start_side.index()) % 4
        };

        let mut current = start;
        let mut side = start_side;
        for _ in 0..steps {
            side = side.next();
            let corner = self.corner_vertex(bbox, side, corners);
            let he = self.create_half_edge(face);
            self.he_mut(he).origin = self.he(current).destination;
            self.he_mut(he).destination = Some(corner);
            self.link_half_edges(current, he);
            current = he;
        }

        let he = self.create_half_edge(face);
        self.he_mut(he).origin = self.he(current).destination;
        self.he_mut(he).destination = Some(to);
        self.link_half_edges(current, he);
        self.link_half_edges(he, end);
    }

    fn check_cycles(&self) -> Result<(), ClipError> {
        for (face, f) in self.faces() {
            if f.outer_component.is_some() && self.cell_polygon(face).is_none() {
                return Err(ClipError::OpenCycle { site: f.site });
            }
        }
        Ok(())
    }
}
