//! The Voronoi diagram, stored as a doubly-connected edge list.
//!
//! All the parts of the diagram live in arenas owned by the [`Diagram`] and
//! refer to one another by index. Vertices and half-edges can be removed
//! (this happens when clipping to a box); a removed element leaves a
//! tombstone in its slot, so the indices of everything else stay valid.

use crate::geom::Point;

/// The index of a [`Site`] in a [`Diagram`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct SiteIdx(pub(crate) usize);

/// The index of a [`Face`] in a [`Diagram`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct FaceIdx(pub(crate) usize);

/// The index of a [`Vertex`] in a [`Diagram`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct VertexIdx(pub(crate) usize);

/// The index of a [`HalfEdge`] in a [`Diagram`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct HalfEdgeIdx(pub(crate) usize);

/// A vector indexed by [`SiteIdx`].
#[derive(Clone, serde::Serialize)]
pub struct SiteVec<T> {
    inner: Vec<T>,
}
impl_typed_vec!(SiteVec, SiteIdx, "s");

/// A vector indexed by [`FaceIdx`].
#[derive(Clone, serde::Serialize)]
pub struct FaceVec<T> {
    inner: Vec<T>,
}
impl_typed_vec!(FaceVec, FaceIdx, "f");

/// A vector indexed by [`VertexIdx`].
#[derive(Clone, serde::Serialize)]
pub struct VertexVec<T> {
    inner: Vec<T>,
}
impl_typed_vec!(VertexVec, VertexIdx, "v");

/// A vector indexed by [`HalfEdgeIdx`].
#[derive(Clone, serde::Serialize)]
pub struct HalfEdgeVec<T> {
    inner: Vec<T>,
}
impl_typed_vec!(HalfEdgeVec, HalfEdgeIdx, "h");

/// One of the input points.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Site {
    /// This site's index.
    pub index: SiteIdx,
    /// Where the site is.
    pub point: Point,
    /// The cell of points closer to this site than to any other.
    pub face: FaceIdx,
}

/// The Voronoi cell of a site.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Face {
    /// The site that this cell belongs to.
    pub site: SiteIdx,
    /// Some half-edge on the boundary of this cell.
    ///
    /// Once the diagram is bounded, following `next` from here walks
    /// counter-clockwise around the cell and comes back. This is `None` for
    /// the cell of a lone site before bounding, and for cells clipped away
    /// entirely.
    pub outer_component: Option<HalfEdgeIdx>,
}

/// A vertex of the diagram.
///
/// This is either a point equidistant from three or more sites, or a point
/// on the boundary of the bounding box.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Vertex {
    /// The location of the vertex.
    pub point: Point,
}

/// One side of an edge of the diagram.
///
/// Every half-edge belongs to exactly one cell, and runs counter-clockwise
/// around it.
#[derive(Clone, Debug, serde::Serialize)]
pub struct HalfEdge {
    /// Where this half-edge starts, if that's known yet.
    pub origin: Option<VertexIdx>,
    /// Where this half-edge ends, if that's known yet.
    pub destination: Option<VertexIdx>,
    /// The half-edge on the other side of this edge, running the other way.
    ///
    /// Half-edges along the bounding box have no twin.
    pub twin: Option<HalfEdgeIdx>,
    /// The previous half-edge around our face.
    pub prev: Option<HalfEdgeIdx>,
    /// The next half-edge around our face.
    pub next: Option<HalfEdgeIdx>,
    /// The face we belong to.
    pub incident_face: FaceIdx,
}

impl HalfEdge {
    fn new(face: FaceIdx) -> Self {
        HalfEdge {
            origin: None,
            destination: None,
            twin: None,
            prev: None,
            next: None,
            incident_face: face,
        }
    }
}

/// An edge that was still growing when the sweep finished.
///
/// The edge runs along a ray; bounding the diagram cuts the ray where it
/// leaves the box. `incoming` is the half-edge that will end at the cut, and
/// `outgoing` is its twin, which will start there.
#[derive(Clone, Debug, serde::Serialize)]
pub(crate) struct Ray {
    pub origin: Point,
    pub direction: Point,
    pub incoming: HalfEdgeIdx,
    pub outgoing: HalfEdgeIdx,
}

/// A Voronoi diagram.
///
/// A diagram comes out of [`crate::build_diagram`] with some of its edges
/// still unbounded; [`Diagram::bound_to`] closes them off against a box.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct Diagram {
    pub(crate) sites: SiteVec<Site>,
    pub(crate) faces: FaceVec<Face>,
    pub(crate) vertices: VertexVec<Option<Vertex>>,
    pub(crate) half_edges: HalfEdgeVec<Option<HalfEdge>>,
    pub(crate) rays: Vec<Ray>,
    pub(crate) bounded: bool,
}

impl Diagram {
    /// Creates a diagram with one site and one empty face per point.
    pub(crate) fn with_sites(points: impl IntoIterator<Item = Point>) -> Self {
        let mut diagram = Diagram::default();
        for point in points {
            let index = SiteIdx(diagram.sites.len());
            let face = diagram.faces.push(Face {
                site: index,
                outer_component: None,
            });
            diagram.sites.push(Site { index, point, face });
        }
        diagram
    }

    /// The number of sites (and faces).
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// The site at `idx`.
    pub fn site(&self, idx: SiteIdx) -> &Site {
        &self.sites[idx]
    }

    /// Iterates over all the sites, in input order.
    pub fn sites(&self) -> impl Iterator<Item = &Site> + '_ {
        self.sites.iter().map(|(_, s)| s)
    }

    /// The face at `idx`.
    pub fn face(&self, idx: FaceIdx) -> &Face {
        &self.faces[idx]
    }

    /// Iterates over all the faces, along with their indices.
    pub fn faces(&self) -> impl Iterator<Item = (FaceIdx, &Face)> + '_ {
        self.faces.iter()
    }

    /// The vertex at `idx`, unless it was removed.
    pub fn vertex(&self, idx: VertexIdx) -> Option<&Vertex> {
        self.vertices.live(idx)
    }

    /// Iterates over the vertices that haven't been removed.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexIdx, &Vertex)> + '_ {
        self.vertices.iter_live()
    }

    /// The number of vertices that haven't been removed.
    pub fn vertex_count(&self) -> usize {
        self.vertices.live_count()
    }

    /// The half-edge at `idx`, unless it was removed.
    pub fn half_edge(&self, idx: HalfEdgeIdx) -> Option<&HalfEdge> {
        self.half_edges.live(idx)
    }

    /// Iterates over the half-edges that haven't been removed.
    pub fn half_edges(&self) -> impl Iterator<Item = (HalfEdgeIdx, &HalfEdge)> + '_ {
        self.half_edges.iter_live()
    }

    /// The number of half-edges that haven't been removed.
    pub fn half_edge_count(&self) -> usize {
        self.half_edges.live_count()
    }

    /// Has this diagram been bounded to a box?
    pub fn is_bounded(&self) -> bool {
        self.bounded
    }

    /// The position of a vertex.
    ///
    /// Panics if the vertex was removed.
    pub(crate) fn point(&self, idx: VertexIdx) -> Point {
        self.vertices[idx]
            .as_ref()
            .map(|v| v.point)
            .unwrap_or_else(|| panic!("{idx:?} was removed"))
    }

    pub(crate) fn he(&self, idx: HalfEdgeIdx) -> &HalfEdge {
        self.half_edges[idx]
            .as_ref()
            .unwrap_or_else(|| panic!("{idx:?} was removed"))
    }

    pub(crate) fn he_mut(&mut self, idx: HalfEdgeIdx) -> &mut HalfEdge {
        self.half_edges[idx]
            .as_mut()
            .unwrap_or_else(|| panic!("{idx:?} was removed"))
    }

    /// Adds a new vertex.
    pub(crate) fn create_vertex(&mut self, point: Point) -> VertexIdx {
        self.vertices.push(Some(Vertex { point }))
    }

    /// Adds a new half-edge to `face`, with nothing connected to it.
    ///
    /// If `face` has no boundary yet, the new half-edge becomes its outer component.
    pub(crate) fn create_half_edge(&mut self, face: FaceIdx) -> HalfEdgeIdx {
        let idx = self.half_edges.push(Some(HalfEdge::new(face)));
        let face = &mut self.faces[face];
        if face.outer_component.is_none() {
            face.outer_component = Some(idx);
        }
        idx
    }

    /// Adds a twin pair of half-edges, one in each face.
    pub(crate) fn create_twins(
        &mut self,
        left: FaceIdx,
        right: FaceIdx,
    ) -> (HalfEdgeIdx, HalfEdgeIdx) {
        let a = self.create_half_edge(left);
        let b = self.create_half_edge(right);
        self.he_mut(a).twin = Some(b);
        self.he_mut(b).twin = Some(a);
        (a, b)
    }

    pub(crate) fn remove_vertex(&mut self, idx: VertexIdx) {
        self.vertices.take(idx);
    }

    pub(crate) fn remove_half_edge(&mut self, idx: HalfEdgeIdx) {
        if let Some(he) = self.half_edges.take(idx) {
            let face = &mut self.faces[he.incident_face];
            if face.outer_component == Some(idx) {
                face.outer_component = None;
            }
        }
    }

    /// Makes `next` follow `prev` around their face.
    pub(crate) fn link_half_edges(&mut self, prev: HalfEdgeIdx, next: HalfEdgeIdx) {
        self.he_mut(prev).next = Some(next);
        self.he_mut(next).prev = Some(prev);
    }

    /// Walks the boundary of a face, starting from its outer component.
    ///
    /// The walk stops when it gets back to the start, when it reaches a
    /// half-edge with no `next`, or after visiting every half-edge in the
    /// diagram (which can only happen if the boundary is corrupted).
    pub fn face_half_edges(&self, face: FaceIdx) -> FaceHalfEdges<'_> {
        let start = self.faces[face].outer_component;
        FaceHalfEdges {
            diagram: self,
            start,
            current: start,
            budget: self.half_edges.len(),
        }
    }

    /// The corners of a bounded cell, in counter-clockwise order.
    ///
    /// Returns `None` if the cell is empty or its boundary isn't closed.
    pub fn cell_polygon(&self, face: FaceIdx) -> Option<Vec<Point>> {
        let start = self.faces[face].outer_component?;
        let mut points = Vec::new();
        let mut last = None;
        for idx in self.face_half_edges(face) {
            let he = self.half_edge(idx)?;
            points.push(self.point(he.origin?));
            last = Some(he);
        }
        (last?.next == Some(start)).then_some(points)
    }

    /// The boundary of a bounded cell, as a closed path.
    pub fn cell_path(&self, face: FaceIdx) -> Option<kurbo::BezPath> {
        let polygon = self.cell_polygon(face)?;
        let mut path = kurbo::BezPath::new();
        let mut points = polygon.into_iter().map(Point::to_kurbo);
        path.move_to(points.next()?);
        for p in points {
            path.line_to(p);
        }
        path.close_path();
        Some(path)
    }

    /// Draws every bounded cell, for debugging.
    ///
    /// Our `y` axis points up, so the drawing is flipped vertically.
    #[cfg(feature = "debug-svg")]
    pub fn dump_svg(&self) -> svg::Document {
        use kurbo::Shape;

        let mut bbox: Option<kurbo::Rect> = None;
        let mut doc = svg::Document::new();
        let mut group = svg::node::element::Group::new().set("transform", "scale(1, -1)");
        for (face, _) in self.faces() {
            let Some(path) = self.cell_path(face) else {
                continue;
            };
            let rect = path.bounding_box();
            bbox = Some(bbox.map_or(rect, |b| b.union(rect)));

            let mut data = svg::node::element::path::Data::new();
            for el in path.iter() {
                data = match el {
                    kurbo::PathEl::MoveTo(p) => data.move_to((p.x, p.y)),
                    kurbo::PathEl::LineTo(p) => data.line_to((p.x, p.y)),
                    kurbo::PathEl::ClosePath => data.close(),
                    // We only ever build polygons.
                    _ => data,
                };
            }
            let path = svg::node::element::Path::new()
                .set("d", data)
                .set("stroke", "black")
                .set("stroke-width", 0.01)
                .set("stroke-linejoin", "round")
                .set("fill", "none");
            group = group.add(path);
        }
        for site in self.sites() {
            let circle = svg::node::element::Circle::new()
                .set("cx", site.point.x)
                .set("cy", site.point.y)
                .set("r", 0.02)
                .set("fill", "red");
            group = group.add(circle);
        }

        if let Some(bbox) = bbox {
            let pad = 0.05 * bbox.width().max(bbox.height());
            doc = doc.set(
                "viewBox",
                (
                    bbox.min_x() - pad,
                    -bbox.max_y() - pad,
                    bbox.width() + 2.0 * pad,
                    bbox.height() + 2.0 * pad,
                ),
            );
        }
        doc.add(group)
    }

    /// Checks the structural invariants of the half-edge graph.
    ///
    /// For an unbounded diagram, this only checks that twins and face
    /// pointers are consistent. For a bounded one, it also checks that every
    /// face boundary is a closed cycle whose half-edges are joined end to end.
    pub fn check_invariants(&self) {
        for (idx, he) in self.half_edges() {
            if let Some(twin_idx) = he.twin {
                let twin = self
                    .half_edge(twin_idx)
                    .unwrap_or_else(|| panic!("{idx:?} has a removed twin"));
                assert_eq!(twin.twin, Some(idx), "{idx:?} and {twin_idx:?} aren't twins");
                assert_ne!(twin.incident_face, he.incident_face);
                if self.bounded {
                    assert_eq!(twin.origin, he.destination);
                    assert_eq!(twin.destination, he.origin);
                }
            }
            if let Some(next) = he.next {
                let next_he = self.he(next);
                assert_eq!(next_he.prev, Some(idx));
                assert_eq!(next_he.incident_face, he.incident_face);
                if self.bounded {
                    assert_eq!(next_he.origin, he.destination);
                }
            }
            for v in [he.origin, he.destination].into_iter().flatten() {
                assert!(self.vertex(v).is_some(), "{idx:?} refers to removed {v:?}");
            }
        }

        if self.bounded {
            for (face, _) in self.faces() {
                if self.faces[face].outer_component.is_some() {
                    assert!(
                        self.cell_polygon(face).is_some(),
                        "{face:?} isn't closed"
                    );
                }
            }
        }
    }
}

/// An iterator over the boundary of a face. See [`Diagram::face_half_edges`].
pub struct FaceHalfEdges<'a> {
    diagram: &'a Diagram,
    start: Option<HalfEdgeIdx>,
    current: Option<HalfEdgeIdx>,
    budget: usize,
}

impl Iterator for FaceHalfEdges<'_> {
    type Item = HalfEdgeIdx;

    fn next(&mut self) -> Option<HalfEdgeIdx> {
        let current = self.current?;
        if self.budget == 0 {
            return None;
        }
        self.budget -= 1;

        let next = self.diagram.half_edge(current).and_then(|he| he.next);
        self.current = next.filter(|&n| Some(n) != self.start);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> (Diagram, FaceIdx) {
        let mut d = Diagram::with_sites([Point::new(0.5, 0.5)]);
        let face = d.site(SiteIdx(0)).face;
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .map(|p| d.create_vertex(Point::from(p)));
        let edges = [0, 1, 2, 3].map(|_| d.create_half_edge(face));
        for i in 0..4 {
            let he = d.he_mut(edges[i]);
            he.origin = Some(corners[i]);
            he.destination = Some(corners[(i + 1) % 4]);
            d.link_half_edges(edges[i], edges[(i + 1) % 4]);
        }
        d.bounded = true;
        (d, face)
    }

    #[test]
    fn one_site_per_face() {
        let d = Diagram::with_sites([Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        assert_eq!(d.site_count(), 2);
        for site in d.sites() {
            assert_eq!(d.face(site.face).site, site.index);
            assert!(d.face(site.face).outer_component.is_none());
        }
        assert_eq!(d.vertex_count(), 0);
        assert_eq!(d.half_edge_count(), 0);
    }

    #[test]
    fn first_half_edge_is_the_outer_component() {
        let mut d = Diagram::with_sites([Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        let (a, b) = d.create_twins(FaceIdx(0), FaceIdx(1));
        let c = d.create_half_edge(FaceIdx(0));
        assert_eq!(d.face(FaceIdx(0)).outer_component, Some(a));
        assert_eq!(d.face(FaceIdx(1)).outer_component, Some(b));
        assert_ne!(c, a);
        assert_eq!(d.he(a).twin, Some(b));
        assert_eq!(d.he(b).twin, Some(a));
        d.check_invariants();
    }

    #[test]
    fn closed_square() {
        let (d, face) = square();
        d.check_invariants();
        assert_eq!(d.face_half_edges(face).count(), 4);
        let polygon = d.cell_polygon(face).unwrap();
        assert_eq!(polygon[0], Point::new(0.0, 0.0));
        assert_eq!(polygon[2], Point::new(1.0, 1.0));

        let path = d.cell_path(face).unwrap();
        // Counter-clockwise with y up means positive area.
        assert!((kurbo::Shape::area(&path) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn removal_leaves_other_indices_alone() {
        let (mut d, face) = square();
        let edges: Vec<_> = d.face_half_edges(face).collect();
        d.remove_half_edge(edges[0]);
        d.remove_vertex(VertexIdx(0));

        assert_eq!(d.half_edge_count(), 3);
        assert_eq!(d.vertex_count(), 3);
        assert!(d.half_edge(edges[0]).is_none());
        assert!(d.half_edge(edges[1]).is_some());
        assert_eq!(d.vertex(VertexIdx(1)).unwrap().point, Point::new(1.0, 0.0));
        // The outer component pointed at the removed half-edge.
        assert_eq!(d.face(face).outer_component, None);
        assert_eq!(d.cell_polygon(face), None);
    }

    #[test]
    fn broken_cycle_is_not_a_polygon() {
        let (mut d, face) = square();
        let edges: Vec<_> = d.face_half_edges(face).collect();
        d.he_mut(edges[3]).next = None;
        assert_eq!(d.face_half_edges(face).count(), 4);
        assert_eq!(d.cell_polygon(face), None);
    }
}
