#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
pub mod beachline;
mod bound;
pub mod diagram;
mod geom;
mod num;
pub mod priority_queue;
pub mod sweep;

pub use bound::{BoundMode, ClipError};
pub use diagram::{
    Diagram, Face, FaceIdx, HalfEdge, HalfEdgeIdx, Site, SiteIdx, Vertex, VertexIdx,
};
pub use geom::{BoundingBox, Intersection, Point, Side};
pub use num::CheapOrderedFloat;
pub use sweep::{build_diagram, SweepResult, SweepStats, Sweeper};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The input points were faulty, or the sweep ran into numbers it couldn't handle.
pub enum Error {
    /// At least one of the inputs was infinite.
    Infinity,
    /// At least one of the inputs was not a number.
    NaN,
    /// The sweep computed a non-finite coordinate.
    NumericDegeneracy,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Infinity => write!(f, "one of the inputs was infinite"),
            Error::NaN => write!(f, "one of the inputs had a NaN"),
            Error::NumericDegeneracy => {
                write!(f, "the sweep produced a non-finite coordinate")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Computes the Voronoi diagram of some points, bounded by a box.
///
/// This is the same as calling [`build_diagram`] and then
/// [`Diagram::bound_to_with`]; see those for the details.
pub fn voronoi<P: Into<Point>>(
    points: impl IntoIterator<Item = P>,
    bbox: BoundingBox,
    mode: BoundMode,
) -> Result<Diagram, Box<dyn std::error::Error + Send + Sync>> {
    let mut diagram = build_diagram(points)?.into_diagram();
    diagram.bound_to_with(bbox, mode)?;
    Ok(diagram)
}
