use crate::geometry::{polyline_length, reduce_collinear};
use geo::{Coord, Distance, Euclidean, LineString, Point};

/// A route-following path between two points, with redundant collinear
/// vertices already removed.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredPath {
    pub points: LineString<f64>,
    pub length: f64,
}

impl DiscoveredPath {
    /// Simplifies a walked point sequence. Length is taken after simplification,
    /// which only ever drops points lying on a straight continuation.
    pub fn from_walk(walked: &[Coord]) -> Self {
        let simplified = reduce_collinear(walked);
        let length = polyline_length(&simplified);
        Self {
            points: LineString::new(simplified),
            length,
        }
    }

    pub fn start(&self) -> Option<Point<f64>> {
        self.points.0.first().map(|c| Point::from(*c))
    }

    pub fn end(&self) -> Option<Point<f64>> {
        self.points.0.last().map(|c| Point::from(*c))
    }

    pub fn vertex_count(&self) -> usize {
        self.points.0.len()
    }

    /// True when some segment of the path comes within `tolerance` of `point`.
    pub fn passes_through(&self, point: Coord, tolerance: f64) -> bool {
        let point = Point::from(point);
        self.points
            .lines()
            .any(|line| Euclidean.distance(&line, &point) <= tolerance)
    }
}
