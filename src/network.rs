use crate::geometry::polyline_length;
use geo::{Coord, Line, LineString, Point};
use rstar::primitives::{GeomWithData, Line as IndexLine};
use rstar::{AABB, RTree};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Index of a route polyline inside a [`RouteNetwork`].
pub type RouteId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RouteEnd {
    Start,
    End,
}

impl RouteEnd {
    pub fn opposite(self) -> Self {
        match self {
            RouteEnd::Start => RouteEnd::End,
            RouteEnd::End => RouteEnd::Start,
        }
    }
}

/// A named distribution endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub name: String,
    pub location: Point<f64>,
}

impl Terminal {
    pub fn new(name: impl Into<String>, location: Point<f64>) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// Where terminals are moved to before any path is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapMode {
    /// Nearest point anywhere on the route network.
    #[default]
    Network,
    /// Nearest end of a route polyline.
    Endpoint,
    /// Keep the input locations.
    None,
}

type IndexedPiece = GeomWithData<IndexLine<[f64; 2]>, (RouteId, usize)>;
type IndexedEnd = GeomWithData<[f64; 2], (RouteId, RouteEnd)>;

/// The installable cable routes of one run, immutable once built.
///
/// Every two-point piece of every route goes into one R-tree, and every route end
/// into another, so both walkers only look at geometry near their position.
pub struct RouteNetwork {
    routes: Vec<LineString<f64>>,
    lengths: Vec<f64>,
    pieces: RTree<IndexedPiece>,
    ends: RTree<IndexedEnd>,
}

fn to_array(c: Coord) -> [f64; 2] {
    [c.x, c.y]
}

fn to_coord(p: [f64; 2]) -> Coord {
    Coord { x: p[0], y: p[1] }
}

impl RouteNetwork {
    pub fn new(routes: Vec<LineString<f64>>) -> Self {
        let input_count = routes.len();
        let routes: Vec<LineString<f64>> = routes
            .into_iter()
            .filter(|route| route.0.len() >= 2 && polyline_length(&route.0) > 0.0)
            .collect();

        if routes.len() < input_count {
            warn!(
                dropped = input_count - routes.len(),
                "ignoring degenerate routes with fewer than two distinct points"
            );
        }

        let lengths = routes.iter().map(|r| polyline_length(&r.0)).collect();

        let mut pieces = Vec::new();
        let mut ends = Vec::with_capacity(routes.len() * 2);

        for (route_id, route) in routes.iter().enumerate() {
            for (piece_idx, line) in route.lines().enumerate() {
                pieces.push(GeomWithData::new(
                    IndexLine::new(to_array(line.start), to_array(line.end)),
                    (route_id, piece_idx),
                ));
            }
            if let (Some(first), Some(last)) = (route.0.first(), route.0.last()) {
                ends.push(GeomWithData::new(to_array(*first), (route_id, RouteEnd::Start)));
                ends.push(GeomWithData::new(to_array(*last), (route_id, RouteEnd::End)));
            }
        }

        Self {
            routes,
            lengths,
            pieces: RTree::bulk_load(pieces),
            ends: RTree::bulk_load(ends),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[LineString<f64>] {
        &self.routes
    }

    pub fn route(&self, id: RouteId) -> &LineString<f64> {
        &self.routes[id]
    }

    pub fn route_length(&self, id: RouteId) -> f64 {
        self.lengths[id]
    }

    pub fn end_point(&self, id: RouteId, end: RouteEnd) -> Coord {
        let coords = &self.routes[id].0;
        match end {
            RouteEnd::Start => coords[0],
            RouteEnd::End => coords[coords.len() - 1],
        }
    }

    /// Route pieces whose bounding box reaches within `radius` of `center`,
    /// ordered by (route, piece).
    pub fn pieces_near(&self, center: Coord, radius: f64) -> Vec<(RouteId, Line<f64>)> {
        let envelope = AABB::from_corners(
            [center.x - radius, center.y - radius],
            [center.x + radius, center.y + radius],
        );
        let mut found: Vec<(RouteId, usize, Line<f64>)> = self
            .pieces
            .locate_in_envelope_intersecting(&envelope)
            .map(|piece| {
                let (route_id, piece_idx) = piece.data;
                let line = piece.geom();
                (
                    route_id,
                    piece_idx,
                    Line::new(to_coord(line.from), to_coord(line.to)),
                )
            })
            .collect();
        found.sort_by_key(|(route_id, piece_idx, _)| (*route_id, *piece_idx));
        found
            .into_iter()
            .map(|(route_id, _, line)| (route_id, line))
            .collect()
    }

    /// Route ends lying within `tolerance` of `position`, ordered by route.
    pub fn route_ends_near(&self, position: Coord, tolerance: f64) -> Vec<(RouteId, RouteEnd)> {
        let mut found: Vec<(RouteId, RouteEnd)> = self
            .ends
            .locate_within_distance(to_array(position), tolerance * tolerance)
            .map(|end| end.data)
            .collect();
        found.sort();
        found
    }

    /// Nearest point anywhere on the network.
    pub fn nearest_point(&self, point: Coord) -> Option<Coord> {
        let query = to_array(point);
        self.pieces
            .nearest_neighbor(&query)
            .map(|piece| to_coord(piece.geom().nearest_point(&query)))
    }

    /// Nearest route end.
    pub fn nearest_end(&self, point: Coord) -> Option<Coord> {
        self.ends
            .nearest_neighbor(&to_array(point))
            .map(|end| to_coord(*end.geom()))
    }

    pub fn snap(&self, terminal: &Terminal, mode: SnapMode) -> Terminal {
        let location = terminal.location.0;
        let snapped = match mode {
            SnapMode::Network => self.nearest_point(location),
            SnapMode::Endpoint => self.nearest_end(location),
            SnapMode::None => Some(location),
        };

        match snapped {
            Some(coord) => Terminal::new(terminal.name.clone(), Point::from(coord)),
            None => {
                warn!(terminal = %terminal.name, "no route to snap to, keeping input location");
                terminal.clone()
            }
        }
    }

    pub fn snap_all(&self, terminals: &[Terminal], mode: SnapMode) -> Vec<Terminal> {
        terminals.iter().map(|t| self.snap(t, mode)).collect()
    }
}
