use geo::{Coord, Distance, Euclidean, Line, Point};

/// Slack on the segment parameter when accepting circle intersections at segment ends.
pub const PARAM_EPSILON: f64 = 1e-9;
/// Relative slack used when deciding that two direction vectors are collinear.
pub const COLLINEAR_EPSILON: f64 = 1e-9;
/// Relative slack for tangency and disk-boundary decisions.
const BOUNDARY_EPSILON: f64 = 1e-9;

// --- Points under tolerance ---

pub fn distance(a: Coord, b: Coord) -> f64 {
    Euclidean.distance(Point::from(a), Point::from(b))
}

/// Points are never compared exactly; two points within `tolerance` are the same point.
/// The bound is inclusive, matching rstar's `locate_within_distance`, so a zero
/// tolerance still matches identical points.
pub fn coincident(a: Coord, b: Coord, tolerance: f64) -> bool {
    distance(a, b) <= tolerance
}

/// True when `p` lies in the open disk around `center`. Points on the rim are outside.
pub fn inside_open_disk(p: Coord, center: Coord, radius: f64) -> bool {
    distance(p, center) < radius * (1.0 - BOUNDARY_EPSILON)
}

fn dot(a: Coord, b: Coord) -> f64 {
    a.x * b.x + a.y * b.y
}

fn norm(a: Coord) -> f64 {
    a.x.hypot(a.y)
}

// --- Circle / segment intersection ---

/// Pushes the points where the circle (`center`, `radius`) crosses `line`, with the
/// segment parameter of each crossing. A tangent contact yields a single point.
pub fn circle_line_intersections(
    center: Coord,
    radius: f64,
    line: &Line<f64>,
    out: &mut Vec<(f64, Coord)>,
) {
    let d = line.delta();
    let a = dot(d, d);

    if a <= f64::EPSILON * radius * radius {
        // Degenerate segment: only counts if it sits on the rim.
        let rim_gap = (distance(line.start, center) - radius).abs();
        if rim_gap <= radius * BOUNDARY_EPSILON {
            out.push((0.0, line.start));
        }
        return;
    }

    let f = line.start - center;
    let t0 = -dot(f, d) / a;
    let closest = line.start + d * t0;
    let h2 = dot(closest - center, closest - center);
    let r2 = radius * radius;

    if h2 > r2 * (1.0 + BOUNDARY_EPSILON) {
        return;
    }

    let half = ((r2 - h2).max(0.0) / a).sqrt();
    let tangent = half * a.sqrt() <= radius * BOUNDARY_EPSILON;

    let mut push = |t: f64| {
        if (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&t) {
            let t = t.clamp(0.0, 1.0);
            out.push((t, line.start + d * t));
        }
    };

    if tangent {
        push(t0);
    } else {
        push(t0 - half);
        push(t0 + half);
    }
}

// --- Direction heuristics ---

/// Cosine of the angle between (origin -> a) and (origin -> b).
/// Zero-length vectors have no direction and score 0.
pub fn cosine_similarity(origin: Coord, a: Coord, b: Coord) -> f64 {
    let u = a - origin;
    let v = b - origin;
    let nu = norm(u);
    let nv = norm(v);
    if nu == 0.0 || nv == 0.0 {
        return 0.0;
    }
    dot(u, v) / (nu * nv)
}

// --- Polylines ---

pub fn polyline_length(coords: &[Coord]) -> f64 {
    coords.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Removes interior points that continue straight on from the last kept point.
///
/// A point is redundant when the incoming direction is perpendicular to the
/// outgoing direction rotated by 90 degrees. Reversals are kept so that the
/// simplified polyline has the same length as the walked one.
pub fn reduce_collinear(points: &[Coord]) -> Vec<Coord> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut kept: Vec<Coord> = Vec::with_capacity(points.len());
    kept.push(points[0]);

    for i in 1..points.len() - 1 {
        let (current, next) = (points[i], points[i + 1]);
        let previous = kept[kept.len() - 1];

        let incoming = current - previous;
        let outgoing = next - current;
        let scale = norm(incoming) * norm(outgoing);

        if scale == 0.0 {
            // duplicate vertex
            continue;
        }

        let rotated = Coord {
            x: -outgoing.y,
            y: outgoing.x,
        };
        let straight = dot(incoming, rotated).abs() <= COLLINEAR_EPSILON * scale
            && dot(incoming, outgoing) > 0.0;

        if !straight {
            kept.push(current);
        }
    }

    kept.push(points[points.len() - 1]);
    kept
}
