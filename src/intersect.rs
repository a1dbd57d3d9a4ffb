//! Epsilon-consistent geometric predicates backing the BSP operations.
//!
//! Every predicate takes the classification tolerance as an explicit
//! argument so that a tree built with a per-instance tolerance stays
//! self-consistent: the same value decides point classification, edge
//! crossings and vertex snapping.

use crate::bsp::LeafSide;
use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

/// Classify `point` against the plane through `origin` with `normal`.
///
/// Returns `None` for on-plane points. A point within `eps` of `origin`
/// itself is treated as on-plane (degenerate short-circuit); otherwise the
/// signed offset is the dot of the *normalized* point-to-origin vector with
/// the plane normal, compared against `±eps`.
pub fn classify_point(
    point: &Point3<Real>,
    origin: &Point3<Real>,
    normal: &Vector3<Real>,
    eps: Real,
) -> Option<LeafSide> {
    let offset = point - origin;
    if offset.norm() < eps {
        return None;
    }

    let signed = offset.normalize().dot(normal);
    if signed > eps {
        Some(LeafSide::Front)
    } else if signed < -eps {
        Some(LeafSide::Back)
    } else {
        None
    }
}

/// Plane normal of a triangle, as used for every leaf plane:
/// `cross(normalize(p1 - p0), normalize(p2 - p1))`.
///
/// The result is *not* re-normalized; its length is the sine of the corner
/// angle, which only widens the on-plane band for needle triangles.
pub fn triangle_normal(p0: &Point3<Real>, p1: &Point3<Real>, p2: &Point3<Real>) -> Vector3<Real> {
    (p1 - p0).normalize().cross(&(p2 - p1).normalize())
}

/// Intersection of the segment `a..b` with the plane through `origin`.
///
/// Only strict crossings count: both endpoints must classify to opposite
/// sides under [`classify_point`]. Segments with an on-plane endpoint
/// return `None`, so a straddling triangle yields at most two crossings.
pub fn segment_plane_intersection(
    a: &Point3<Real>,
    b: &Point3<Real>,
    origin: &Point3<Real>,
    normal: &Vector3<Real>,
    eps: Real,
) -> Option<Point3<Real>> {
    let side_a = classify_point(a, origin, normal, eps)?;
    let side_b = classify_point(b, origin, normal, eps)?;
    if side_a == side_b {
        return None;
    }

    let dir = b - a;
    let denom = normal.dot(&dir);
    if denom.abs() < Real::EPSILON {
        return None;
    }
    let t = (normal.dot(&(origin - a)) / denom).clamp(0.0, 1.0);
    Some(a + dir * t)
}

/// Intersection segment of triangle `a` with the *area* of triangle `b`.
///
/// `b` is the coplanar geometry stored in a leaf; a crossing of `b`'s
/// supporting plane alone is not enough. The chord of `a` across the plane
/// is clipped to `b`'s edges; overlaps shorter than `eps` are dismissed as
/// grazing contact.
pub fn triangle_vs_triangle(
    a: &[Point3<Real>; 3],
    b: &[Point3<Real>; 3],
    eps: Real,
) -> Option<(Point3<Real>, Point3<Real>)> {
    let plane_normal = triangle_normal(&b[0], &b[1], &b[2]);
    if !plane_normal.norm().is_finite() || plane_normal.norm() < eps {
        return None;
    }
    let plane_origin = b[0];

    let sides = [
        classify_point(&a[0], &plane_origin, &plane_normal, eps),
        classify_point(&a[1], &plane_origin, &plane_normal, eps),
        classify_point(&a[2], &plane_origin, &plane_normal, eps),
    ];
    let has_front = sides.contains(&Some(LeafSide::Front));
    let has_back = sides.contains(&Some(LeafSide::Back));
    if !has_front || !has_back {
        return None;
    }

    // Chord of `a` across the plane: strict edge crossings plus any
    // on-plane vertices of `a`.
    let mut chord: Vec<Point3<Real>> = Vec::with_capacity(3);
    let push_unique = |p: Point3<Real>, chord: &mut Vec<Point3<Real>>| {
        if !chord.iter().any(|q| (q - p).norm() < eps) {
            chord.push(p);
        }
    };
    for i in 0..3 {
        if sides[i].is_none() {
            push_unique(a[i], &mut chord);
        }
        if let Some(p) =
            segment_plane_intersection(&a[i], &a[(i + 1) % 3], &plane_origin, &plane_normal, eps)
        {
            push_unique(p, &mut chord);
        }
    }
    if chord.len() < 2 {
        return None;
    }
    let (p, q) = (chord[0], chord[1]);

    // Clip the chord to the area of `b` against its three inward edge
    // half-planes (Liang-Barsky on the chord parameter).
    let dir = q - p;
    let mut t0: Real = 0.0;
    let mut t1: Real = 1.0;
    for i in 0..3 {
        let edge = b[(i + 1) % 3] - b[i];
        let inward = plane_normal.cross(&edge);
        let fp = inward.dot(&(p - b[i]));
        let fq = inward.dot(&(q - b[i]));
        if fp < 0.0 && fq < 0.0 {
            return None;
        }
        if fp < 0.0 || fq < 0.0 {
            let t = fp / (fp - fq);
            if fp < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
        if t0 >= t1 {
            return None;
        }
    }

    let clipped = ((t1 - t0) * dir.norm()).abs();
    if clipped < eps {
        return None;
    }
    Some((p + dir * t0, p + dir * t1))
}

/// Crossings of the infinite line through `p, q` with the three sides of a
/// triangle.
///
/// Returns the two distinct crossing points, each tagged with the index of
/// the edge it lies on (edge `i` joins vertices `i` and `(i + 1) % 3`),
/// edge indices ascending. A line passing exactly through a vertex
/// produces coincident hits on the adjacent edges; duplicates within `eps`
/// are collapsed, and `None` is returned when fewer than two distinct
/// crossings remain.
pub fn line_vs_triangle_sides(
    tri: &[Point3<Real>; 3],
    p: &Point3<Real>,
    q: &Point3<Real>,
    eps: Real,
) -> Option<[(Point3<Real>, usize); 2]> {
    let dir = q - p;
    if dir.norm() < eps {
        return None;
    }

    let mut hits: Vec<(Point3<Real>, usize)> = Vec::with_capacity(3);
    for i in 0..3 {
        let e0 = tri[i];
        let edge = tri[(i + 1) % 3] - e0;
        let n = dir.cross(&edge);
        let denom = n.norm_squared();
        if denom < Real::EPSILON {
            continue; // parallel to this edge
        }
        let w = e0 - p;
        // Skew-line parameters: p + s*dir meets e0 + t*edge.
        let t = w.cross(&dir).dot(&n) / denom;
        let s = w.cross(&edge).dot(&n) / denom;
        if !(-eps..=1.0 + eps).contains(&t) {
            continue;
        }
        let on_edge = e0 + edge * t.clamp(0.0, 1.0);
        let on_line = p + dir * s;
        if (on_edge - on_line).norm() > eps {
            continue; // lines miss each other in 3D
        }
        if hits.iter().any(|(h, _)| (h - on_edge).norm() < eps) {
            continue;
        }
        hits.push((on_edge, i));
    }

    if hits.len() < 2 {
        return None;
    }
    Some([hits[0], hits[1]])
}
