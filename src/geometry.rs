//! Geometry kernels used to build Voronoi cells from their Delaunay dual.
//!
//! All functions are pure. Degenerate input never panics: collinear points in a
//! circumcenter computation are a defect of the triangulation and produce
//! non-finite output, degenerate faces simply have zero measure.

use glam::{DVec2, DVec3};

/// Circumcenter of the triangle through the given 3 points.
pub fn circumcenter(p0: DVec2, p1: DVec2, p2: DVec2) -> DVec2 {
    let a = p1 - p0;
    let b = p2 - p0;

    let d = 2. * a.perp_dot(b);
    let a2 = a.length_squared();
    let b2 = b.length_squared();
    let rx = (b.y * a2 - a.y * b2) / d;
    let ry = (a.x * b2 - b.x * a2) / d;

    p0 + DVec2::new(rx, ry)
}

/// Centroid and (unsigned) area of the triangle through the given 3 points.
pub fn triangle_centroid_measure(a: DVec2, b: DVec2, c: DVec2) -> (DVec2, f64) {
    let centroid = (a + b + c) / 3.;
    let area = 0.5 * (b - a).perp_dot(c - a).abs();
    (centroid, area)
}

/// Midpoint and length of the 2D face (line segment) between `a` and `b`.
pub fn face_midpoint_measure(a: DVec2, b: DVec2) -> (DVec2, f64) {
    (0.5 * (a + b), a.distance(b))
}

/// Part of the segment `[a, b]` inside the box `[lo, hi]`, `None` if the
/// segment misses the box.
pub fn clip_segment(a: DVec2, b: DVec2, lo: DVec2, hi: DVec2) -> Option<[DVec2; 2]> {
    let d = b - a;
    let mut t_in = 0f64;
    let mut t_out = 1f64;
    for axis in 0..2 {
        for (p, q) in [(-d[axis], a[axis] - lo[axis]), (d[axis], hi[axis] - a[axis])] {
            if p == 0. {
                if q < 0. {
                    return None;
                }
            } else if p < 0. {
                t_in = t_in.max(q / p);
            } else {
                t_out = t_out.min(q / p);
            }
        }
    }
    (t_in <= t_out).then(|| [a + t_in * d, a + t_out * d])
}

/// Part of the convex polygon inside the half plane `(x - point) . normal <= 0`.
fn clip_half_plane(vertices: &[DVec2], point: DVec2, normal: DVec2) -> Vec<DVec2> {
    let mut clipped = Vec::with_capacity(vertices.len() + 1);
    for (i, &a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        let dist_a = (a - point).dot(normal);
        let dist_b = (b - point).dot(normal);
        if dist_a <= 0. {
            clipped.push(a);
        }
        if (dist_a < 0. && dist_b > 0.) || (dist_a > 0. && dist_b < 0.) {
            clipped.push(a + dist_a / (dist_a - dist_b) * (b - a));
        }
    }
    clipped
}

/// Part of the convex polygon inside the box `[lo, hi]`.
pub fn clip_polygon(vertices: &[DVec2], lo: DVec2, hi: DVec2) -> Vec<DVec2> {
    let mut clipped = vertices.to_vec();
    for (point, normal) in [
        (lo, DVec2::NEG_X),
        (hi, DVec2::X),
        (lo, DVec2::NEG_Y),
        (hi, DVec2::Y),
    ] {
        if clipped.is_empty() {
            break;
        }
        clipped = clip_half_plane(&clipped, point, normal);
    }
    clipped
}

/// Centroid and area of a 2D polygon, see [`polygon_midpoint_measure`].
pub fn polygon_centroid_measure(vertices: &[DVec2]) -> (DVec2, f64) {
    let vertices: Vec<DVec3> = vertices.iter().map(|v| v.extend(0.)).collect();
    let (centroid, area) = polygon_midpoint_measure(&vertices);
    (centroid.truncate(), area)
}

/// Circumcenter of the tetrahedron through the given 4 points.
pub fn tetrahedron_circumcenter(p0: DVec3, p1: DVec3, p2: DVec3, p3: DVec3) -> DVec3 {
    let a = p1 - p0;
    let b = p2 - p0;
    let c = p3 - p0;

    let d = 2. * a.dot(b.cross(c));
    let r = a.length_squared() * b.cross(c)
        + b.length_squared() * c.cross(a)
        + c.length_squared() * a.cross(b);

    p0 + r / d
}

/// Centroid and (unsigned) volume of the tetrahedron through the given 4 points.
pub fn tetrahedron_centroid_measure(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> (DVec3, f64) {
    let centroid = 0.25 * (a + b + c + d);
    let volume = (b - a).dot((c - a).cross(d - a)).abs() / 6.;
    (centroid, volume)
}

/// Midpoint (area weighted centroid) and area of a planar polygonal 3D face.
///
/// The vertices are assumed to be ordered around the face. Faces with fewer
/// than 3 vertices or zero area get the vertex average as midpoint and an area
/// of 0.
pub fn polygon_midpoint_measure(vertices: &[DVec3]) -> (DVec3, f64) {
    if vertices.is_empty() {
        return (DVec3::ZERO, 0.);
    }
    let average = vertices.iter().copied().sum::<DVec3>() / vertices.len() as f64;
    if vertices.len() < 3 {
        return (average, 0.);
    }

    let anchor = vertices[0];
    let mut area = 0.;
    let mut midpoint = DVec3::ZERO;
    for pair in vertices[1..].windows(2) {
        let (b, c) = (pair[0], pair[1]);
        let fan_area = 0.5 * (b - anchor).cross(c - anchor).length();
        area += fan_area;
        midpoint += fan_area * (anchor + b + c) / 3.;
    }

    if area > 0. {
        (midpoint / area, area)
    } else {
        (average, 0.)
    }
}
