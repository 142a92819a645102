//! Incremental Bowyer-Watson construction of a [`DelaunayTessellation`].
//!
//! This is a small reference producer, used to feed the Voronoi builder in
//! tests and in the demo driver. Point location is brute force, so it is only
//! meant for modest point counts.

use std::collections::{HashMap, HashSet};

use glam::DVec2;

use super::{DelaunayTessellation, GhostVertex, Triangle};
use crate::errors::MeshError;

/// Twice the signed area of the triangle `a, b, c` (positive if counterclockwise).
fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Positive if `p` lies strictly inside the circumcircle of the
/// counterclockwise triangle `a, b, c`.
fn in_circle(a: DVec2, b: DVec2, c: DVec2, p: DVec2) -> f64 {
    let ad = a - p;
    let bd = b - p;
    let cd = c - p;
    ad.length_squared() * bd.perp_dot(cd) - bd.length_squared() * ad.perp_dot(cd)
        + cd.length_squared() * ad.perp_dot(bd)
}

struct BowyerWatson {
    points: Vec<DVec2>,
    triangles: Vec<Option<[usize; 3]>>,
    /// Directed edge -> the triangle having this edge in counterclockwise order.
    edges: HashMap<(usize, usize), usize>,
}

impl BowyerWatson {
    /// Start from a super-triangle enclosing all `points`. The super-triangle
    /// vertices are prepended as placeholders 0, 1 and 2.
    fn new(points: &[DVec2]) -> Self {
        let (min, max) = points.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        let (center, span) = if points.is_empty() {
            (DVec2::ZERO, 1.)
        } else {
            (0.5 * (min + max), (max - min).max_element().max(1.))
        };
        let mut all_points = vec![
            center + DVec2::new(-20. * span, -10. * span),
            center + DVec2::new(20. * span, -10. * span),
            center + DVec2::new(0., 20. * span),
        ];
        all_points.extend_from_slice(points);

        let mut builder = Self {
            points: all_points,
            triangles: vec![],
            edges: HashMap::new(),
        };
        builder.add_triangle([0, 1, 2]);
        builder
    }

    fn add_triangle(&mut self, vertices: [usize; 3]) {
        let t_idx = self.triangles.len();
        for k in 0..3 {
            self.edges
                .insert((vertices[k], vertices[(k + 1) % 3]), t_idx);
        }
        self.triangles.push(Some(vertices));
    }

    fn remove_triangle(&mut self, t_idx: usize) {
        if let Some(vertices) = self.triangles[t_idx].take() {
            for k in 0..3 {
                self.edges.remove(&(vertices[k], vertices[(k + 1) % 3]));
            }
        }
    }

    fn locate(&self, p: DVec2) -> Option<usize> {
        self.triangles.iter().position(|t| {
            t.is_some_and(|[a, b, c]| {
                let (a, b, c) = (self.points[a], self.points[b], self.points[c]);
                orient(a, b, p) >= 0. && orient(b, c, p) >= 0. && orient(c, a, p) >= 0.
            })
        })
    }

    fn insert(&mut self, p_idx: usize) -> Result<(), MeshError> {
        let p = self.points[p_idx];
        let start = self.locate(p).ok_or_else(|| MeshError::InsertionFailed {
            vertex: p_idx,
            details: "point outside of the super-triangle".to_string(),
        })?;
        if let Some(vertices) = self.triangles[start] {
            if vertices.iter().any(|&v| self.points[v] == p) {
                return Err(MeshError::InsertionFailed {
                    vertex: p_idx,
                    details: format!("duplicate of point at {p}"),
                });
            }
        }

        // Flood fill the cavity of triangles whose circumcircle contains p.
        let mut cavity = HashSet::from([start]);
        let mut queue = vec![start];
        while let Some(t_idx) = queue.pop() {
            let Some(vertices) = self.triangles[t_idx] else {
                continue;
            };
            for k in 0..3 {
                let (a, b) = (vertices[k], vertices[(k + 1) % 3]);
                let Some(&twin) = self.edges.get(&(b, a)) else {
                    continue;
                };
                if cavity.contains(&twin) {
                    continue;
                }
                let Some([ta, tb, tc]) = self.triangles[twin] else {
                    continue;
                };
                if in_circle(self.points[ta], self.points[tb], self.points[tc], p) > 0. {
                    cavity.insert(twin);
                    queue.push(twin);
                }
            }
        }

        let mut boundary = vec![];
        for &t_idx in cavity.iter() {
            let Some(vertices) = self.triangles[t_idx] else {
                continue;
            };
            for k in 0..3 {
                let (a, b) = (vertices[k], vertices[(k + 1) % 3]);
                let outside = self
                    .edges
                    .get(&(b, a))
                    .map_or(true, |twin| !cavity.contains(twin));
                if outside {
                    boundary.push((a, b));
                }
            }
        }

        for &t_idx in cavity.iter() {
            self.remove_triangle(t_idx);
        }
        for (a, b) in boundary {
            self.add_triangle([a, b, p_idx]);
        }

        Ok(())
    }

    /// Compact the surviving triangles and derive their neighbour links.
    fn finish(self) -> (Vec<DVec2>, Vec<Triangle>) {
        let mut new_index = vec![usize::MAX; self.triangles.len()];
        let alive: Vec<[usize; 3]> = self
            .triangles
            .iter()
            .enumerate()
            .filter_map(|(old, t)| t.map(|vertices| (old, vertices)))
            .enumerate()
            .map(|(new, (old, vertices))| {
                new_index[old] = new;
                vertices
            })
            .collect();

        let triangles = alive
            .iter()
            .map(|&vertices| {
                let mut triangle = Triangle {
                    vertices,
                    neighbours: [None; 3],
                    index_in_neighbour: [0; 3],
                };
                for k in 0..3 {
                    let a = vertices[(k + 1) % 3];
                    let b = vertices[(k + 2) % 3];
                    let Some(&twin) = self.edges.get(&(b, a)) else {
                        continue;
                    };
                    let twin_vertices = alive[new_index[twin]];
                    // Unlinked edges are caught by the validation of the result.
                    if let Some(opposite) =
                        (0..3).find(|&j| twin_vertices[j] != a && twin_vertices[j] != b)
                    {
                        triangle.neighbours[k] = Some(new_index[twin]);
                        triangle.index_in_neighbour[k] = opposite;
                    }
                }
                triangle
            })
            .collect();

        (self.points, triangles)
    }
}

impl DelaunayTessellation {
    /// Triangulate the given local generators together with the ghost
    /// generators (position and ghost record).
    ///
    /// The three corners of an enclosing super-triangle become the placeholder
    /// vertices, followed by the generators and then the ghosts.
    pub fn build(generators: &[DVec2], ghosts: &[(DVec2, GhostVertex)]) -> Result<Self, MeshError> {
        let points: Vec<DVec2> = generators
            .iter()
            .copied()
            .chain(ghosts.iter().map(|(p, _)| *p))
            .collect();
        let mut builder = BowyerWatson::new(&points);
        for p_idx in 3..builder.points.len() {
            builder.insert(p_idx)?;
        }
        let (vertices, triangles) = builder.finish();
        log::debug!(
            "Built Delaunay triangulation of {} generators and {} ghosts with {} triangles",
            generators.len(),
            ghosts.len(),
            triangles.len()
        );

        let vertex_end = 3 + generators.len();
        Self::from_raw_parts(
            vertices,
            3,
            vertex_end,
            triangles,
            ghosts.iter().map(|(_, ghost)| *ghost).collect(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delaunay::VertexKind;

    #[test]
    fn test_predicates() {
        let a = DVec2::ZERO;
        let b = DVec2::X;
        let c = DVec2::Y;
        assert!(orient(a, b, c) > 0.);
        assert!(in_circle(a, b, c, DVec2::splat(0.5)) > 0.);
        assert!(in_circle(a, b, c, DVec2::splat(2.)) < 0.);
        assert_eq!(in_circle(a, b, c, DVec2::ONE), 0.);
    }

    #[test]
    fn test_build() {
        let generators = [
            DVec2::new(0.25, 0.25),
            DVec2::new(0.75, 0.25),
            DVec2::new(0.5, 0.75),
            DVec2::new(0.5, 0.375),
        ];
        let d = DelaunayTessellation::build(&generators, &[]).expect("Triangulation succeeds");

        // n points inside the super-triangle: 2n + 1 triangles.
        assert_eq!(d.triangles().len(), 2 * generators.len() + 1);
        assert_eq!(d.num_real(), 4);
        assert_eq!(d.vertex_kind(3), VertexKind::Real { local_idx: 0 });
        for t in d.triangles() {
            let [a, b, c] = t.vertices.map(|v| d.vertex(v));
            assert!(orient(a, b, c) > 0.);
            // Empty circumcircle property
            for v in 0..generators.len() + 3 {
                if !t.vertices.contains(&v) {
                    assert!(in_circle(a, b, c, d.vertex(v)) <= 0.);
                }
            }
        }
        for local_idx in 0..generators.len() {
            let del_idx = d.delaunay_index(local_idx);
            let (t, k) = d.incident_triangle(del_idx).expect("Every vertex has a triangle");
            assert_eq!(d.triangles()[t].vertices[k], del_idx);
        }
    }

    #[test]
    fn test_duplicate() {
        let generators = [DVec2::new(0.25, 0.25), DVec2::new(0.25, 0.25)];
        assert!(matches!(
            DelaunayTessellation::build(&generators, &[]),
            Err(MeshError::InsertionFailed { vertex: 4, .. })
        ));
    }
}
