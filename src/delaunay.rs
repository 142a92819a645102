//! The Delaunay triangulation consumed by the Voronoi builder.
//!
//! Vertices are stored in three consecutive index ranges:
//!  - `[0, vertex_start)`: placeholder vertices (e.g. the corners of an
//!    enclosing super-triangle). These never carry geometry for a Voronoi cell.
//!  - `[vertex_start, vertex_end)`: real vertices, one per local generator. The
//!    local generator index is `delaunay index - vertex_start`.
//!  - `[vertex_end, len)`: ghost vertices, imported from neighbouring
//!    partitions or mirrored at a physical boundary. Each ghost maps to a
//!    foreign generator index and a relation class.
//!
//! Triangles are oriented counterclockwise. `neighbours[i]` is the triangle on
//! the other side of the edge opposite `vertices[i]`, and
//! `index_in_neighbour[i]` is the slot of the vertex in that neighbour that is
//! not shared with this triangle.

use glam::DVec2;

use crate::{errors::MeshError, relation::RelationClass};

mod bowyer_watson;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [usize; 3],
    pub neighbours: [Option<usize>; 3],
    pub index_in_neighbour: [usize; 3],
}

impl Triangle {
    /// Slot of the given vertex in this triangle.
    pub fn slot_of(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GhostVertex {
    /// Index of the generator this ghost stands for in the halo.
    pub foreign_idx: usize,
    pub relation: RelationClass,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexKind {
    Placeholder,
    Real { local_idx: usize },
    Ghost(GhostVertex),
}

#[derive(Debug, Clone)]
pub struct DelaunayTessellation {
    vertices: Vec<DVec2>,
    vertex_start: usize,
    vertex_end: usize,
    triangles: Vec<Triangle>,
    vertex_triangles: Vec<Option<(usize, usize)>>,
    ghosts: Vec<GhostVertex>,
}

impl DelaunayTessellation {
    /// Wrap a finished triangulation, validating its index ranges and the
    /// reciprocity of all neighbour links.
    pub fn from_raw_parts(
        vertices: Vec<DVec2>,
        vertex_start: usize,
        vertex_end: usize,
        triangles: Vec<Triangle>,
        ghosts: Vec<GhostVertex>,
    ) -> Result<Self, MeshError> {
        if vertex_start > vertex_end || vertex_end > vertices.len() {
            return Err(MeshError::InvalidVertexRanges(format!(
                "real range [{vertex_start}, {vertex_end}) does not fit in {} vertices",
                vertices.len()
            )));
        }
        if ghosts.len() != vertices.len() - vertex_end {
            return Err(MeshError::InvalidVertexRanges(format!(
                "{} ghost vertices but {} ghost records",
                vertices.len() - vertex_end,
                ghosts.len()
            )));
        }

        let mut vertex_triangles = vec![None; vertices.len()];
        for (t_idx, triangle) in triangles.iter().enumerate() {
            for k in 0..3 {
                let v = triangle.vertices[k];
                if v >= vertices.len() {
                    return Err(MeshError::BrokenAdjacency {
                        generator: v,
                        triangle: t_idx,
                        details: format!("vertex index {v} out of range"),
                    });
                }
                if vertex_triangles[v].is_none() {
                    vertex_triangles[v] = Some((t_idx, k));
                }

                let Some(ngb) = triangle.neighbours[k] else {
                    continue;
                };
                let reciprocal = triangles
                    .get(ngb)
                    .and_then(|n| n.neighbours.get(triangle.index_in_neighbour[k]).copied())
                    .flatten();
                if reciprocal != Some(t_idx) {
                    return Err(MeshError::BrokenAdjacency {
                        generator: v,
                        triangle: t_idx,
                        details: format!("neighbour link {k} -> {ngb} is not reciprocal"),
                    });
                }
            }
        }

        Ok(Self {
            vertices,
            vertex_start,
            vertex_end,
            triangles,
            vertex_triangles,
            ghosts,
        })
    }

    pub fn vertex_kind(&self, del_idx: usize) -> VertexKind {
        if del_idx < self.vertex_start {
            VertexKind::Placeholder
        } else if del_idx < self.vertex_end {
            VertexKind::Real {
                local_idx: del_idx - self.vertex_start,
            }
        } else {
            match self.ghosts.get(del_idx - self.vertex_end) {
                Some(ghost) => VertexKind::Ghost(*ghost),
                None => VertexKind::Placeholder,
            }
        }
    }

    pub fn is_placeholder(&self, del_idx: usize) -> bool {
        matches!(self.vertex_kind(del_idx), VertexKind::Placeholder)
    }

    /// Delaunay vertex index of the local generator `local_idx`.
    pub fn delaunay_index(&self, local_idx: usize) -> usize {
        debug_assert!(local_idx < self.num_real());
        local_idx + self.vertex_start
    }

    pub fn num_real(&self) -> usize {
        self.vertex_end - self.vertex_start
    }

    pub fn vertex(&self, del_idx: usize) -> DVec2 {
        self.vertices[del_idx]
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounds checked triangle access.
    pub fn triangle(&self, t_idx: usize) -> Option<&Triangle> {
        self.triangles.get(t_idx)
    }

    /// One triangle containing the given vertex, and the vertex' slot in it.
    pub fn incident_triangle(&self, del_idx: usize) -> Option<(usize, usize)> {
        self.vertex_triangles.get(del_idx).copied().flatten()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Two triangles sharing the diagonal of the unit square.
    fn square() -> (Vec<DVec2>, Vec<Triangle>) {
        let vertices = vec![
            DVec2::new(0., 0.),
            DVec2::new(1., 0.),
            DVec2::new(1., 1.),
            DVec2::new(0., 1.),
        ];
        let triangles = vec![
            Triangle {
                vertices: [0, 1, 2],
                neighbours: [None, Some(1), None],
                index_in_neighbour: [0, 1, 0],
            },
            Triangle {
                vertices: [0, 2, 3],
                neighbours: [None, None, Some(0)],
                index_in_neighbour: [0, 0, 1],
            },
        ];
        (vertices, triangles)
    }

    #[test]
    fn test_ranges() {
        let (vertices, triangles) = square();
        let ghost = GhostVertex {
            foreign_idx: 7,
            relation: RelationClass::Boundary,
        };
        let d = DelaunayTessellation::from_raw_parts(vertices, 1, 3, triangles, vec![ghost])
            .expect("Valid triangulation");
        assert_eq!(d.vertex_kind(0), VertexKind::Placeholder);
        assert_eq!(d.vertex_kind(1), VertexKind::Real { local_idx: 0 });
        assert_eq!(d.vertex_kind(2), VertexKind::Real { local_idx: 1 });
        assert_eq!(d.vertex_kind(3), VertexKind::Ghost(ghost));
        assert_eq!(d.delaunay_index(1), 2);
        assert_eq!(d.incident_triangle(3), Some((1, 2)));
    }

    #[test]
    fn test_invalid_links() {
        let (vertices, mut triangles) = square();
        triangles[1].neighbours[2] = None;
        let result = DelaunayTessellation::from_raw_parts(vertices, 0, 4, triangles, vec![]);
        assert!(matches!(result, Err(MeshError::BrokenAdjacency { .. })));

        let (vertices, triangles) = square();
        let result = DelaunayTessellation::from_raw_parts(vertices, 0, 3, triangles, vec![]);
        assert!(matches!(result, Err(MeshError::InvalidVertexRanges(_))));
    }
}
