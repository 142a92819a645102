//! Voronoi cells and faces built from the dual Delaunay triangulation.
//!
//! For every active generator, the ring of triangles around it is walked in
//! counterclockwise order. The circumcenters of consecutive triangles are the
//! vertices of the cell: each pair spans a fan triangle with the generator,
//! adding to the volume and centroid of the cell, and a face shared with the
//! generator on the other side of the crossed Delaunay edge.

use std::io::{self, Write};

use glam::DVec2;
use rayon::prelude::*;

use crate::{
    config::TessellationCfg,
    connectivity::{ConnectivityIndex, Span},
    delaunay::{DelaunayTessellation, Triangle, VertexKind},
    errors::MeshError,
    face_registry::{Face, FaceOutcome, FaceRegistry, RegistryStats, RightVertex},
    geometry::{
        circumcenter, clip_polygon, clip_segment, polygon_centroid_measure,
        triangle_centroid_measure,
    },
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiCell {
    volume: f64,
    centroid: DVec2,
    span: Span,
}

impl VoronoiCell {
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Centroid relative to the generator.
    pub fn centroid(&self) -> DVec2 {
        self.centroid
    }

    pub fn face_count(&self) -> usize {
        self.span.count
    }

    /// Offset of the faces of this cell in the connectivity index.
    pub fn face_connections_offset(&self) -> usize {
        self.span.offset
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub cells_built: usize,
    /// Active generators whose cell had (almost) zero volume.
    pub cells_skipped: usize,
    pub faces: RegistryStats,
}

#[derive(Debug)]
pub struct Voronoi {
    cfg: TessellationCfg,
    cells: Vec<Option<VoronoiCell>>,
    registry: FaceRegistry,
    connectivity: ConnectivityIndex,
    circumcenters: Vec<Option<DVec2>>,
    domain: Option<DVec2>,
}

impl Voronoi {
    pub fn new(cfg: TessellationCfg) -> Self {
        Self {
            cfg,
            cells: vec![],
            registry: FaceRegistry::new(0., cfg.store_faces),
            connectivity: ConnectivityIndex::new(),
            circumcenters: vec![],
            domain: None,
        }
    }

    /// Clip the cells of generators lying on a side of the box `[0, domain]`
    /// to that box.
    ///
    /// A generator on a reflective wall is its own mirror image, so its cell
    /// extends symmetrically beyond the wall. All other cells are left as is.
    pub fn set_domain(&mut self, domain: Option<DVec2>) {
        self.domain = domain;
    }

    /// Discard all cells and faces, keeping the allocations.
    pub fn reset(&mut self) {
        self.cells.clear();
        self.registry.reset(0.);
        self.connectivity.reset(0);
        self.circumcenters.clear();
    }

    /// Rebuild the cells of the active generators.
    ///
    /// `characteristic_length` sets the scale for the minimal face and cell
    /// size. On error, the partially built tessellation is discarded.
    pub fn build(
        &mut self,
        delaunay: &DelaunayTessellation,
        active: &[bool],
        characteristic_length: f64,
    ) -> Result<BuildStats, MeshError> {
        let result = self.build_cells(delaunay, active, characteristic_length);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn build_cells(
        &mut self,
        delaunay: &DelaunayTessellation,
        active: &[bool],
        characteristic_length: f64,
    ) -> Result<BuildStats, MeshError> {
        let num_generators = delaunay.num_real();
        if active.len() != num_generators {
            return Err(MeshError::CountMismatch {
                expected: num_generators,
                found: active.len(),
            });
        }

        self.cells.clear();
        self.cells.resize(num_generators, None);
        self.registry
            .reset(self.cfg.min_rel_face_size * characteristic_length);
        self.connectivity.reset(num_generators);
        self.compute_circumcenters(delaunay, active);

        let min_cell_volume =
            self.cfg.min_rel_cell_volume * characteristic_length * characteristic_length;
        let mut stats = BuildStats::default();
        // Ascending order, the face registry relies on it.
        for local_idx in (0..num_generators).filter(|&idx| active[idx]) {
            let cell = self.build_cell(delaunay, active, local_idx)?;
            if cell.volume > min_cell_volume {
                self.cells[local_idx] = Some(cell);
                stats.cells_built += 1;
            } else {
                log::debug!("Skipping degenerate cell of generator {local_idx}");
                stats.cells_skipped += 1;
            }
        }
        stats.faces = self.registry.stats();

        log::debug!(
            "Built {} cells ({} skipped) with {} faces: {} reused, {} degenerate, {} duplicate, {} unmatched",
            stats.cells_built,
            stats.cells_skipped,
            stats.faces.new,
            stats.faces.reused,
            stats.faces.degenerate,
            stats.faces.duplicate,
            stats.faces.unmatched
        );

        Ok(stats)
    }

    /// Circumcenters of all triangles touching an active generator.
    fn compute_circumcenters(&mut self, delaunay: &DelaunayTessellation, active: &[bool]) {
        let touches_active = |triangle: &Triangle| {
            triangle.vertices.iter().any(|&v| {
                matches!(delaunay.vertex_kind(v), VertexKind::Real { local_idx } if active[local_idx])
            })
        };
        self.circumcenters.clear();
        self.circumcenters
            .par_extend(delaunay.triangles().par_iter().map(|triangle| {
                let has_placeholder = triangle.vertices.iter().any(|&v| delaunay.is_placeholder(v));
                if has_placeholder || !touches_active(triangle) {
                    return None;
                }
                let [p0, p1, p2] = triangle.vertices.map(|v| delaunay.vertex(v));
                Some(circumcenter(p0, p1, p2))
            }));
    }

    /// Triangle of the ring around `generator`, checked for placeholders.
    fn ring_triangle<'a>(
        delaunay: &'a DelaunayTessellation,
        generator: usize,
        del_idx: usize,
        t_idx: usize,
    ) -> Result<&'a Triangle, MeshError> {
        let triangle = delaunay
            .triangle(t_idx)
            .ok_or_else(|| MeshError::BrokenAdjacency {
                generator,
                triangle: t_idx,
                details: "triangle index out of range".to_string(),
            })?;
        if let Some(&vertex) = triangle.vertices.iter().find(|&&v| delaunay.is_placeholder(v)) {
            return Err(MeshError::PlaceholderInRing {
                generator,
                triangle: t_idx,
                vertex,
            });
        }
        if triangle.slot_of(del_idx).is_none() {
            return Err(MeshError::BrokenAdjacency {
                generator,
                triangle: t_idx,
                details: "triangle does not contain the generator".to_string(),
            });
        }
        Ok(triangle)
    }

    fn circumcenter_of(&self, generator: usize, t_idx: usize) -> Result<DVec2, MeshError> {
        self.circumcenters
            .get(t_idx)
            .copied()
            .flatten()
            .ok_or_else(|| MeshError::BrokenAdjacency {
                generator,
                triangle: t_idx,
                details: "no circumcenter for triangle".to_string(),
            })
    }

    fn add_face(
        &mut self,
        delaunay: &DelaunayTessellation,
        active: &[bool],
        left: usize,
        left_del_idx: usize,
        right_del_idx: usize,
        vertices: [DVec2; 2],
    ) -> Result<FaceOutcome, MeshError> {
        let right = match delaunay.vertex_kind(right_del_idx) {
            VertexKind::Real { local_idx } => RightVertex::Local {
                local_idx,
                active: active[local_idx],
            },
            VertexKind::Ghost(ghost) => RightVertex::Ghost(ghost),
            VertexKind::Placeholder => {
                return Err(MeshError::PlaceholderInRing {
                    generator: left,
                    triangle: usize::MAX,
                    vertex: right_del_idx,
                })
            }
        };
        Ok(self.registry.add_or_find(
            &mut self.connectivity,
            left,
            left_del_idx,
            right,
            right_del_idx,
            vertices,
        ))
    }

    fn build_cell(
        &mut self,
        delaunay: &DelaunayTessellation,
        active: &[bool],
        local_idx: usize,
    ) -> Result<VoronoiCell, MeshError> {
        let del_idx = delaunay.delaunay_index(local_idx);
        let generator = delaunay.vertex(del_idx);
        let clip = self.domain.filter(|&domain| {
            (0..2).any(|axis| generator[axis] == 0. || generator[axis] == domain[axis])
        });
        let fan = |a: DVec2, b: DVec2| match clip {
            Some(domain) => {
                polygon_centroid_measure(&clip_polygon(&[generator, a, b], DVec2::ZERO, domain))
            }
            None => triangle_centroid_measure(generator, a, b),
        };
        // Faces outside the box get zero length, which the registry rejects
        let face = |a: DVec2, b: DVec2| match clip {
            Some(domain) => clip_segment(a, b, DVec2::ZERO, domain).unwrap_or([a, a]),
            None => [a, b],
        };
        let (t0, k0) =
            delaunay
                .incident_triangle(del_idx)
                .ok_or_else(|| MeshError::BrokenAdjacency {
                    generator: local_idx,
                    triangle: usize::MAX,
                    details: "generator has no incident triangle".to_string(),
                })?;
        let broken_link = |triangle: usize| MeshError::BrokenAdjacency {
            generator: local_idx,
            triangle,
            details: "ring around generator is not closed".to_string(),
        };

        let triangle0 = Self::ring_triangle(delaunay, local_idx, del_idx, t0)?;
        let next = (k0 + 1) % 3;
        let first_ngb = triangle0.vertices[next];
        let first_cc = self.circumcenter_of(local_idx, t0)?;
        let mut t1 = triangle0.neighbours[next].ok_or_else(|| broken_link(t0))?;
        let mut cur_in_next = triangle0.index_in_neighbour[next];

        self.connectivity.open_span(local_idx)?;
        let mut volume = 0.;
        let mut centroid = DVec2::ZERO;
        let mut prev_cc = first_cc;
        let mut steps = 0;
        while t1 != t0 {
            steps += 1;
            if steps > delaunay.triangles().len() {
                return Err(broken_link(t1));
            }
            let triangle1 = Self::ring_triangle(delaunay, local_idx, del_idx, t1)?;
            let next_in_cur = (cur_in_next + 2) % 3;
            let ngb = triangle1.vertices[next_in_cur];
            let cc = self.circumcenter_of(local_idx, t1)?;

            let (fan_centroid, fan_volume) = fan(prev_cc, cc);
            volume += fan_volume;
            centroid += fan_volume * fan_centroid;
            self.add_face(delaunay, active, local_idx, del_idx, ngb, face(prev_cc, cc))?;

            cur_in_next = triangle1.index_in_neighbour[next_in_cur];
            t1 = triangle1.neighbours[next_in_cur].ok_or_else(|| broken_link(t1))?;
            prev_cc = cc;
        }

        // Close the ring
        let (fan_centroid, fan_volume) = fan(prev_cc, first_cc);
        volume += fan_volume;
        centroid += fan_volume * fan_centroid;
        self.add_face(delaunay, active, local_idx, del_idx, first_ngb, face(prev_cc, first_cc))?;

        let span = self.connectivity.close_span().unwrap_or_default();
        let centroid = if volume > 0. {
            centroid / volume - generator
        } else {
            DVec2::ZERO
        };
        Ok(VoronoiCell {
            volume,
            centroid,
            span,
        })
    }

    pub fn cell(&self, local_idx: usize) -> Option<&VoronoiCell> {
        self.cells.get(local_idx).and_then(|cell| cell.as_ref())
    }

    pub fn cells(&self) -> &[Option<VoronoiCell>] {
        &self.cells
    }

    pub fn registry(&self) -> &FaceRegistry {
        &self.registry
    }

    pub fn connectivity(&self) -> &ConnectivityIndex {
        &self.connectivity
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.registry.faces()
    }

    /// The faces of the cell of the given generator.
    pub fn cell_faces(&self, local_idx: usize) -> impl Iterator<Item = &Face> {
        self.connectivity
            .span(local_idx)
            .iter()
            .map(|entry| self.registry.face(*entry))
    }

    /// Dump the generators, cells and faces as tab separated records:
    /// `G x y`, `C centroid_x centroid_y volume face_count` and
    /// `F relation area midpoint_x midpoint_y [vertices]`.
    pub fn write_grid<W: Write>(&self, generators: &[DVec2], writer: &mut W) -> io::Result<()> {
        for g in generators {
            writeln!(writer, "G\t{}\t{}", g.x, g.y)?;
        }
        for (g, cell) in generators.iter().zip(self.cells.iter()) {
            if let Some(cell) = cell {
                let centroid = *g + cell.centroid;
                writeln!(
                    writer,
                    "C\t{}\t{}\t{}\t{}",
                    centroid.x,
                    centroid.y,
                    cell.volume,
                    cell.face_count()
                )?;
            }
        }
        for face in self.faces() {
            write!(
                writer,
                "F\t{}\t{}\t{}\t{}",
                face.relation().code(),
                face.area(),
                face.midpoint().x,
                face.midpoint().y
            )?;
            if let Some([a, b]) = face.vertices() {
                write!(writer, "\t{}\t{}\t{}\t{}", a.x, a.y, b.x, b.y)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
