use std::{
    collections::BTreeMap,
    io::{self, Write},
};

use glam::{DVec2, DVec3};
use rayon::prelude::*;

use crate::{
    config::Config,
    delaunay::DelaunayTessellation,
    errors::MeshError,
    face_registry::{Face, FaceNeighbour},
    flux::{flux_exchange, FaceGeometry, FluxInfo},
    generator::{Generator, PipelineStage},
    gradients::{face_contribution, GradientData, LimiterData},
    initial_conditions::{Boundary, GhostSource, Halo},
    physical_quantities::{Conserved, Gradients, Primitive, State},
    riemann_solver::RiemannFluxSolver,
    utils::{box_reflect, box_wrap, contains, AtomicF64Max, HydroDimension},
    voronoi::{BuildStats, Voronoi},
};

/// Relative tolerance on the net flux between two generators across periodic faces.
const CONSERVATION_TOLERANCE: f64 = 1e-10;

/// The generators of one partition, their halo and their tessellation.
///
/// Every step that needs fluxes runs through [`rebuild`](Self::rebuild),
/// [`gradient_estimate`](Self::gradient_estimate),
/// [`slope_limit`](Self::slope_limit), [`flux_exchange`](Self::flux_exchange)
/// and [`finalize`](Self::finalize), in that order.
pub struct Space {
    generators: Vec<Generator>,
    halo: Vec<Generator>,
    /// Local generators the ghosts of `halo` are images of, if known.
    halo_sources: Vec<GhostSource>,
    active: Vec<bool>,
    delaunay: Option<DelaunayTessellation>,
    voronoi: Voronoi,
    config: Config,
    riemann_solver: Box<dyn RiemannFluxSolver>,
}

impl Space {
    pub fn new(config: Config, generators: Vec<Generator>) -> Self {
        Self {
            active: vec![false; generators.len()],
            generators,
            halo: vec![],
            halo_sources: vec![],
            delaunay: None,
            voronoi: Voronoi::new(config.tessellation),
            riemann_solver: Box::new(config.hydrodynamics.riemann_solver),
            config,
        }
    }

    pub fn with_riemann_solver(mut self, riemann_solver: Box<dyn RiemannFluxSolver>) -> Self {
        self.riemann_solver = riemann_solver;
        self
    }

    /// Use the given triangulation of the generators and ghosts, and the
    /// states of the ghosts (indexed by the foreign index of the ghost vertices).
    ///
    /// The ghosts are treated as generators of other partitions, their states
    /// are never updated.
    pub fn set_tessellation(
        &mut self,
        delaunay: DelaunayTessellation,
        halo: Vec<Generator>,
    ) -> Result<(), MeshError> {
        if delaunay.num_real() != self.generators.len() {
            return Err(MeshError::CountMismatch {
                expected: self.generators.len(),
                found: delaunay.num_real(),
            });
        }
        self.voronoi.reset();
        self.voronoi.set_domain(None);
        self.delaunay = Some(delaunay);
        self.halo = halo;
        self.halo_sources.clear();
        Ok(())
    }

    /// Triangulate the current generator positions together with the ghosts of `halo`.
    ///
    /// The ghosts follow the state of their sources from here on.
    pub fn retessellate(&mut self, halo: Halo) -> Result<(), MeshError> {
        let positions: Vec<_> = self.generators.iter().map(|g| g.x).collect();
        let delaunay = DelaunayTessellation::build(&positions, &halo.vertices)?;
        self.set_tessellation(delaunay, halo.generators)?;
        self.voronoi.set_domain(halo.domain);
        self.halo_sources = halo.sources;
        self.sync_halo();
        Ok(())
    }

    /// Copy the state of every ghost's source into the ghost.
    fn sync_halo(&mut self) {
        let generators = &self.generators;
        for (ghost, source) in self.halo.iter_mut().zip(self.halo_sources.iter()) {
            let Some(g) = generators.get(source.local_idx) else {
                continue;
            };
            ghost.primitives = source.image_primitives(g);
            ghost.v = source.image_velocity(g);
            ghost.gradients = source.image_gradients(g);
            ghost.dt = g.dt;
        }
    }

    /// The local generator a ghost is a periodic copy of.
    fn periodic_source(halo_sources: &[GhostSource], ghost: usize) -> Option<usize> {
        halo_sources
            .get(ghost)
            .filter(|source| source.is_periodic())
            .map(|source| source.local_idx)
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn generators_mut(&mut self) -> &mut [Generator] {
        &mut self.generators
    }

    pub fn halo(&self) -> &[Generator] {
        &self.halo
    }

    pub fn voronoi(&self) -> &Voronoi {
        &self.voronoi
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_active(&self, local_idx: usize) -> bool {
        self.active.get(local_idx).copied().unwrap_or(false)
    }

    /// Build the cells of the active generators and start a new step for them.
    pub fn rebuild(
        &mut self,
        active: &[bool],
        characteristic_length: f64,
    ) -> Result<BuildStats, MeshError> {
        let delaunay = self
            .delaunay
            .as_ref()
            .ok_or_else(|| MeshError::InvalidVertexRanges("no tessellation set".to_string()))?;
        let stats = self.voronoi.build(delaunay, active, characteristic_length)?;

        self.active.clear();
        self.active.extend_from_slice(active);
        for (generator, _) in self.generators.iter_mut().zip(active).filter(|(_, a)| **a) {
            generator.reset_stage();
            generator.v_max = 0.;
        }
        Ok(stats)
    }

    /// Derive the primitive quantities of the active generators from their
    /// conserved quantities and the volumes of the rebuilt cells. Generators
    /// move with the fluid.
    pub fn update_primitives(&mut self) {
        let eos = self.config.hydrodynamics.gas_law;
        let voronoi = &self.voronoi;
        let active = &self.active;
        self.generators
            .par_iter_mut()
            .enumerate()
            .filter(|(idx, _)| active[*idx])
            .for_each(|(idx, g)| {
                let Some(cell) = voronoi.cell(idx) else {
                    return;
                };
                g.volume = cell.volume();
                g.centroid = cell.centroid();
                g.convert_conserved_to_primitive(&eos);
                g.v = g.primitives.velocity();
            });
        self.sync_halo();
    }

    /// Advance all active generators to the given stage.
    fn advance_active(&mut self, to: PipelineStage) -> Result<(), MeshError> {
        for (idx, generator) in self.generators.iter_mut().enumerate() {
            if self.active[idx] {
                generator.advance(idx, to)?;
            }
        }
        Ok(())
    }

    fn neighbour<'a>(
        generators: &'a [Generator],
        halo: &'a [Generator],
        face: &Face,
    ) -> Result<&'a Generator, MeshError> {
        match face.right() {
            FaceNeighbour::Local(idx) => Ok(&generators[idx]),
            FaceNeighbour::Foreign(idx) => {
                halo.get(idx)
                    .ok_or_else(|| MeshError::ForeignIndexOutOfRange {
                        index: idx,
                        len: halo.len(),
                        relation: face.relation(),
                    })
            }
        }
    }

    /// Estimate the gradients of the primitive quantities of all active generators.
    pub fn gradient_estimate(&mut self) -> Result<(), MeshError> {
        self.advance_active(PipelineStage::GradientsAccumulated)?;

        let faces: Vec<&Face> = self.voronoi.faces().collect();
        let generators = &self.generators;
        let halo = &self.halo;
        let contributions = faces
            .par_iter()
            .map(|face| {
                let left = &generators[face.left()];
                let right = Self::neighbour(generators, halo, face)?;
                let c = face.midpoint().extend(0.) - 0.5 * (left.position() + right.position());
                let r_ij = left.position() - right.position();
                Ok((
                    face.left(),
                    face.right(),
                    face_contribution(&left.primitives, &right.primitives, face.area(), c, r_ij),
                ))
            })
            .collect::<Result<Vec<_>, MeshError>>()?;

        let mut gradient_data = vec![GradientData::default(); self.generators.len()];
        for (left, right, contribution) in contributions {
            if self.active[left] {
                gradient_data[left].collect(contribution);
            }
            if let FaceNeighbour::Local(right) = right {
                if self.active[right] {
                    gradient_data[right].collect(-1. * contribution);
                }
            }
        }

        for (idx, (generator, data)) in self
            .generators
            .iter_mut()
            .zip(gradient_data)
            .enumerate()
        {
            if !self.active[idx] {
                continue;
            }
            let volume = self.voronoi.cell(idx).map_or(0., |cell| cell.volume());
            generator.gradients = data.finalize(volume);
            debug_assert!(generator.gradients.is_finite());
        }

        Ok(())
    }

    /// Limit the gradients of all active generators, so that the extrapolations
    /// to their faces stay within the range of their neighbours' states.
    pub fn slope_limit(&mut self) -> Result<(), MeshError> {
        self.advance_active(PipelineStage::SlopesLimited)?;

        let generators = &self.generators;
        let halo = &self.halo;
        let voronoi = &self.voronoi;
        let active = &self.active;
        let limited = generators
            .par_iter()
            .enumerate()
            .map(|(idx, generator)| {
                if !active[idx] {
                    return Ok(None);
                }
                let mut limiter = LimiterData::new(&generator.primitives);
                for face in voronoi.cell_faces(idx) {
                    let other = if face.left() == idx {
                        Self::neighbour(generators, halo, face)?
                    } else {
                        &generators[face.left()]
                    };
                    let dx = face.midpoint().extend(0.) - generator.position();
                    let extrapolated = generator.gradients.dot(dx);
                    limiter.collect(&other.primitives, &extrapolated);
                }
                let mut gradients = generator.gradients;
                limiter.limit(&mut gradients, &generator.primitives);
                Ok(Some(gradients))
            })
            .collect::<Result<Vec<Option<Gradients<Primitive>>>, MeshError>>()?;

        for (generator, gradients) in self.generators.iter_mut().zip(limited) {
            if let Some(gradients) = gradients {
                generator.gradients = gradients;
            }
        }
        self.sync_halo();

        Ok(())
    }

    /// Exchange fluxes across all faces.
    ///
    /// The flux of a face is subtracted from its left and added to its right
    /// generator, also when the right generator is inactive. Fluxes across faces
    /// with a foreign right endpoint leave the partition, unless the endpoint is
    /// a periodic copy of a local generator:
    /// * an inactive copied generator receives the flux directly;
    /// * an active one exchanges the flux with the left generator across its
    ///   own face, so the fluxes between each such pair of generators must
    ///   cancel.
    pub fn flux_exchange(&mut self) -> Result<(), MeshError> {
        self.advance_active(PipelineStage::FluxesExchanged)?;

        let faces: Vec<&Face> = self.voronoi.faces().collect();
        let generators = &self.generators;
        let halo = &self.halo;
        let halo_sources = &self.halo_sources;
        let eos = &self.config.hydrodynamics.gas_law;
        let riemann_solver = self.riemann_solver.as_ref();
        let v_max: Vec<_> = generators
            .iter()
            .map(|g| AtomicF64Max::new(g.v_max))
            .collect();

        let fluxes = faces
            .par_iter()
            .map(|face| {
                let left = &generators[face.left()];
                let right = Self::neighbour(generators, halo, face)?;
                let geometry = FaceGeometry {
                    area: face.area(),
                    midpoint: face.midpoint().extend(0.),
                };
                let flux_info = flux_exchange(
                    &left.face_side(),
                    &right.face_side(),
                    &geometry,
                    eos,
                    riemann_solver,
                );
                v_max[face.left()].fetch_max(flux_info.v_max);
                let receiver = match face.right() {
                    FaceNeighbour::Local(right) => Some(right),
                    FaceNeighbour::Foreign(ghost) => Self::periodic_source(halo_sources, ghost),
                };
                if let Some(receiver) = receiver {
                    v_max[receiver].fetch_max(flux_info.v_max);
                }
                Ok((face.left(), face.right(), flux_info))
            })
            .collect::<Result<Vec<(usize, FaceNeighbour, FluxInfo)>, MeshError>>()?;

        let mut outflow = State::<Conserved>::vacuum();
        let mut periodic = BTreeMap::<(usize, usize), State<Conserved>>::new();
        let mut scale = 0f64;
        for (left, right, flux_info) in fluxes {
            self.generators[left].fluxes -= flux_info.fluxes;
            match right {
                FaceNeighbour::Local(right) => self.generators[right].fluxes += flux_info.fluxes,
                FaceNeighbour::Foreign(ghost) => {
                    match Self::periodic_source(&self.halo_sources, ghost) {
                        Some(source) if self.active[source] => {
                            *periodic.entry((left, source)).or_insert_with(State::vacuum) +=
                                flux_info.fluxes;
                        }
                        Some(source) => self.generators[source].fluxes += flux_info.fluxes,
                        None => outflow += flux_info.fluxes,
                    }
                }
            }
            scale = scale.max(flux_info.fluxes.max_abs());
        }
        for (generator, v_max) in self.generators.iter_mut().zip(v_max) {
            generator.v_max = v_max.into_inner();
        }

        log::debug!(
            "Exchanged fluxes across {} faces, mass outflow {:.3e}",
            faces.len(),
            outflow.mass()
        );

        for (&(left, source), &flux) in periodic.iter() {
            let imbalance = if left == source {
                flux
            } else {
                flux + periodic
                    .get(&(source, left))
                    .copied()
                    .unwrap_or_else(State::vacuum)
            };
            Self::check_conservation(&imbalance, scale)?;
        }
        Ok(())
    }

    fn check_conservation(imbalance: &State<Conserved>, scale: f64) -> Result<(), MeshError> {
        let tolerance = CONSERVATION_TOLERANCE * scale.max(f64::MIN_POSITIVE);
        let quantities = [
            ("mass", imbalance.mass()),
            ("momentum", imbalance.momentum().abs().max_element()),
            ("energy", imbalance.energy()),
        ];
        for (quantity, imbalance) in quantities {
            if !(imbalance.abs() <= tolerance) {
                return Err(MeshError::NonConservation {
                    quantity,
                    imbalance,
                });
            }
        }
        Ok(())
    }

    /// Hand the cell volumes and centroids to the active generators and reset
    /// the tessellation.
    pub fn finalize(&mut self) -> Result<(), MeshError> {
        self.advance_active(PipelineStage::Finalized)?;
        for (idx, generator) in self.generators.iter_mut().enumerate() {
            if !self.active[idx] {
                continue;
            }
            if let Some(cell) = self.voronoi.cell(idx) {
                generator.volume = cell.volume();
                generator.centroid = cell.centroid();
            }
        }
        self.voronoi.reset();
        Ok(())
    }

    /// Run all stages of a step for the given active generators, starting from
    /// their current primitive quantities.
    pub fn step(
        &mut self,
        active: &[bool],
        characteristic_length: f64,
    ) -> Result<BuildStats, MeshError> {
        let stats = self.rebuild(active, characteristic_length)?;
        self.gradient_estimate()?;
        self.slope_limit()?;
        self.flux_exchange()?;
        self.finalize()?;
        Ok(stats)
    }

    /// Smallest CFL time step of all generators.
    pub fn min_timestep(&self) -> f64 {
        let cfl_criterion = self.config.hydrodynamics.cfl_criterion;
        let eos = &self.config.hydrodynamics.gas_law;
        self.generators
            .par_iter()
            .map(|g| g.timestep(cfl_criterion, eos, HydroDimension::HydroDimension2D))
            .reduce(|| f64::INFINITY, f64::min)
    }

    /// Add the accumulated fluxes to the conserved quantities.
    ///
    /// The primitive quantities follow in
    /// [`update_primitives`](Self::update_primitives), once the volumes of the
    /// drifted cells are known.
    pub fn apply_flux(&mut self) {
        self.generators.par_iter_mut().for_each(|g| g.apply_flux());
    }

    /// Move all generators with their own velocity.
    pub fn drift(&mut self, dt: f64) {
        self.generators.par_iter_mut().for_each(|g| {
            g.x += dt * g.v.truncate();
        });
    }

    /// Put generators that left the box back in. Reflected generators also
    /// have the normal component of their velocity and momentum reversed.
    pub fn keep_in_box(&mut self, box_size: DVec2, boundary: Boundary) {
        let box_size = box_size.extend(1.);
        self.generators.par_iter_mut().for_each(|g| {
            let mut x = g.position();
            if contains(box_size, x, 2) {
                return;
            }
            match boundary {
                Boundary::Periodic => box_wrap(box_size, &mut x, 2),
                Boundary::Reflective => {
                    let reflected = box_reflect(box_size, &mut x, 2);
                    for (axis, normal) in [DVec3::X, DVec3::Y].into_iter().enumerate() {
                        if reflected[axis] {
                            g.reflect(normal);
                        }
                    }
                }
            }
            g.x = x.truncate();
        });
    }

    /// Write the current tessellation as tab separated records.
    pub fn dump<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let positions: Vec<DVec2> = self.generators.iter().map(|g| g.x).collect();
        self.voronoi.write_grid(&positions, writer)
    }
}
