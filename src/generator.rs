use glam::{DVec2, DVec3};

use crate::{
    errors::MeshError,
    flux::FaceSide,
    gas_law::GasLaw,
    physical_quantities::{Conserved, Gradients, Primitive, State},
    utils::HydroDimension,
};

/// Stage of a generator in the per step pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Unvisited,
    GradientsAccumulated,
    SlopesLimited,
    FluxesExchanged,
    Finalized,
}

impl PipelineStage {
    fn next(self) -> Option<Self> {
        match self {
            PipelineStage::Unvisited => Some(PipelineStage::GradientsAccumulated),
            PipelineStage::GradientsAccumulated => Some(PipelineStage::SlopesLimited),
            PipelineStage::SlopesLimited => Some(PipelineStage::FluxesExchanged),
            PipelineStage::FluxesExchanged => Some(PipelineStage::Finalized),
            PipelineStage::Finalized => None,
        }
    }
}

/// A point inducing one Voronoi cell, with its hydrodynamic state.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    pub x: DVec2,
    /// Velocity of the generator itself (not necessarily the fluid velocity).
    pub v: DVec3,
    pub primitives: State<Primitive>,
    pub conserved: State<Conserved>,
    /// Fluxes received since the last [`apply_flux`](Self::apply_flux).
    pub fluxes: State<Conserved>,
    pub gradients: Gradients<Primitive>,
    pub dt: f64,
    /// Maximal signal velocity over the faces of the last flux pass.
    pub v_max: f64,
    pub volume: f64,
    /// Cell centroid relative to `x`.
    pub centroid: DVec2,
    stage: PipelineStage,
}

impl Generator {
    pub fn new(x: DVec2, v: DVec3, primitives: State<Primitive>, dt: f64) -> Self {
        Self {
            x,
            v,
            primitives,
            dt,
            ..Self::default()
        }
    }

    /// Position of the generator in 3D (z = 0).
    pub fn position(&self) -> DVec3 {
        self.x.extend(0.)
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Start a new step.
    pub(crate) fn reset_stage(&mut self) {
        self.stage = PipelineStage::Unvisited;
    }

    /// Move to the next pipeline stage, which must be `to`.
    pub(crate) fn advance(&mut self, generator: usize, to: PipelineStage) -> Result<(), MeshError> {
        if self.stage.next() != Some(to) {
            return Err(MeshError::StageViolation {
                generator,
                from: self.stage,
                to,
            });
        }
        self.stage = to;
        Ok(())
    }

    pub(crate) fn face_side(&self) -> FaceSide {
        FaceSide {
            x: self.position(),
            v: self.v,
            primitives: &self.primitives,
            gradients: &self.gradients,
            dt: self.dt,
        }
    }

    /// Set the volume of the cell and derive the conserved quantities from the primitives.
    pub fn init_conserved(&mut self, volume: f64, eos: &GasLaw) {
        self.volume = volume;
        self.conserved = State::<Conserved>::from_primitives(&self.primitives, volume, eos);
    }

    pub fn apply_flux(&mut self) {
        self.conserved += self.fluxes;
        self.fluxes = State::vacuum();
    }

    pub fn convert_conserved_to_primitive(&mut self, eos: &GasLaw) {
        self.primitives = State::<Primitive>::from_conserved(&self.conserved, self.volume, eos);
    }

    /// Reverse the velocity components along the unit `normal`, for the
    /// generator as well as for its fluid.
    pub fn reflect(&mut self, normal: DVec3) {
        self.v -= 2. * self.v.dot(normal) * normal;
        self.primitives = self.primitives.reflect(normal);
        self.conserved = self.conserved.reflect(normal);
    }

    /// CFL time step of this generator.
    pub fn timestep(&self, cfl_criterion: f64, eos: &GasLaw, dimension: HydroDimension) -> f64 {
        let mut v_max = self.v_max;
        if self.primitives.density() > 0. {
            v_max = v_max.max(
                eos.sound_speed(self.primitives.pressure(), 1. / self.primitives.density()),
            );
        }
        if v_max > 0. {
            cfl_criterion * dimension.radius_from_volume(self.volume) / v_max
        } else {
            f64::INFINITY
        }
    }
}
