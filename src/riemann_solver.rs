use glam::DVec3;
use yaml_rust::Yaml;

use crate::{
    errors::ConfigError,
    gas_law::GasLaw,
    physical_quantities::{Conserved, Primitive, State},
};

mod hllc;
mod vacuum;

pub use hllc::HLLCRiemannSolver;
pub use vacuum::VacuumRiemannSolver;

/// A numerical flux kernel for the Riemann problem at a face.
///
/// The states are given in the rest frame of the face, the returned flux is
/// deboosted to the lab frame using `interface_velocity`.
pub trait RiemannFluxSolver: Sync {
    fn solve_for_flux(
        &self,
        left: &State<Primitive>,
        right: &State<Primitive>,
        interface_velocity: DVec3,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> State<Conserved>;
}

/// Construct the Riemann solver named in the `hydrodynamics` section of a configuration.
pub fn riemann_solver_from_config(cfg: &Yaml) -> Result<HLLCRiemannSolver, ConfigError> {
    let kind = cfg["riemann_solver"].as_str().unwrap_or("HLLC");
    match kind {
        "HLLC" => Ok(HLLCRiemannSolver),
        _ => Err(ConfigError::UnknownRiemannSolver(kind.to_string())),
    }
}

/// Deboost the flux of `w_half` through a face with normal `n_unit` moving
/// with `interface_velocity` to the lab frame.
pub(crate) fn flux_from_half_state(
    w_half: &State<Primitive>,
    interface_velocity: DVec3,
    n_unit: DVec3,
    eos: &GasLaw,
) -> State<Conserved> {
    if w_half.density() == 0. {
        return State::<Conserved>::vacuum();
    }

    let v = w_half.velocity();
    let v_n = v.dot(n_unit);
    let rho_v_n = w_half.density() * v_n;
    let rho_e = w_half.density()
        * (eos.gas_internal_energy_from_pressure(w_half.pressure(), 1. / w_half.density())
            + 0.5 * v.length_squared());
    let mut flux = State::<Conserved>::new(
        rho_v_n,
        rho_v_n * v + w_half.pressure() * n_unit,
        (rho_e + w_half.pressure()) * v_n,
    );

    flux += State::<Conserved>::new(
        0.,
        interface_velocity * flux.mass(),
        interface_velocity.dot(flux.momentum())
            + 0.5 * interface_velocity.length_squared() * flux.mass(),
    );
    flux
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;
    use yaml_rust::YamlLoader;

    use super::*;
    use crate::gas_law::EquationOfState;

    #[test]
    fn test_from_config() {
        let cfg = &YamlLoader::load_from_str("riemann_solver: HLLC").unwrap()[0];
        assert!(riemann_solver_from_config(cfg).is_ok());
        let cfg = &YamlLoader::load_from_str("riemann_solver: Roe").unwrap()[0];
        assert!(matches!(
            riemann_solver_from_config(cfg),
            Err(ConfigError::UnknownRiemannSolver(_))
        ));
    }

    #[test]
    fn test_half_state_flux() {
        let eos = GasLaw::new(5. / 3., EquationOfState::Ideal);
        let w = State::<Primitive>::new(2., DVec3::ZERO, 3.);
        let flux = flux_from_half_state(&w, DVec3::ZERO, DVec3::Y, &eos);
        assert_eq!(flux.mass(), 0.);
        assert_approx_eq!(f64, flux.momentum().y, 3.);
        assert_eq!(flux.energy(), 0.);
    }
}
