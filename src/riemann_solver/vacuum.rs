use glam::DVec3;

use super::{flux_from_half_state, RiemannFluxSolver};
use crate::{
    gas_law::GasLaw,
    physical_quantities::{Conserved, Primitive, State},
};

/// Exact sampling of Riemann problems involving vacuum.
#[derive(Debug, Clone, Copy, Default)]
pub struct VacuumRiemannSolver;

impl VacuumRiemannSolver {
    pub fn is_vacuum(
        left: &State<Primitive>,
        right: &State<Primitive>,
        a_l: f64,
        a_r: f64,
        v_r_m_v_l: f64,
        eos: &GasLaw,
    ) -> bool {
        // Vacuum on either side, or vacuum generated in between
        left.density() == 0.
            || right.density() == 0.
            || eos.gamma().tdgm1() * (a_l + a_r) <= v_r_m_v_l
    }

    fn sample_half_vacuum(
        non_vacuum: &State<Primitive>,
        v: f64,
        a: f64,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> State<Primitive> {
        let gamma = eos.gamma();
        let base = gamma.tdgp1() + gamma.gm1dgp1() * v / a;
        let v_half = gamma.tdgp1() * (a + v / gamma.tdgm1()) - v;
        State::<Primitive>::new(
            non_vacuum.density() * base.powf(gamma.tdgm1()),
            non_vacuum.velocity() + n_unit * v_half,
            non_vacuum.pressure() * base.powf(gamma.gamma() * gamma.tdgm1()),
        )
    }

    fn sample_right_vacuum(
        left: &State<Primitive>,
        v_l: f64,
        a_l: f64,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> State<Primitive> {
        if v_l < a_l {
            let s_l = v_l + eos.gamma().tdgm1() * a_l;
            if s_l > 0. {
                Self::sample_half_vacuum(left, v_l, a_l, n_unit, eos)
            } else {
                State::vacuum()
            }
        } else {
            *left
        }
    }

    fn sample_left_vacuum(
        right: &State<Primitive>,
        v_r: f64,
        a_r: f64,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> State<Primitive> {
        if v_r > -a_r {
            let s_r = v_r - eos.gamma().tdgm1() * a_r;
            if s_r < 0. {
                Self::sample_half_vacuum(right, v_r, -a_r, n_unit, eos)
            } else {
                State::vacuum()
            }
        } else {
            *right
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn sample_vacuum_creation(
        left: &State<Primitive>,
        right: &State<Primitive>,
        v_l: f64,
        v_r: f64,
        a_l: f64,
        a_r: f64,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> State<Primitive> {
        let s_l = v_l + eos.gamma().tdgm1() * a_l;
        let s_r = v_r - eos.gamma().tdgm1() * a_r;

        if s_l >= 0. {
            if a_l > v_l {
                Self::sample_half_vacuum(left, v_l, a_l, n_unit, eos)
            } else {
                *left
            }
        } else if s_r <= 0. {
            if -a_r < v_r {
                Self::sample_half_vacuum(right, v_r, -a_r, n_unit, eos)
            } else {
                *right
            }
        } else {
            debug_assert!(s_r > 0. && s_l < 0.);
            State::vacuum()
        }
    }

    /// Sample the solution of a vacuum Riemann problem at the interface.
    #[allow(clippy::too_many_arguments)]
    pub fn sample(
        left: &State<Primitive>,
        right: &State<Primitive>,
        v_l: f64,
        v_r: f64,
        a_l: f64,
        a_r: f64,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> State<Primitive> {
        debug_assert!(Self::is_vacuum(left, right, a_l, a_r, v_r - v_l, eos));

        if right.density() == 0. && left.density() == 0. {
            State::vacuum()
        } else if right.density() == 0. {
            Self::sample_right_vacuum(left, v_l, a_l, n_unit, eos)
        } else if left.density() == 0. {
            Self::sample_left_vacuum(right, v_r, a_r, n_unit, eos)
        } else {
            Self::sample_vacuum_creation(left, right, v_l, v_r, a_l, a_r, n_unit, eos)
        }
    }
}

impl RiemannFluxSolver for VacuumRiemannSolver {
    fn solve_for_flux(
        &self,
        left: &State<Primitive>,
        right: &State<Primitive>,
        interface_velocity: DVec3,
        n_unit: DVec3,
        eos: &GasLaw,
    ) -> State<Conserved> {
        let v_l = left.velocity().dot(n_unit);
        let v_r = right.velocity().dot(n_unit);
        let a_l = if left.density() > 0. {
            eos.sound_speed(left.pressure(), 1. / left.density())
        } else {
            0.
        };
        let a_r = if right.density() > 0. {
            eos.sound_speed(right.pressure(), 1. / right.density())
        } else {
            0.
        };
        let w_half = Self::sample(left, right, v_l, v_r, a_l, a_r, n_unit, eos);
        flux_from_half_state(&w_half, interface_velocity, n_unit, eos)
    }
}
