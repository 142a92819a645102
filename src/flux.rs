use glam::DVec3;

use crate::{
    gas_law::GasLaw,
    gradients::pairwise_limiter,
    physical_quantities::{Conserved, Gradients, Primitive, State},
    riemann_solver::RiemannFluxSolver,
};

/// The state of one side of a face, as needed for the flux computation.
#[derive(Debug, Clone, Copy)]
pub struct FaceSide<'a> {
    /// Position of the generator.
    pub x: DVec3,
    /// Velocity of the generator.
    pub v: DVec3,
    pub primitives: &'a State<Primitive>,
    pub gradients: &'a Gradients<Primitive>,
    /// Length of the current time step of this side, 0 if it has none.
    pub dt: f64,
}

/// The geometry of a face.
#[derive(Debug, Clone, Copy)]
pub struct FaceGeometry {
    pub area: f64,
    pub midpoint: DVec3,
}

#[derive(Debug, Clone, Copy)]
pub struct FluxInfo {
    /// Flux from left to right, integrated over the face and the time step.
    pub fluxes: State<Conserved>,
    /// Signal velocity across the face.
    pub v_max: f64,
}

impl FluxInfo {
    pub fn zero() -> Self {
        Self {
            fluxes: State::vacuum(),
            v_max: 0.,
        }
    }
}

fn sound_speed(primitives: &State<Primitive>, eos: &GasLaw) -> f64 {
    if primitives.density() > 0. {
        eos.sound_speed(primitives.pressure(), 1. / primitives.density())
    } else {
        0.
    }
}

/// Time derivative of the primitive state from the Euler equations.
fn time_derivative(
    primitives: &State<Primitive>,
    gradients: &Gradients<Primitive>,
    eos: &GasLaw,
) -> State<Primitive> {
    if primitives.density() <= 0. {
        return State::vacuum();
    }
    let rho = primitives.density();
    let v = primitives.velocity();
    let div_v = gradients.div_v();
    let rho_c2 = rho * sound_speed(primitives, eos).powi(2);
    let grad_p = gradients[4];
    State::<Primitive>::new(
        -(v.dot(gradients[0]) + rho * div_v),
        -DVec3::new(
            v.dot(gradients[1]) + grad_p.x / rho,
            v.dot(gradients[2]) + grad_p.y / rho,
            v.dot(gradients[3]) + grad_p.z / rho,
        ),
        -(rho_c2 * div_v + v.dot(grad_p)),
    )
}

/// Signal velocity across the face: the sum of both sound speeds plus the
/// velocity with which the two sides approach each other.
///
/// The approach velocity is the larger one of the generators and of the fluid.
pub fn signal_velocity(left: &FaceSide, right: &FaceSide, eos: &GasLaw) -> f64 {
    let dx = left.x - right.x;
    let r = dx.length();
    let dvdr = (left.v - right.v).dot(dx);
    let dvdotdx = (left.primitives.velocity() - right.primitives.velocity()).dot(dx);
    let mut v_max = sound_speed(left.primitives, eos) + sound_speed(right.primitives, eos);
    if r > 0. {
        v_max -= dvdr.min(dvdotdx).min(0.) / r;
    }
    v_max.max(0.)
}

/// Velocity of the face (Springel 2010, eq. 33).
///
/// The average of both generator velocities, corrected for the offset of the
/// face midpoint from the midpoint of the two generators.
pub fn face_velocity(left: &FaceSide, right: &FaceSide, midpoint: DVec3) -> DVec3 {
    let dx = left.x - right.x;
    let r2 = dx.length_squared();
    let generator_midpoint = 0.5 * (left.x + right.x);
    let fac = (right.v - left.v).dot(midpoint - generator_midpoint) / r2;
    0.5 * (left.v + right.v) + fac * dx
}

/// Half step extrapolated and limited state of `side` at the face, in the rest
/// frame of the face.
fn reconstruct(
    side: &FaceSide,
    other: &FaceSide,
    midpoint: DVec3,
    v_face: DVec3,
    dt: f64,
    eos: &GasLaw,
) -> State<Primitive> {
    let dx_face = midpoint - side.x;
    let r = (other.x - side.x).length();
    let own = side.primitives.boost(-v_face);
    let neighbour = other.primitives.boost(-v_face);
    let mut dash = own
        + side.gradients.dot(dx_face)
        + 0.5 * dt * time_derivative(&own, side.gradients, eos);
    dash.check_physical();
    pairwise_limiter(&own, &neighbour, &dash, dx_face.length() / r)
}

/// Compute the flux from `left` to `right` through a face.
///
/// The flux is integrated over the smaller of the two time steps (only the
/// left one if the right side has no time step), so that it can be subtracted
/// from the left and added to the right side unchanged.
pub fn flux_exchange<R: RiemannFluxSolver + ?Sized>(
    left: &FaceSide,
    right: &FaceSide,
    face: &FaceGeometry,
    eos: &GasLaw,
    riemann: &R,
) -> FluxInfo {
    let dx = left.x - right.x;
    let r = dx.length();
    if face.area == 0. || r == 0. {
        return FluxInfo::zero();
    }

    let v_max = signal_velocity(left, right, eos);
    let dt = if right.dt > 0. {
        left.dt.min(right.dt)
    } else {
        left.dt
    };
    let v_face = face_velocity(left, right, face.midpoint);

    let primitives_left = reconstruct(left, right, face.midpoint, v_face, dt, eos);
    let primitives_right = reconstruct(right, left, face.midpoint, v_face, dt, eos);

    let n_unit = -dx / r;
    let fluxes = face.area
        * riemann.solve_for_flux(&primitives_left, &primitives_right, v_face, n_unit, eos);
    debug_assert!(fluxes.is_finite());

    FluxInfo {
        fluxes: dt * fluxes,
        v_max,
    }
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::gas_law::EquationOfState;

    struct StubSolver;

    impl RiemannFluxSolver for StubSolver {
        fn solve_for_flux(
            &self,
            left: &State<Primitive>,
            right: &State<Primitive>,
            _interface_velocity: DVec3,
            n_unit: DVec3,
            _eos: &GasLaw,
        ) -> State<Conserved> {
            State::<Conserved>::new(left.pressure() - right.pressure(), n_unit, 0.)
        }
    }

    #[test]
    fn test_face_velocity() {
        let zero = Gradients::zeros();
        let w = State::<Primitive>::new(1., DVec3::ZERO, 1.);
        let left = FaceSide {
            x: DVec3::ZERO,
            v: DVec3::ZERO,
            primitives: &w,
            gradients: &zero,
            dt: 0.1,
        };
        let right = FaceSide {
            x: DVec3::X,
            v: DVec3::Y,
            primitives: &w,
            gradients: &zero,
            dt: 0.1,
        };
        // Face midpoint on the bisector: plain average.
        let v_face = face_velocity(&left, &right, DVec3::new(0.5, 0., 0.));
        assert_approx_eq!(f64, v_face.x, 0.);
        assert_approx_eq!(f64, v_face.y, 0.5);

        // Off center face midpoint: v_face gets a component along x_i - x_j.
        let v_face = face_velocity(&left, &right, DVec3::new(0.5, 0.25, 0.));
        assert_approx_eq!(f64, v_face.x, -0.25);
        assert_approx_eq!(f64, v_face.y, 0.5);
    }

    #[test]
    fn test_signal_velocity() {
        let zero = Gradients::zeros();
        let eos = GasLaw::new(5. / 3., EquationOfState::Ideal);
        let w_l = State::<Primitive>::new(1., DVec3::X, 0.6);
        let w_r = State::<Primitive>::new(1., -DVec3::X, 0.6);
        let left = FaceSide {
            x: DVec3::ZERO,
            v: DVec3::ZERO,
            primitives: &w_l,
            gradients: &zero,
            dt: 0.1,
        };
        let right = FaceSide {
            x: 2. * DVec3::X,
            primitives: &w_r,
            ..left
        };
        // c = 1 on both sides, closing speed 2.
        assert_approx_eq!(f64, signal_velocity(&left, &right, &eos), 4.);
        assert_approx_eq!(f64, signal_velocity(&right, &left, &eos), 4.);

        // Generators approaching faster than the fluid
        let left = FaceSide {
            v: 2. * DVec3::X,
            ..left
        };
        let right = FaceSide {
            v: -DVec3::X,
            ..right
        };
        assert_approx_eq!(f64, signal_velocity(&left, &right, &eos), 5.);
        assert_approx_eq!(f64, signal_velocity(&right, &left, &eos), 5.);

        // Receding generators do not lower the signal velocity of the fluid
        let left = FaceSide {
            v: -DVec3::X,
            ..left
        };
        let right = FaceSide {
            v: DVec3::X,
            ..right
        };
        assert_approx_eq!(f64, signal_velocity(&left, &right, &eos), 4.);
    }

    #[test]
    fn test_flux_time_step() {
        let zero = Gradients::zeros();
        let eos = GasLaw::new(5. / 3., EquationOfState::Ideal);
        let w_l = State::<Primitive>::new(1., DVec3::ZERO, 1.);
        let w_r = State::<Primitive>::new(0.125, DVec3::ZERO, 0.1);
        let left = FaceSide {
            x: DVec3::ZERO,
            v: DVec3::ZERO,
            primitives: &w_l,
            gradients: &zero,
            dt: 0.1,
        };
        let right = FaceSide {
            x: DVec3::X,
            primitives: &w_r,
            dt: 0.05,
            ..left
        };
        let face = FaceGeometry {
            area: 2.,
            midpoint: DVec3::new(0.5, 0., 0.),
        };
        let info = flux_exchange(&left, &right, &face, &eos, &StubSolver);
        assert_approx_eq!(f64, info.fluxes.mass(), 0.05 * 2. * 0.9);
        assert_approx_eq!(f64, info.fluxes.momentum().x, 0.05 * 2.);

        // Right side without time step: the left time step is used.
        let right = FaceSide { dt: 0., ..right };
        let info = flux_exchange(&left, &right, &face, &eos, &StubSolver);
        assert_approx_eq!(f64, info.fluxes.mass(), 0.1 * 2. * 0.9);
        assert_approx_eq!(f64, info.fluxes.momentum().x, 0.1 * 2.);
    }
}
