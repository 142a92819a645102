use std::{
    marker::PhantomData,
    ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign},
};

use glam::DVec3;

use crate::gas_law::GasLaw;

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Primitive;
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Conserved;

/// Five component hydrodynamic state: (density, velocity, pressure) for
/// [`Primitive`], (mass, momentum, energy) for [`Conserved`].
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct State<T>(f64, DVec3, f64, PhantomData<T>);

impl<T> Add for State<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0, self.1 + rhs.1, self.2 + rhs.2, PhantomData)
    }
}

impl<T> AddAssign for State<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.1 += rhs.1;
        self.2 += rhs.2;
    }
}

impl<T> Sub for State<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0, self.1 - rhs.1, self.2 - rhs.2, PhantomData)
    }
}

impl<T> SubAssign for State<T> {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
        self.1 -= rhs.1;
        self.2 -= rhs.2;
    }
}

impl<T> Neg for State<T> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0, -self.1, -self.2, PhantomData)
    }
}

impl<T> Mul<State<T>> for f64 {
    type Output = State<T>;

    fn mul(self, rhs: State<T>) -> Self::Output {
        State::<T>(self * rhs.0, self * rhs.1, self * rhs.2, PhantomData)
    }
}

impl<T> State<T> {
    pub(crate) fn splat(value: f64) -> Self {
        Self(value, DVec3::splat(value), value, PhantomData)
    }

    pub fn vacuum() -> Self {
        Self(0., DVec3::ZERO, 0., PhantomData)
    }

    pub fn pairwise_max(&self, other: &Self) -> Self {
        Self(
            self.0.max(other.0),
            self.1.max(other.1),
            self.2.max(other.2),
            PhantomData,
        )
    }

    pub fn pairwise_min(&self, other: &Self) -> Self {
        Self(
            self.0.min(other.0),
            self.1.min(other.1),
            self.2.min(other.2),
            PhantomData,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite() && self.2.is_finite()
    }

    /// Largest absolute value of the five components.
    pub fn max_abs(&self) -> f64 {
        self.0.abs().max(self.1.abs().max_element()).max(self.2.abs())
    }
}

impl<T> Index<usize> for State<T> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.0,
            1 => &self.1.x,
            2 => &self.1.y,
            3 => &self.1.z,
            4 => &self.2,
            _ => panic!("Index out of bounds for State!"),
        }
    }
}

impl<T> IndexMut<usize> for State<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.0,
            1 => &mut self.1.x,
            2 => &mut self.1.y,
            3 => &mut self.1.z,
            4 => &mut self.2,
            _ => panic!("Index out of bounds for State!"),
        }
    }
}

/// Spatial gradients of the five components of a [`State`].
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Gradients<T>([DVec3; 5], PhantomData<T>);

impl<T> Gradients<T> {
    pub fn zeros() -> Self {
        Gradients([DVec3::ZERO; 5], PhantomData)
    }

    /// The change of the state over the displacement `dx`.
    pub fn dot(&self, dx: DVec3) -> State<T> {
        State::<T>(
            self.0[0].dot(dx),
            DVec3::new(self.0[1].dot(dx), self.0[2].dot(dx), self.0[3].dot(dx)),
            self.0[4].dot(dx),
            PhantomData,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|g| g.is_finite())
    }
}

impl Gradients<Primitive> {
    pub fn div_v(&self) -> f64 {
        self.0[1].x + self.0[2].y + self.0[3].z
    }

    /// Gradients of the mirror image of the state in the plane with unit `normal`.
    ///
    /// As for the reflected state, the velocity component along the normal
    /// changes sign as well.
    pub fn reflect(&self, normal: DVec3) -> Self {
        let mirror = |g: DVec3| g - 2. * g.dot(normal) * normal;
        let rows = [self.0[1], self.0[2], self.0[3]].map(mirror);
        let along_normal = normal.x * rows[0] + normal.y * rows[1] + normal.z * rows[2];
        Gradients(
            [
                mirror(self.0[0]),
                rows[0] - 2. * normal.x * along_normal,
                rows[1] - 2. * normal.y * along_normal,
                rows[2] - 2. * normal.z * along_normal,
                mirror(self.0[4]),
            ],
            PhantomData,
        )
    }
}

impl<T> Index<usize> for Gradients<T> {
    type Output = DVec3;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> IndexMut<usize> for Gradients<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<T> AddAssign for Gradients<T> {
    fn add_assign(&mut self, rhs: Self) {
        for (g, r) in self.0.iter_mut().zip(rhs.0) {
            *g += r;
        }
    }
}

impl<T> Mul<Gradients<T>> for f64 {
    type Output = Gradients<T>;

    fn mul(self, rhs: Gradients<T>) -> Self::Output {
        Gradients(rhs.0.map(|g| self * g), PhantomData)
    }
}

impl State<Primitive> {
    pub fn new(density: f64, velocity: DVec3, pressure: f64) -> Self {
        Self(density, velocity, pressure, PhantomData)
    }

    pub fn density(&self) -> f64 {
        self.0
    }

    pub fn velocity(&self) -> DVec3 {
        self.1
    }

    pub fn pressure(&self) -> f64 {
        self.2
    }

    pub fn from_conserved(conserved: &State<Conserved>, volume: f64, eos: &GasLaw) -> Self {
        if conserved.mass() > 0. && volume > 0. {
            let m_inv = 1. / conserved.mass();
            let density = conserved.mass() / volume;
            let velocity = conserved.momentum() * m_inv;
            let internal_energy = conserved.internal_energy();
            let pressure = eos.gas_pressure_from_internal_energy(internal_energy, density);
            let mut primitives = Self::new(density, velocity, pressure);
            primitives.check_physical();
            primitives
        } else {
            Self::vacuum()
        }
    }

    /// Add `velocity` to the fluid velocity. Vacuum stays vacuum.
    pub fn boost(&self, velocity: DVec3) -> Self {
        if self.density() > 0. {
            Self::new(self.density(), self.velocity() + velocity, self.pressure())
        } else {
            debug_assert_eq!(self.density(), 0.);
            debug_assert_eq!(self.pressure(), 0.);
            *self
        }
    }

    /// Reflect velocity component along normal
    pub fn reflect(&self, normal: DVec3) -> Self {
        let v = self.velocity() - 2. * self.velocity().dot(normal) * normal;
        Self::new(self.density(), v, self.pressure())
    }

    /// Resets unphysical values to vacuum and logs a warning.
    pub fn check_physical(&mut self) {
        if self.density() < 0. {
            log::warn!("Negative density encountered, resetting to vacuum!");
            *self = Self::vacuum();
        }
        if self.pressure() < 0. {
            log::warn!("Negative pressure encountered, resetting to vacuum!");
            *self = Self::vacuum();
        }

        debug_assert!(
            self.density().is_finite(),
            "Infinite density after extrapolation!"
        );
        debug_assert!(
            self.velocity().is_finite(),
            "Infinite velocity after extrapolation!"
        );
        debug_assert!(
            self.pressure().is_finite(),
            "Infinite pressure after extrapolation!"
        );
    }
}

impl State<Conserved> {
    pub fn new(mass: f64, momentum: DVec3, energy: f64) -> Self {
        Self(mass, momentum, energy, PhantomData)
    }

    pub fn mass(&self) -> f64 {
        self.0
    }

    pub fn momentum(&self) -> DVec3 {
        self.1
    }

    pub fn energy(&self) -> f64 {
        self.2
    }

    /// returns the specific internal energy e defined by: E = E_kin + E_therm = E_kin + m * e
    pub fn internal_energy(&self) -> f64 {
        let m_inv = 1. / self.mass();
        let thermal_energy = self.energy() - 0.5 * self.momentum().length_squared() * m_inv;
        thermal_energy * m_inv
    }

    pub fn from_primitives(primitives: &State<Primitive>, volume: f64, eos: &GasLaw) -> Self {
        if primitives.density() <= 0. {
            return Self::vacuum();
        }
        let mass = primitives.density() * volume;
        let momentum = mass * primitives.velocity();
        let energy = 0.5 * momentum.dot(primitives.velocity())
            + mass
                * eos.gas_internal_energy_from_pressure(
                    primitives.pressure(),
                    1. / primitives.density(),
                );
        Self::new(mass, momentum, energy)
    }

    /// Reflect the momentum component along normal
    pub fn reflect(&self, normal: DVec3) -> Self {
        let momentum = self.momentum() - 2. * self.momentum().dot(normal) * normal;
        Self::new(self.mass(), momentum, self.energy())
    }
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;
    use glam::DVec3;

    use super::{Conserved, Gradients, Primitive};
    use crate::{
        gas_law::{EquationOfState, GasLaw},
        physical_quantities::State,
    };

    #[test]
    fn test_conversions() {
        let primitives = State::<Primitive>::new(
            0.75,
            DVec3 {
                x: 0.4,
                y: 0.,
                z: 0.,
            },
            0.8,
        );
        let volume = 0.1;
        let eos = GasLaw::new(5. / 3., EquationOfState::Ideal);
        let conserved = State::<Conserved>::from_primitives(&primitives, volume, &eos);
        let primitives_new = State::<Primitive>::from_conserved(&conserved, volume, &eos);

        assert_approx_eq!(f64, primitives.density(), primitives_new.density());
        assert_approx_eq!(f64, primitives.velocity().x, primitives_new.velocity().x);
        assert_approx_eq!(f64, primitives.velocity().y, primitives_new.velocity().y);
        assert_approx_eq!(f64, primitives.velocity().z, primitives_new.velocity().z);
        assert_approx_eq!(f64, primitives.pressure(), primitives_new.pressure());
    }

    #[test]
    fn test_check_physical() {
        let mut primitives = State::<Primitive>::new(1., DVec3::X, -0.1);
        primitives.check_physical();
        assert_eq!(primitives, State::<Primitive>::vacuum());
        assert_eq!(
            State::<Primitive>::from_conserved(&State::vacuum(), 1., &GasLaw::new(1.4, EquationOfState::Ideal)),
            State::<Primitive>::vacuum()
        );
    }

    #[test]
    fn test_gradient_dot() {
        let mut gradients = Gradients::<Primitive>::zeros();
        gradients[0] = DVec3::new(1., 2., 0.);
        gradients[2] = DVec3::new(0., -1., 0.);
        let delta = gradients.dot(DVec3::new(0.5, 0.25, 0.));
        assert_eq!(delta.density(), 1.);
        assert_eq!(delta.velocity(), DVec3::new(0., -0.25, 0.));
        assert_eq!(delta.pressure(), 0.);
        assert_eq!((2. * gradients)[0], DVec3::new(2., 4., 0.));
    }

    #[test]
    fn test_gradient_reflect() {
        let mut gradients = Gradients::<Primitive>::zeros();
        for k in 0..5 {
            gradients[k] = DVec3::new(1. + k as f64, -0.5 * k as f64, 0.25);
        }
        for normal in [DVec3::X, DVec3::Y] {
            let reflected = gradients.reflect(normal);
            let dx = DVec3::new(0.3, -0.7, 0.1);
            let mirrored_dx = dx - 2. * dx.dot(normal) * normal;
            // The change over dx of the image equals the image of the change over the mirrored dx
            let expected = gradients.dot(mirrored_dx).reflect(normal);
            let delta = reflected.dot(dx);
            assert_approx_eq!(f64, delta.density(), expected.density());
            assert_approx_eq!(f64, delta.velocity().x, expected.velocity().x);
            assert_approx_eq!(f64, delta.velocity().y, expected.velocity().y);
            assert_approx_eq!(f64, delta.velocity().z, expected.velocity().z);
            assert_approx_eq!(f64, delta.pressure(), expected.pressure());
        }
    }
}
