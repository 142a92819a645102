//! Gradient estimates and slope limiters for the linear reconstruction of the
//! primitive state of a cell.

use glam::DVec3;

use crate::physical_quantities::{Gradients, Primitive, State};

/// Contribution of a face to the gradient of the cell on one of its sides.
///
/// Green-Gauss estimate corrected for the offset `c` between the face midpoint
/// and the midpoint of the two generators (Springel 2010, eq. 21). `r_ij` is the
/// position of the own generator minus the position of the other one, so that
/// the contribution to the other side is exactly the negation of this one.
pub fn face_contribution(
    own: &State<Primitive>,
    other: &State<Primitive>,
    area: f64,
    c: DVec3,
    r_ij: DVec3,
) -> Gradients<Primitive> {
    let mut contribution = Gradients::zeros();
    let r = r_ij.length();
    if area == 0. || r == 0. {
        return contribution;
    }
    let r_inv = 1. / r;
    for k in 0..5 {
        contribution[k] =
            area * ((other[k] - own[k]) * r_inv * c - 0.5 * (own[k] + other[k]) * r_inv * r_ij);
    }
    contribution
}

/// Running sum of the face contributions to the gradients of one cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientData {
    gradients: Gradients<Primitive>,
}

impl GradientData {
    pub fn collect(&mut self, contribution: Gradients<Primitive>) {
        self.gradients += contribution;
    }

    pub fn finalize(self, volume: f64) -> Gradients<Primitive> {
        if volume > 0. {
            (1. / volume) * self.gradients
        } else {
            Gradients::zeros()
        }
    }
}

/// Cell wide slope limiter: the extrapolated values at the face midpoints must
/// stay within the range of the neighbouring values.
#[derive(Debug, Clone, Copy)]
pub struct LimiterData {
    pub min: State<Primitive>,
    pub max: State<Primitive>,
    pub e_min: State<Primitive>,
    pub e_max: State<Primitive>,
}

impl LimiterData {
    pub fn new(primitives: &State<Primitive>) -> Self {
        Self {
            min: *primitives,
            max: *primitives,
            e_min: State::splat(0.),
            e_max: State::splat(0.),
        }
    }

    /// Collect the neighbour state across a face and the extrapolation of the
    /// own state to the midpoint of that face.
    pub fn collect(&mut self, neighbour: &State<Primitive>, extrapolated: &State<Primitive>) {
        self.min = self.min.pairwise_min(neighbour);
        self.max = self.max.pairwise_max(neighbour);
        self.e_min = self.e_min.pairwise_min(extrapolated);
        self.e_max = self.e_max.pairwise_max(extrapolated);
    }

    fn limit_single_quantity(d_max: f64, d_min: f64, e_max: f64, e_min: f64) -> f64 {
        let mut alpha = 1.0f64;
        if e_max > 0. {
            alpha = alpha.min(d_max / e_max);
        }
        if e_min < 0. {
            alpha = alpha.min(d_min / e_min);
        }
        alpha.max(0.)
    }

    pub fn limit(&self, gradients: &mut Gradients<Primitive>, primitives: &State<Primitive>) {
        for k in 0..5 {
            let alpha = Self::limit_single_quantity(
                self.max[k] - primitives[k],
                self.min[k] - primitives[k],
                self.e_max[k],
                self.e_min[k],
            );
            gradients[k] *= alpha;
        }
    }
}

fn pairwise_limiter_single_quantity(q_l: f64, q_r: f64, q_dash: f64, dx_fac: f64) -> f64 {
    if q_l == q_r {
        return q_l;
    }

    let q_bar = q_l + dx_fac * (q_r - q_l);
    let q_diff = (q_l - q_r).abs();
    let delta1 = 0.5 * q_diff;
    let delta2 = 0.25 * q_diff;

    if q_l < q_r {
        let q_min = q_l.min(q_r);
        let qmin = if (q_min - delta1) * q_min > 0. {
            q_min - delta1
        } else {
            q_min * q_min.abs() / (q_min.abs() + delta1)
        };
        qmin.max((q_bar + delta2).min(q_dash))
    } else {
        let q_max = q_l.max(q_r);
        let qplu = if (q_max + delta1) * q_max > 0. {
            q_max + delta1
        } else {
            q_max * q_max.abs() / (q_max.abs() + delta1)
        };
        qplu.min((q_bar - delta2).max(q_dash))
    }
}

/// Limit the reconstructed state `primitives_dash` of the left cell at a face,
/// given the states of the left and right cells. `dx_fac` is the distance of
/// the face from the left generator relative to the distance between both
/// generators.
pub fn pairwise_limiter(
    primitives_left: &State<Primitive>,
    primitives_right: &State<Primitive>,
    primitives_dash: &State<Primitive>,
    dx_fac: f64,
) -> State<Primitive> {
    let mut limited = State::<Primitive>::vacuum();
    for k in 0..5 {
        limited[k] = pairwise_limiter_single_quantity(
            primitives_left[k],
            primitives_right[k],
            primitives_dash[k],
            dx_fac,
        );
    }

    limited.check_physical();

    limited
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_antisymmetric_contribution() {
        let w_i = State::<Primitive>::new(1., DVec3::new(0.1, -0.2, 0.), 1.);
        let w_j = State::<Primitive>::new(0.5, DVec3::new(0.3, 0.2, 0.), 0.25);
        let c = DVec3::new(0., 0.05, 0.);
        let r_ij = DVec3::new(-0.5, 0., 0.);
        let g_i = face_contribution(&w_i, &w_j, 0.25, c, r_ij);
        let g_j = face_contribution(&w_j, &w_i, 0.25, c, -r_ij);
        for k in 0..5 {
            assert_approx_eq!(f64, g_i[k].x, -g_j[k].x);
            assert_approx_eq!(f64, g_i[k].y, -g_j[k].y);
        }

        assert_eq!(
            face_contribution(&w_i, &w_j, 0., c, r_ij),
            Gradients::zeros()
        );
    }

    #[test]
    fn test_linear_field() {
        // Unit square cell around the origin with 4 neighbours at distance 1,
        // density rho = 1 + 2x.
        let own = State::<Primitive>::new(1., DVec3::ZERO, 1.);
        let mut data = GradientData::default();
        for (dir, value) in [
            (DVec3::X, 3.),
            (-DVec3::X, -1.),
            (DVec3::Y, 1.),
            (-DVec3::Y, 1.),
        ] {
            let other = State::<Primitive>::new(value, DVec3::ZERO, 1.);
            data.collect(face_contribution(&own, &other, 1., DVec3::ZERO, -dir));
        }
        let gradients = data.finalize(1.);
        assert_approx_eq!(f64, gradients[0].x, 2.);
        assert_approx_eq!(f64, gradients[0].y, 0.);
        assert_approx_eq!(f64, gradients[4].x, 0.);
    }

    #[test]
    fn test_cell_limiter() {
        let own = State::<Primitive>::new(1., DVec3::ZERO, 1.);
        let mut gradients = Gradients::<Primitive>::zeros();
        gradients[0] = DVec3::new(4., 0., 0.);
        let mut limiter = LimiterData::new(&own);
        // Neighbour at +0.5 has density 1.5, at -0.5 density 0.5.
        let right = State::<Primitive>::new(1.5, DVec3::ZERO, 1.);
        let left = State::<Primitive>::new(0.5, DVec3::ZERO, 1.);
        limiter.collect(&right, &gradients.dot(DVec3::new(0.25, 0., 0.)));
        limiter.collect(&left, &gradients.dot(DVec3::new(-0.25, 0., 0.)));
        limiter.limit(&mut gradients, &own);
        // Extrapolation of 1. to the faces is limited to 0.5.
        assert_approx_eq!(f64, gradients[0].x, 2.);
    }

    #[test]
    fn test_pairwise_limiter() {
        let left = State::<Primitive>::new(1., DVec3::ZERO, 1.);
        let right = State::<Primitive>::new(0.5, DVec3::ZERO, 0.5);
        // Overshooting extrapolation is clipped.
        let dash = State::<Primitive>::new(2., DVec3::ZERO, 0.75);
        let limited = pairwise_limiter(&left, &right, &dash, 0.5);
        assert!(limited.density() <= 1.25);
        assert_approx_eq!(f64, limited.pressure(), 0.75);
        assert_eq!(limited.velocity(), DVec3::ZERO);
    }
}
