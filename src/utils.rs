use std::sync::atomic::{AtomicU64, Ordering};

use glam::DVec3;

/// The dimensionality of the tessellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[repr(usize)]
pub enum HydroDimension {
    HydroDimension2D = 2,
    HydroDimension3D = 3,
}

impl HydroDimension {
    /// Radius of the sphere (circle in 2D) with the given volume.
    pub fn radius_from_volume(&self, volume: f64) -> f64 {
        match self {
            HydroDimension::HydroDimension2D => (volume * std::f64::consts::FRAC_1_PI).sqrt(),
            HydroDimension::HydroDimension3D => {
                (0.75 * volume * std::f64::consts::FRAC_1_PI).cbrt()
            }
        }
    }
}

pub fn contains(box_size: DVec3, pos: DVec3, dimension: usize) -> bool {
    let mut contains = true;
    for i in 0..dimension {
        contains &= pos[i] >= 0. && pos[i] < box_size[i];
    }
    contains
}

pub fn box_wrap(box_size: DVec3, pos: &mut DVec3, dimension: usize) {
    for i in 0..dimension {
        while pos[i] < 0. {
            pos[i] += box_size[i];
        }
        while pos[i] >= box_size[i] {
            pos[i] -= box_size[i];
        }
    }
}

/// Mirror `pos` back into the box. Returns the mask of mirrored axes.
pub fn box_reflect(box_size: DVec3, pos: &mut DVec3, dimension: usize) -> [bool; 3] {
    let mut reflected = [false; 3];
    for i in 0..dimension {
        if pos[i] < 0. {
            pos[i] = -pos[i];
            reflected[i] = true;
        }
        if pos[i] > box_size[i] {
            pos[i] -= 2. * (pos[i] - box_size[i]);
            reflected[i] = true;
        }
    }
    reflected
}

/// Lock-free running maximum of a non-negative `f64`.
///
/// For non-negative floats the IEEE-754 bit patterns are ordered like the
/// values themselves, so `fetch_max` on the bits is a float maximum.
#[derive(Debug, Default)]
pub struct AtomicF64Max(AtomicU64);

impl AtomicF64Max {
    pub fn new(value: f64) -> Self {
        debug_assert!(value >= 0.);
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn fetch_max(&self, value: f64) {
        debug_assert!(!value.is_nan());
        self.0.fetch_max(value.max(0.).to_bits(), Ordering::Relaxed);
    }

    pub fn into_inner(self) -> f64 {
        f64::from_bits(self.0.into_inner())
    }
}
