use glam::{DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use yaml_rust::Yaml;

use crate::{
    config::as_f64,
    delaunay::GhostVertex,
    errors::ConfigError,
    generator::Generator,
    physical_quantities::{Gradients, Primitive, State},
    relation::{NeighbourDirection, RelationClass},
};

fn sod_shock(x: DVec2, box_size: DVec2) -> State<Primitive> {
    if x.x < 0.5 * box_size.x {
        State::<Primitive>::new(1., DVec3::ZERO, 1.)
    } else {
        State::<Primitive>::new(0.125, DVec3::ZERO, 0.1)
    }
}

fn noh(x: DVec2, box_size: DVec2) -> State<Primitive> {
    let velocity = if x.x < 0.5 * box_size.x { 1. } else { -1. };
    State::<Primitive>::new(1., velocity * DVec3::X, 1.0e-6)
}

fn toro(x: DVec2, box_size: DVec2) -> State<Primitive> {
    let velocity = if x.x < 0.5 * box_size.x { 2. } else { -2. };
    State::<Primitive>::new(1., velocity * DVec3::X, 0.4)
}

fn vacuum(x: DVec2, box_size: DVec2) -> State<Primitive> {
    if x.x < 0.5 * box_size.x {
        State::<Primitive>::new(1., DVec3::ZERO, 1.)
    } else {
        State::vacuum()
    }
}

fn uniform(_x: DVec2, _box_size: DVec2) -> State<Primitive> {
    State::<Primitive>::new(1., DVec3::ZERO, 1.)
}

/// How ghosts are created at the sides of the box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// Mirror images of the generators, with mirrored velocities.
    Reflective,
    /// Periodic copies of the generators, as if they were part of the
    /// neighbouring partitions.
    Periodic,
}

impl Boundary {
    pub fn init(cfg: &Yaml) -> Result<Self, ConfigError> {
        let kind = cfg.as_str().unwrap_or("reflective");
        match kind {
            "reflective" => Ok(Boundary::Reflective),
            "periodic" => Ok(Boundary::Periodic),
            _ => Err(ConfigError::UnknownBoundaryConditions(kind.to_string())),
        }
    }
}

/// The local generator a ghost is an image of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostSource {
    pub local_idx: usize,
    /// Per axis, whether the image is mirrored in a side of the box.
    pub mirrored: [bool; 2],
}

impl GhostSource {
    fn normals(&self) -> impl Iterator<Item = DVec3> + '_ {
        [DVec3::X, DVec3::Y]
            .into_iter()
            .zip(self.mirrored)
            .filter_map(|(normal, mirrored)| mirrored.then_some(normal))
    }

    /// Periodic copies carry the state of their source unchanged.
    pub fn is_periodic(&self) -> bool {
        !self.mirrored.iter().any(|&m| m)
    }

    pub fn image_primitives(&self, source: &Generator) -> State<Primitive> {
        self.normals()
            .fold(source.primitives, |primitives, normal| primitives.reflect(normal))
    }

    pub fn image_velocity(&self, source: &Generator) -> DVec3 {
        self.normals()
            .fold(source.v, |v, normal| v - 2. * v.dot(normal) * normal)
    }

    pub fn image_gradients(&self, source: &Generator) -> Gradients<Primitive> {
        self.normals()
            .fold(source.gradients, |gradients, normal| gradients.reflect(normal))
    }
}

/// Ghost vertices and the states of the corresponding ghost generators.
///
/// The foreign index of every ghost vertex is its index in `generators` and
/// in `sources`.
#[derive(Debug, Clone, Default)]
pub struct Halo {
    pub vertices: Vec<(DVec2, GhostVertex)>,
    pub generators: Vec<Generator>,
    pub sources: Vec<GhostSource>,
    /// Box to clip the cells of generators on its sides to, set for
    /// reflective boundaries.
    pub domain: Option<DVec2>,
}

impl Halo {
    fn push(
        &mut self,
        generators: &[Generator],
        source: GhostSource,
        x: DVec2,
        relation: RelationClass,
    ) {
        let g = &generators[source.local_idx];
        let mut ghost = Generator::new(
            x,
            source.image_velocity(g),
            source.image_primitives(g),
            g.dt,
        );
        ghost.gradients = source.image_gradients(g);
        self.vertices.push((
            x,
            GhostVertex {
                foreign_idx: self.generators.len(),
                relation,
            },
        ));
        self.generators.push(ghost);
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

/// Construct the ghosts of all generators within `width` of the sides of the box.
///
/// Ghosts take over the time step and gradients of their source. A generator
/// lying on a reflective side is not mirrored in it.
pub fn build_halo(
    generators: &[Generator],
    box_size: DVec2,
    boundary: Boundary,
    width: f64,
) -> Halo {
    let mut halo = Halo::default();
    match boundary {
        Boundary::Reflective => {
            halo.domain = Some(box_size);
            for (local_idx, g) in generators.iter().enumerate() {
                // Per axis: no mirror, mirror in the low side, mirror in the high side
                let options = |axis: usize| {
                    let mut options = vec![None];
                    let (low, high) = (g.x[axis], box_size[axis] - g.x[axis]);
                    if low > 0. && low <= width {
                        options.push(Some(-g.x[axis]));
                    }
                    if high > 0. && high <= width {
                        options.push(Some(2. * box_size[axis] - g.x[axis]));
                    }
                    options
                };
                for mx in options(0) {
                    for my in options(1) {
                        if mx.is_none() && my.is_none() {
                            continue;
                        }
                        let x = DVec2::new(mx.unwrap_or(g.x.x), my.unwrap_or(g.x.y));
                        let source = GhostSource {
                            local_idx,
                            mirrored: [mx.is_some(), my.is_some()],
                        };
                        halo.push(generators, source, x, RelationClass::Boundary);
                    }
                }
            }
        }
        Boundary::Periodic => {
            for (local_idx, g) in generators.iter().enumerate() {
                for sx in -1i8..=1 {
                    for sy in -1i8..=1 {
                        let Some(direction) = NeighbourDirection::new([sx, sy, 0]) else {
                            continue;
                        };
                        let x = g.x + DVec2::new(sx as f64, sy as f64) * box_size;
                        let inside = (-width..box_size.x + width).contains(&x.x)
                            && (-width..box_size.y + width).contains(&x.y);
                        if inside {
                            let source = GhostSource {
                                local_idx,
                                mirrored: [false; 2],
                            };
                            let relation = RelationClass::Neighbour(direction);
                            halo.push(generators, source, x, relation);
                        }
                    }
                }
            }
        }
    }
    log::debug!("Created halo with {} ghosts ({boundary:?})", halo.len());
    halo
}

/// A square lattice of generators in a rectangular box, optionally perturbed.
#[derive(Debug, Clone, Copy)]
pub struct InitialConditions {
    profile: fn(DVec2, DVec2) -> State<Primitive>,
    num_per_side: usize,
    box_size: DVec2,
    perturbation: f64,
    seed: u64,
    boundary: Boundary,
}

impl InitialConditions {
    pub fn init(ic_cfg: &Yaml) -> Result<Self, ConfigError> {
        let kind = ic_cfg["type"]
            .as_str()
            .ok_or(ConfigError::MissingParameter("initial_conditions:type".to_string()))?
            .to_string();
        let profile: fn(DVec2, DVec2) -> State<Primitive> = match kind.as_str() {
            "sodshock" => sod_shock,
            "noh" => noh,
            "toro" => toro,
            "vacuum" => vacuum,
            "uniform" => uniform,
            _ => return Err(ConfigError::UnknownICs(kind)),
        };
        let num_per_side = ic_cfg["num_part"].as_i64().unwrap_or(32);
        if num_per_side < 2 {
            return Err(ConfigError::IllegalValue {
                name: "initial_conditions:num_part".to_string(),
                value: num_per_side.to_string(),
            });
        }
        let box_size = match ic_cfg["box_size"].as_vec() {
            Some(sides) => {
                let sides = sides.iter().map(as_f64).collect::<Option<Vec<_>>>();
                match sides.as_deref() {
                    Some(&[x, y, ..]) if x > 0. && y > 0. => DVec2::new(x, y),
                    _ => {
                        return Err(ConfigError::IllegalValue {
                            name: "initial_conditions:box_size".to_string(),
                            value: format!("{:?}", ic_cfg["box_size"]),
                        })
                    }
                }
            }
            None => DVec2::ONE,
        };
        let perturbation = as_f64(&ic_cfg["perturbation"]).unwrap_or(0.);
        if !(0. ..0.5).contains(&perturbation) {
            return Err(ConfigError::IllegalValue {
                name: "initial_conditions:perturbation".to_string(),
                value: perturbation.to_string(),
            });
        }
        Ok(Self {
            profile,
            num_per_side: num_per_side as usize,
            box_size,
            perturbation,
            seed: ic_cfg["seed"].as_i64().unwrap_or(0) as u64,
            boundary: Boundary::init(&ic_cfg["boundary"])?,
        })
    }

    pub fn box_size(&self) -> DVec2 {
        self.box_size
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Typical distance between neighbouring generators.
    pub fn characteristic_length(&self) -> f64 {
        self.box_size.min_element() / self.num_per_side as f64
    }

    /// Generators at the centres of the lattice cells, displaced by at most
    /// `perturbation` times the lattice spacing. Generators move with the fluid.
    pub fn generators(&self) -> Vec<Generator> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let spacing = self.box_size / self.num_per_side as f64;
        let mut generators = Vec::with_capacity(self.num_per_side * self.num_per_side);
        for j in 0..self.num_per_side {
            for i in 0..self.num_per_side {
                let mut x = DVec2::new(i as f64 + 0.5, j as f64 + 0.5) * spacing;
                if self.perturbation > 0. {
                    x += DVec2::new(
                        rng.gen_range(-self.perturbation..self.perturbation),
                        rng.gen_range(-self.perturbation..self.perturbation),
                    ) * spacing;
                }
                let primitives = (self.profile)(x, self.box_size);
                generators.push(Generator::new(x, primitives.velocity(), primitives, 0.));
            }
        }
        generators
    }

    /// Ghosts wide enough to close the cells of all generators of the lattice.
    pub fn halo(&self, generators: &[Generator]) -> Halo {
        build_halo(
            generators,
            self.box_size,
            self.boundary,
            3. * self.characteristic_length(),
        )
    }
}
