use glam::{DVec2, DVec3};
use mvmm_tessellation::{
    delaunay::GhostVertex,
    gas_law::GasLaw,
    initial_conditions::{build_halo, Boundary, Halo},
    physical_quantities::{Conserved, Primitive, State},
    relation::RelationClass,
    riemann_solver::RiemannFluxSolver,
    Config, Generator, Space,
};

pub const CONFIG: &'static str = r##"
tessellation:
  min_rel_face_size: 1e-8
  min_rel_cell_volume: 1e-12
  store_faces: true
hydrodynamics:
  gamma: 1.66666667
  equation_of_state: "Ideal"
  riemann_solver: "HLLC"
  cfl_criterion: 0.3
"##;

pub fn get_config() -> Config {
    Config::from_yaml_str(CONFIG).expect("Error loading config!")
}

/// Mass flux equal to the pressure difference, momentum flux along the normal.
pub struct PressureDifferenceSolver;

impl RiemannFluxSolver for PressureDifferenceSolver {
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

/// The same flux for every face.
pub struct ConstantFluxSolver(pub State<Conserved>);

impl RiemannFluxSolver for ConstantFluxSolver {
    fn solve_for_flux(
        &self,
        _left: &State<Primitive>,
        _right: &State<Primitive>,
        _interface_velocity: DVec3,
        _n_unit: DVec3,
        _eos: &GasLaw,
    ) -> State<Conserved> {
        self.0
    }
}

pub fn generator(x: DVec2, density: f64, velocity: DVec3, pressure: f64, dt: f64) -> Generator {
    Generator::new(
        x,
        velocity,
        State::<Primitive>::new(density, velocity, pressure),
        dt,
    )
}

/// A space for the given generators in the box `[0, box_size]`, with a
/// reflective halo containing the mirror images of all generators.
pub fn get_space(generators: Vec<Generator>, box_size: DVec2) -> Space {
    let mut space = Space::new(get_config(), generators);
    let halo = build_halo(
        space.generators(),
        box_size,
        Boundary::Reflective,
        box_size.max_element(),
    );
    space.retessellate(halo).expect("Error building tessellation!");
    space
}

/// Generators at (0, 0) and (1, 0) with (rho, P) = (1, 1) and (0.125, 0.1), in
/// the box [-0.5, 1.5] x [-0.5, 0.5] with reflective boundaries.
pub fn two_generator_space(dt: f64) -> Space {
    let generators = vec![
        generator(DVec2::ZERO, 1., DVec3::ZERO, 1., dt),
        generator(DVec2::X, 0.125, DVec3::ZERO, 0.1, dt),
    ];
    let mut halo = Halo::default();
    for g in generators.iter() {
        for offset in [
            DVec2::new(-1., 0.),
            DVec2::new(1., 0.),
            DVec2::new(0., -1.),
            DVec2::new(0., 1.),
        ] {
            // Mirror in the side of the box closest in the direction of offset
            let x = if offset.x < 0. && g.x.x > 0.5 || offset.x > 0. && g.x.x < 0.5 {
                continue;
            } else if offset.x != 0. {
                DVec2::new(2. * (g.x.x + 0.5 * offset.x) - g.x.x, g.x.y)
            } else {
                DVec2::new(g.x.x, 2. * (g.x.y + 0.5 * offset.y) - g.x.y)
            };
            halo.vertices.push((
                x,
                GhostVertex {
                    foreign_idx: halo.generators.len(),
                    relation: RelationClass::Boundary,
                },
            ));
            halo.generators.push(Generator::new(
                x,
                DVec3::ZERO,
                g.primitives.reflect(offset.abs().extend(0.)),
                0.,
            ));
        }
    }
    let mut space = Space::new(get_config(), generators);
    space.retessellate(halo).expect("Error building tessellation!");
    space
}

/// Generators on a regular `n` x `n` lattice in the unit square.
pub fn lattice(n: usize, velocity: DVec3, pressure: impl Fn(usize) -> f64) -> Vec<Generator> {
    let mut generators = vec![];
    for j in 0..n {
        for i in 0..n {
            let idx = j * n + i;
            let x = DVec2::new(i as f64 + 0.5, j as f64 + 0.5) / n as f64;
            generators.push(generator(x, 1., velocity, pressure(idx), 1e-3));
        }
    }
    generators
}
