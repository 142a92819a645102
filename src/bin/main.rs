use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
};

use clap::Parser;
use mvmm_tessellation::{
    config::as_f64, errors::ConfigError, initial_conditions::InitialConditions, Config, Space,
};
use yaml_rust::{Yaml, YamlLoader};

#[derive(Parser)]
#[clap(about = "Moving-mesh hydrodynamics on a 2D lattice of generators")]
struct Cli {
    /// The path to the config file to read
    #[clap(parse(from_os_str))]
    config: PathBuf,
}

struct TimeIntegrationCfg {
    t_end: f64,
    max_steps: usize,
    grid_file: Option<String>,
}

impl TimeIntegrationCfg {
    fn init(cfg: &Yaml) -> Result<Self, ConfigError> {
        let t_end = as_f64(&cfg["time_integration"]["t_end"]).ok_or(
            ConfigError::MissingParameter("time_integration:t_end".to_string()),
        )?;
        Ok(Self {
            t_end,
            max_steps: cfg["time_integration"]["max_steps"]
                .as_i64()
                .unwrap_or(10_000) as usize,
            grid_file: cfg["output"]["grid"].as_str().map(|s| s.to_string()),
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // parse command line parameters
    let args = Cli::parse();

    // read configuration
    let docs = YamlLoader::load_from_str(&fs::read_to_string(args.config)?)?;
    let cfg = docs
        .first()
        .ok_or(ConfigError::MissingParameter("hydrodynamics".to_string()))?;
    let config = Config::init(cfg)?;
    let ics = InitialConditions::init(&cfg["initial_conditions"])?;
    let time_integration = TimeIntegrationCfg::init(cfg)?;

    // Setup ICs and construct space
    let characteristic_length = ics.characteristic_length();
    let mut space = Space::new(config, ics.generators());
    let active = vec![true; space.generators().len()];
    let halo = ics.halo(space.generators());
    space.retessellate(halo)?;
    let stats = space.step(&active, characteristic_length)?;
    log::info!(
        "Initial tessellation: {} cells ({} skipped), {} faces",
        stats.cells_built,
        stats.cells_skipped,
        stats.faces.new
    );
    let eos = config.hydrodynamics.gas_law;
    for generator in space.generators_mut() {
        let volume = generator.volume;
        generator.init_conserved(volume, &eos);
    }

    // run
    let mut t = 0.;
    let mut step = 0;
    while t < time_integration.t_end && step < time_integration.max_steps {
        let dt = space.min_timestep().min(time_integration.t_end - t);
        for generator in space.generators_mut() {
            generator.dt = dt;
        }
        let halo = ics.halo(space.generators());
        space.retessellate(halo)?;
        space.rebuild(&active, characteristic_length)?;
        // Conserved quantities of the drifted generators over their new volumes
        space.update_primitives();
        space.gradient_estimate()?;
        space.slope_limit()?;
        space.flux_exchange()?;
        space.finalize()?;
        space.apply_flux();
        space.drift(dt);
        space.keep_in_box(ics.box_size(), ics.boundary());

        t += dt;
        step += 1;
        log::info!("Step {step}: t = {t:.6}, dt = {dt:.3e}");
    }

    if let Some(grid_file) = time_integration.grid_file {
        let halo = ics.halo(space.generators());
        space.retessellate(halo)?;
        space.rebuild(&active, characteristic_length)?;
        let mut writer = BufWriter::new(File::create(&grid_file)?);
        space.dump(&mut writer)?;
        log::info!("Written tessellation to {grid_file}");
    }

    println!("Done!");
    Ok(())
}
