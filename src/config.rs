use yaml_rust::{Yaml, YamlLoader};

use crate::{
    errors::ConfigError,
    gas_law::GasLaw,
    riemann_solver::{riemann_solver_from_config, HLLCRiemannSolver},
};

/// Read a float, also accepting integers.
pub fn as_f64(yaml: &Yaml) -> Option<f64> {
    match yaml {
        Yaml::Integer(i) => Some(*i as f64),
        _ => yaml.as_f64(),
    }
}

fn positive_or_default(cfg: &Yaml, name: &str, default: f64) -> Result<f64, ConfigError> {
    match &cfg[name] {
        Yaml::BadValue | Yaml::Null => Ok(default),
        value => match as_f64(value) {
            Some(v) if v > 0. => Ok(v),
            _ => Err(ConfigError::IllegalValue {
                name: name.to_string(),
                value: format!("{value:?}"),
            }),
        },
    }
}

/// Parameters of the tessellation rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationCfg {
    /// Minimal face measure, relative to the characteristic length of the cells.
    pub min_rel_face_size: f64,
    /// Minimal cell volume, relative to the characteristic length squared.
    pub min_rel_cell_volume: f64,
    /// Whether to keep the boundary vertices of every face.
    pub store_faces: bool,
}

impl Default for TessellationCfg {
    fn default() -> Self {
        Self {
            min_rel_face_size: 1e-8,
            min_rel_cell_volume: 1e-12,
            store_faces: false,
        }
    }
}

impl TessellationCfg {
    pub fn init(cfg: &Yaml) -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            min_rel_face_size: positive_or_default(
                cfg,
                "min_rel_face_size",
                default.min_rel_face_size,
            )?,
            min_rel_cell_volume: positive_or_default(
                cfg,
                "min_rel_cell_volume",
                default.min_rel_cell_volume,
            )?,
            store_faces: cfg["store_faces"].as_bool().unwrap_or(default.store_faces),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HydroCfg {
    pub gas_law: GasLaw,
    pub riemann_solver: HLLCRiemannSolver,
    pub cfl_criterion: f64,
}

impl HydroCfg {
    pub fn init(cfg: &Yaml) -> Result<Self, ConfigError> {
        if cfg.is_badvalue() {
            return Err(ConfigError::MissingParameter("hydrodynamics".to_string()));
        }
        Ok(Self {
            gas_law: GasLaw::init(cfg)?,
            riemann_solver: riemann_solver_from_config(cfg)?,
            cfl_criterion: positive_or_default(cfg, "cfl_criterion", 0.3)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub tessellation: TessellationCfg,
    pub hydrodynamics: HydroCfg,
}

impl Config {
    pub fn init(cfg: &Yaml) -> Result<Self, ConfigError> {
        Ok(Self {
            tessellation: TessellationCfg::init(&cfg["tessellation"])?,
            hydrodynamics: HydroCfg::init(&cfg["hydrodynamics"])?,
        })
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(source)?;
        let cfg = docs
            .first()
            .ok_or(ConfigError::MissingParameter("hydrodynamics".to_string()))?;
        Self::init(cfg)
    }
}
