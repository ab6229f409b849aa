//! `SimulationConfig`: the TOML-parsed knob set for one simulation run.

use serde::{Deserialize, Serialize};

use crate::sim::error::{SimResult, SimulationError};
use crate::sim::pedestrian::TransitionParams;
use crate::sim::static_field::StaticFieldVariant;

fn default_cell_length() -> f32 {
    0.4
}

fn default_timestep_time() -> f32 {
    1.0
}

fn default_max_timesteps() -> u64 {
    100_000
}

fn default_history_size() -> usize {
    600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Grid dimensions, `L` (rows) and `C` (columns). Must match the
    /// environment file's declared header and are re-validated against it.
    pub rows: usize,
    pub columns: usize,

    /// Static-field sensitivity.
    pub k_static: f32,
    /// Dynamic-field sensitivity.
    pub k_dynamic: f32,
    /// Fire-field sensitivity.
    pub k_fire: f32,

    /// Dynamic-field diffusion coefficient.
    pub alpha: f32,
    /// Dynamic-field decay coefficient.
    pub delta: f32,
    /// Inertia boost applied to the pedestrian's last movement direction.
    pub omega: f32,
    /// Probability that a same-target conflict is denied to every participant.
    pub mu: f32,

    /// Diagonal-step cost for the Varas static-field variant (typically `sqrt(2)`).
    pub diagonal: f32,
    #[serde(default)]
    pub prevent_corner_crossing: bool,
    #[serde(default)]
    pub immediate_exit: bool,
    #[serde(default)]
    pub allow_x_movement: bool,
    #[serde(default)]
    pub ignore_latest_self_trace: bool,
    #[serde(default)]
    pub velocity_density_field: bool,
    #[serde(default)]
    pub fire_is_present: bool,

    pub risk_distance: f32,
    pub fire_alpha: f32,
    pub fire_gamma: f32,
    pub spread_rate: f32,

    #[serde(default = "default_cell_length")]
    pub cell_length: f32,
    #[serde(default = "default_timestep_time")]
    pub timestep_time: f32,

    pub seed: u64,
    pub num_simulations: u32,
    #[serde(default = "default_max_timesteps")]
    pub max_timesteps: u64,
    #[serde(default = "default_history_size")]
    pub diagnostic_history_size: usize,

    pub static_field_variant: StaticFieldVariant,
}

impl SimulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(SimulationError::Configuration(
                "rows and columns must be non-zero".into(),
            ));
        }
        if self.num_simulations == 0 {
            return Err(SimulationError::Configuration(
                "num_simulations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mu) {
            return Err(SimulationError::Configuration(
                "mu must be a probability in [0, 1]".into(),
            ));
        }
        if self.alpha < 0.0 || self.alpha > 1.0 || self.delta < 0.0 || self.delta > 1.0 {
            return Err(SimulationError::Configuration(
                "alpha and delta must be fractions in [0, 1]".into(),
            ));
        }
        if self.diagonal <= 0.0 {
            return Err(SimulationError::Configuration(
                "diagonal step cost must be positive".into(),
            ));
        }
        if self.max_timesteps == 0 {
            return Err(SimulationError::Configuration(
                "max_timesteps must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn transition_params(&self) -> TransitionParams {
        TransitionParams {
            k_static: self.k_static,
            k_dynamic: self.k_dynamic,
            k_fire: self.k_fire,
            risk_distance: self.risk_distance,
            fire_alpha: self.fire_alpha,
            inertia: self.omega,
            ignore_latest_self_trace: self.ignore_latest_self_trace,
        }
    }
}

pub fn parse_toml(text: &str) -> SimResult<SimulationConfig> {
    let config: SimulationConfig =
        toml::from_str(text).map_err(|err| SimulationError::Configuration(err.to_string()))?;
    config.validate()?;
    Ok(config)
}
