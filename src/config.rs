//! Simulation and training settings, loadable from JSON.

use super::{
    agent::{AgentConfig, Discretization},
    rewards::RewardConfig,
    ticks_in,
    track::TrackPalette,
    vehicle::VehicleConfig,
};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be between 0 and 1 (got {value})")]
    NotUnit { field: &'static str, value: f64 },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("speed tiers must strictly decrease in both speed and reward")]
    SpeedTiersOrder,
}

/// World dimensions and simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: u32,
    pub height: u32,
    /// Simulation ticks per simulated second.
    pub ticks_per_second: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            width: 800,
            height: 600,
            ticks_per_second: 60,
        }
    }
}

/// How a training session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Episode length in simulated seconds.
    pub episode_duration: f64,
    pub num_episodes: u32,
    /// Drive from keyboard input instead of the agent.
    pub manual_control: bool,
    /// Update the Q-table and decay exploration while driving.
    pub learning_mode: bool,
    pub sensor_range: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            episode_duration: 15.0,
            num_episodes: 1000,
            manual_control: false,
            learning_mode: true,
            sensor_range: 150.0,
        }
    }
}

/// Every setting of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub world: WorldConfig,
    pub palette: TrackPalette,
    pub vehicle: VehicleConfig,
    pub agent: AgentConfig,
    pub state: Discretization,
    pub rewards: RewardConfig,
    pub session: SessionConfig,
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    // Written this way round so NaN is rejected too
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::NotUnit { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl Config {
    /// Reads and validates a JSON config. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("world.width", self.world.width as f64)?;
        positive("world.height", self.world.height as f64)?;
        positive("world.ticks_per_second", self.world.ticks_per_second as f64)?;

        let v = &self.vehicle;
        positive("vehicle.width", v.width)?;
        positive("vehicle.height", v.height)?;
        positive("vehicle.max_speed", v.max_speed)?;
        positive("vehicle.max_speed_partially_off", v.max_speed_partially_off)?;
        positive("vehicle.max_speed_completely_off", v.max_speed_completely_off)?;
        positive("vehicle.acceleration", v.acceleration)?;
        unit("vehicle.deceleration", v.deceleration)?;
        non_negative("vehicle.rotation_speed", v.rotation_speed)?;

        let a = &self.agent;
        unit("agent.learning_rate", a.learning_rate)?;
        unit("agent.discount_factor", a.discount_factor)?;
        unit("agent.exploration_rate", a.exploration_rate)?;
        unit("agent.exploration_decay", a.exploration_decay)?;
        unit("agent.min_exploration_rate", a.min_exploration_rate)?;

        positive("state.heading_bucket", self.state.heading_bucket)?;
        positive("state.sensor_bucket", self.state.sensor_bucket)?;

        let r = &self.rewards;
        non_negative("rewards.checkpoint_radius", r.checkpoint_radius as f64)?;
        non_negative("rewards.checkpoint_cooldown", r.checkpoint_cooldown)?;
        positive("rewards.off_track_interval", r.off_track_interval)?;
        positive("rewards.speed_interval", r.speed_interval)?;
        let ordered = r.speed_tiers.windows(2).all(|w| {
            w[0].min_speed > w[1].min_speed && w[0].reward > w[1].reward
        });
        let above_penalty = r
            .speed_tiers
            .last()
            .map_or(true, |t| t.reward > r.slow_penalty);
        if !ordered || !above_penalty {
            return Err(ConfigError::SpeedTiersOrder);
        }

        positive("session.episode_duration", self.session.episode_duration)?;
        positive("session.sensor_range", self.session.sensor_range)?;
        Ok(())
    }

    /// Number of ticks in one episode.
    pub fn episode_ticks(&self) -> u64 {
        ticks_in(
            self.session.episode_duration,
            self.world.ticks_per_second as f64,
        )
    }
}
