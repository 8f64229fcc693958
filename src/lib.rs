//! A vehicle driving a raster-encoded track, trained by a tabular Q-learning agent.

use nalgebra as na;

pub type Point = na::Point2<f64>;
pub type Vector = na::Vector2<f64>;

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod env;
pub mod rewards;
pub mod sensors;
pub mod track;
pub mod training_log;
pub mod vehicle;

pub use agent::{QLearningAgent, QTable, State};
pub use config::Config;
pub use controller::{EpisodeController, EpisodeEnd, EpisodeOutcome, Frontend, Headless};
pub use env::Environment;
pub use track::{Cell, TrackMap};
pub use vehicle::{Action, TrackStatus, Vehicle};

/// Rounds a value to one decimal place.
///
/// Scores and rewards pass through this so long runs don't accumulate floating drift.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Converts a duration in seconds to the nearest whole number of simulation ticks.
pub fn ticks_in(seconds: f64, ticks_per_second: f64) -> u64 {
    (seconds * ticks_per_second).round().max(0.0) as u64
}

/// The size of the world, in (width, height) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct World {
    pub width: f64,
    pub height: f64,
}

impl World {
    pub fn new(width: f64, height: f64) -> Self {
        World { width, height }
    }

    /// Checks that a rectangle of the given half extents centered at `center` fits inside the
    /// world.
    pub fn contains(&self, center: Point, half_width: f64, half_height: f64) -> bool {
        center.x - half_width >= 0.0
            && center.y - half_height >= 0.0
            && center.x + half_width <= self.width
            && center.y + half_height <= self.height
    }
}
