//! The vehicle being driven around the [track](TrackMap).

use super::{round1, track::TrackMap, Point, Vector, World};
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Number of discrete [actions](Action).
pub const ACTION_COUNT: usize = 4;

/// Physical constants of a [vehicle](Vehicle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Length of the collision rectangle along the heading.
    pub width: f64,
    /// Length of the collision rectangle across the heading.
    pub height: f64,
    /// Speed cap while fully on the track.
    pub max_speed: f64,
    pub max_speed_partially_off: f64,
    pub max_speed_completely_off: f64,
    /// Speed gained per accelerate action.
    pub acceleration: f64,
    /// Multiplicative factor applied to speed while coasting or over a cap.
    pub deceleration: f64,
    /// Degrees turned per tick at full speed.
    pub rotation_speed: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        VehicleConfig {
            width: 20.0,
            height: 10.0,
            max_speed: 6.0,
            max_speed_partially_off: 3.0,
            max_speed_completely_off: 1.0,
            acceleration: 0.2,
            deceleration: 0.95,
            rotation_speed: 4.0,
        }
    }
}

/// A discrete control applied for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Accelerate,
    TurnLeft,
    TurnRight,
    Coast,
}

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::Accelerate,
        Action::TurnLeft,
        Action::TurnRight,
        Action::Coast,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Direction keys held during a tick of manual control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// How much of the vehicle sits on the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    OnRoad,
    PartiallyOff,
    CompletelyOff,
}

impl TrackStatus {
    /// Derives the status from the number of corners (out of four) on the track.
    pub fn from_corners(on_track: usize) -> Self {
        match on_track {
            4 => TrackStatus::OnRoad,
            0 => TrackStatus::CompletelyOff,
            _ => TrackStatus::PartiallyOff,
        }
    }
}

/// Result of integrating one tick of motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// The vehicle moved and now has this status.
    Moved(TrackStatus),
    /// The move would have left the world; the vehicle stayed put.
    Collided,
}

/// A vehicle with a pose, a speed and a score.
#[derive(Debug, Clone)]
pub struct Vehicle {
    config: VehicleConfig,
    start: Point,
    start_heading: f64,
    position: Point,
    heading: f64,
    speed: f64,
    current_max_speed: f64,
    score: f64,
    last_checkpoint: Option<(i64, i64)>,
}

/// Wraps an angle in degrees into `[0, 360)`.
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

impl Vehicle {
    /// Constructs a new `Vehicle` at rest at the given start pose.
    pub fn new(config: VehicleConfig, start: Point, heading: f64) -> Self {
        let current_max_speed = config.max_speed;
        let heading = normalize_heading(heading);
        Vehicle {
            config,
            start,
            start_heading: heading,
            position: start,
            heading,
            speed: 0.0,
            current_max_speed,
            score: 0.0,
            last_checkpoint: None,
        }
    }

    /// Returns the vehicle to its start pose with no speed, score or checkpoint history.
    pub fn reset(&mut self) {
        self.position = self.start;
        self.heading = self.start_heading;
        self.speed = 0.0;
        self.current_max_speed = self.config.max_speed;
        self.score = 0.0;
        self.last_checkpoint = None;
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn pos(&self) -> Point {
        self.position
    }

    /// Heading in degrees, within `[0, 360)`.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The cap selected by the most recent track status.
    pub fn current_max_speed(&self) -> f64 {
        self.current_max_speed
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn last_checkpoint(&self) -> Option<(i64, i64)> {
        self.last_checkpoint
    }

    pub(crate) fn set_last_checkpoint(&mut self, position: (i64, i64)) {
        self.last_checkpoint = Some(position);
    }

    /// Adds to the score, keeping it rounded to one decimal.
    pub fn add_score(&mut self, delta: f64) {
        self.score = round1(self.score + delta);
    }

    /// Places the vehicle at an arbitrary pose.
    pub fn set_pose(&mut self, x: f64, y: f64, heading: f64) {
        self.position = Point::new(x, y);
        self.heading = normalize_heading(heading);
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Unit vector along the heading, with the screen y axis pointing down.
    pub fn direction(&self) -> Vector {
        direction(self.heading)
    }

    /// Applies an agent's action to speed and heading.
    pub fn apply_action(&mut self, action: Action) {
        match action {
            Action::Accelerate => {
                self.speed = f64::min(self.speed + self.config.acceleration, self.current_max_speed)
            }
            Action::TurnLeft => self.turn(1.0),
            Action::TurnRight => self.turn(-1.0),
            Action::Coast => self.speed *= self.config.deceleration,
        }
    }

    /// Applies held keys to speed and heading.
    ///
    /// Holding up accelerates while under the cap, holding down keeps the current speed and
    /// holding neither coasts. Left and right apply independently of each other.
    pub fn apply_manual(&mut self, input: ManualInput) {
        if input.up {
            if self.speed < self.current_max_speed {
                self.speed += self.config.acceleration;
            }
        } else if !input.down {
            self.speed *= self.config.deceleration;
        }
        if input.left {
            self.turn(1.0);
        }
        if input.right {
            self.turn(-1.0);
        }
    }

    /// Turns in the given direction, scaled by how close speed is to the cap.
    fn turn(&mut self, sign: f64) {
        let rate = self.config.rotation_speed * (self.speed / self.current_max_speed);
        self.heading = normalize_heading(self.heading + sign * rate);
    }

    /// Moves the vehicle one tick along its heading and updates its speed cap.
    ///
    /// The move is rejected if the collision rectangle would leave the world.
    pub fn integrate(&mut self, track: &TrackMap, world: &World) -> Motion {
        let candidate = self.position + self.direction() * self.speed;
        if !world.contains(
            candidate,
            self.config.width / 2.0,
            self.config.height / 2.0,
        ) {
            return Motion::Collided;
        }

        let status = self.status_at(track, candidate);
        self.position = candidate;
        match status {
            TrackStatus::OnRoad => {
                self.current_max_speed = self.config.max_speed;
                self.speed = f64::min(self.speed, self.current_max_speed);
            }
            TrackStatus::PartiallyOff => self.slow_to(self.config.max_speed_partially_off),
            TrackStatus::CompletelyOff => self.slow_to(self.config.max_speed_completely_off),
        }
        Motion::Moved(status)
    }

    /// Lowers the cap, easing speed toward it rather than clamping.
    fn slow_to(&mut self, cap: f64) {
        self.current_max_speed = cap;
        if self.speed > cap {
            self.speed *= self.config.deceleration;
        }
    }

    /// Corners of the collision rectangle centered at `center`, rotated by the heading.
    ///
    /// Order is top left, top right, bottom right, bottom left before rotation.
    pub fn corners_at(&self, center: Point) -> [Point; 4] {
        let (hw, hh) = (self.config.width / 2.0, self.config.height / 2.0);
        let rotation = na::Rotation2::new(self.heading.to_radians());
        let offsets = [
            Vector::new(-hw, -hh),
            Vector::new(hw, -hh),
            Vector::new(hw, hh),
            Vector::new(-hw, hh),
        ];
        let mut corners = [center; 4];
        for (corner, offset) in corners.iter_mut().zip(offsets.iter()) {
            *corner = center + rotation * *offset;
        }
        corners
    }

    /// Classifies how much of the vehicle would be on the track if centered at `center`.
    pub fn status_at(&self, track: &TrackMap, center: Point) -> TrackStatus {
        let on_track = self
            .corners_at(center)
            .iter()
            .filter(|c| track.is_on_track(c.x, c.y))
            .count();
        TrackStatus::from_corners(on_track)
    }

    /// Classifies the current pose.
    pub fn track_status(&self, track: &TrackMap) -> TrackStatus {
        self.status_at(track, self.position)
    }
}

/// Unit vector for a heading in degrees, with the screen y axis pointing down.
pub fn direction(heading: f64) -> Vector {
    let rad = heading.to_radians();
    Vector::new(rad.cos(), -rad.sin())
}
