//! The environment the vehicle is driven in: track, vehicle, sensors and reward accounting.

use super::{
    agent::{Discretization, State},
    config::Config,
    rewards::{RewardAccounting, TickReward},
    sensors::SensorArray,
    track::{TrackError, TrackMap},
    vehicle::{Action, ManualInput, Motion, Vehicle},
    Point, World,
};

/// Who is steering during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Agent(Action),
    Manual(ManualInput),
}

/// Outcome of a single [step](Environment::step).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// The state observed after the step.
    pub state: State,
    pub reward: TickReward,
    /// The vehicle tried to leave the world.
    pub collided: bool,
}

/// An environment for one [vehicle](Vehicle) on one [track](TrackMap).
///
/// The world bounds are the track's dimensions. Time is simulated: every step advances the
/// clock by one tick.
pub struct Environment {
    track: TrackMap,
    world: World,
    vehicle: Vehicle,
    sensors: SensorArray,
    rewards: RewardAccounting,
    buckets: Discretization,
    ticks_per_second: f64,
    tick: u64,
}

impl Environment {
    /// Constructs a new `Environment` with the vehicle on the track's start line.
    ///
    /// Fails if the track has no usable start line.
    pub fn new(track: TrackMap, config: &Config) -> Result<Self, TrackError> {
        let start = track.find_start()?;
        let vehicle = Vehicle::new(
            config.vehicle.clone(),
            Point::new(start.x, start.y),
            start.heading,
        );
        Ok(Self::with_vehicle(track, vehicle, config))
    }

    /// Constructs a new `Environment` around an already placed vehicle.
    pub fn with_vehicle(track: TrackMap, vehicle: Vehicle, config: &Config) -> Self {
        let world = World::new(track.width() as f64, track.height() as f64);
        let mut env = Environment {
            track,
            world,
            vehicle,
            sensors: SensorArray::new(config.session.sensor_range),
            rewards: RewardAccounting::new(
                config.rewards.clone(),
                config.world.ticks_per_second as f64,
            ),
            buckets: config.state.clone(),
            ticks_per_second: config.world.ticks_per_second as f64,
            tick: 0,
        };
        env.sensors.update(&env.vehicle, &env.track);
        env
    }

    pub fn track(&self) -> &TrackMap {
        &self.track
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut Vehicle {
        &mut self.vehicle
    }

    pub fn sensors(&self) -> &SensorArray {
        &self.sensors
    }

    pub fn rewards(&self) -> &RewardAccounting {
        &self.rewards
    }

    /// Ticks since the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since the last reset.
    pub fn now(&self) -> f64 {
        self.tick as f64 / self.ticks_per_second
    }

    /// Puts the vehicle back on the start line and clears the episode's history.
    pub fn reset(&mut self) -> State {
        self.tick = 0;
        self.vehicle.reset();
        self.rewards.reset(self.tick);
        self.sensors.update(&self.vehicle, &self.track);
        self.state()
    }

    /// Has the vehicle perform a single control.
    ///
    /// This function can be thought of as a "frame" or timestep through the environment:
    /// the control is applied and integrated, the sensors are recast from the new pose and
    /// the new pose is scored.
    pub fn step(&mut self, control: Control) -> Step {
        self.tick += 1;

        match control {
            Control::Agent(action) => self.vehicle.apply_action(action),
            Control::Manual(input) => self.vehicle.apply_manual(input),
        }
        let motion = self.vehicle.integrate(&self.track, &self.world);
        self.sensors.update(&self.vehicle, &self.track);
        let reward = self.rewards.evaluate(&mut self.vehicle, &self.track, self.tick);

        Step {
            state: self.state(),
            reward,
            collided: motion == Motion::Collided,
        }
    }

    /// Discretizes the current situation of the vehicle.
    pub fn state(&self) -> State {
        let pos = self.vehicle.pos();
        self.buckets.state(
            self.track.is_on_track(pos.x, pos.y),
            self.vehicle.speed(),
            self.vehicle.heading(),
            &self.sensors.distances(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Cell;

    /// A 200x100 road with a start line column at x = 20 and a checkpoint column at x = 60.
    fn track() -> TrackMap {
        let (w, h) = (200, 100);
        let cells = (0..w * h)
            .map(|i| match (i % w, i / w) {
                (_, y) if !(30..70).contains(&y) => Cell::Off,
                (20, _) => Cell::StartLine,
                (60, _) => Cell::Checkpoint,
                _ => Cell::Road,
            })
            .collect();
        TrackMap::from_cells(w, h, cells).unwrap()
    }

    #[test]
    fn starts_on_start_line_facing_road() {
        let env = Environment::new(track(), &Config::default()).unwrap();
        assert_eq!(env.vehicle().pos(), Point::new(20.0, 30.0));
        // The first start pixel's only road neighbour is to its left
        assert_eq!(env.vehicle().heading(), 180.0);
    }

    #[test]
    fn missing_start_line_is_fatal() {
        let track = TrackMap::from_cells(4, 4, vec![Cell::Road; 16]).unwrap();
        assert!(matches!(
            Environment::new(track, &Config::default()),
            Err(TrackError::NoStartLine)
        ));
    }

    #[test]
    fn step_accelerates_moves_and_scores() {
        let vehicle = Vehicle::new(Default::default(), Point::new(40.5, 50.5), 0.0);
        let mut env = Environment::with_vehicle(track(), vehicle, &Config::default());
        let initial = env.reset();
        assert!(initial.on_track);
        assert_eq!(initial.speed, 0);

        let step = env.step(Control::Agent(Action::Accelerate));
        assert!(!step.collided);
        assert!((env.vehicle().speed() - 0.2).abs() < 1e-12);
        assert!((env.vehicle().pos().x - 40.7).abs() < 1e-9);
        assert_eq!(env.tick(), 1);
        // Road to the right ends at the world edge
        assert_eq!(env.sensors().distances()[2], 150.0);

        let step = env.step(Control::Agent(Action::Coast));
        assert!((env.vehicle().speed() - 0.19).abs() < 1e-12);
        assert_eq!(step.reward.total(), 0.0);
    }

    #[test]
    fn reset_restores_the_start() {
        let vehicle = Vehicle::new(Default::default(), Point::new(58.5, 50.5), 0.0);
        let mut env = Environment::with_vehicle(track(), vehicle, &Config::default());
        env.reset();
        let step = env.step(Control::Agent(Action::Accelerate));
        assert_eq!(step.reward.checkpoint, 5.0);
        assert_eq!(env.vehicle().score(), 5.0);
        assert!(!env.rewards().ledger().is_empty());

        env.reset();
        assert_eq!(env.vehicle().score(), 0.0);
        assert_eq!(env.vehicle().pos(), Point::new(58.5, 50.5));
        assert_eq!(env.vehicle().last_checkpoint(), None);
        assert!(env.rewards().ledger().is_empty());
        assert_eq!(env.now(), 0.0);
    }

    #[test]
    fn leaving_the_world_reports_collision() {
        let vehicle = Vehicle::new(Default::default(), Point::new(189.0, 50.5), 0.0);
        let mut env = Environment::with_vehicle(track(), vehicle, &Config::default());
        env.reset();
        env.vehicle_mut().set_speed(2.0);
        let step = env.step(Control::Agent(Action::Accelerate));
        assert!(step.collided);
        assert_eq!(env.vehicle().pos(), Point::new(189.0, 50.5));
    }
}
