//! Per-tick reward accounting for a [vehicle](Vehicle).

use super::{
    checkpoint::{CheckpointLedger, Crossing},
    ticks_in,
    track::{Cell, TrackMap},
    vehicle::{TrackStatus, Vehicle},
};
use serde::{Deserialize, Serialize};

/// A speed shaping tier: vehicles at or above `min_speed` earn `reward`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTier {
    pub min_speed: f64,
    pub reward: f64,
}

/// Reward magnitudes, timers and detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub checkpoint_reward: f64,
    /// Radius, in cells, of the disk scanned for checkpoint cells.
    pub checkpoint_radius: i64,
    /// Seconds before a credited checkpoint can pay again.
    pub checkpoint_cooldown: f64,
    /// Minimum seconds between two off-track penalties.
    pub off_track_interval: f64,
    pub partially_off_penalty: f64,
    pub completely_off_penalty: f64,
    /// Seconds between two speed checks.
    pub speed_interval: f64,
    /// Tiers ordered from fastest to slowest.
    pub speed_tiers: Vec<SpeedTier>,
    /// Reward below the slowest tier.
    pub slow_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            checkpoint_reward: 5.0,
            checkpoint_radius: 2,
            checkpoint_cooldown: 5.0,
            off_track_interval: 0.25,
            partially_off_penalty: -1.0,
            completely_off_penalty: -2.0,
            speed_interval: 0.25,
            speed_tiers: vec![
                SpeedTier {
                    min_speed: 6.0,
                    reward: 0.3,
                },
                SpeedTier {
                    min_speed: 3.0,
                    reward: 0.2,
                },
                SpeedTier {
                    min_speed: 1.0,
                    reward: 0.1,
                },
            ],
            slow_penalty: -0.5,
        }
    }
}

/// The contributions making up one tick's reward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReward {
    pub checkpoint: f64,
    pub off_track: f64,
    pub speed: f64,
}

impl TickReward {
    pub fn total(&self) -> f64 {
        self.checkpoint + self.off_track + self.speed
    }
}

/// Scores ticks from checkpoints, off-track time and speed.
///
/// Off-track penalties and speed shaping each run on their own timer. Timers count whole
/// simulation ticks; configured intervals are rounded to the nearest tick.
#[derive(Debug, Clone)]
pub struct RewardAccounting {
    config: RewardConfig,
    ledger: CheckpointLedger,
    off_track_ticks: u64,
    speed_ticks: u64,
    last_penalty: u64,
    last_speed_check: u64,
}

impl RewardAccounting {
    pub fn new(config: RewardConfig, ticks_per_second: f64) -> Self {
        let ledger = CheckpointLedger::new(ticks_in(config.checkpoint_cooldown, ticks_per_second));
        RewardAccounting {
            off_track_ticks: ticks_in(config.off_track_interval, ticks_per_second),
            speed_ticks: ticks_in(config.speed_interval, ticks_per_second),
            config,
            ledger,
            last_penalty: 0,
            last_speed_check: 0,
        }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub fn ledger(&self) -> &CheckpointLedger {
        &self.ledger
    }

    /// Forgets every checkpoint and restarts both timers at `tick`.
    pub fn reset(&mut self, tick: u64) {
        self.ledger.clear();
        self.last_penalty = tick;
        self.last_speed_check = tick;
    }

    /// Scores the vehicle's current pose and adds the total to its score.
    pub fn evaluate(&mut self, vehicle: &mut Vehicle, track: &TrackMap, tick: u64) -> TickReward {
        let reward = TickReward {
            checkpoint: self.checkpoint(vehicle, track, tick),
            off_track: self.off_track(vehicle, track, tick),
            speed: self.speed(vehicle, tick),
        };
        vehicle.add_score(reward.total());
        reward
    }

    /// Scans a disk around the vehicle for a checkpoint worth crediting.
    ///
    /// Cells are visited column by column. Meeting the last credited checkpoint ends the scan
    /// empty-handed; a cooling checkpoint is skipped.
    pub fn checkpoint(&mut self, vehicle: &mut Vehicle, track: &TrackMap, tick: u64) -> f64 {
        let r = self.config.checkpoint_radius;
        let center = vehicle.pos();
        for dx in -r..=r {
            for dy in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let position = (
                    (center.x + dx as f64).floor() as i64,
                    (center.y + dy as f64).floor() as i64,
                );
                if track.cell(position.0, position.1) != Cell::Checkpoint {
                    continue;
                }
                match self.ledger.cross(position, vehicle.last_checkpoint(), tick) {
                    Crossing::Credited => {
                        vehicle.set_last_checkpoint(position);
                        log::debug!("checkpoint {:?} credited on tick {}", position, tick);
                        return self.config.checkpoint_reward;
                    }
                    Crossing::Repeated => return 0.0,
                    Crossing::Cooling => {}
                }
            }
        }
        0.0
    }

    /// Penalizes leaving the track, at most once per interval.
    pub fn off_track(&mut self, vehicle: &Vehicle, track: &TrackMap, tick: u64) -> f64 {
        if tick.saturating_sub(self.last_penalty) < self.off_track_ticks {
            return 0.0;
        }
        let penalty = match vehicle.track_status(track) {
            TrackStatus::OnRoad => return 0.0,
            TrackStatus::PartiallyOff => self.config.partially_off_penalty,
            TrackStatus::CompletelyOff => self.config.completely_off_penalty,
        };
        self.last_penalty = tick;
        log::debug!("off track penalty {} on tick {}", penalty, tick);
        penalty
    }

    /// Rewards keeping speed up, once per interval.
    pub fn speed(&mut self, vehicle: &Vehicle, tick: u64) -> f64 {
        if tick.saturating_sub(self.last_speed_check) < self.speed_ticks {
            return 0.0;
        }
        self.last_speed_check = tick;
        let speed = vehicle.speed().abs();
        self.config
            .speed_tiers
            .iter()
            .find(|tier| speed >= tier.min_speed)
            .map_or(self.config.slow_penalty, |tier| tier.reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{vehicle::VehicleConfig, Point};

    /// A 100x40 road with checkpoint columns at x = 30 and x = 60.
    fn track() -> TrackMap {
        let (w, h) = (100, 40);
        let cells = (0..w * h)
            .map(|i| match i % w {
                30 | 60 => Cell::Checkpoint,
                _ => Cell::Road,
            })
            .collect();
        TrackMap::from_cells(w, h, cells).unwrap()
    }

    fn vehicle_at(x: f64) -> Vehicle {
        Vehicle::new(VehicleConfig::default(), Point::new(x, 20.5), 0.0)
    }

    fn accounting() -> RewardAccounting {
        RewardAccounting::new(RewardConfig::default(), 60.0)
    }

    #[test]
    fn intervals_become_ticks() {
        let rewards = accounting();
        assert_eq!(rewards.off_track_ticks, 15);
        assert_eq!(rewards.speed_ticks, 15);
        assert!(rewards.ledger().is_empty());
    }

    #[test]
    fn same_checkpoint_twice_pays_once() {
        let track = track();
        let mut rewards = accounting();
        let mut v = vehicle_at(30.5);
        assert_eq!(rewards.checkpoint(&mut v, &track, 60), 5.0);
        let credited = v.last_checkpoint().unwrap();
        assert_eq!(rewards.checkpoint(&mut v, &track, 66), 0.0);
        assert_eq!(rewards.checkpoint(&mut v, &track, 6000), 0.0);
        assert_eq!(v.last_checkpoint(), Some(credited));
    }

    #[test]
    fn different_checkpoints_both_pay() {
        let track = track();
        let mut rewards = accounting();
        let mut v = vehicle_at(30.5);
        assert_eq!(rewards.checkpoint(&mut v, &track, 60), 5.0);
        v.set_pose(60.5, 20.5, 0.0);
        assert_eq!(rewards.checkpoint(&mut v, &track, 66), 5.0);
        assert_eq!(v.last_checkpoint().unwrap().0, 60);
    }

    #[test]
    fn cooling_checkpoint_is_skipped() {
        let track = track();
        let mut rewards = accounting();
        let mut v = vehicle_at(30.5);
        rewards.checkpoint(&mut v, &track, 0);
        let first = v.last_checkpoint().unwrap();
        v.set_pose(60.5, 20.5, 0.0);
        rewards.checkpoint(&mut v, &track, 60);
        // Back at the first checkpoint before its cooldown ran out: the column holds other
        // fresh cells, so one of those gets credited instead.
        v.set_pose(30.5, 20.5, 0.0);
        assert_eq!(rewards.checkpoint(&mut v, &track, 120), 5.0);
        assert_ne!(v.last_checkpoint(), Some(first));
        assert_eq!(v.last_checkpoint().unwrap().0, 30);
    }

    #[test]
    fn no_checkpoint_nearby() {
        let track = track();
        let mut rewards = accounting();
        let mut v = vehicle_at(45.5);
        assert_eq!(rewards.checkpoint(&mut v, &track, 0), 0.0);
        assert!(rewards.ledger().is_empty());
    }

    #[test]
    fn off_track_penalty_is_rate_limited() {
        let (w, h) = (100, 40);
        let off = TrackMap::from_cells(w, h, vec![Cell::Off; w * h]).unwrap();
        let mut rewards = accounting();
        let v = vehicle_at(50.0);
        rewards.reset(0);
        assert_eq!(rewards.off_track(&v, &off, 6), 0.0);
        assert_eq!(rewards.off_track(&v, &off, 15), -2.0);
        assert_eq!(rewards.off_track(&v, &off, 24), 0.0);
        assert_eq!(rewards.off_track(&v, &off, 30), -2.0);
        // On the road nothing is charged and the timer keeps running
        assert_eq!(rewards.off_track(&v, &track(), 54), 0.0);
        assert_eq!(rewards.off_track(&v, &off, 54), -2.0);
    }

    #[test]
    fn off_track_penalties_are_evenly_spaced() {
        let (w, h) = (100, 40);
        let off = TrackMap::from_cells(w, h, vec![Cell::Off; w * h]).unwrap();
        let road = track();
        let mut rewards = accounting();
        let v = vehicle_at(50.0);
        rewards.reset(0);

        let mut charged = Vec::new();
        for tick in 1..=200 {
            let track = if tick < 23 { &road } else { &off };
            if rewards.off_track(&v, track, tick) != 0.0 {
                charged.push(tick);
            }
        }
        assert_eq!(charged[0], 23);
        assert_eq!(charged.len(), 12);
        assert!(charged.windows(2).all(|pair| pair[1] - pair[0] == 15));
    }

    #[test]
    fn partially_off_penalty() {
        let (w, h) = (100, 40);
        let cells = (0..w * h)
            .map(|i| if i % w < 50 { Cell::Road } else { Cell::Off })
            .collect();
        let half = TrackMap::from_cells(w, h, cells).unwrap();
        let mut rewards = accounting();
        assert_eq!(rewards.off_track(&vehicle_at(50.0), &half, 60), -1.0);
    }

    #[test]
    fn speed_tiers_decrease_with_speed() {
        let mut rewards = accounting();
        let mut v = vehicle_at(50.0);
        let mut tick = 0;
        let mut reward_at = |speed: f64| {
            tick += 60;
            v.set_speed(speed);
            rewards.speed(&v, tick)
        };
        assert_eq!(reward_at(6.0), 0.3);
        assert_eq!(reward_at(4.0), 0.2);
        assert_eq!(reward_at(1.5), 0.1);
        assert_eq!(reward_at(0.5), -0.5);
        assert_eq!(reward_at(-4.0), 0.2);
    }

    #[test]
    fn speed_check_restarts_timer() {
        let mut rewards = accounting();
        let v = vehicle_at(50.0);
        rewards.reset(0);
        assert_eq!(rewards.speed(&v, 14), 0.0);
        assert_eq!(rewards.speed(&v, 15), -0.5);
        assert_eq!(rewards.speed(&v, 29), 0.0);
        assert_eq!(rewards.speed(&v, 30), -0.5);
    }

    #[test]
    fn evaluate_sums_and_rounds_into_score() {
        let track = track();
        let mut rewards = accounting();
        let mut v = vehicle_at(30.5);
        v.set_speed(1.5);
        rewards.reset(0);
        let reward = rewards.evaluate(&mut v, &track, 30);
        assert_eq!(reward.checkpoint, 5.0);
        assert_eq!(reward.off_track, 0.0);
        assert_eq!(reward.speed, 0.1);
        assert_eq!(v.score(), 5.1);
    }
}
