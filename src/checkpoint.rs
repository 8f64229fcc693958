//! Cooldown bookkeeping for track checkpoints.

use std::collections::HashMap;

/// A checkpoint cell and the tick it last granted a reward on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub position: (i64, i64),
    pub last_crossed: u64,
}

impl Checkpoint {
    /// Whether `cooldown` ticks have passed since the last crossing.
    pub fn is_active(&self, tick: u64, cooldown: u64) -> bool {
        tick.saturating_sub(self.last_crossed) >= cooldown
    }
}

/// What happened when the vehicle touched a checkpoint cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// The checkpoint granted its reward.
    Credited,
    /// The checkpoint is the last one credited; it never pays twice in a row.
    Repeated,
    /// The checkpoint is still cooling down.
    Cooling,
}

/// Every checkpoint crossed during the current episode, keyed by cell.
///
/// Entries are created on first crossing and never removed until [cleared](Self::clear).
/// Times are counted in simulation ticks.
#[derive(Debug, Clone, Default)]
pub struct CheckpointLedger {
    cooldown: u64,
    checkpoints: HashMap<(i64, i64), Checkpoint>,
}

impl CheckpointLedger {
    pub fn new(cooldown: u64) -> Self {
        CheckpointLedger {
            cooldown,
            checkpoints: HashMap::new(),
        }
    }

    pub fn get(&self, position: (i64, i64)) -> Option<&Checkpoint> {
        self.checkpoints.get(&position)
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn clear(&mut self) {
        self.checkpoints.clear();
    }

    /// Records a crossing of `position` and reports whether it earns a reward.
    ///
    /// `last` is the checkpoint the vehicle was most recently credited for.
    pub fn cross(&mut self, position: (i64, i64), last: Option<(i64, i64)>, tick: u64) -> Crossing {
        if last == Some(position) {
            return Crossing::Repeated;
        }
        match self.checkpoints.get_mut(&position) {
            Some(cp) if !cp.is_active(tick, self.cooldown) => Crossing::Cooling,
            Some(cp) => {
                cp.last_crossed = tick;
                Crossing::Credited
            }
            None => {
                self.checkpoints.insert(
                    position,
                    Checkpoint {
                        position,
                        last_crossed: tick,
                    },
                );
                Crossing::Credited
            }
        }
    }
}
