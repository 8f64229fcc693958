//! The tabular Q-learning agent that drives the [vehicle](crate::vehicle::Vehicle).

use super::{
    sensors::SENSOR_COUNT,
    vehicle::{Action, ACTION_COUNT},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Action-values of a single [state](State), indexed by [`Action::index`].
pub type ActionValues = [f64; ACTION_COUNT];

/// Errors raised while reading or writing a [Q-table](QTable).
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("q-table i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("q-table is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Learning parameters of the [agent](QLearningAgent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    /// Exploration rate at the start of a run.
    pub exploration_rate: f64,
    /// Multiplier applied to the exploration rate on every decay.
    pub exploration_decay: f64,
    pub min_exploration_rate: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 1.0,
            exploration_decay: 0.995,
            min_exploration_rate: 0.01,
        }
    }
}

/// Bucket sizes used to turn continuous readings into a [state](State).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Discretization {
    /// Degrees per heading bucket.
    pub heading_bucket: f64,
    /// Pixels per sensor distance bucket.
    pub sensor_bucket: f64,
}

impl Default for Discretization {
    fn default() -> Self {
        Discretization {
            heading_bucket: 10.0,
            sensor_bucket: 10.0,
        }
    }
}

/// The discretized situation of the vehicle; the key of the [Q-table](QTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub on_track: bool,
    pub speed: i32,
    pub heading: i32,
    pub sensors: [i32; SENSOR_COUNT],
}

impl Discretization {
    /// Buckets continuous readings.
    ///
    /// Every value is truncated toward zero, so negative (off-track) sensor distances keep
    /// their sign.
    pub fn state(
        &self,
        on_track: bool,
        speed: f64,
        heading: f64,
        distances: &[f64; SENSOR_COUNT],
    ) -> State {
        let mut sensors = [0; SENSOR_COUNT];
        for (bucket, distance) in sensors.iter_mut().zip(distances.iter()) {
            *bucket = (distance / self.sensor_bucket) as i32;
        }
        State {
            on_track,
            speed: speed as i32,
            heading: (heading / self.heading_bucket) as i32,
            sensors,
        }
    }
}

/// One persisted row of a [Q-table](QTable).
#[derive(Serialize, Deserialize)]
struct Entry {
    state: State,
    values: ActionValues,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    entries: Vec<Entry>,
}

/// Action-values keyed by [state](State).
///
/// Unknown states read as all zeros. Only [`values_mut`](Self::values_mut) adds rows, so the
/// table holds exactly the states that have been written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: HashMap<State, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the values of a state without adding it.
    pub fn values(&self, state: &State) -> ActionValues {
        self.values
            .get(state)
            .copied()
            .unwrap_or([0.0; ACTION_COUNT])
    }

    /// Returns the values of a state for writing, inserting zeros on first use.
    pub fn values_mut(&mut self, state: &State) -> &mut ActionValues {
        self.values.entry(*state).or_insert([0.0; ACTION_COUNT])
    }

    pub fn contains(&self, state: &State) -> bool {
        self.values.contains_key(state)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.values.keys()
    }

    /// Writes the table as JSON, rows sorted by state.
    ///
    /// The document goes to a sibling `.tmp` file first and is renamed over `path` once it is
    /// on disk, so an interrupted save leaves the previous table intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        let path = path.as_ref();
        let mut entries: Vec<Entry> = self
            .values
            .iter()
            .map(|(state, values)| Entry {
                state: *state,
                values: *values,
            })
            .collect();
        entries.sort_by(|a, b| a.state.cmp(&b.state));

        let tmp_path = staging_path(path);
        let mut writer = BufWriter::new(fs::File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, &Snapshot { entries })?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Reads a table written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let reader = BufReader::new(fs::File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        Ok(QTable {
            values: snapshot
                .entries
                .into_iter()
                .map(|e| (e.state, e.values))
                .collect(),
        })
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &ActionValues) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// An epsilon-greedy Q-learning agent.
///
/// Randomness comes from the injected `rng`, so a seeded generator makes runs reproducible.
pub struct QLearningAgent<R: Rng> {
    config: AgentConfig,
    exploration_rate: f64,
    table: QTable,
    rng: R,
}

impl<R: Rng> QLearningAgent<R> {
    /// Constructs a new `QLearningAgent` with an empty table.
    pub fn new(config: AgentConfig, rng: R) -> Self {
        let exploration_rate = config.exploration_rate;
        QLearningAgent {
            config,
            exploration_rate,
            table: QTable::new(),
            rng,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut QTable {
        &mut self.table
    }

    pub fn set_table(&mut self, table: QTable) {
        self.table = table;
    }

    /// Picks a random action with probability equal to the exploration rate, otherwise the
    /// [greedy](Self::greedy_action) one.
    pub fn select_action(&mut self, state: &State) -> Action {
        if self.rng.gen::<f64>() < self.exploration_rate {
            Action::ALL[self.rng.gen_range(0..ACTION_COUNT)]
        } else {
            self.greedy_action(state)
        }
    }

    /// The best known action for a state; ties go to the first action.
    pub fn greedy_action(&self, state: &State) -> Action {
        Action::ALL[argmax(&self.table.values(state))]
    }

    /// Applies one TD(0) update for the transition `state --action--> next_state`.
    pub fn update(&mut self, state: &State, action: Action, reward: f64, next_state: &State) {
        let next = self.table.values(next_state);
        let target = reward + self.config.discount_factor * next[argmax(&next)];
        let learning_rate = self.config.learning_rate;
        let value = &mut self.table.values_mut(state)[action.index()];
        *value += learning_rate * (target - *value);
    }

    /// Shrinks the exploration rate, never below its floor.
    pub fn decay_exploration(&mut self) {
        self.exploration_rate = f64::max(
            self.config.min_exploration_rate,
            self.exploration_rate * self.config.exploration_decay,
        );
    }

    /// Replaces the table with the one stored at `path`.
    ///
    /// A missing or unreadable file leaves the agent with an empty table.
    pub fn load_or_empty<P: AsRef<Path>>(&mut self, path: P) {
        let path = path.as_ref();
        self.table = match QTable::load(path) {
            Ok(table) => {
                log::info!("loaded {} states from {}", table.len(), path.display());
                table
            }
            Err(PersistError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no q-table at {}, starting empty", path.display());
                QTable::new()
            }
            Err(e) => {
                log::warn!("ignoring q-table at {}: {}", path.display(), e);
                QTable::new()
            }
        };
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        self.table.save(path)
    }
}
