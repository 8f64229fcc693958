//! Episode orchestration: the per-tick loop tying the environment to the agent.

use super::{
    agent::{QLearningAgent, State},
    config::Config,
    env::{Control, Environment, Step},
    round1,
    vehicle::{Action, ManualInput},
};
use rand::Rng;

/// Whether the frontend wants the episode to go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Stop,
}

/// What a [frontend](Frontend) gets to show after each tick.
pub struct Frame<'a> {
    pub env: &'a Environment,
    pub step: &'a Step,
    /// The action the agent took; `None` under manual control.
    pub action: Option<Action>,
    pub episode: u64,
    /// Simulated seconds left in the episode.
    pub remaining: f64,
}

/// Everything outside the simulation: event polling, keyboard state and rendering.
pub trait Frontend {
    /// Keys held for the coming tick. Only consulted under manual control.
    fn manual_input(&mut self) -> ManualInput {
        ManualInput::default()
    }

    /// Presents a finished tick and reports whether to keep going.
    fn present(&mut self, frame: &Frame<'_>) -> Signal;
}

/// A frontend that shows nothing and never stops an episode early.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl Frontend for Headless {
    fn present(&mut self, _frame: &Frame<'_>) -> Signal {
        Signal::Continue
    }
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeEnd {
    /// The episode ran for its full duration.
    TimeUp,
    /// The vehicle hit the edge of the world.
    Collision,
    /// The frontend asked to stop.
    Stopped,
}

/// Summary of a finished episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    pub index: u64,
    pub score: f64,
    pub ticks: u64,
    pub end: EpisodeEnd,
}

/// Runs episodes of an [environment](Environment) driven by an [agent](QLearningAgent) or by
/// hand.
pub struct EpisodeController<R: Rng> {
    env: Environment,
    agent: QLearningAgent<R>,
    episode_duration: f64,
    episode_ticks: u64,
    manual_control: bool,
    learning_mode: bool,
    episode: u64,
}

impl<R: Rng> EpisodeController<R> {
    /// Constructs a new `EpisodeController`. Episode numbering starts at 1.
    pub fn new(env: Environment, agent: QLearningAgent<R>, config: &Config) -> Self {
        EpisodeController {
            env,
            agent,
            episode_duration: config.session.episode_duration,
            episode_ticks: config.episode_ticks(),
            manual_control: config.session.manual_control,
            learning_mode: config.session.learning_mode,
            episode: 0,
        }
    }

    /// Continues numbering after `episode`, e.g. the last one in a training log.
    pub fn resume_after(&mut self, episode: u64) {
        self.episode = episode;
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn agent(&self) -> &QLearningAgent<R> {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut QLearningAgent<R> {
        &mut self.agent
    }

    /// Index of the most recently started episode.
    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// Runs one episode from the start line until time runs out, the vehicle collides with
    /// the world's edge or the frontend stops it.
    pub fn run_episode(&mut self, frontend: &mut dyn Frontend) -> EpisodeOutcome {
        self.episode += 1;
        let mut state = self.env.reset();
        log::info!("starting episode {}", self.episode);

        let end = loop {
            if self.env.tick() >= self.episode_ticks {
                break EpisodeEnd::TimeUp;
            }
            let (step, action) = self.tick(&state, frontend);
            state = step.state;

            let remaining = f64::max(0.0, self.episode_duration - self.env.now());
            let signal = frontend.present(&Frame {
                env: &self.env,
                step: &step,
                action,
                episode: self.episode,
                remaining,
            });

            if step.collided {
                break EpisodeEnd::Collision;
            }
            if signal == Signal::Stop {
                break EpisodeEnd::Stopped;
            }
        };

        let outcome = EpisodeOutcome {
            index: self.episode,
            score: self.env.vehicle().score(),
            ticks: self.env.tick(),
            end,
        };
        log::info!(
            "episode {} ended ({:?}) after {} ticks with score {}, exploration {:.4}",
            outcome.index,
            outcome.end,
            outcome.ticks,
            outcome.score,
            self.agent.exploration_rate()
        );
        outcome
    }

    /// Runs a single tick: pick a control, step the environment, learn from the result.
    fn tick(&mut self, state: &State, frontend: &mut dyn Frontend) -> (Step, Option<Action>) {
        if self.manual_control {
            let input = frontend.manual_input();
            return (self.env.step(Control::Manual(input)), None);
        }

        let action = self.agent.select_action(state);
        let step = self.env.step(Control::Agent(action));
        if self.learning_mode {
            self.agent
                .update(state, action, round1(step.reward.total()), &step.state);
            self.agent.decay_exploration();
        }
        (step, Some(action))
    }
}
