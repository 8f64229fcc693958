use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::path::PathBuf;
use trackpilot::{
    training_log::TrainingLog, Config, EpisodeController, EpisodeEnd, Environment, Headless,
    QLearningAgent, TrackMap,
};

#[derive(Debug, Parser)]
#[command(name = "trackpilot", version)]
#[command(about = "Trains a Q-learning agent to drive around a raster track")]
struct Args {
    /// Track image; black road, gray checkpoints, yellow start line, white background
    #[arg(long)]
    track: PathBuf,

    /// JSON config file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the Q-table is loaded from and saved to
    #[arg(long, default_value = "q_table.json")]
    q_table: PathBuf,

    /// Append-only episode score log
    #[arg(long, default_value = "training_log.txt")]
    log: PathBuf,

    /// Number of episodes; overrides the config
    #[arg(long)]
    episodes: Option<u32>,

    /// Seed for exploration; random if absent
    #[arg(long)]
    seed: Option<u64>,

    /// Drive the current policy without updating it
    #[arg(long)]
    evaluate: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(episodes) = args.episodes {
        config.session.num_episodes = episodes;
    }
    if args.evaluate {
        config.session.learning_mode = false;
    }
    // There is no keyboard without a window
    config.session.manual_control = false;

    let size = (config.world.width, config.world.height);
    let track = TrackMap::open(&args.track, &config.palette, size)
        .with_context(|| format!("loading track {}", args.track.display()))?;
    let env = Environment::new(track, &config).context("placing the vehicle on the start line")?;

    let rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let mut agent = QLearningAgent::new(config.agent.clone(), rng);
    agent.load_or_empty(&args.q_table);

    let log = TrainingLog::new(&args.log);
    let mut controller = EpisodeController::new(env, agent, &config);
    controller.resume_after(log.last_episode().context("reading the training log")?);

    for _ in 0..config.session.num_episodes {
        let outcome = controller.run_episode(&mut Headless);
        if config.session.learning_mode {
            controller
                .agent()
                .save(&args.q_table)
                .with_context(|| format!("saving q-table {}", args.q_table.display()))?;
            log.append(outcome.index, outcome.score)
                .context("appending to the training log")?;
        }
        println!(
            "Episode {} completed. Final score: {}{}",
            outcome.index,
            outcome.score,
            if outcome.end == EpisodeEnd::Collision {
                " (collision)"
            } else {
                ""
            }
        );
    }
    Ok(())
}
