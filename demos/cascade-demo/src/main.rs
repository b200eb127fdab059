//! A bot that plays through a few levels with random swipes.
//!
//! ```text
//! cargo run -p cascade-demo                       # built-in levels, in memory
//! cargo run -p cascade-demo -- levels.json        # levels from a file
//! cargo run -p cascade-demo -- levels.json save.json
//! ```
//!
//! With a save file the bot picks up where the previous run stopped.
//! Set `RUST_LOG=debug` to watch the cascade step by step.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tilematch::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_SWIPES: usize = 500;

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

fn builtin_levels() -> Result<GameplayConfig, TilematchError> {
    let levels = vec![
        LevelConfig::from_rows("warm-up", &["BBA", "AAB"])?,
        LevelConfig::from_rows("chain", &["BCAD", "AACC"])?,
        LevelConfig::from_rows("tower", &["C..C", "BAAB", "CBBC", "AACA"])?,
    ];
    Ok(GameplayConfig {
        levels,
        ..GameplayConfig::default()
    })
}

// ---------------------------------------------------------------------------
// Spawner that remembers every id it hands out
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct RecordingSpawner {
    inner: Arc<Mutex<(SequentialSpawner, Vec<ElementId>)>>,
}

impl RecordingSpawner {
    fn lock(&self) -> MutexGuard<'_, (SequentialSpawner, Vec<ElementId>)> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ids(&self) -> Vec<ElementId> {
        self.lock().1.clone()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&mut self, kind: &str, position: Position, world: WorldPosition) -> Element {
        let mut guard = self.lock();
        let element = guard.0.spawn(kind, position, world);
        guard.1.push(element.id());
        element
    }
}

// ---------------------------------------------------------------------------
// Board output
// ---------------------------------------------------------------------------

fn render(info: &CascadeInfo) -> String {
    let Some(snapshot) = &info.snapshot else {
        return "(no board)".into();
    };
    let mut out = String::new();
    for y in (0..info.height).rev() {
        for x in 0..info.width {
            let cell = snapshot
                .tiles
                .get(y * info.width + x)
                .and_then(|t| t.element.as_deref())
                .unwrap_or(".");
            out.push_str(cell);
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

async fn play<S: SaveStore>(config: GameplayConfig, store: S) -> Result<(), TilematchError> {
    let level_count = config.level_count();
    let spawner = RecordingSpawner::default();
    let session = GameSession::builder(config)
        .start(store, InstantAnimator::new(), spawner.clone())
        .await?;
    let mut events = session.subscribe().await?;

    let first = session.info().await?;
    println!("level {}\n{}", first.level, render(&first));

    let mut rng = rand::rng();
    let mut completed = 0;
    for swipe_no in 1..=MAX_SWIPES {
        let ids = spawner.ids();
        if ids.is_empty() {
            break;
        }
        let target = ids[rng.random_range(0..ids.len())];
        let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        session.swipe(SwipeEvent::new(target, direction)).await?;

        // Let the cascade run out before looking at the board again.
        let mut info = session.info().await?;
        while info.state.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
            info = session.info().await?;
        }

        while let Ok(event) = events.try_recv() {
            match event {
                CascadeEvent::GroupsCleared { groups, tiles } => {
                    println!("swipe {swipe_no}: {target} {direction} cleared {groups} group(s), {tiles} tile(s)");
                }
                CascadeEvent::LevelCompleted { level } => {
                    completed += 1;
                    println!("level {level} completed after {swipe_no} swipes");
                }
                CascadeEvent::LevelStarted { level, .. } => {
                    let info = session.info().await?;
                    println!("level {level}\n{}", render(&info));
                }
                CascadeEvent::StateChanged(_) => {}
            }
        }
        if completed >= level_count {
            break;
        }
    }

    info!(completed, level_count, "bot finished");
    let last = session.info().await?;
    println!("final board (level {}, {})\n{}", last.level, last.state, render(&last));
    session.shutdown().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GameplayConfig::from_path(path)?,
        None => builtin_levels()?,
    };

    match args.next() {
        Some(path) => play(config, JsonFileStore::open(path)?).await?,
        None => play(config, MemoryStore::new()).await?,
    }
    Ok(())
}
