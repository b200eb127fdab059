//! `GameSession` builder and level progression.
//!
//! A session ties the layers together: it validates the configuration,
//! spawns the cascade actor, boots the saved level, and (optionally)
//! moves on to the next level whenever one is completed.

use tilematch_cascade::{
    Animator, CascadeEvent, CascadeHandle, CascadeInfo, SwipeDetector, SwipeEvent,
    spawn_cascade,
};
use tilematch_grid::{ElementId, WorldPosition};
use tilematch_level::{GameplayConfig, SaveStore, Spawner};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::TilematchError;

/// Builder for configuring and starting a [`GameSession`].
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), tilematch::TilematchError> {
/// use tilematch::prelude::*;
///
/// let config = GameplayConfig::from_path("levels.json")?;
/// let session = GameSession::builder(config)
///     .start(MemoryStore::new(), InstantAnimator::new(), SequentialSpawner::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GameSessionBuilder {
    config: GameplayConfig,
    auto_advance: bool,
}

impl GameSessionBuilder {
    pub fn new(config: GameplayConfig) -> Self {
        Self {
            config,
            auto_advance: true,
        }
    }

    /// Whether a completed level is followed by the next one
    /// automatically. On by default.
    pub fn auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    /// Validates the configuration, spawns the cascade actor, and boots
    /// the saved level.
    ///
    /// Must be called from inside a Tokio runtime.
    pub async fn start<A, S, P>(
        self,
        store: S,
        animator: A,
        spawner: P,
    ) -> Result<GameSession, TilematchError>
    where
        A: Animator,
        S: SaveStore,
        P: Spawner,
    {
        let config = self.config.validated()?;
        let detector = SwipeDetector::from_config(&config);
        let handle = spawn_cascade(config, store, animator, spawner);

        // Subscribe before booting so an immediately-completed level is
        // still seen.
        let progression = if self.auto_advance {
            let events = handle.subscribe().await?;
            Some(tokio::spawn(advance_on_completion(handle.clone(), events)))
        } else {
            None
        };

        if let Err(err) = handle.boot().await {
            let _ = handle.shutdown().await;
            return Err(err.into());
        }
        info!(auto_advance = self.auto_advance, "game session started");

        Ok(GameSession {
            handle,
            detector,
            progression,
        })
    }
}

/// A running game: the cascade actor plus level progression.
pub struct GameSession {
    handle: CascadeHandle,
    detector: SwipeDetector,
    progression: Option<JoinHandle<()>>,
}

impl GameSession {
    pub fn builder(config: GameplayConfig) -> GameSessionBuilder {
        GameSessionBuilder::new(config)
    }

    /// The underlying actor handle, for commands the session doesn't wrap.
    pub fn handle(&self) -> &CascadeHandle {
        &self.handle
    }

    /// Classifies a raw gesture and sends the resulting swipe, if any.
    ///
    /// Returns `true` if a swipe was sent. A sent swipe may still be
    /// rejected by the cascade (locked tile, grid edge, busy board).
    pub async fn gesture(
        &self,
        start: WorldPosition,
        end: WorldPosition,
        target: Option<ElementId>,
    ) -> Result<bool, TilematchError> {
        let Some(swipe) = self.detector.detect(start, end, target) else {
            debug!("gesture produced no swipe");
            return Ok(false);
        };
        self.handle.swipe(swipe).await?;
        Ok(true)
    }

    pub async fn swipe(&self, swipe: SwipeEvent) -> Result<(), TilematchError> {
        Ok(self.handle.swipe(swipe).await?)
    }

    pub async fn info(&self) -> Result<CascadeInfo, TilematchError> {
        Ok(self.handle.info().await?)
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<CascadeEvent>, TilematchError> {
        Ok(self.handle.subscribe().await?)
    }

    pub async fn restart(&self) -> Result<(), TilematchError> {
        Ok(self.handle.restart().await?)
    }

    pub async fn next_level(&self) -> Result<(), TilematchError> {
        Ok(self.handle.next_level().await?)
    }

    /// Stops the actor and waits for level progression to wind down.
    pub async fn shutdown(self) -> Result<(), TilematchError> {
        self.handle.shutdown().await?;
        if let Some(progression) = self.progression {
            if let Err(err) = progression.await {
                warn!(error = %err, "level progression task failed");
            }
        }
        info!("game session stopped");
        Ok(())
    }
}

/// Starts the next level after every completion, until the actor stops.
async fn advance_on_completion(
    handle: CascadeHandle,
    mut events: broadcast::Receiver<CascadeEvent>,
) {
    loop {
        match events.recv().await {
            Ok(CascadeEvent::LevelCompleted { level }) => {
                info!(level_index = level, "advancing to next level");
                if let Err(err) = handle.next_level().await {
                    error!(level_index = level, %err, "failed to start next level");
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "level progression fell behind on events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
