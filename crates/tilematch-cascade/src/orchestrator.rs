//! Cascade actor: an isolated Tokio task that owns a level in play.
//!
//! The actor exclusively owns the grid, the locks, the save store, the
//! animator, and the spawner. Everything else talks to it through a
//! [`CascadeHandle`], which wraps a bounded mpsc channel. Request/response
//! commands carry a oneshot reply channel.
//!
//! A cascade runs inside the actor's task. Its only suspension points are
//! the waits on animator completions, and during those waits the actor
//! keeps draining its channel: swipes are dropped, `info` and `subscribe`
//! are answered, and `cancel` or any level command interrupts the cascade.

use std::ops::ControlFlow;

use tilematch_grid::{
    Direction, Element, Grid, GridError, MatchDetector, Position, Tile, normalize,
};
use tilematch_level::{
    GameplayConfig, LEVEL_INDEX_KEY, LEVEL_STATE_KEY, LevelError, LevelState, SaveStore,
    Spawner, restore_grid, spawn_grid,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::animation::{Completion, wait_all};
use crate::{Animator, CascadeError, CascadeEvent, CascadeState, LockManager, SwipeEvent};

/// Bound of the command channel. Senders wait once it is full.
pub const COMMAND_CHANNEL_SIZE: usize = 32;

/// Capacity of the event channel. A subscriber that falls further behind
/// sees `RecvError::Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, CascadeError>>;

/// Commands sent to the cascade actor through its channel.
pub(crate) enum CascadeCommand {
    /// A player gesture. Dropped unless the actor is idle.
    Swipe(SwipeEvent),

    /// Start whatever level the save slot points at.
    Boot { reply: Reply<()> },

    StartLevel {
        level: u32,
        restore: bool,
        reply: Reply<()>,
    },

    Restart { reply: Reply<()> },

    NextLevel { reply: Reply<()> },

    /// Interrupt the running cascade, if any.
    Cancel,

    GetInfo { reply: oneshot::Sender<CascadeInfo> },

    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<CascadeEvent>>,
    },

    Shutdown,
}

/// A snapshot of the actor's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeInfo {
    pub state: CascadeState,
    /// The current level index, before wrapping.
    pub level: u32,
    pub width: usize,
    pub height: usize,
    pub locked_elements: usize,
    pub locked_positions: usize,
    /// Destroys requested but not yet finished.
    pub pending_destroys: usize,
    /// The board as it stands. `None` before any level has started.
    pub snapshot: Option<LevelState>,
}

// ---------------------------------------------------------------------------
// CascadeHandle
// ---------------------------------------------------------------------------

/// Handle to a running cascade actor.
///
/// Cheap to clone. Every method fails with [`CascadeError::Unavailable`]
/// once the actor has stopped.
#[derive(Debug, Clone)]
pub struct CascadeHandle {
    sender: mpsc::Sender<CascadeCommand>,
}

impl CascadeHandle {
    /// Sends a swipe (fire-and-forget). Whether it is accepted shows up
    /// in the event stream.
    pub async fn swipe(&self, swipe: SwipeEvent) -> Result<(), CascadeError> {
        self.send(CascadeCommand::Swipe(swipe)).await
    }

    /// Reads the saved level index and starts that level, restoring the
    /// saved board if there is one.
    pub async fn boot(&self) -> Result<(), CascadeError> {
        self.request(|reply| CascadeCommand::Boot { reply }).await?
    }

    /// Ends the current attempt and starts `level`. With `restore`, a
    /// saved board for the same level is used instead of a fresh spawn.
    pub async fn start_level(&self, level: u32, restore: bool) -> Result<(), CascadeError> {
        self.request(|reply| CascadeCommand::StartLevel {
            level,
            restore,
            reply,
        })
        .await?
    }

    /// Discards the saved board and starts the current level fresh.
    pub async fn restart(&self) -> Result<(), CascadeError> {
        self.request(|reply| CascadeCommand::Restart { reply }).await?
    }

    /// Advances and saves the level index, then starts that level fresh.
    pub async fn next_level(&self) -> Result<(), CascadeError> {
        self.request(|reply| CascadeCommand::NextLevel { reply }).await?
    }

    /// Interrupts the running cascade (fire-and-forget).
    pub async fn cancel(&self) -> Result<(), CascadeError> {
        self.send(CascadeCommand::Cancel).await
    }

    pub async fn info(&self) -> Result<CascadeInfo, CascadeError> {
        self.request(|reply| CascadeCommand::GetInfo { reply }).await
    }

    /// A receiver for every event from now on. Drop it to unsubscribe.
    /// The channel closes when the actor stops.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<CascadeEvent>, CascadeError> {
        self.request(|reply| CascadeCommand::Subscribe { reply }).await
    }

    /// Stops the actor, cancelling any running cascade first.
    pub async fn shutdown(&self) -> Result<(), CascadeError> {
        self.send(CascadeCommand::Shutdown).await
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: CascadeCommand) -> Result<(), CascadeError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| CascadeError::Unavailable)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CascadeCommand,
    ) -> Result<T, CascadeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| CascadeError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// How a wait on animator completions ended.
enum Wait {
    Done,
    /// A cancel or a level command arrived first.
    Interrupted,
}

/// Tiles locked for one pass of match resolution, and the destroys to
/// wait for.
struct DestroyBatch {
    locked: Vec<Tile>,
    completions: Vec<Completion>,
}

struct CascadeActor<A, S, P> {
    config: GameplayConfig,
    store: S,
    animator: A,
    spawner: P,
    detector: MatchDetector,
    locks: LockManager,
    grid: Option<Grid>,
    level: u32,
    state: CascadeState,
    pending_destroys: Vec<Element>,
    completion_sent: bool,
    /// A command that interrupted a cascade, handled right after it.
    deferred: Option<CascadeCommand>,
    events: broadcast::Sender<CascadeEvent>,
    receiver: mpsc::Receiver<CascadeCommand>,
}

impl<A: Animator, S: SaveStore, P: Spawner> CascadeActor<A, S, P> {
    async fn run(mut self) {
        info!(levels = self.config.level_count(), "cascade actor started");

        loop {
            let cmd = match self.deferred.take() {
                Some(cmd) => cmd,
                None => match self.receiver.recv().await {
                    Some(cmd) => cmd,
                    None => break,
                },
            };
            if self.handle(cmd).await.is_break() {
                break;
            }
        }

        info!(level_index = self.level, "cascade actor stopped");
    }

    async fn handle(&mut self, cmd: CascadeCommand) -> ControlFlow<()> {
        match cmd {
            CascadeCommand::Swipe(swipe) => self.handle_swipe(swipe).await,
            CascadeCommand::Boot { reply } => {
                let _ = reply.send(self.boot());
            }
            CascadeCommand::StartLevel {
                level,
                restore,
                reply,
            } => {
                let _ = reply.send(self.start_level(level, restore));
            }
            CascadeCommand::Restart { reply } => {
                let _ = reply.send(self.restart());
            }
            CascadeCommand::NextLevel { reply } => {
                let _ = reply.send(self.next_level());
            }
            CascadeCommand::Cancel => {
                debug!(state = %self.state, "cancel with no cascade running");
            }
            CascadeCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            CascadeCommand::Subscribe { reply } => {
                let _ = reply.send(self.events.subscribe());
            }
            CascadeCommand::Shutdown => {
                info!(level_index = self.level, "cascade shutting down");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // -- swipes and cascades ------------------------------------------------

    async fn handle_swipe(&mut self, swipe: SwipeEvent) {
        if !self.state.accepts_swipes() {
            debug!(element = %swipe.target, state = %self.state, "swipe ignored");
            return;
        }
        let Some((from, to)) = self.accept_swipe(&swipe) else {
            return;
        };
        debug!(
            element = %swipe.target,
            %from,
            %to,
            direction = %swipe.direction,
            "swipe accepted"
        );

        match self.run_cascade(from, to).await {
            Ok(Wait::Done) => {
                self.set_state(CascadeState::Idle);
                self.check_completion();
            }
            Ok(Wait::Interrupted) => self.cancel_cascade(),
            Err(err) => {
                error!(level_index = self.level, %err, "cascade failed, cancelling");
                self.cancel_cascade();
            }
        }
    }

    /// The two positions to swap, or `None` if the swipe is rejected.
    fn accept_swipe(&self, swipe: &SwipeEvent) -> Option<(Position, Position)> {
        let grid = self.grid.as_ref()?;
        let Some(tile) = grid.find_element(swipe.target) else {
            warn!(element = %swipe.target, "swipe target is not on the grid");
            return None;
        };
        let position = tile.position();
        let Some(neighbour) = grid.neighbour(position, swipe.direction) else {
            debug!(%position, direction = %swipe.direction, "swipe past the grid edge");
            return None;
        };
        if self.locks.is_tile_locked(tile) || self.locks.is_tile_locked(neighbour) {
            debug!(%position, direction = %swipe.direction, "swipe touches a locked tile");
            return None;
        }
        if neighbour.is_empty() && swipe.direction == Direction::Up {
            debug!(%position, "upward swipe into an empty tile");
            return None;
        }
        Some((position, neighbour.position()))
    }

    /// Swap, settle, then resolve matches until the board is stable.
    async fn run_cascade(&mut self, from: Position, to: Position) -> Result<Wait, CascadeError> {
        self.set_state(CascadeState::SwapPending);
        let duration = self.config.animation_duration();

        let swapped = {
            let grid = require(&mut self.grid)?;
            let before = [tile_at(grid, from)?, tile_at(grid, to)?];
            for tile in &before {
                self.locks.lock_tile(tile);
            }
            grid.swap(from, to)?;
            before
        };
        self.persist();

        let completions = match &self.grid {
            Some(grid) => [from, to]
                .iter()
                .filter_map(|p| grid.tile(*p))
                .filter_map(|tile| {
                    tile.element()
                        .map(|e| self.animator.move_to(e, tile.world_position(), duration))
                })
                .collect(),
            None => Vec::new(),
        };
        if let Wait::Interrupted = self.wait(completions).await {
            return Ok(Wait::Interrupted);
        }
        for tile in &swapped {
            self.locks.unlock_tile(tile);
        }

        self.set_state(CascadeState::Settling);
        if let Wait::Interrupted = self.settle().await? {
            return Ok(Wait::Interrupted);
        }

        loop {
            self.set_state(CascadeState::MatchResolving);
            let Some(batch) = self.destroy_matches()? else {
                break;
            };
            if let Wait::Interrupted = self.wait(batch.completions).await {
                return Ok(Wait::Interrupted);
            }
            self.pending_destroys.clear();
            for tile in &batch.locked {
                self.locks.unlock_tile(tile);
            }

            self.set_state(CascadeState::Settling);
            if let Wait::Interrupted = self.settle().await? {
                return Ok(Wait::Interrupted);
            }
        }

        self.persist();
        Ok(Wait::Done)
    }

    /// Applies gravity and animates every resulting move as one batch.
    async fn settle(&mut self) -> Result<Wait, CascadeError> {
        let duration = self.config.animation_duration();
        let moves = normalize(require(&mut self.grid)?);
        for info in &moves {
            self.locks.lock_move(info);
            trace!(element = %info.element.id(), from = %info.from, to = %info.to, "element falls");
        }
        let completions = moves
            .iter()
            .map(|info| self.animator.move_to(&info.element, info.to_world, duration))
            .collect();
        debug!(level_index = self.level, moves = moves.len(), "settling");
        self.persist();

        if let Wait::Interrupted = self.wait(completions).await {
            return Ok(Wait::Interrupted);
        }
        for info in &moves {
            self.locks.unlock_move(info);
        }
        Ok(Wait::Done)
    }

    /// Locks and clears every matched group, requesting a delayed destroy
    /// for each element. `None` if nothing matched.
    fn destroy_matches(&mut self) -> Result<Option<DestroyBatch>, CascadeError> {
        let delay = self.config.animation_duration();
        let grid = require(&mut self.grid)?;
        let groups = self.detector.find_all_connected_groups(grid);
        if groups.is_empty() {
            return Ok(None);
        }

        let mut locked = Vec::new();
        for group in &groups {
            for &position in group.positions() {
                let tile = tile_at(grid, position)?;
                self.locks.lock_tile(&tile);
                locked.push(tile);
            }
        }

        let mut completions = Vec::with_capacity(locked.len());
        for tile in &locked {
            if let Some(element) = grid.clear(tile.position())? {
                completions.push(self.animator.destroy(&element, delay));
                self.pending_destroys.push(element);
            }
        }

        info!(
            level_index = self.level,
            groups = groups.len(),
            tiles = locked.len(),
            "groups cleared"
        );
        self.emit(CascadeEvent::GroupsCleared {
            groups: groups.len(),
            tiles: locked.len(),
        });
        Ok(Some(DestroyBatch {
            locked,
            completions,
        }))
    }

    /// Waits for a batch while still serving the command channel.
    async fn wait(&mut self, completions: Vec<Completion>) -> Wait {
        let batch = wait_all(completions);
        tokio::pin!(batch);

        loop {
            tokio::select! {
                biased;
                () = &mut batch => return Wait::Done,
                cmd = self.receiver.recv() => {
                    if self.handle_while_busy(cmd).is_break() {
                        return Wait::Interrupted;
                    }
                }
            }
        }
    }

    fn handle_while_busy(&mut self, cmd: Option<CascadeCommand>) -> ControlFlow<()> {
        match cmd {
            Some(CascadeCommand::Swipe(swipe)) => {
                debug!(element = %swipe.target, state = %self.state, "swipe ignored");
                ControlFlow::Continue(())
            }
            Some(CascadeCommand::GetInfo { reply }) => {
                let _ = reply.send(self.info());
                ControlFlow::Continue(())
            }
            Some(CascadeCommand::Subscribe { reply }) => {
                let _ = reply.send(self.events.subscribe());
                ControlFlow::Continue(())
            }
            Some(CascadeCommand::Cancel) => ControlFlow::Break(()),
            Some(other) => {
                self.deferred = Some(other);
                ControlFlow::Break(())
            }
            None => {
                self.deferred = Some(CascadeCommand::Shutdown);
                ControlFlow::Break(())
            }
        }
    }

    /// Forces pending destroys, drops every lock, and returns to `Idle`.
    /// Grid changes made so far stay.
    fn cancel_cascade(&mut self) {
        self.set_state(CascadeState::Cancelling);
        let pending = std::mem::take(&mut self.pending_destroys);
        for element in &pending {
            self.animator.force_destroy(element);
        }
        self.locks.clear_all();
        info!(
            level_index = self.level,
            forced_destroys = pending.len(),
            "cascade cancelled"
        );
        self.persist();
        self.set_state(CascadeState::Idle);
        self.check_completion();
    }

    /// Enters `Completed` once per attempt when the board is empty and
    /// nothing is locked.
    fn check_completion(&mut self) {
        if self.completion_sent || self.state.is_busy() || !self.locks.is_clear() {
            return;
        }
        if !self.grid.as_ref().is_some_and(Grid::is_empty) {
            return;
        }
        self.completion_sent = true;
        if let Err(err) = self.store.delete_key(LEVEL_STATE_KEY) {
            error!(level_index = self.level, %err, "failed to delete level state");
        }
        self.set_state(CascadeState::Completed);
        info!(level_index = self.level, "level completed");
        self.emit(CascadeEvent::LevelCompleted { level: self.level });
    }

    // -- level lifecycle ------------------------------------------------------

    fn boot(&mut self) -> Result<(), CascadeError> {
        let level = self
            .store
            .read(LEVEL_INDEX_KEY, 0u32)
            .map_err(LevelError::from)?;
        info!(level_index = level, "booting");
        self.start_level(level, true)
    }

    fn start_level(&mut self, level: u32, restore: bool) -> Result<(), CascadeError> {
        self.end_attempt();

        let saved = if restore { self.saved_state(level)? } else { None };
        let level_config = self.config.level_config(level).map_err(LevelError::from)?;
        let name = level_config.name.clone();
        let grid = match &saved {
            Some(state) => {
                restore_grid(level_config, &self.config.layout, &mut self.spawner, state)?
            }
            None => spawn_grid(level_config, &self.config.layout, &mut self.spawner)?,
        };
        let restored = saved.is_some();

        self.grid = Some(grid);
        self.level = level;
        self.completion_sent = false;
        self.store
            .write(LEVEL_INDEX_KEY, &level)
            .map_err(LevelError::from)?;
        self.save_snapshot()?;

        info!(level_index = level, %name, restored, "level started");
        self.emit(CascadeEvent::LevelStarted { level, restored });
        self.set_state(CascadeState::Idle);
        Ok(())
    }

    fn restart(&mut self) -> Result<(), CascadeError> {
        self.store
            .delete_key(LEVEL_STATE_KEY)
            .map_err(LevelError::from)?;
        self.start_level(self.level, false)
    }

    fn next_level(&mut self) -> Result<(), CascadeError> {
        let next = self.level.wrapping_add(1);
        self.store
            .write(LEVEL_INDEX_KEY, &next)
            .map_err(LevelError::from)?;
        self.start_level(next, false)
    }

    /// The saved board for `level`, if the store has one that fits the
    /// level's current dimensions.
    fn saved_state(&self, level: u32) -> Result<Option<LevelState>, CascadeError> {
        if !self.store.has_key(LEVEL_STATE_KEY) {
            return Ok(None);
        }
        let state = self
            .store
            .read(LEVEL_STATE_KEY, LevelState::default())
            .map_err(LevelError::from)?;
        if state.level != level {
            warn!(
                saved = state.level,
                requested = level,
                "saved board belongs to another level, ignoring"
            );
            return Ok(None);
        }
        let level_config = self.config.level_config(level).map_err(LevelError::from)?;
        if let Err(err) = state.check_size(level_config.width, level_config.height) {
            warn!(level_index = level, %err, "saved board doesn't fit the level, ignoring");
            return Ok(None);
        }
        Ok(Some(state))
    }

    /// Tears down the current board through the animator.
    fn end_attempt(&mut self) {
        for element in std::mem::take(&mut self.pending_destroys) {
            self.animator.force_destroy(&element);
        }
        if let Some(grid) = self.grid.take() {
            for element in grid.elements() {
                self.animator.remove(element);
            }
            debug!(
                level_index = self.level,
                removed = grid.element_count(),
                "board torn down"
            );
        }
        self.animator.reset();
        self.locks.clear_all();
    }

    // -- helpers --------------------------------------------------------------

    fn persist(&mut self) {
        if let Err(err) = self.save_snapshot() {
            error!(level_index = self.level, %err, "failed to persist level state");
        }
    }

    fn save_snapshot(&mut self) -> Result<(), CascadeError> {
        let grid = self.grid.as_ref().ok_or(CascadeError::NoLevel)?;
        let snapshot = LevelState::capture(self.level, grid);
        self.store
            .write(LEVEL_STATE_KEY, &snapshot)
            .map_err(LevelError::from)?;
        trace!(level_index = self.level, tiles = snapshot.tiles.len(), "level state saved");
        Ok(())
    }

    fn set_state(&mut self, state: CascadeState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "cascade state changed");
        self.state = state;
        self.emit(CascadeEvent::StateChanged(state));
    }

    /// Broadcasts to subscribers. No subscribers is fine.
    fn emit(&self, event: CascadeEvent) {
        let _ = self.events.send(event);
    }

    fn info(&self) -> CascadeInfo {
        CascadeInfo {
            state: self.state,
            level: self.level,
            width: self.grid.as_ref().map_or(0, Grid::width),
            height: self.grid.as_ref().map_or(0, Grid::height),
            locked_elements: self.locks.locked_element_count(),
            locked_positions: self.locks.locked_position_count(),
            pending_destroys: self.pending_destroys.len(),
            snapshot: self
                .grid
                .as_ref()
                .map(|grid| LevelState::capture(self.level, grid)),
        }
    }
}

fn require(grid: &mut Option<Grid>) -> Result<&mut Grid, CascadeError> {
    grid.as_mut().ok_or(CascadeError::NoLevel)
}

fn tile_at(grid: &Grid, position: Position) -> Result<Tile, CascadeError> {
    grid.tile(position)
        .cloned()
        .ok_or(CascadeError::Grid(GridError::OutOfBounds(position)))
}

/// Spawns a cascade actor and returns a handle to it.
///
/// No level is running until [`CascadeHandle::boot`] or
/// [`CascadeHandle::start_level`] is called. Must be called from inside a
/// Tokio runtime.
pub fn spawn_cascade<A, S, P>(
    config: GameplayConfig,
    store: S,
    animator: A,
    spawner: P,
) -> CascadeHandle
where
    A: Animator,
    S: SaveStore,
    P: Spawner,
{
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let actor = CascadeActor {
        config,
        store,
        animator,
        spawner,
        detector: MatchDetector::default(),
        locks: LockManager::new(),
        grid: None,
        level: 0,
        state: CascadeState::Idle,
        pending_destroys: Vec::new(),
        completion_sent: false,
        deferred: None,
        events,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    CascadeHandle { sender: tx }
}
