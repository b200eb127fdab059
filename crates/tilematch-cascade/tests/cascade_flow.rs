//! Integration tests for the cascade actor, driven through its handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tilematch_cascade::{
    AnimationCall, Animator, CascadeError, CascadeEvent, CascadeHandle, CascadeInfo,
    CascadeState, Completion, CompletionSender, InstantAnimator, SwipeEvent, TimedAnimator,
    spawn_cascade,
};
use tilematch_grid::{Direction, Element, ElementId, Position, WorldPosition};
use tilematch_level::{
    ConfigError, GameplayConfig, LEVEL_INDEX_KEY, LEVEL_STATE_KEY, LevelConfig, LevelError,
    LevelState, MemoryStore, SaveStore, SequentialSpawner, StoreError, TileInfo,
};
use tokio::sync::broadcast;

// =========================================================================
// Boards
// =========================================================================

/// Swiping the B at (2, 0) up turns both rows into straight runs.
const TWO_ROWS: &[&str] = &["BBA", "AAB"];

/// Like `TWO_ROWS`, with a C on top that survives the clear.
const TWO_ROWS_AND_C: &[&str] = &["C..", "BBA", "AAB"];

/// Swiping the A at (2, 1) down clears the bottom row, and the Cs that
/// fall into it make a second run.
const CHAIN: &[&str] = &["BCAD", "AACC"];

/// A level with nothing on it.
const EMPTY: &[&str] = &["..."];

// =========================================================================
// Helpers
// =========================================================================

fn config(levels: &[&[&str]]) -> GameplayConfig {
    GameplayConfig {
        levels: levels
            .iter()
            .enumerate()
            .map(|(i, rows)| LevelConfig::from_rows(&format!("level-{i}"), rows).unwrap())
            .collect(),
        ..GameplayConfig::default()
    }
}

/// Spawns an actor over `levels` and starts level 0 fresh.
async fn start<A: Animator>(levels: &[&[&str]], animator: A) -> (CascadeHandle, MemoryStore) {
    let store = MemoryStore::new();
    let handle = spawn_cascade(
        config(levels),
        store.clone(),
        animator,
        SequentialSpawner::new(),
    );
    handle.start_level(0, false).await.unwrap();
    (handle, store)
}

/// The id [`SequentialSpawner`] gives the element at `(x, y)` of a fresh
/// board: ids count up from 1 over occupied cells, row-major from the
/// bottom row.
fn id_at(rows: &[&str], x: usize, y: usize) -> ElementId {
    let height = rows.len();
    let mut next = 1;
    for row_y in 0..height {
        for (row_x, c) in rows[height - 1 - row_y].chars().enumerate() {
            if c == '.' {
                continue;
            }
            if (row_x, row_y) == (x, y) {
                return ElementId(next);
            }
            next += 1;
        }
    }
    panic!("no element at ({x}, {y})");
}

fn swipe(target: ElementId, direction: Direction) -> SwipeEvent {
    SwipeEvent::new(target, direction)
}

/// The board in `info`, top row first.
fn render(info: &CascadeInfo) -> String {
    let snapshot = info.snapshot.as_ref().expect("a level is running");
    render_state(snapshot, info.width, info.height)
}

fn render_state(snapshot: &LevelState, width: usize, height: usize) -> String {
    (0..height)
        .rev()
        .map(|y| {
            (0..width)
                .map(|x| {
                    snapshot.tiles[y * width + x]
                        .element
                        .as_deref()
                        .and_then(|k| k.chars().next())
                        .unwrap_or('.')
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Receives until an event matches, failing after a generous timeout.
async fn wait_for(
    events: &mut broadcast::Receiver<CascadeEvent>,
    pred: impl Fn(&CascadeEvent) -> bool,
) -> CascadeEvent {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let event = events.recv().await.expect("event channel open");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not received in time")
}

fn drain(events: &mut broadcast::Receiver<CascadeEvent>) -> Vec<CascadeEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Completes moves at once but holds every destroy until released.
#[derive(Clone, Default)]
struct ManualAnimator {
    held: Arc<Mutex<Vec<CompletionSender>>>,
    forced: Arc<Mutex<Vec<ElementId>>>,
    removed: Arc<Mutex<Vec<ElementId>>>,
}

impl ManualAnimator {
    fn release_destroys(&self) {
        for done in self.held.lock().unwrap().drain(..) {
            done.complete();
        }
    }

    fn forced(&self) -> Vec<ElementId> {
        self.forced.lock().unwrap().clone()
    }

    fn removed(&self) -> Vec<ElementId> {
        self.removed.lock().unwrap().clone()
    }
}

impl Animator for ManualAnimator {
    fn move_to(&self, _element: &Element, _to: WorldPosition, _duration: Duration) -> Completion {
        Completion::ready()
    }

    fn destroy(&self, _element: &Element, _delay: Duration) -> Completion {
        let (done, completion) = Completion::pending();
        self.held.lock().unwrap().push(done);
        completion
    }

    fn force_destroy(&self, element: &Element) {
        self.forced.lock().unwrap().push(element.id());
    }

    fn remove(&self, element: &Element) {
        self.removed.lock().unwrap().push(element.id());
    }
}

/// A memory store whose writes can be switched to fail.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: Arc<AtomicBool>,
}

impl SaveStore for FlakyStore {
    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.write(key, value)
    }

    fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        self.inner.read(key, default)
    }

    fn has_key(&self, key: &str) -> bool {
        self.inner.has_key(key)
    }

    fn delete_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.delete_key(key)
    }

    fn delete_all(&mut self) -> Result<(), StoreError> {
        self.inner.delete_all()
    }
}

/// A memory store that keeps every level state written to it, in order.
#[derive(Clone, Default)]
struct RecordingStore {
    inner: MemoryStore,
    states: Arc<Mutex<Vec<LevelState>>>,
}

impl RecordingStore {
    fn boards(&self, width: usize, height: usize) -> Vec<String> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .map(|state| render_state(state, width, height))
            .collect()
    }
}

impl SaveStore for RecordingStore {
    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        self.inner.write(key, value)?;
        if key == LEVEL_STATE_KEY {
            let state = self.inner.read(LEVEL_STATE_KEY, LevelState::default())?;
            self.states.lock().unwrap().push(state);
        }
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        self.inner.read(key, default)
    }

    fn has_key(&self, key: &str) -> bool {
        self.inner.has_key(key)
    }

    fn delete_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.delete_key(key)
    }

    fn delete_all(&mut self) -> Result<(), StoreError> {
        self.inner.delete_all()
    }
}

// =========================================================================
// Level start and persistence
// =========================================================================

#[tokio::test]
async fn test_start_level_persists_first_snapshot() {
    let (handle, store) = start(&[TWO_ROWS], InstantAnimator::new()).await;

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!((info.width, info.height), (3, 2));
    assert_eq!(render(&info), "BBA\nAAB");

    let saved: LevelState = store.read(LEVEL_STATE_KEY, LevelState::default()).unwrap();
    assert_eq!(saved.tiles.len(), 6);
    assert_eq!(Some(saved), info.snapshot);
    assert_eq!(store.read(LEVEL_INDEX_KEY, 99u32).unwrap(), 0);
}

#[tokio::test]
async fn test_info_before_any_level() {
    let handle = spawn_cascade(
        config(&[TWO_ROWS]),
        MemoryStore::new(),
        InstantAnimator::new(),
        SequentialSpawner::new(),
    );

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!(info.snapshot, None);
    assert_eq!((info.width, info.height), (0, 0));
}

#[tokio::test]
async fn test_start_level_without_levels_is_an_error() {
    let handle = spawn_cascade(
        GameplayConfig::default(),
        MemoryStore::new(),
        InstantAnimator::new(),
        SequentialSpawner::new(),
    );

    let err = handle.start_level(0, false).await.unwrap_err();
    assert!(matches!(
        err,
        CascadeError::Level(LevelError::Config(ConfigError::NoLevels))
    ));
}

#[tokio::test]
async fn test_boot_restores_saved_mid_level_board() {
    let mut store = MemoryStore::new();
    store.write(LEVEL_INDEX_KEY, &1u32).unwrap();
    let saved = LevelState {
        level: 1,
        tiles: vec![
            TileInfo { position: Position::new(0, 0), element: Some("A".into()) },
            TileInfo { position: Position::new(1, 0), element: None },
            TileInfo { position: Position::new(0, 1), element: None },
            TileInfo { position: Position::new(1, 1), element: Some("B".into()) },
        ],
    };
    store.write(LEVEL_STATE_KEY, &saved).unwrap();

    let handle = spawn_cascade(
        config(&[TWO_ROWS, &["AB", "BA"]]),
        store.clone(),
        InstantAnimator::new(),
        SequentialSpawner::new(),
    );
    let mut events = handle.subscribe().await.unwrap();
    handle.boot().await.unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.level, 1);
    assert_eq!(render(&info), ".B\nA.");
    assert_eq!(info.snapshot, Some(saved));
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, CascadeEvent::LevelStarted { .. })).await,
        CascadeEvent::LevelStarted { level: 1, restored: true }
    );
}

#[tokio::test]
async fn test_boot_ignores_snapshot_of_another_level() {
    let mut store = MemoryStore::new();
    store
        .write(LEVEL_STATE_KEY, &LevelState { level: 5, tiles: Vec::new() })
        .unwrap();

    let handle = spawn_cascade(
        config(&[TWO_ROWS]),
        store,
        InstantAnimator::new(),
        SequentialSpawner::new(),
    );
    let mut events = handle.subscribe().await.unwrap();
    handle.boot().await.unwrap();

    assert_eq!(render(&handle.info().await.unwrap()), "BBA\nAAB");
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, CascadeEvent::LevelStarted { .. })).await,
        CascadeEvent::LevelStarted { level: 0, restored: false }
    );
}

#[tokio::test]
async fn test_boot_spawns_fresh_when_snapshot_does_not_fit_level() {
    let mut store = MemoryStore::new();
    let resized = LevelState {
        level: 0,
        tiles: vec![
            TileInfo { position: Position::new(0, 0), element: Some("A".into()) },
            TileInfo { position: Position::new(1, 0), element: None },
            TileInfo { position: Position::new(0, 1), element: None },
            TileInfo { position: Position::new(1, 1), element: Some("B".into()) },
        ],
    };
    store.write(LEVEL_STATE_KEY, &resized).unwrap();

    let handle = spawn_cascade(
        config(&[TWO_ROWS]),
        store.clone(),
        InstantAnimator::new(),
        SequentialSpawner::new(),
    );
    let mut events = handle.subscribe().await.unwrap();
    handle.boot().await.unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!(render(&info), "BBA
AAB");
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, CascadeEvent::LevelStarted { .. })).await,
        CascadeEvent::LevelStarted { level: 0, restored: false }
    );
    let saved: LevelState = store.read(LEVEL_STATE_KEY, LevelState::default()).unwrap();
    assert_eq!(saved.tiles.len(), 6);
}

#[tokio::test]
async fn test_empty_level_waits_in_idle() {
    let (handle, store) = start(&[EMPTY], InstantAnimator::new()).await;
    let mut events = handle.subscribe().await.unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Idle);
    assert!(store.has_key(LEVEL_STATE_KEY));

    handle.restart().await.unwrap();
    handle.info().await.unwrap();
    assert!(
        !drain(&mut events)
            .iter()
            .any(|e| matches!(e, CascadeEvent::LevelCompleted { .. }))
    );
}

#[tokio::test]
async fn test_cascade_persists_every_stable_point_in_order() {
    let store = RecordingStore::default();
    let handle = spawn_cascade(
        config(&[CHAIN]),
        store.clone(),
        InstantAnimator::new(),
        SequentialSpawner::new(),
    );
    handle.start_level(0, false).await.unwrap();

    handle.swipe(swipe(id_at(CHAIN, 2, 1), Direction::Down)).await.unwrap();
    handle.info().await.unwrap();

    assert_eq!(
        store.boards(4, 2),
        vec![
            // level start
            "BCAD\nAACC",
            // swap
            "BCCD\nAAAC",
            // first settle: nothing falls
            "BCCD\nAAAC",
            // As cleared, column falls
            "...D\nBCCC",
            // Cs cleared, D falls
            "....\nB..D",
            // cascade done
            "....\nB..D",
        ]
    );
}

#[tokio::test]
async fn test_board_survives_actor_restart() {
    let (handle, store) = start(&[CHAIN], InstantAnimator::new()).await;
    handle.swipe(swipe(id_at(CHAIN, 2, 1), Direction::Down)).await.unwrap();
    let before = handle.info().await.unwrap();
    handle.shutdown().await.unwrap();

    let revived = spawn_cascade(
        config(&[CHAIN]),
        store,
        InstantAnimator::new(),
        SequentialSpawner::starting_at(100),
    );
    revived.boot().await.unwrap();

    let after = revived.info().await.unwrap();
    assert_eq!(render(&after), render(&before));
    assert_eq!(render(&after), "....\nB..D");
}

#[tokio::test]
async fn test_next_level_wraps_and_saves_index() {
    let (handle, store) = start(&[TWO_ROWS, CHAIN], InstantAnimator::new()).await;

    handle.next_level().await.unwrap();
    handle.next_level().await.unwrap();
    handle.next_level().await.unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.level, 3);
    assert_eq!(render(&info), "BCAD\nAACC");
    assert_eq!(store.read(LEVEL_INDEX_KEY, 0u32).unwrap(), 3);
}

#[tokio::test]
async fn test_restart_spawns_fresh_board() {
    let (handle, _store) = start(&[CHAIN], InstantAnimator::new()).await;
    handle.swipe(swipe(id_at(CHAIN, 2, 1), Direction::Down)).await.unwrap();
    assert_eq!(render(&handle.info().await.unwrap()), "....\nB..D");

    handle.restart().await.unwrap();

    assert_eq!(render(&handle.info().await.unwrap()), "BCAD\nAACC");
}

// =========================================================================
// Cascades
// =========================================================================

#[tokio::test]
async fn test_clearing_board_completes_level_once() {
    let (handle, store) = start(&[TWO_ROWS], InstantAnimator::new()).await;
    let mut events = handle.subscribe().await.unwrap();

    handle.swipe(swipe(id_at(TWO_ROWS, 2, 0), Direction::Up)).await.unwrap();
    let completed =
        wait_for(&mut events, |e| matches!(e, CascadeEvent::LevelCompleted { .. })).await;
    assert_eq!(completed, CascadeEvent::LevelCompleted { level: 0 });

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Completed);
    assert_eq!(info.locked_elements + info.locked_positions, 0);
    assert!(!store.has_key(LEVEL_STATE_KEY));

    // Swipes and cancels after completion change nothing.
    handle.swipe(swipe(id_at(TWO_ROWS, 0, 0), Direction::Right)).await.unwrap();
    handle.cancel().await.unwrap();
    handle.info().await.unwrap();
    assert!(
        !drain(&mut events)
            .iter()
            .any(|e| matches!(e, CascadeEvent::LevelCompleted { .. }))
    );
}

#[tokio::test]
async fn test_cascade_walks_through_states_in_order() {
    let (handle, _store) = start(&[TWO_ROWS], InstantAnimator::new()).await;
    let mut events = handle.subscribe().await.unwrap();

    handle.swipe(swipe(id_at(TWO_ROWS, 2, 0), Direction::Up)).await.unwrap();
    handle.info().await.unwrap();

    let states: Vec<CascadeState> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            CascadeEvent::StateChanged(state) => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            CascadeState::SwapPending,
            CascadeState::Settling,
            CascadeState::MatchResolving,
            CascadeState::Settling,
            CascadeState::MatchResolving,
            CascadeState::Idle,
            CascadeState::Completed,
        ]
    );
}

#[tokio::test]
async fn test_chain_cascade_resolves_second_match() {
    let (handle, store) = start(&[CHAIN], InstantAnimator::new()).await;
    let mut events = handle.subscribe().await.unwrap();

    handle.swipe(swipe(id_at(CHAIN, 2, 1), Direction::Down)).await.unwrap();
    let info = handle.info().await.unwrap();

    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!(render(&info), "....\nB..D");
    let cleared: Vec<CascadeEvent> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, CascadeEvent::GroupsCleared { .. }))
        .collect();
    assert_eq!(
        cleared,
        vec![
            CascadeEvent::GroupsCleared { groups: 1, tiles: 3 },
            CascadeEvent::GroupsCleared { groups: 1, tiles: 3 },
        ]
    );

    let saved: LevelState = store.read(LEVEL_STATE_KEY, LevelState::default()).unwrap();
    assert_eq!(Some(saved), info.snapshot);
}

#[tokio::test]
async fn test_swipe_animates_both_elements_then_destroys() {
    let animator = InstantAnimator::new();
    let (handle, _store) = start(&[TWO_ROWS], animator.clone()).await;

    handle.swipe(swipe(id_at(TWO_ROWS, 2, 0), Direction::Up)).await.unwrap();
    handle.info().await.unwrap();

    let calls = animator.take_calls();
    let moved: Vec<ElementId> = calls
        .iter()
        .filter_map(|c| match c {
            AnimationCall::MoveTo { element, .. } => Some(*element),
            _ => None,
        })
        .collect();
    assert_eq!(moved.len(), 2);
    assert!(moved.contains(&id_at(TWO_ROWS, 2, 0)));
    assert!(moved.contains(&id_at(TWO_ROWS, 2, 1)));

    let destroys = calls
        .iter()
        .filter(|c| {
            matches!(c, AnimationCall::Destroy { delay, .. } if *delay == Duration::from_millis(300))
        })
        .count();
    assert_eq!(destroys, 6);
}

// =========================================================================
// Rejected swipes
// =========================================================================

#[tokio::test]
async fn test_upward_swipe_into_empty_tile_is_rejected() {
    let rows: &[&str] = &["...", "A.."];
    let animator = InstantAnimator::new();
    let (handle, _store) = start(&[rows], animator.clone()).await;

    handle.swipe(swipe(id_at(rows, 0, 0), Direction::Up)).await.unwrap();
    let info = handle.info().await.unwrap();

    assert_eq!(render(&info), "...\nA..");
    assert_eq!(info.state, CascadeState::Idle);
    assert!(animator.calls().is_empty());
}

#[tokio::test]
async fn test_sideways_swipe_into_empty_tile_moves_element() {
    let rows: &[&str] = &["...", "A.."];
    let (handle, _store) = start(&[rows], InstantAnimator::new()).await;

    handle.swipe(swipe(id_at(rows, 0, 0), Direction::Right)).await.unwrap();

    assert_eq!(render(&handle.info().await.unwrap()), "...\n.A.");
}

#[tokio::test]
async fn test_swipe_past_edge_or_unknown_target_is_ignored() {
    let animator = InstantAnimator::new();
    let (handle, _store) = start(&[TWO_ROWS], animator.clone()).await;

    handle.swipe(swipe(id_at(TWO_ROWS, 0, 0), Direction::Left)).await.unwrap();
    handle.swipe(swipe(id_at(TWO_ROWS, 0, 0), Direction::Down)).await.unwrap();
    handle.swipe(swipe(ElementId(999), Direction::Right)).await.unwrap();
    let info = handle.info().await.unwrap();

    assert_eq!(render(&info), "BBA\nAAB");
    assert!(animator.calls().is_empty());
}

#[tokio::test]
async fn test_swipe_while_busy_is_dropped() {
    let animator = ManualAnimator::default();
    let (handle, _store) = start(&[TWO_ROWS_AND_C], animator.clone()).await;

    handle
        .swipe(swipe(id_at(TWO_ROWS_AND_C, 2, 0), Direction::Up))
        .await
        .unwrap();
    let busy = handle.info().await.unwrap();
    assert_eq!(busy.state, CascadeState::MatchResolving);

    // Would move the C sideways if it were queued.
    handle
        .swipe(swipe(id_at(TWO_ROWS_AND_C, 0, 2), Direction::Right))
        .await
        .unwrap();
    assert_eq!(handle.info().await.unwrap().state, CascadeState::MatchResolving);
    animator.release_destroys();

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!(render(&info), "...\n...\nC..");
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test]
async fn test_cancel_mid_match_releases_locks_and_forces_destroys() {
    let animator = ManualAnimator::default();
    let (handle, _store) = start(&[TWO_ROWS_AND_C], animator.clone()).await;

    handle
        .swipe(swipe(id_at(TWO_ROWS_AND_C, 2, 0), Direction::Up))
        .await
        .unwrap();
    let busy = handle.info().await.unwrap();
    assert_eq!(busy.state, CascadeState::MatchResolving);
    assert_eq!(busy.pending_destroys, 6);
    assert_eq!(busy.locked_elements, 6);
    assert_eq!(busy.locked_positions, 6);

    handle.cancel().await.unwrap();
    let info = handle.info().await.unwrap();

    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!(info.pending_destroys, 0);
    assert_eq!(info.locked_elements + info.locked_positions, 0);
    assert_eq!(animator.forced().len(), 6);
    // Cleared tiles stay cleared; gravity has not run yet.
    assert_eq!(render(&info), "C..\n...\n...");
}

#[tokio::test]
async fn test_actor_accepts_swipes_after_cancel() {
    let animator = ManualAnimator::default();
    let (handle, _store) = start(&[TWO_ROWS_AND_C], animator.clone()).await;

    handle
        .swipe(swipe(id_at(TWO_ROWS_AND_C, 2, 0), Direction::Up))
        .await
        .unwrap();
    handle.cancel().await.unwrap();
    handle
        .swipe(swipe(id_at(TWO_ROWS_AND_C, 0, 2), Direction::Down))
        .await
        .unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!(render(&info), "...\n...\nC..");
}

#[tokio::test]
async fn test_cancel_that_empties_board_completes_level() {
    let animator = ManualAnimator::default();
    let (handle, store) = start(&[TWO_ROWS], animator.clone()).await;
    let mut events = handle.subscribe().await.unwrap();

    handle.swipe(swipe(id_at(TWO_ROWS, 2, 0), Direction::Up)).await.unwrap();
    handle.cancel().await.unwrap();

    wait_for(&mut events, |e| matches!(e, CascadeEvent::LevelCompleted { level: 0 })).await;
    assert_eq!(handle.info().await.unwrap().state, CascadeState::Completed);
    assert!(!store.has_key(LEVEL_STATE_KEY));
}

#[tokio::test]
async fn test_start_level_interrupts_running_cascade() {
    let animator = ManualAnimator::default();
    let (handle, _store) = start(&[TWO_ROWS_AND_C], animator.clone()).await;

    handle
        .swipe(swipe(id_at(TWO_ROWS_AND_C, 2, 0), Direction::Up))
        .await
        .unwrap();
    handle.start_level(0, false).await.unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.state, CascadeState::Idle);
    assert_eq!(info.locked_elements + info.locked_positions, 0);
    assert_eq!(render(&info), "C..\nBBA\nAAB");
    assert_eq!(animator.forced().len(), 6);
    assert_eq!(animator.removed(), vec![id_at(TWO_ROWS_AND_C, 0, 2)]);
}

// =========================================================================
// Failures and teardown
// =========================================================================

#[tokio::test]
async fn test_failed_writes_do_not_stop_cascade() {
    let store = FlakyStore::default();
    let handle = spawn_cascade(
        config(&[TWO_ROWS]),
        store.clone(),
        InstantAnimator::new(),
        SequentialSpawner::new(),
    );
    handle.start_level(0, false).await.unwrap();
    let mut events = handle.subscribe().await.unwrap();

    store.failing.store(true, Ordering::SeqCst);
    handle.swipe(swipe(id_at(TWO_ROWS, 2, 0), Direction::Up)).await.unwrap();
    wait_for(&mut events, |e| matches!(e, CascadeEvent::LevelCompleted { .. })).await;

    let err = handle.restart().await.unwrap_err();
    assert!(matches!(
        err,
        CascadeError::Level(LevelError::Store(StoreError::Io(_)))
    ));
}

#[tokio::test]
async fn test_shutdown_closes_events_and_handle() {
    let (handle, _store) = start(&[TWO_ROWS], InstantAnimator::new()).await;
    let mut events = handle.subscribe().await.unwrap();

    handle.shutdown().await.unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Err(err) = events.recv().await {
                return err;
            }
        }
    })
    .await
    .unwrap();
    assert!(matches!(closed, broadcast::error::RecvError::Closed));
    assert!(matches!(handle.info().await, Err(CascadeError::Unavailable)));
    assert!(handle.is_closed());
}

// =========================================================================
// Timed animation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timed_cascade_waits_for_each_batch() {
    let (handle, _store) = start(&[TWO_ROWS], TimedAnimator::new()).await;
    let mut events = handle.subscribe().await.unwrap();
    let started = tokio::time::Instant::now();

    handle.swipe(swipe(id_at(TWO_ROWS, 2, 0), Direction::Up)).await.unwrap();
    wait_for(&mut events, |e| matches!(e, CascadeEvent::LevelCompleted { .. })).await;

    // One swap animation plus one destroy delay.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(600), "finished after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "finished after {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_timed_cascade_reports_busy_state_while_waiting() {
    let (handle, _store) = start(&[TWO_ROWS], TimedAnimator::new()).await;

    handle.swipe(swipe(id_at(TWO_ROWS, 2, 0), Direction::Up)).await.unwrap();
    let info = handle.info().await.unwrap();

    assert_eq!(info.state, CascadeState::SwapPending);
    assert_eq!(info.locked_positions, 2);
    assert_eq!(info.locked_elements, 2);
}
