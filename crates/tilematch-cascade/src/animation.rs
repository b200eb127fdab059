//! The animation contract between the cascade and whatever draws it.
//!
//! The orchestrator never sleeps on its own. Every wait in a cascade is a
//! [`Completion`] handed back by an [`Animator`], so the pacing of a
//! cascade is entirely up to the animator:
//!
//! - [`InstantAnimator`] completes everything at once and records each
//!   request, for headless runs and tests.
//! - [`TimedAnimator`] completes requests after their duration on the
//!   Tokio clock.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures_util::future::join_all;
use tilematch_grid::{Element, ElementId, WorldPosition};
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Resolves when an animation request has finished.
///
/// Backed by a oneshot channel. If the [`CompletionSender`] is dropped
/// without firing, the completion still resolves, so a presentation layer
/// that tears an entity down never leaves the cascade hanging.
#[derive(Debug)]
pub struct Completion {
    rx: Option<oneshot::Receiver<()>>,
}

/// The firing side of a [`Completion`].
#[derive(Debug)]
pub struct CompletionSender(oneshot::Sender<()>);

impl Completion {
    /// A completion that is already resolved.
    pub fn ready() -> Self {
        Self { rx: None }
    }

    /// A completion that resolves when the returned sender fires or drops.
    pub fn pending() -> (CompletionSender, Self) {
        let (tx, rx) = oneshot::channel();
        (CompletionSender(tx), Self { rx: Some(rx) })
    }
}

impl CompletionSender {
    pub fn complete(self) {
        let _ = self.0.send(());
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(());
        };
        // A closed channel counts as done.
        let _ = ready!(Pin::new(rx).poll(cx));
        self.rx = None;
        Poll::Ready(())
    }
}

/// Resolves once every completion in the batch has.
pub async fn wait_all(completions: Vec<Completion>) {
    join_all(completions).await;
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

/// Moves and destroys the presentation entities behind elements.
///
/// All methods take `&self`; implementations keep whatever state they need
/// behind interior mutability. Methods are called from inside the cascade
/// actor's task, so implementations may spawn Tokio tasks.
pub trait Animator: Send + 'static {
    /// Moves `element` to `to` over `duration`.
    fn move_to(&self, element: &Element, to: WorldPosition, duration: Duration) -> Completion;

    /// Destroys `element` after `delay`. The completion resolves when the
    /// entity is gone.
    fn destroy(&self, element: &Element, delay: Duration) -> Completion;

    /// Skips the remaining delay of a pending [`destroy`](Self::destroy)
    /// and destroys the entity now. Resolves the pending completion.
    fn force_destroy(&self, element: &Element);

    /// Removes the entity without any animation (level teardown).
    fn remove(&self, element: &Element);

    /// Called once a level attempt has been torn down and every element on
    /// the board was passed to [`remove`](Self::remove). Implementations
    /// drop whatever they still track for the ended attempt.
    fn reset(&self) {}
}

/// One request received by an [`InstantAnimator`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationCall {
    MoveTo {
        element: ElementId,
        to: WorldPosition,
        duration: Duration,
    },
    Destroy {
        element: ElementId,
        delay: Duration,
    },
    ForceDestroy {
        element: ElementId,
    },
    Remove {
        element: ElementId,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// InstantAnimator
// ---------------------------------------------------------------------------

/// Completes every request immediately and keeps a log of them.
///
/// Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct InstantAnimator {
    calls: Arc<Mutex<Vec<AnimationCall>>>,
}

impl InstantAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request so far, oldest first.
    pub fn calls(&self) -> Vec<AnimationCall> {
        lock(&self.calls).clone()
    }

    /// Drains the log.
    pub fn take_calls(&self) -> Vec<AnimationCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    fn record(&self, call: AnimationCall) {
        lock(&self.calls).push(call);
    }
}

impl Animator for InstantAnimator {
    fn move_to(&self, element: &Element, to: WorldPosition, duration: Duration) -> Completion {
        self.record(AnimationCall::MoveTo {
            element: element.id(),
            to,
            duration,
        });
        Completion::ready()
    }

    fn destroy(&self, element: &Element, delay: Duration) -> Completion {
        self.record(AnimationCall::Destroy {
            element: element.id(),
            delay,
        });
        Completion::ready()
    }

    fn force_destroy(&self, element: &Element) {
        self.record(AnimationCall::ForceDestroy {
            element: element.id(),
        });
    }

    fn remove(&self, element: &Element) {
        self.record(AnimationCall::Remove {
            element: element.id(),
        });
    }
}

// ---------------------------------------------------------------------------
// TimedAnimator
// ---------------------------------------------------------------------------

/// Completes requests on the Tokio clock.
///
/// Moves take their full duration and destroys resolve after their delay,
/// unless [`force_destroy`](Animator::force_destroy) or
/// [`remove`](Animator::remove) cuts the delay short. Under
/// `tokio::time::pause` the clock auto-advances, so cascades stay
/// deterministic in tests.
///
/// Must be driven from inside a Tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TimedAnimator {
    inner: Arc<Mutex<TimedState>>,
}

#[derive(Debug, Default)]
struct TimedState {
    /// Bumped by `reset`. Timers started under an older generation are
    /// stale and leave the state alone.
    generation: u64,
    positions: HashMap<ElementId, WorldPosition>,
    pending_destroys: HashMap<ElementId, CompletionSender>,
    destroyed: HashSet<ElementId>,
}

impl TimedState {
    fn finish_destroy(&mut self, id: ElementId) {
        if let Some(done) = self.pending_destroys.remove(&id) {
            done.complete();
        }
        self.positions.remove(&id);
        self.destroyed.insert(id);
    }

    fn forget(&mut self, id: ElementId) {
        if let Some(done) = self.pending_destroys.remove(&id) {
            done.complete();
        }
        self.positions.remove(&id);
        self.destroyed.remove(&id);
    }
}

impl TimedAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the last finished move left `id`.
    pub fn position(&self, id: ElementId) -> Option<WorldPosition> {
        lock(&self.inner).positions.get(&id).copied()
    }

    pub fn is_destroyed(&self, id: ElementId) -> bool {
        lock(&self.inner).destroyed.contains(&id)
    }

    /// Destroys whose delay hasn't run out yet.
    pub fn pending_destroy_count(&self) -> usize {
        lock(&self.inner).pending_destroys.len()
    }

    /// Elements with a known position or a finished destroy.
    pub fn tracked_count(&self) -> usize {
        let state = lock(&self.inner);
        state.positions.len() + state.destroyed.len()
    }
}

impl Animator for TimedAnimator {
    fn move_to(&self, element: &Element, to: WorldPosition, duration: Duration) -> Completion {
        let (done, completion) = Completion::pending();
        let inner = Arc::clone(&self.inner);
        let id = element.id();
        let generation = lock(&self.inner).generation;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            {
                let mut state = lock(&inner);
                if state.generation == generation && !state.destroyed.contains(&id) {
                    state.positions.insert(id, to);
                }
            }
            done.complete();
        });
        completion
    }

    fn destroy(&self, element: &Element, delay: Duration) -> Completion {
        let (done, completion) = Completion::pending();
        let id = element.id();
        let generation = {
            let mut state = lock(&self.inner);
            state.pending_destroys.insert(id, done);
            state.generation
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = lock(&inner);
            if state.generation == generation && state.pending_destroys.contains_key(&id) {
                state.finish_destroy(id);
            }
        });
        completion
    }

    fn force_destroy(&self, element: &Element) {
        lock(&self.inner).finish_destroy(element.id());
    }

    fn remove(&self, element: &Element) {
        lock(&self.inner).forget(element.id());
    }

    fn reset(&self) {
        let mut state = lock(&self.inner);
        for (_, done) in state.pending_destroys.drain() {
            done.complete();
        }
        state.positions.clear();
        state.destroyed.clear();
        state.generation = state.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(id: u64) -> Element {
        Element::new(ElementId(id), "A")
    }

    #[tokio::test]
    async fn test_ready_completion_resolves() {
        Completion::ready().await;
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_complete() {
        let (done, completion) = Completion::pending();
        drop(done);
        completion.await;
    }

    #[tokio::test]
    async fn test_wait_all_waits_for_every_completion() {
        let (first, a) = Completion::pending();
        let (second, b) = Completion::pending();
        let batch = tokio::spawn(wait_all(vec![a, b, Completion::ready()]));

        first.complete();
        tokio::task::yield_now().await;
        assert!(!batch.is_finished());

        second.complete();
        batch.await.unwrap();
    }

    #[tokio::test]
    async fn test_instant_animator_records_calls() {
        let animator = InstantAnimator::new();
        let observer = animator.clone();

        animator
            .move_to(&element(1), WorldPosition::new(1.0, 2.0, 0.0), Duration::from_millis(5))
            .await;
        animator.destroy(&element(2), Duration::from_millis(5)).await;
        animator.force_destroy(&element(2));
        animator.remove(&element(3));

        let calls = observer.take_calls();
        assert_eq!(calls.len(), 4);
        assert!(matches!(calls[0], AnimationCall::MoveTo { element: ElementId(1), .. }));
        assert_eq!(calls[3], AnimationCall::Remove { element: ElementId(3) });
        assert!(observer.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_move_takes_its_duration() {
        let animator = TimedAnimator::new();
        let start = tokio::time::Instant::now();
        let to = WorldPosition::new(3.0, 0.0, 0.0);

        animator.move_to(&element(1), to, Duration::from_millis(300)).await;

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(animator.position(ElementId(1)), Some(to));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_force_destroy_skips_delay() {
        let animator = TimedAnimator::new();
        let start = tokio::time::Instant::now();

        let completion = animator.destroy(&element(1), Duration::from_secs(10));
        assert_eq!(animator.pending_destroy_count(), 1);
        animator.force_destroy(&element(1));
        completion.await;

        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(animator.is_destroyed(ElementId(1)));
        assert_eq!(animator.pending_destroy_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_remove_forgets_element() {
        let animator = TimedAnimator::new();
        let to = WorldPosition::new(1.0, 0.0, 0.0);
        animator.move_to(&element(1), to, Duration::from_millis(10)).await;
        assert_eq!(animator.position(ElementId(1)), Some(to));

        animator.remove(&element(1));

        assert_eq!(animator.position(ElementId(1)), None);
        assert!(!animator.is_destroyed(ElementId(1)));
        assert_eq!(animator.tracked_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_reset_clears_state_and_ignores_stale_timers() {
        let animator = TimedAnimator::new();
        animator.destroy(&element(1), Duration::ZERO).await;
        assert!(animator.is_destroyed(ElementId(1)));

        let moving = animator.move_to(
            &element(2),
            WorldPosition::new(2.0, 0.0, 0.0),
            Duration::from_millis(50),
        );
        let destroying = animator.destroy(&element(3), Duration::from_millis(50));

        animator.reset();
        destroying.await;
        moving.await;

        assert!(!animator.is_destroyed(ElementId(1)));
        assert!(!animator.is_destroyed(ElementId(3)));
        assert_eq!(animator.position(ElementId(2)), None);
        assert_eq!(animator.pending_destroy_count(), 0);
        assert_eq!(animator.tracked_count(), 0);
    }
}
