//! The cascade engine for Tilematch.
//!
//! A [`CascadeHandle`] drives an actor task that owns one level in play.
//! A swipe sets off a cascade: swap, gravity, match resolution, and more
//! gravity, looping until the board is stable. Every step is paced by an
//! [`Animator`] and persisted through a
//! [`SaveStore`](tilematch_level::SaveStore).
//!
//! # Key types
//!
//! - [`spawn_cascade`] / [`CascadeHandle`]: start the actor and talk to it
//! - [`CascadeState`] / [`CascadeEvent`]: the state machine and its
//!   notifications
//! - [`LockManager`]: which tiles a cascade is busy with
//! - [`Animator`] / [`Completion`]: the animation contract, with
//!   [`InstantAnimator`] and [`TimedAnimator`]
//! - [`SwipeDetector`] / [`SwipeEvent`]: gesture classification

mod animation;
mod error;
mod input;
mod lock;
mod orchestrator;
mod state;

pub use animation::{
    AnimationCall, Animator, Completion, CompletionSender, InstantAnimator, TimedAnimator,
    wait_all,
};
pub use error::CascadeError;
pub use input::{SwipeDetector, SwipeEvent};
pub use lock::LockManager;
pub use orchestrator::{
    COMMAND_CHANNEL_SIZE, CascadeHandle, CascadeInfo, EVENT_CHANNEL_CAPACITY, spawn_cascade,
};
pub use state::{CascadeEvent, CascadeState};
