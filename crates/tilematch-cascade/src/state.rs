//! Cascade state machine and the events it emits.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CascadeState
// ---------------------------------------------------------------------------

/// Where the orchestrator is within a cascade.
///
/// ```text
///          swipe            moves done           nothing matches
/// Idle ─→ SwapPending ─→ Settling ─→ MatchResolving ─→ Idle ─→ (Completed)
///                           ↑              │
///                           └──────────────┘ groups destroyed
/// ```
///
/// Any busy state can drop into **Cancelling**, which always leaves
/// through `Idle` (or `Completed` if the board happens to be empty).
/// Only `Idle` accepts swipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CascadeState {
    Idle,
    SwapPending,
    Settling,
    MatchResolving,
    Cancelling,
    Completed,
}

impl CascadeState {
    pub fn accepts_swipes(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// `true` while a cascade is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::SwapPending | Self::Settling | Self::MatchResolving | Self::Cancelling
        )
    }
}

impl std::fmt::Display for CascadeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::SwapPending => write!(f, "SwapPending"),
            Self::Settling => write!(f, "Settling"),
            Self::MatchResolving => write!(f, "MatchResolving"),
            Self::Cancelling => write!(f, "Cancelling"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

// ---------------------------------------------------------------------------
// CascadeEvent
// ---------------------------------------------------------------------------

/// Notifications broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeEvent {
    /// A level attempt began, either fresh or from a saved snapshot.
    LevelStarted { level: u32, restored: bool },

    StateChanged(CascadeState),

    /// One pass of match resolution removed `groups` groups totalling
    /// `tiles` tiles.
    GroupsCleared { groups: usize, tiles: usize },

    /// The board was emptied. Sent at most once per level attempt.
    LevelCompleted { level: u32 },
}
