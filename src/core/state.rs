//! # Application State
//!
//! Core business state for the tutor. Domain logic only; presentation state
//! lives in the `tui` module.
//!
//! ```text
//! App
//! ├── client: Arc<dyn QueryClient>  // question-answering API
//! ├── pacing: Pacing                // animation batch size + tick
//! ├── transcript: Transcript        // append-only, copy-on-write messages
//! ├── turn: Option<ActiveTurn>      // current (or last) turn and its phase
//! ├── is_loading: bool              // loading indicator (waiting for first content)
//! ├── status_message: String        // status bar text
//! └── last_error: Option<String>    // most recent transport failure
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use crate::api::QueryClient;
use crate::core::animation::Pacing;
use crate::core::config::ResolvedConfig;
use crate::core::transcript::Transcript;
use crate::core::turn::TurnId;

/// Lifecycle of one turn.
///
/// ```text
/// Idle → Waiting → Streaming → Draining → Settled
///           │          │           │
///           └──────────┴───────────┴──(transport error / cancel)──▶ Settled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No turn submitted yet.
    Idle,
    /// Request sent, loading indicator shown, no content yet.
    Waiting,
    /// First content arrived; assistant message exists and is animating.
    Streaming,
    /// `done` received, characters still queued.
    Draining,
    /// Queue empty and sources attached (if any). Terminal.
    Settled,
}

impl TurnPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            TurnPhase::Waiting | TurnPhase::Streaming | TurnPhase::Draining
        )
    }
}

/// Reducer-side record of the current turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTurn {
    pub id: TurnId,
    pub phase: TurnPhase,
    /// Transcript index of the assistant message, once created.
    pub message_index: Option<usize>,
}

pub struct App {
    pub client: Arc<dyn QueryClient>,
    pub pacing: Pacing,
    pub transcript: Transcript,
    pub turn: Option<ActiveTurn>,
    pub is_loading: bool,
    pub status_message: String,
    pub last_error: Option<String>,
    next_turn: u64,
}

impl App {
    pub fn new(client: Arc<dyn QueryClient>, pacing: Pacing) -> Self {
        Self {
            client,
            pacing,
            transcript: Transcript::new(),
            turn: None,
            is_loading: false,
            status_message: String::from("Ask a question about the lectures"),
            last_error: None,
            next_turn: 1,
        }
    }

    pub fn from_config(client: Arc<dyn QueryClient>, config: &ResolvedConfig) -> Self {
        Self::new(client, config.pacing)
    }

    /// Phase of the current turn, `Idle` before the first question.
    pub fn phase(&self) -> TurnPhase {
        self.turn.as_ref().map_or(TurnPhase::Idle, |t| t.phase)
    }

    pub fn turn_in_flight(&self) -> bool {
        self.phase().is_in_flight()
    }

    /// Allocate the id for a new turn.
    pub(crate) fn next_turn_id(&mut self) -> TurnId {
        let id = TurnId(self.next_turn);
        self.next_turn += 1;
        id
    }

    /// The in-flight turn, if `id` is it.
    pub(crate) fn active_turn_mut(&mut self, id: TurnId) -> Option<&mut ActiveTurn> {
        self.turn
            .as_mut()
            .filter(|t| t.id == id && t.phase.is_in_flight())
    }
}
