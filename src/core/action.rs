//! # Actions
//!
//! Everything that can happen in the tutor becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! The turn driver revealed three characters? That's `Action::Reveal { .. }`.
//!
//! `update()` takes the current state and an action, mutates the state, and
//! returns an `Effect` describing the I/O the caller should perform. No side
//! effects happen here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! Actions produced by a turn carry its `TurnId`. Anything tagged with a turn
//! that is no longer in flight (cancelled, failed, superseded) is dropped, so
//! a torn-down turn can never write into the transcript.

use log::{debug, info, warn};

use crate::api::Source;
use crate::core::state::{ActiveTurn, App, TurnPhase};
use crate::core::transcript::Message;
use crate::core::turn::{TurnHandle, TurnId};

/// Shown in place of the answer when the request fails.
pub const APOLOGY: &str = "Sorry, I couldn't reach the tutor right now. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The learner submitted a question.
    Submit(String),
    /// Abandon the in-flight turn.
    CancelTurn,
    Quit,
    /// First content of the turn arrived: hide loading, create the message.
    StreamStarted(TurnId),
    /// One animation batch to append to the turn's message.
    Reveal { turn: TurnId, text: String },
    /// Sources released after the animation queue drained.
    SourcesReady { turn: TurnId, sources: Vec<Source> },
    /// The server finished the answer (characters may still be animating).
    StreamDone(TurnId),
    /// Transport failure; the answer is replaced by the apology.
    TurnFailed { turn: TurnId, error: String },
    /// Queue drained and the stream is over.
    TurnSettled(TurnId),
    /// Result of the startup health probe.
    HealthChecked(Result<(), String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    /// Start streaming the answer for this turn.
    SpawnTurn(TurnHandle),
    /// Tear down the running turn task.
    AbortTurn,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Submit(text) => submit(app, text),
        Action::CancelTurn => {
            let Some(turn) = app.turn.as_mut().filter(|t| t.phase.is_in_flight()) else {
                return Effect::None;
            };
            info!("Cancelling turn {}", turn.id);
            turn.phase = TurnPhase::Settled;
            app.is_loading = false;
            app.status_message = String::from("Answer cancelled");
            Effect::AbortTurn
        }
        Action::Quit => Effect::Quit,
        Action::StreamStarted(id) => {
            let Some(turn) = app
                .turn
                .as_mut()
                .filter(|t| t.id == id && t.phase.is_in_flight())
            else {
                debug!("Dropping StreamStarted for stale turn {}", id);
                return Effect::None;
            };
            if turn.message_index.is_some() {
                return Effect::None;
            }
            let index = app.transcript.push(Message::assistant());
            turn.message_index = Some(index);
            // `done` may already have arrived; the turn then stays Draining.
            if turn.phase == TurnPhase::Waiting {
                turn.phase = TurnPhase::Streaming;
            }
            app.is_loading = false;
            app.status_message = String::from("Answering...");
            Effect::None
        }
        Action::Reveal { turn, text } => {
            match app.active_turn_mut(turn).and_then(|t| t.message_index) {
                Some(index) => {
                    app.transcript.update(index, |m| m.content.push_str(&text));
                }
                None => debug!("Dropping reveal for turn {} ({} bytes)", turn, text.len()),
            }
            Effect::None
        }
        Action::SourcesReady { turn, sources } => {
            match app.active_turn_mut(turn).and_then(|t| t.message_index) {
                Some(index) => {
                    info!("Attaching {} source(s) to message {}", sources.len(), index);
                    app.transcript.update(index, |m| m.sources = sources);
                }
                None => warn!("Sources for turn {} have no message to attach to", turn),
            }
            Effect::None
        }
        Action::StreamDone(id) => {
            let Some(turn) = app.active_turn_mut(id) else {
                return Effect::None;
            };
            if matches!(turn.phase, TurnPhase::Waiting | TurnPhase::Streaming) {
                turn.phase = TurnPhase::Draining;
            }
            app.is_loading = false;
            Effect::None
        }
        Action::TurnFailed { turn, error } => {
            let Some(active) = app.active_turn_mut(turn) else {
                return Effect::None;
            };
            warn!("Turn {} failed: {}", turn, error);
            active.phase = TurnPhase::Settled;
            let index = active.message_index;
            let apologised = index.is_some_and(|i| {
                app.transcript.update(i, |m| {
                    m.content = APOLOGY.to_string();
                    m.sources.clear();
                })
            });
            if !apologised {
                let index = app.transcript.push(Message {
                    content: APOLOGY.to_string(),
                    ..Message::assistant()
                });
                if let Some(active) = app.turn.as_mut() {
                    active.message_index = Some(index);
                }
            }
            app.is_loading = false;
            app.status_message = String::from("Request failed");
            app.last_error = Some(error);
            Effect::None
        }
        Action::TurnSettled(id) => {
            let Some(turn) = app.active_turn_mut(id) else {
                return Effect::None;
            };
            turn.phase = TurnPhase::Settled;
            app.is_loading = false;
            app.status_message = String::from("Ready");
            Effect::None
        }
        Action::HealthChecked(result) => {
            app.status_message = match result {
                Ok(()) => format!("Connected to {}", app.client.endpoint()),
                Err(e) => {
                    warn!("Health check failed: {}", e);
                    format!("API unreachable ({e})")
                }
            };
            Effect::None
        }
    }
}

fn submit(app: &mut App, text: String) -> Effect {
    let question = text.trim();
    if question.is_empty() {
        debug!("Ignoring empty submission");
        return Effect::None;
    }
    if app.turn_in_flight() {
        app.status_message = String::from("Still answering - press Esc to cancel");
        return Effect::None;
    }

    let id = app.next_turn_id();
    info!("Turn {} submitted ({} chars)", id, question.chars().count());
    app.transcript.push(Message::user(question));
    app.turn = Some(ActiveTurn {
        id,
        phase: TurnPhase::Waiting,
        message_index: None,
    });
    app.is_loading = true;
    app.last_error = None;
    app.status_message = String::from("Thinking...");
    Effect::SpawnTurn(TurnHandle {
        id,
        question: question.to_string(),
    })
}
