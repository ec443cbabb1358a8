//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! - **Turn in flight**: polls every ~16ms so revealed batches and the
//!   spinner show up as soon as the turn task sends them.
//! - **Idle**: sleeps up to 500ms, only redraws on events or terminal resize.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call, making blinking cursors appear erratic during continuous redraws.

mod component;
mod components;
mod event;
pub mod markdown;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use tokio::task::AbortHandle;

use crate::api::{ApiError, HttpQueryClient, QueryClient};
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::state::App;
use crate::core::turn::{TurnHandle, run_turn};
use crate::tui::component::EventHandler;
use crate::tui::components::{InputBox, InputEvent, MessageListState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const BUSY_POLL: Duration = Duration::from_millis(16);
const IDLE_POLL: Duration = Duration::from_millis(500);

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // The keyboard enhancement protocol is ignored by terminals that
        // don't support it.
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

/// Build the HTTP client for the configured API.
pub fn build_client(config: &ResolvedConfig) -> Result<Arc<dyn QueryClient>, ApiError> {
    let client = HttpQueryClient::new(&config.api_url, &config.query_path, &config.health_path)?;
    Ok(Arc::new(client))
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let client = build_client(&config).map_err(|e| std::io::Error::other(e.to_string()))?;
    let mut app = App::from_config(client, &config);
    let mut tui = TuiState::new();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();
    spawn_health_check(app.client.clone(), tx.clone());

    // Abort handle for the running turn (used by Escape-to-cancel)
    let mut active_turn: Option<AbortHandle> = None;

    let start_time = Instant::now();
    let mut needs_redraw = true;

    loop {
        let busy = app.turn_in_flight();
        if app.is_loading {
            needs_redraw = true; // spinner
        }

        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if busy { BUSY_POLL } else { IDLE_POLL };
        let first_event = poll_event_timeout(timeout);

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if dispatch(&mut app, &mut tui, event, &tx, &mut active_turn) {
                should_quit = true;
                break;
            }
        }

        // Handle background task actions (turn progress, health check)
        while !should_quit && let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            let effect = update(&mut app, action);
            should_quit = apply_effect(&app, effect, &tx, &mut active_turn);
        }

        if should_quit {
            break;
        }
    }

    if let Some(handle) = active_turn.take() {
        handle.abort();
    }
    ratatui::restore();
    info!("Tutor shutting down");
    Ok(())
}

/// Route one terminal event. Returns true when the app should quit.
fn dispatch(
    app: &mut App,
    tui: &mut TuiState,
    event: TuiEvent,
    tx: &mpsc::Sender<Action>,
    active_turn: &mut Option<AbortHandle>,
) -> bool {
    match event {
        // Resize just needs a redraw
        TuiEvent::Resize => false,
        TuiEvent::ForceQuit => {
            let effect = update(app, Action::Quit);
            apply_effect(app, effect, tx, active_turn)
        }
        // Esc cancels the running turn, or quits when there is none
        TuiEvent::Escape => {
            if !app.turn_in_flight() {
                let effect = update(app, Action::Quit);
                return apply_effect(app, effect, tx, active_turn);
            }
            let effect = update(app, Action::CancelTurn);
            apply_effect(app, effect, tx, active_turn)
        }
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown
        | TuiEvent::ScrollToBottom => {
            tui.message_list.handle_event(&event);
            false
        }
        _ => match tui.input_box.handle_event(&event) {
            Some(InputEvent::Submit(text)) => {
                let effect = update(app, Action::Submit(text.clone()));
                if !matches!(effect, Effect::SpawnTurn(_)) {
                    // Rejected while busy: keep what the learner typed.
                    tui.input_box.restore(text);
                    return false;
                }
                tui.message_list.stick_to_bottom = true;
                apply_effect(app, effect, tx, active_turn)
            }
            Some(InputEvent::ContentChanged) | None => false,
        },
    }
}

/// Perform the I/O an `Effect` asks for. Returns true when the app should quit.
fn apply_effect(
    app: &App,
    effect: Effect,
    tx: &mpsc::Sender<Action>,
    active_turn: &mut Option<AbortHandle>,
) -> bool {
    match effect {
        Effect::None => false,
        Effect::Quit => true,
        Effect::SpawnTurn(handle) => {
            if let Some(previous) = active_turn.replace(spawn_turn(app, handle, tx.clone())) {
                previous.abort();
            }
            false
        }
        Effect::AbortTurn => {
            if let Some(handle) = active_turn.take() {
                info!("Aborting turn task");
                handle.abort();
            }
            false
        }
    }
}

fn spawn_turn(app: &App, handle: TurnHandle, tx: mpsc::Sender<Action>) -> AbortHandle {
    info!("Spawning turn {}", handle.id);
    tokio::spawn(run_turn(app.client.clone(), handle, app.pacing, tx)).abort_handle()
}

fn spawn_health_check(client: Arc<dyn QueryClient>, tx: mpsc::Sender<Action>) {
    tokio::spawn(async move {
        let result = client.health().await.map_err(|e| e.to_string());
        if let Err(e) = &result {
            warn!("Health check against {} failed: {}", client.endpoint(), e);
        }
        if tx.send(Action::HealthChecked(result)).is_err() {
            warn!("Failed to send health check result: receiver dropped");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::TurnPhase;
    use crate::test_support::test_app;

    fn type_text(app: &mut App, tui: &mut TuiState, text: &str, tx: &mpsc::Sender<Action>) {
        let mut active = None;
        for c in text.chars() {
            dispatch(app, tui, TuiEvent::InputChar(c), tx, &mut active);
        }
    }

    #[tokio::test]
    async fn submit_spawns_turn_and_clears_input() {
        let mut app = test_app();
        let mut tui = TuiState::new();
        let (tx, _rx) = mpsc::channel();
        let mut active = None;

        type_text(&mut app, &mut tui, "What is RAG?", &tx);
        assert!(!dispatch(&mut app, &mut tui, TuiEvent::Submit, &tx, &mut active));

        assert!(active.is_some());
        assert_eq!(app.phase(), TurnPhase::Waiting);
        assert!(tui.input_box.text().is_empty());
        assert_eq!(app.transcript.len(), 1);
    }

    #[tokio::test]
    async fn submit_while_busy_keeps_input() {
        let mut app = test_app();
        let mut tui = TuiState::new();
        let (tx, _rx) = mpsc::channel();
        let mut active = None;

        type_text(&mut app, &mut tui, "first", &tx);
        dispatch(&mut app, &mut tui, TuiEvent::Submit, &tx, &mut active);
        type_text(&mut app, &mut tui, "second", &tx);
        dispatch(&mut app, &mut tui, TuiEvent::Submit, &tx, &mut active);

        assert_eq!(tui.input_box.text(), "second");
        assert_eq!(app.transcript.len(), 1);
    }

    #[tokio::test]
    async fn escape_cancels_then_quits() {
        let mut app = test_app();
        let mut tui = TuiState::new();
        let (tx, _rx) = mpsc::channel();
        let mut active = None;

        type_text(&mut app, &mut tui, "What is RAG?", &tx);
        dispatch(&mut app, &mut tui, TuiEvent::Submit, &tx, &mut active);

        assert!(!dispatch(&mut app, &mut tui, TuiEvent::Escape, &tx, &mut active));
        assert!(active.is_none());
        assert_eq!(app.phase(), TurnPhase::Settled);

        assert!(dispatch(&mut app, &mut tui, TuiEvent::Escape, &tx, &mut active));
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = test_app();
        let mut tui = TuiState::new();
        let (tx, _rx) = mpsc::channel();
        assert!(dispatch(&mut app, &mut tui, TuiEvent::ForceQuit, &tx, &mut None));
    }

    #[test]
    fn empty_submit_does_nothing() {
        let mut app = test_app();
        let mut tui = TuiState::new();
        let (tx, _rx) = mpsc::channel();
        let mut active = None;
        type_text(&mut app, &mut tui, "   ", &tx);
        assert!(!dispatch(&mut app, &mut tui, TuiEvent::Submit, &tx, &mut active));
        assert!(active.is_none());
        assert!(app.transcript.is_empty());
    }

    #[tokio::test]
    async fn scripted_turn_reaches_settled_through_the_loop() {
        let mut app = test_app();
        let mut tui = TuiState::new();
        let (tx, rx) = mpsc::channel();
        let mut active = None;

        type_text(&mut app, &mut tui, "hello", &tx);
        dispatch(&mut app, &mut tui, TuiEvent::Submit, &tx, &mut active);

        // The scripted body is empty: done is implied and the turn settles.
        let actions = tokio::task::spawn_blocking(move || {
            let mut actions = Vec::new();
            while let Ok(action) = rx.recv_timeout(Duration::from_secs(5)) {
                let settled = matches!(action, Action::TurnSettled(_));
                actions.push(action);
                if settled {
                    break;
                }
            }
            actions
        })
        .await
        .unwrap();
        for action in actions {
            update(&mut app, action);
        }
        assert!(!app.turn_in_flight());
    }
}
