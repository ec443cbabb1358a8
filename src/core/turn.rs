//! # Turn Driver
//!
//! One question, one answer, one tokio task.
//!
//! ```text
//!              ┌──────────────────── run_turn (one task) ────────────────────┐
//!  HTTP body ─▶│ RecordStream::next_record ─▶ parse_record ─▶ TurnDriver     │
//!              │                                              │  ▲           │
//!              │                                   push_str   ▼  │ Batch     │
//!              │                                            Animator::tick   │
//!              └──────────────────────────────┬──────────────────────────────┘
//!                                             ▼
//!                              mpsc::Sender<Action>  ─▶  update()
//! ```
//!
//! Both suspension points (next record, next tick) are raced with a biased
//! `select!`, so the animation queue and any held sources are owned by a
//! single control flow. Sources wait for the queue's drained signal before
//! they are released.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use log::{debug, info, warn};

use crate::api::{ApiError, QueryClient, RecordError, Source, StreamEvent, parse_record};
use crate::core::action::Action;
use crate::core::animation::{Animator, Batch, Pacing};

/// Identifies one question/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a turn task needs to know about its question.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnHandle {
    pub id: TurnId,
    pub question: String,
}

/// The UI loop went away; nobody is listening to this turn anymore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action receiver dropped")
    }
}

impl std::error::Error for ChannelClosed {}

/// Per-turn interpreter state: the animation queue, sources waiting for it
/// to drain, and whether the message and the stream have started/ended.
pub struct TurnDriver {
    turn: TurnId,
    animator: Animator,
    held_sources: Option<Vec<Source>>,
    started: bool,
    done: bool,
    tx: Sender<Action>,
}

impl TurnDriver {
    pub fn new(turn: TurnId, pacing: Pacing, tx: Sender<Action>) -> Self {
        Self {
            turn,
            animator: Animator::new(pacing),
            held_sources: None,
            started: false,
            done: false,
            tx,
        }
    }

    /// Decode one record and act on it. Records that don't decode are logged
    /// and skipped.
    pub fn on_record(&mut self, record: &str) -> Result<(), ChannelClosed> {
        match parse_record(record) {
            Ok(event) => self.interpret(event),
            Err(RecordError::NoData) => {
                debug!("Turn {}: ignoring record without data: {:?}", self.turn, record);
                Ok(())
            }
            Err(e) => {
                warn!("Turn {}: skipping record: {}", self.turn, e);
                Ok(())
            }
        }
    }

    pub fn interpret(&mut self, event: StreamEvent) -> Result<(), ChannelClosed> {
        match event {
            StreamEvent::Content(text) => {
                self.start()?;
                if text.is_empty() {
                    return Ok(());
                }
                self.animator.push_str(&text);
                debug!(
                    "Turn {}: queued {} chars ({} pending)",
                    self.turn,
                    text.chars().count(),
                    self.animator.pending()
                );
                Ok(())
            }
            StreamEvent::Sources(sources) => {
                if self.animator.is_drained() {
                    return self.release(sources);
                }
                if self.held_sources.is_some() {
                    debug!("Turn {}: newer sources replace held ones", self.turn);
                }
                debug!(
                    "Turn {}: holding {} source(s) until {} chars drain",
                    self.turn,
                    sources.len(),
                    self.animator.pending()
                );
                self.held_sources = Some(sources);
                Ok(())
            }
            StreamEvent::Done => {
                if self.done {
                    debug!("Turn {}: duplicate done ignored", self.turn);
                    return Ok(());
                }
                self.done = true;
                self.send(Action::StreamDone(self.turn))
            }
        }
    }

    /// Forward one animation batch; on drain, release held sources.
    pub fn on_batch(&mut self, batch: Batch) -> Result<(), ChannelClosed> {
        if !batch.text.is_empty() {
            self.send(Action::Reveal {
                turn: self.turn,
                text: batch.text,
            })?;
        }
        if batch.drained
            && let Some(sources) = self.held_sources.take()
        {
            self.release(sources)?;
        }
        Ok(())
    }

    /// The body ended. A missing `done` is treated as if it had arrived.
    pub fn end_of_stream(&mut self) -> Result<(), ChannelClosed> {
        if !self.done {
            info!("Turn {}: body ended without done", self.turn);
            self.interpret(StreamEvent::Done)?;
        }
        Ok(())
    }

    /// Abandon queued animation and held sources, and report the failure.
    pub fn fail(&mut self, error: &ApiError) -> Result<(), ChannelClosed> {
        let dropped = self.animator.clear();
        let had_sources = self.held_sources.take().is_some();
        self.done = true;
        warn!(
            "Turn {}: {} (dropped {} queued chars, held sources: {})",
            self.turn, error, dropped, had_sources
        );
        self.send(Action::TurnFailed {
            turn: self.turn,
            error: error.to_string(),
        })
    }

    /// Done received, nothing left to animate, nothing held back.
    pub fn is_settled(&self) -> bool {
        self.done && self.animator.is_drained() && self.held_sources.is_none()
    }

    pub fn settle(&self) -> Result<(), ChannelClosed> {
        self.send(Action::TurnSettled(self.turn))
    }

    /// Whether an animation tick is scheduled.
    pub fn is_animating(&self) -> bool {
        self.animator.is_armed()
    }

    /// Next animation batch. Pends forever while nothing is queued.
    pub async fn tick(&mut self) -> Batch {
        self.animator.tick().await
    }

    fn start(&mut self) -> Result<(), ChannelClosed> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.send(Action::StreamStarted(self.turn))
    }

    fn release(&mut self, sources: Vec<Source>) -> Result<(), ChannelClosed> {
        // Sources with no content still need a message to hang off.
        self.start()?;
        info!("Turn {}: releasing {} source(s)", self.turn, sources.len());
        self.send(Action::SourcesReady {
            turn: self.turn,
            sources,
        })
    }

    fn send(&self, action: Action) -> Result<(), ChannelClosed> {
        self.tx.send(action).map_err(|_| ChannelClosed)
    }
}

/// Stream one answer from request to settle.
///
/// Returns once the body has ended and the animation queue has drained, or
/// right after a transport failure has been reported. Aborting the task
/// drops the body and the pending tick with it.
pub async fn run_turn(
    client: Arc<dyn QueryClient>,
    handle: TurnHandle,
    pacing: Pacing,
    tx: Sender<Action>,
) {
    let id = handle.id;
    let started = std::time::Instant::now();
    match drive(client, handle, pacing, tx).await {
        Ok(()) => info!("Turn {} finished in {:?}", id, started.elapsed()),
        Err(ChannelClosed) => warn!("Turn {}: receiver dropped, stopping", id),
    }
}

async fn drive(
    client: Arc<dyn QueryClient>,
    handle: TurnHandle,
    pacing: Pacing,
    tx: Sender<Action>,
) -> Result<(), ChannelClosed> {
    let mut driver = TurnDriver::new(handle.id, pacing, tx);

    info!("Turn {}: opening stream at {}", handle.id, client.endpoint());
    let mut records = match client.open(&handle.question).await {
        Ok(records) => records,
        Err(e) => return driver.fail(&e),
    };

    let mut reading = true;
    let mut record_count = 0usize;
    loop {
        if !reading && driver.is_settled() {
            debug!("Turn {}: {} records, settled", handle.id, record_count);
            return driver.settle();
        }

        tokio::select! {
            biased;

            record = records.next_record(), if reading => match record {
                Ok(Some(record)) => {
                    record_count += 1;
                    driver.on_record(&record)?;
                }
                Ok(None) => {
                    reading = false;
                    driver.end_of_stream()?;
                }
                Err(e) => return driver.fail(&e),
            },
            batch = driver.tick(), if driver.is_animating() => driver.on_batch(batch)?,
            else => {
                warn!("Turn {}: nothing left to wait for, settling", handle.id);
                return driver.settle();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::core::state::TurnPhase;
    use crate::core::transcript::Role;
    use crate::test_support::{
        ScriptedClient, Step, content_record, done_record, run_scripted_turn, sample_source,
        sources_record,
    };

    fn reveals(actions: &[Action]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Reveal { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn position(actions: &[Action], pred: impl Fn(&Action) -> bool) -> Option<usize> {
        actions.iter().position(pred)
    }

    #[tokio::test(start_paused = true)]
    async fn what_is_rag_scenario() {
        let body = [
            content_record("Retrieval-"),
            content_record("Augmented Generation"),
            sources_record(&[sample_source()]),
            done_record(),
        ]
        .concat();
        let (app, actions) =
            run_scripted_turn("What is RAG?", vec![Step::chunk(0, body)]).await;

        let messages = app.transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "What is RAG?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Retrieval-Augmented Generation");
        assert_eq!(messages[1].sources.len(), 1);
        assert_eq!(messages[1].sources[0].label(), "GenAI 101 • Intro • 00:03:12");

        assert_eq!(app.phase(), TurnPhase::Settled);
        assert!(!app.is_loading);
        assert!(matches!(actions.last(), Some(Action::TurnSettled(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn sources_wait_for_last_reveal() {
        let body = [
            content_record("A fairly long answer that takes many ticks."),
            sources_record(&[sample_source()]),
            done_record(),
        ]
        .concat();
        let (_, actions) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;

        let last_reveal = actions
            .iter()
            .rposition(|a| matches!(a, Action::Reveal { .. }))
            .unwrap();
        let sources = position(&actions, |a| matches!(a, Action::SourcesReady { .. })).unwrap();
        assert!(sources > last_reveal);
    }

    #[tokio::test(start_paused = true)]
    async fn sources_after_drain_are_released_immediately() {
        let (app, actions) = run_scripted_turn(
            "q",
            vec![
                Step::chunk(0, content_record("Hi")),
                Step::chunk(500, sources_record(&[sample_source()])),
                Step::chunk(0, done_record()),
            ],
        )
        .await;

        let kinds: Vec<&str> = actions
            .iter()
            .map(|a| match a {
                Action::StreamStarted(_) => "started",
                Action::Reveal { .. } => "reveal",
                Action::SourcesReady { .. } => "sources",
                Action::StreamDone(_) => "done",
                Action::TurnSettled(_) => "settled",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["started", "reveal", "sources", "done", "settled"]);
        assert_eq!(app.transcript.last().unwrap().sources, vec![sample_source()]);
    }

    #[tokio::test(start_paused = true)]
    async fn final_content_is_independent_of_chunking() {
        let body = [
            content_record("Embeddings map text "),
            content_record("to vectors: café ☕ "),
            content_record("naïve"),
            sources_record(&[sample_source()]),
            done_record(),
        ]
        .concat()
        .into_bytes();

        let whole = vec![Step::chunk(0, body.clone())];
        let per_byte = body.iter().map(|b| Step::chunk(1, vec![*b])).collect();
        let sevens = body.chunks(7).map(|c| Step::chunk(3, c.to_vec())).collect();

        let mut finals = Vec::new();
        for steps in [whole, per_byte, sevens] {
            let (app, _) = run_scripted_turn("q", steps).await;
            finals.push(app.transcript.last().unwrap().clone());
        }
        assert_eq!(finals[0].content, "Embeddings map text to vectors: café ☕ naïve");
        assert_eq!(finals[0], finals[1]);
        assert_eq!(finals[0], finals[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_fragments_reveal_in_order() {
        let body = [content_record("ab"), content_record("cd"), done_record()].concat();
        let (app, actions) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;
        assert_eq!(reveals(&actions), vec!["abc", "d"]);
        assert_eq!(app.transcript.last().unwrap().content, "abcd");
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_done_is_reported_once() {
        let body = [content_record("x"), done_record(), done_record()].concat();
        let (app, actions) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;
        let dones = actions
            .iter()
            .filter(|a| matches!(a, Action::StreamDone(_)))
            .count();
        assert_eq!(dones, 1);
        assert_eq!(app.phase(), TurnPhase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn body_without_done_still_settles() {
        let (app, actions) =
            run_scripted_turn("q", vec![Step::chunk(0, content_record("tail"))]).await;
        assert!(actions.iter().any(|a| matches!(a, Action::StreamDone(_))));
        assert_eq!(app.transcript.last().unwrap().content, "tail");
        assert_eq!(app.phase(), TurnPhase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_record_is_skipped() {
        let body = [
            content_record("before "),
            "data: {not json\n\n".to_string(),
            "data: {\"type\":\"telemetry\",\"data\":1}\n\n".to_string(),
            ": keep-alive\n\n".to_string(),
            content_record("after"),
            done_record(),
        ]
        .concat();
        let (app, _) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;
        assert_eq!(app.transcript.last().unwrap().content, "before after");
        assert!(app.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sources_without_content_start_the_message() {
        let body = [sources_record(&[sample_source()]), done_record()].concat();
        let (app, actions) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;
        assert!(matches!(actions[0], Action::StreamStarted(_)));
        let last = app.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "");
        assert_eq!(last.sources.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sources_after_done_without_content_are_attached() {
        let body = [done_record(), sources_record(&[sample_source()])].concat();
        let (app, actions) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;

        assert!(matches!(actions[0], Action::StreamDone(_)));
        assert_eq!(app.transcript.len(), 2);
        let last = app.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.sources, vec![sample_source()]);
        assert_eq!(app.phase(), TurnPhase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn content_after_done_is_still_revealed() {
        let body = [done_record(), content_record("late")].concat();
        let (app, _) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;

        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.last().unwrap().content, "late");
        assert_eq!(app.phase(), TurnPhase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_first_fragment_opens_the_message() {
        let body = [content_record(""), done_record()].concat();
        let (app, actions) = run_scripted_turn("q", vec![Step::chunk(0, body)]).await;

        assert!(matches!(actions[0], Action::StreamStarted(_)));
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.last().unwrap().content, "");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_request_yields_single_apology() {
        let client = ScriptedClient::rejecting(500, "Internal Server Error");
        let (app, actions) = crate::test_support::run_turn_with("q", client).await;

        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::TurnFailed { .. }));
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.last().unwrap().content, crate::core::action::APOLOGY);
        assert!(!app.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn mid_stream_failure_replaces_partial_answer() {
        let (app, actions) = run_scripted_turn(
            "q",
            vec![
                Step::chunk(0, content_record("Partial answer that never finishes")),
                Step::fail(100, "connection reset"),
            ],
        )
        .await;

        let failed = position(&actions, |a| matches!(a, Action::TurnFailed { .. })).unwrap();
        assert_eq!(failed, actions.len() - 1);

        let assistants: Vec<_> = app
            .transcript
            .messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .collect();
        assert_eq!(assistants.len(), 1);
        assert_eq!(assistants[0].content, crate::core::action::APOLOGY);
        assert!(assistants[0].sources.is_empty());
        assert_eq!(app.phase(), TurnPhase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_receiver_is_dropped() {
        let client: Arc<dyn QueryClient> =
            Arc::new(ScriptedClient::new(vec![Step::chunk(0, content_record("hello"))]));
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let handle = TurnHandle {
            id: TurnId(1),
            question: "q".to_string(),
        };
        // Must return rather than animate into the void.
        run_turn(client, handle, Pacing::default(), tx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn driver_holds_sources_while_queue_is_busy() {
        let (tx, rx) = mpsc::channel();
        let mut driver = TurnDriver::new(TurnId(3), Pacing::default(), tx);

        driver
            .interpret(StreamEvent::Content("abcd".to_string()))
            .unwrap();
        driver
            .interpret(StreamEvent::Sources(vec![sample_source()]))
            .unwrap();
        assert!(!driver.is_settled());

        let batch = driver.tick().await;
        driver.on_batch(batch).unwrap();
        assert!(
            !rx.try_iter()
                .any(|a| matches!(a, Action::SourcesReady { .. }))
        );

        let batch = driver.tick().await;
        assert!(batch.drained);
        driver.on_batch(batch).unwrap();
        assert!(
            rx.try_iter()
                .any(|a| matches!(a, Action::SourcesReady { .. }))
        );

        driver.end_of_stream().unwrap();
        assert!(driver.is_settled());
    }

    #[test]
    fn turn_id_display() {
        assert_eq!(TurnId(42).to_string(), "#42");
    }
}
