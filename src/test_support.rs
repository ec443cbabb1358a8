//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::api::{ApiError, QueryClient, RecordStream, Source};
use crate::core::action::{Action, Effect, update};
use crate::core::animation::Pacing;
use crate::core::state::App;
use crate::core::turn::run_turn;

/// One step of a scripted response body.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver `bytes` after waiting `after`.
    Chunk { after: Duration, bytes: Vec<u8> },
    /// Fail the body with a network error after waiting `after`.
    Fail { after: Duration, message: String },
}

impl Step {
    pub fn chunk(after_ms: u64, bytes: impl Into<Vec<u8>>) -> Self {
        Step::Chunk {
            after: Duration::from_millis(after_ms),
            bytes: bytes.into(),
        }
    }

    pub fn fail(after_ms: u64, message: &str) -> Self {
        Step::Fail {
            after: Duration::from_millis(after_ms),
            message: message.to_string(),
        }
    }
}

/// A `QueryClient` that replays a fixed body on the tokio clock.
pub struct ScriptedClient {
    steps: Vec<Step>,
    reject: Option<(u16, String)>,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            reject: None,
        }
    }

    /// Every request fails with the given HTTP status.
    pub fn rejecting(status: u16, message: &str) -> Self {
        Self {
            steps: Vec::new(),
            reject: Some((status, message.to_string())),
        }
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    fn endpoint(&self) -> &str {
        "scripted"
    }

    async fn open(&self, _question: &str) -> Result<RecordStream, ApiError> {
        if let Some((status, message)) = &self.reject {
            return Err(ApiError::Api {
                status: *status,
                message: message.clone(),
            });
        }
        let body = futures::stream::iter(self.steps.clone())
            .then(|step| async move {
                match step {
                    Step::Chunk { after, bytes } => {
                        tokio::time::sleep(after).await;
                        Ok(bytes)
                    }
                    Step::Fail { after, message } => {
                        tokio::time::sleep(after).await;
                        Err(ApiError::Network(message))
                    }
                }
            })
            .boxed();
        Ok(RecordStream::new(body))
    }

    async fn health(&self) -> Result<(), ApiError> {
        match &self.reject {
            Some((status, message)) => Err(ApiError::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub fn content_record(text: &str) -> String {
    let payload = serde_json::json!({ "type": "content", "data": text });
    format!("data: {payload}\n\n")
}

pub fn sources_record(sources: &[Source]) -> String {
    let payload = serde_json::json!({ "type": "sources", "data": sources });
    format!("data: {payload}\n\n")
}

pub fn done_record() -> String {
    "data: {\"type\":\"done\"}\n\n".to_string()
}

pub fn sample_source() -> Source {
    Source {
        course: "GenAI 101".to_string(),
        lecture: "Intro".to_string(),
        timestamp_start: "00:03:12.500".to_string(),
        timestamp_end: None,
        text: None,
    }
}

/// Creates a test App whose client never answers with anything.
pub fn test_app() -> App {
    App::new(Arc::new(ScriptedClient::new(Vec::new())), Pacing::default())
}

/// Submit `question`, run its turn to completion against `steps`, and feed
/// every emitted action back through the reducer.
pub async fn run_scripted_turn(question: &str, steps: Vec<Step>) -> (App, Vec<Action>) {
    run_turn_with(question, ScriptedClient::new(steps)).await
}

pub async fn run_turn_with(question: &str, client: ScriptedClient) -> (App, Vec<Action>) {
    let client: Arc<dyn QueryClient> = Arc::new(client);
    let mut app = App::new(client.clone(), Pacing::default());
    let Effect::SpawnTurn(handle) = update(&mut app, Action::Submit(question.to_string())) else {
        panic!("submission was not accepted");
    };

    let (tx, rx) = mpsc::channel();
    run_turn(client, handle, app.pacing, tx).await;

    let actions: Vec<Action> = rx.try_iter().collect();
    for action in actions.iter().cloned() {
        update(&mut app, action);
    }
    (app, actions)
}
