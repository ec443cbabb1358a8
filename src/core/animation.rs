//! # Animation Scheduler
//!
//! Reveals an answer a few characters at a time, at a fixed cadence that is
//! independent of how bursty the network is.
//!
//! ```text
//!  push_str("Retrieval-")        tick           tick           tick
//!  ─────────────────────▶ [R e t r i e v a l -] ──▶ "Ret" ──▶ "rie" ──▶ ... ──▶ "-" (drained)
//! ```
//!
//! The tick is armed only while characters are queued: pushing onto an empty
//! queue arms it one interval ahead, and the tick that empties the queue
//! disarms it and reports `drained`. An idle animator never wakes up.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Characters revealed per tick.
pub const DEFAULT_BATCH_SIZE: usize = 3;
/// Time between ticks.
pub const DEFAULT_TICK: Duration = Duration::from_millis(30);

/// Reveal rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub batch_size: usize,
    pub tick: Duration,
}

impl Pacing {
    /// Batch size is clamped to at least one character.
    pub fn new(batch_size: usize, tick: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            tick,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_TICK)
    }
}

/// Output of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub text: String,
    /// True when this batch emptied the queue.
    pub drained: bool,
}

pub struct Animator {
    queue: VecDeque<char>,
    pacing: Pacing,
    deadline: Option<Instant>,
}

impl Animator {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            queue: VecDeque::new(),
            pacing,
            deadline: None,
        }
    }

    /// Queue characters behind anything already pending.
    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.queue.extend(text.chars());
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.pacing.tick);
        }
    }

    /// Point-in-time check: nothing left to reveal.
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a tick is scheduled.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Abandon everything queued. Returns how many characters were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.deadline = None;
        dropped
    }

    /// Take the next batch and re-arm if characters remain.
    pub fn take_batch(&mut self) -> Batch {
        let n = self.pacing.batch_size.min(self.queue.len());
        let text: String = self.queue.drain(..n).collect();
        let drained = self.queue.is_empty();
        self.deadline = if drained {
            None
        } else {
            Some(Instant::now() + self.pacing.tick)
        };
        Batch { text, drained }
    }

    /// Wait for the scheduled tick and take its batch.
    ///
    /// Never resolves while disarmed. Cancel-safe: the deadline is stored, and
    /// the queue is only touched after the sleep completes.
    pub async fn tick(&mut self) -> Batch {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
        self.take_batch()
    }
}
