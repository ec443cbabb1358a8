//! # Core Application Logic
//!
//! The tutor's business logic. It knows nothing about any specific UI
//! technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (app data)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │  • Turn (stream task)   │
//!                    └───────────┬─────────────┘
//!                                │ Action / Effect
//!                                ▼
//!                         ┌────────────┐
//!                         │    TUI     │
//!                         │  Adapter   │
//!                         │ (ratatui)  │
//!                         └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all application state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`transcript`]: Copy-on-write message list
//! - [`turn`]: Per-question streaming task (interpreter + scheduler loop)
//! - [`animation`]: Fixed-cadence character reveal queue
//! - [`config`]: Layered configuration

pub mod action;
pub mod animation;
pub mod config;
pub mod state;
pub mod transcript;
pub mod turn;
