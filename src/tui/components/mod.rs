//! # TUI Components
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components that receive all data as parameters:
//! - `TitleBar`: Top status bar with the avatar, API endpoint and status
//! - `Message`: One transcript message, with its sources once revealed
//! - `LandingPage`: Shown while the transcript is empty
//!
//! ### Stateful Components (Event-Driven)
//!
//! Components that manage local state and emit events:
//! - `InputBox`: Question input field
//! - `MessageList`: Scrollable conversation view with layout caching
//!
//! Components receive external data as props, never by reaching into `App`:
//!
//! ```rust,ignore
//! TitleBar::new(app.client.endpoint(), &app.status_message, unseen).render(frame, area);
//! ```
//!
//! ```text
//! components/
//! ├── mod.rs
//! ├── title_bar.rs     (Top status bar)
//! ├── message.rs       (Single message renderer)
//! ├── message_list.rs  (Scrollable message container + loading spinner)
//! ├── input_box.rs     (Question input)
//! └── landing.rs       (Empty-transcript page)
//! ```

/// The tutor's avatar, shown in the title bar and on its messages.
pub const AVATAR: &str = "🎓";

mod title_bar;
pub use title_bar::TitleBar;

pub mod input_box;
pub use input_box::{InputBox, InputEvent};
pub mod landing;
pub use landing::LandingPage;
pub mod message;
pub mod message_list;
pub use message_list::{MessageList, MessageListState};
