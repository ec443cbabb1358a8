use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::state::{App, TurnPhase};
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{LandingPage, MessageList, TitleBar};

/// Compose one frame: title bar, conversation (or landing page), input box.
pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min};

    tui.input_box.busy = app.turn_in_flight();
    let input_height = tui.input_box.calculate_height(frame.area().width);
    let layout = Layout::vertical([Length(1), Min(0), Length(input_height)]);
    let [title_area, main_area, input_area] = layout.areas(frame.area());

    let messages = app.transcript.messages();
    if messages.is_empty() && !app.is_loading {
        LandingPage::new(app.client.endpoint()).render(frame, main_area);
        tui.message_list.has_unseen_content = false;
    } else {
        let is_streaming = matches!(app.phase(), TurnPhase::Streaming | TurnPhase::Draining);
        MessageList::new(
            &mut tui.message_list,
            messages,
            app.is_loading,
            is_streaming,
            spinner_frame,
        )
        .render(frame, main_area);
    }

    TitleBar::new(
        app.client.endpoint(),
        &app.status_message,
        tui.message_list.has_unseen_content,
    )
    .render(frame, title_area);

    tui.input_box.render(frame, input_area);
}
