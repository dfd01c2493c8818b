//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::page::{NavEvent, Page};
use crate::state::AppState;
use pipdeck_core::prelude::*;

use super::{run, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Navigate(event) => handle_navigate(state, event),

        Message::Execute(command) => run::handle_execute(state, command),
        Message::RunCommand { argv } => run::handle_run_command(state, argv),
        Message::Stream(stream_message) => run::handle_stream(state, stream_message),
        Message::StartFailed { reason } => run::handle_start_failed(state, reason),
        Message::RequestAbort => run::handle_request_abort(state),
    }
}

fn handle_navigate(state: &mut AppState, event: NavEvent) -> UpdateResult {
    let Some(next) = state.page.transition(event, state.running) else {
        if state.page == Page::TaskLog && state.running {
            state.set_status("A task is running. Abort it before leaving the task log.");
        }
        debug!("Ignoring {:?} on {:?}", event, state.page);
        return UpdateResult::none();
    };

    // Back from the task log returns to the page the run was started from
    let next = if state.page == Page::TaskLog && event == NavEvent::Back {
        state
            .previous_page
            .filter(|page| *page != Page::TaskLog)
            .unwrap_or(next)
    } else {
        next
    };

    state.go_to(next);
    UpdateResult::none()
}
