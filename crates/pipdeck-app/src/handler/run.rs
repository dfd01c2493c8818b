//! Run lifecycle handlers
//!
//! Only one run may be active. `running` is set as soon as a run is
//! requested so a second request made before `Started` arrives is rejected.

use pipdeck_core::prelude::*;
use pipdeck_core::StreamMessage;
use pipdeck_daemon::PipCommand;

use crate::message::Message;
use crate::page::NavEvent;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

pub(crate) fn handle_execute(state: &mut AppState, command: PipCommand) -> UpdateResult {
    if let Err(e) = command.validate() {
        state.set_status(e.to_string());
        return UpdateResult::none();
    }
    let argv = command.argv(&state.invocation);
    start_run(state, argv, command.describe())
}

pub(crate) fn handle_run_command(state: &mut AppState, argv: Vec<String>) -> UpdateResult {
    if argv.is_empty() {
        state.set_status(Error::spawn("empty command").to_string());
        return UpdateResult::none();
    }
    let title = format!("Running {}", argv.join(" "));
    start_run(state, argv, title)
}

fn start_run(state: &mut AppState, argv: Vec<String>, title: String) -> UpdateResult {
    if state.running {
        let e = Error::RunInProgress;
        warn!("Rejected '{}': {}", title, e);
        state.set_status(e.to_string());
        return UpdateResult::none();
    }

    info!("{}", title);
    state.running = true;
    state.abort_requested = false;
    state.last_status = None;
    state.current_task = Some(title.clone());
    state.set_status(title.clone());

    UpdateResult::action(UpdateAction::StartRun { argv, title })
}

pub(crate) fn handle_stream(state: &mut AppState, message: StreamMessage) -> UpdateResult {
    match message {
        StreamMessage::Started => {
            state.log.apply(StreamMessage::Started);
            UpdateResult::message(Message::Navigate(NavEvent::RunStarted))
        }
        StreamMessage::Finished(status) => {
            state.log.apply(StreamMessage::Finished(status));
            state.running = false;
            state.abort_requested = false;
            state.last_status = Some(status);

            let task = state.current_task.as_deref().unwrap_or("Task");
            let line = format!("{}: {}", task, status);
            if status.is_success() {
                info!("{}", line);
            } else {
                warn!("{}", line);
            }
            state.set_status(line);

            UpdateResult::message(Message::Navigate(NavEvent::RunFinished))
        }
        line => {
            state.log.apply(line);
            UpdateResult::none()
        }
    }
}

pub(crate) fn handle_start_failed(state: &mut AppState, reason: String) -> UpdateResult {
    debug!("Run did not start: {}", reason);
    state.running = false;
    state.abort_requested = false;
    state.set_status(format!("Failed to start: {}", reason));
    UpdateResult::none()
}

pub(crate) fn handle_request_abort(state: &mut AppState) -> UpdateResult {
    if !state.running {
        debug!("Abort requested with no active run");
        return UpdateResult::none();
    }
    if state.abort_requested {
        return UpdateResult::none();
    }

    state.abort_requested = true;
    let line = format!(
        "Aborting {}",
        state.current_task.as_deref().unwrap_or("task")
    );
    state.set_status(line);
    UpdateResult::action(UpdateAction::AbortRun)
}
