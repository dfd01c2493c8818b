//! Engine - drives the TEA loop for streamed runs
//!
//! The Engine owns the application state, the message channel and the
//! current [`StreamedProcess`]. It turns [`UpdateAction`]s into process
//! operations and feeds the run's queue back into `update` on every tick.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use pipdeck_core::prelude::*;
use pipdeck_core::{
    message_queue, MessageReceiver, RunStatus, StreamMessage, STREAM_ERROR_EXIT_CODE,
};
use pipdeck_daemon::StreamedProcess;

use crate::config::{self, Settings};
use crate::handler::{update, UpdateAction};
use crate::message::Message;
use crate::output_log::LogLine;
use crate::signals;
use crate::state::AppState;

/// Orchestration engine for pipdeck runs
pub struct Engine {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Loaded settings (cached from config)
    pub settings: Settings,

    /// Sender half of the message channel; clone for input sources
    pub msg_tx: mpsc::Sender<Message>,

    msg_rx: mpsc::Receiver<Message>,

    /// The current run, if any
    process: Option<StreamedProcess>,

    /// Queue of the current run
    stream_rx: Option<MessageReceiver>,
}

impl Engine {
    /// Create an Engine with settings from `.pipdeck/config.toml`
    pub fn new(project_path: PathBuf) -> Self {
        let settings = config::load_settings(&project_path);
        Self::with_settings(project_path, settings)
    }

    pub fn with_settings(project_path: PathBuf, settings: Settings) -> Self {
        let state = AppState::with_settings(project_path, &settings);
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);

        Self {
            state,
            settings,
            msg_tx,
            msg_rx,
            process: None,
            stream_rx: None,
        }
    }

    /// Run `update` for `message` and every follow-up, performing actions
    pub fn process_message(&mut self, message: Message) {
        let mut next = Some(message);
        while let Some(msg) = next {
            let result = update(&mut self.state, msg);
            next = result.message;
            if let Some(action) = result.action {
                // update never returns both a message and an action
                if let Some(follow_up) = self.handle_action(action) {
                    next = Some(follow_up);
                }
            }
        }
    }

    fn handle_action(&mut self, action: UpdateAction) -> Option<Message> {
        match action {
            UpdateAction::StartRun { argv, title } => {
                debug!("Starting run '{}'", title);
                let (tx, rx) = message_queue();
                let options = self.settings.streaming.stream_options();
                match StreamedProcess::start(&argv, tx, options)
                    .with_context(|| format!("Failed to start '{}'", title))
                {
                    Ok(process) => {
                        self.process = Some(process);
                        self.stream_rx = Some(rx);
                        None
                    }
                    Err(e) => Some(Message::StartFailed {
                        reason: e.to_string(),
                    }),
                }
            }
            UpdateAction::AbortRun => {
                if let Some(process) = self.process.as_mut() {
                    process.abort();
                }
                None
            }
        }
    }

    /// Feed every message currently in the run's queue into `update`.
    ///
    /// Never blocks. `on_line` sees each line as it is appended to the log.
    pub fn drain_stream(&mut self, on_line: &mut impl FnMut(&LogLine)) {
        let Some(rx) = self.stream_rx.as_mut() else {
            return;
        };

        let mut batch = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(message) => {
                    let finished = message.is_finished();
                    batch.push(message);
                    if finished {
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Run queue closed without a final status");
                    batch.push(StreamMessage::Finished(RunStatus::Exited(
                        STREAM_ERROR_EXIT_CODE,
                    )));
                    break;
                }
            }
        }

        for message in batch {
            let is_line = message.as_line().is_some();
            let finished = message.is_finished();
            self.process_message(Message::Stream(message));

            if is_line {
                if let Some(line) = self.state.log.last_line() {
                    on_line(line);
                }
            }
            if finished {
                self.stream_rx = None;
                self.process = None;
            }
        }
    }

    /// Start a run with `message` and drive it to completion.
    ///
    /// Interrupts are turned into abort requests while the run is active.
    /// Returns `None` if the run could not be started.
    pub async fn run(
        &mut self,
        message: Message,
        mut on_line: impl FnMut(&LogLine),
    ) -> Option<RunStatus> {
        self.process_message(message);
        if !self.state.running {
            return None;
        }

        let signal_task = signals::spawn_abort_handler(self.msg_tx.clone());
        let mut ticker = tokio::time::interval(self.settings.streaming.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.state.running {
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain_stream(&mut on_line);
                }
                Some(msg) = self.msg_rx.recv() => {
                    self.process_message(msg);
                }
            }
        }

        signal_task.abort();
        self.state.last_status
    }

    /// Abort the current run, if any, and wait for its final status
    pub async fn shutdown(&mut self) {
        if let Some(process) = self.process.as_mut() {
            info!("Aborting run on shutdown");
            process.abort();
            process.wait_finished().await;
        }
        self.drain_stream(&mut |_: &LogLine| {});
    }
}
