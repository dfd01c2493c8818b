//! Streamed child process management
//!
//! [`StreamedProcess`] runs an external command and publishes its output to a
//! per-run message queue as line-tagged [`StreamMessage`]s. The caller drains
//! the queue without blocking; see `pipdeck_app::OutputLog`.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use pipdeck_core::prelude::*;
use pipdeck_core::{LineSource, MessageSender, RunStatus, StreamMessage, STREAM_ERROR_EXIT_CODE};

/// Default time to wait for the pipes to reach EOF after the child exits.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest line delivered as one message; longer lines are split.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// How the two output pipes are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// A single task selects over both pipes
    #[default]
    Multiplexed,
    /// One reader task per pipe
    PerStream,
}

/// Options for a single streamed run
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub strategy: ReadStrategy,
    /// Upper bound on draining buffered output after a natural exit. A
    /// grandchild that inherited the pipes can otherwise hold them open.
    pub drain_timeout: Duration,
    /// Extra environment variables for the child
    pub envs: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            strategy: ReadStrategy::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            envs: vec![("PYTHONIOENCODING".to_string(), "utf-8".to_string())],
            current_dir: None,
        }
    }
}

impl StreamOptions {
    pub fn with_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }
}

/// Why the wait task was asked to kill the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillReason {
    Abort,
    ReadFailed,
}

impl KillReason {
    fn status(self) -> RunStatus {
        match self {
            KillReason::Abort => RunStatus::Aborted,
            KillReason::ReadFailed => RunStatus::Exited(STREAM_ERROR_EXIT_CODE),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output gate
// ─────────────────────────────────────────────────────────────────────────────

struct GateState {
    tx: MessageSender,
    lines_open: bool,
    finished: bool,
}

/// Serializes every write to the queue.
///
/// Readers check-and-send under the lock, so once `close_lines` returns no
/// further line can be enqueued. `finish` enqueues `Finished` at most once.
#[derive(Clone)]
struct OutputGate(Arc<Mutex<GateState>>);

impl OutputGate {
    fn new(tx: MessageSender) -> Self {
        Self(Arc::new(Mutex::new(GateState {
            tx,
            lines_open: true,
            finished: false,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn started(&self) {
        let _ = self.lock().tx.send(StreamMessage::Started);
    }

    /// Returns false when the reader should stop
    fn line(&self, source: LineSource, text: String) -> bool {
        let gate = self.lock();
        if !gate.lines_open {
            return false;
        }
        gate.tx.send(StreamMessage::line(source, text)).is_ok()
    }

    fn close_lines(&self) {
        self.lock().lines_open = false;
    }

    fn finish(&self, status: RunStatus) -> bool {
        let mut gate = self.lock();
        if gate.finished {
            return false;
        }
        gate.finished = true;
        gate.lines_open = false;
        let _ = gate.tx.send(StreamMessage::Finished(status));
        true
    }

    fn is_finished(&self) -> bool {
        self.lock().finished
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Line reading
// ─────────────────────────────────────────────────────────────────────────────

/// Cancel-safe line reader that tolerates invalid UTF-8.
///
/// Partial reads stay in `buf` when a `select!` branch is dropped, so the
/// next call continues the same line. A line longer than `max_len` bytes is
/// delivered in `max_len` sized pieces.
struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R) -> Self {
        Self::with_max_len(inner, MAX_LINE_BYTES)
    }

    fn with_max_len(inner: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
            max_len: max_len.max(1),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            // One extra byte so a newline right at the cap ends the line.
            let room = self.max_len - self.buf.len();
            let window = &available[..available.len().min(room + 1)];
            if let Some(pos) = window.iter().position(|&b| b == b'\n') {
                self.buf.extend_from_slice(&window[..=pos]);
                self.reader.consume(pos + 1);
                return Ok(Some(self.take_line()));
            }

            let take = window.len().min(room);
            self.buf.extend_from_slice(&window[..take]);
            self.reader.consume(take);
            if self.buf.len() >= self.max_len {
                return Ok(Some(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = decode_line(&self.buf);
        self.buf.clear();
        line
    }
}

/// Strip one `\n` (and a preceding `\r`) and decode lossily.
fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// What a reader should do after handling one read result
enum ReadStep {
    Continue,
    Eof,
    Stop,
}

fn handle_read(
    result: std::io::Result<Option<String>>,
    source: LineSource,
    gate: &OutputGate,
    kill_tx: &mpsc::UnboundedSender<KillReason>,
) -> ReadStep {
    match result {
        Ok(Some(line)) => {
            trace!("{:?}: {}", source, line);
            if gate.line(source, line) {
                ReadStep::Continue
            } else {
                debug!("{:?} reader stopping, output gate closed", source);
                ReadStep::Stop
            }
        }
        Ok(None) => {
            debug!("{:?} reached EOF", source);
            ReadStep::Eof
        }
        Err(e) => {
            let err = Error::stream_read(format!("{:?}: {}", source, e));
            warn!("{}", err);
            let _ = kill_tx.send(KillReason::ReadFailed);
            ReadStep::Stop
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StreamedProcess
// ─────────────────────────────────────────────────────────────────────────────

/// A running external command whose output is streamed to a message queue.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` task, which is
/// the only place that enqueues [`StreamMessage::Finished`]. `StreamedProcess`
/// keeps a kill channel for [`abort`](Self::abort), an atomic flag for
/// synchronous `has_exited()` checks, and a [`Notify`] so callers can await
/// the end of the run.
pub struct StreamedProcess {
    /// Program name for logging
    program: String,
    /// Process ID for logging
    pid: Option<u32>,
    gate: OutputGate,
    /// Taken on first abort
    kill_tx: Option<mpsc::UnboundedSender<KillReason>>,
    /// Set by the wait task once the child has been reaped
    exited: Arc<AtomicBool>,
    /// Notified right after `Finished` is enqueued
    finish_notify: Arc<Notify>,
}

impl StreamedProcess {
    /// Spawn `command` and start streaming its output into `queue`.
    ///
    /// A spawn failure is returned synchronously and nothing is enqueued.
    /// On success [`StreamMessage::Started`] is already in the queue when this
    /// returns. Must be called within a tokio runtime.
    pub fn start(command: &[String], queue: MessageSender, options: StreamOptions) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::spawn("empty command"))?;

        info!("Spawning: {}", command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &options.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = &options.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| Error::from_spawn(program, e))?;

        let pid = child.id();
        info!("{} started with PID: {:?}", program, pid);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::spawn("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::spawn("stderr was not captured"))?;

        // Started goes in before any reader exists.
        let gate = OutputGate::new(queue);
        gate.started();

        let (kill_tx, kill_rx) = mpsc::unbounded_channel::<KillReason>();

        let readers = match options.strategy {
            ReadStrategy::Multiplexed => vec![tokio::spawn(Self::read_multiplexed(
                stdout,
                stderr,
                gate.clone(),
                kill_tx.clone(),
            ))],
            ReadStrategy::PerStream => vec![
                tokio::spawn(Self::read_stream(
                    stdout,
                    LineSource::Stdout,
                    gate.clone(),
                    kill_tx.clone(),
                )),
                tokio::spawn(Self::read_stream(
                    stderr,
                    LineSource::Stderr,
                    gate.clone(),
                    kill_tx.clone(),
                )),
            ],
        };

        let exited = Arc::new(AtomicBool::new(false));
        let finish_notify = Arc::new(Notify::new());

        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            readers,
            gate.clone(),
            Arc::clone(&exited),
            Arc::clone(&finish_notify),
            options.drain_timeout,
        ));

        Ok(Self {
            program: program.clone(),
            pid,
            gate,
            kill_tx: Some(kill_tx),
            exited,
            finish_notify,
        })
    }

    /// Read both pipes from one task, whichever is ready first.
    async fn read_multiplexed<O, E>(
        stdout: O,
        stderr: E,
        gate: OutputGate,
        kill_tx: mpsc::UnboundedSender<KillReason>,
    ) where
        O: AsyncRead + Unpin,
        E: AsyncRead + Unpin,
    {
        let mut out = LineReader::new(stdout);
        let mut err = LineReader::new(stderr);
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            let step = tokio::select! {
                result = out.next_line(), if out_open => {
                    (LineSource::Stdout, handle_read(result, LineSource::Stdout, &gate, &kill_tx))
                }
                result = err.next_line(), if err_open => {
                    (LineSource::Stderr, handle_read(result, LineSource::Stderr, &gate, &kill_tx))
                }
            };

            match step {
                (_, ReadStep::Continue) => {}
                (LineSource::Stdout, ReadStep::Eof) => out_open = false,
                (LineSource::Stderr, ReadStep::Eof) => err_open = false,
                (_, ReadStep::Stop) => break,
            }
        }

        debug!("multiplexed reader finished");
    }

    /// Read a single pipe until EOF.
    async fn read_stream<R>(
        pipe: R,
        source: LineSource,
        gate: OutputGate,
        kill_tx: mpsc::UnboundedSender<KillReason>,
    ) where
        R: AsyncRead + Unpin,
    {
        let mut reader = LineReader::new(pipe);
        loop {
            let result = reader.next_line().await;
            match handle_read(result, source, &gate, &kill_tx) {
                ReadStep::Continue => {}
                ReadStep::Eof | ReadStep::Stop => break,
            }
        }

        debug!("{:?} reader finished", source);
    }

    /// Background task: owns `child`, waits for it to exit, enqueues `Finished`.
    ///
    /// Two ways the task can end:
    /// 1. The child exits naturally. Buffered output is drained (bounded by
    ///    `drain_timeout`) before `Finished` is sent. A kill request that
    ///    arrives while draining cancels the readers and its reason becomes
    ///    the final status.
    /// 2. `kill_rx` fires. The child is killed and reaped, the readers are
    ///    cancelled, and `Finished` reports the kill reason.
    async fn wait_for_exit(
        mut child: Child,
        mut kill_rx: mpsc::UnboundedReceiver<KillReason>,
        readers: Vec<JoinHandle<()>>,
        gate: OutputGate,
        exited: Arc<AtomicBool>,
        finish_notify: Arc<Notify>,
        drain_timeout: Duration,
    ) {
        let status = tokio::select! {
            // Natural exit path
            result = child.wait() => {
                let code = match result {
                    Ok(status) => {
                        info!("Process exited with status: {:?}", status);
                        exit_code(status)
                    }
                    Err(e) => {
                        error!("Error waiting for process: {}", e);
                        STREAM_ERROR_EXIT_CODE
                    }
                };
                exited.store(true, Ordering::Release);
                match drain_readers(readers, &mut kill_rx, drain_timeout).await {
                    Some(reason) => {
                        gate.close_lines();
                        reason.status()
                    }
                    None => RunStatus::Exited(code),
                }
            }
            // Kill path: abort() or a failed pipe read
            Some(reason) = kill_rx.recv() => {
                info!("Kill requested ({:?}), force-killing process", reason);
                gate.close_lines();
                if let Err(e) = child.kill().await {
                    error!("Failed to kill process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => info!("Process killed, exit status: {:?}", status),
                    Err(e) => error!("Error waiting after kill: {}", e),
                }
                exited.store(true, Ordering::Release);
                for reader in &readers {
                    reader.abort();
                }
                reason.status()
            }
        };

        debug!("Enqueueing Finished({:?})", status);
        gate.finish(status);
        finish_notify.notify_waiters();
    }

    /// Forcibly terminate the child.
    ///
    /// After this returns no `Stdout`/`Stderr` message is enqueued, and exactly
    /// one `Finished` follows. It is `Finished(Aborted)` unless the run was
    /// already enqueueing its natural status. This also holds after the child
    /// has exited while its output is still being drained. Calling it again,
    /// or once `Finished` has been enqueued, does nothing.
    pub fn abort(&mut self) {
        if self.gate.is_finished() {
            debug!("abort() after {} finished, ignoring", self.program);
            return;
        }

        self.gate.close_lines();

        let Some(kill_tx) = self.kill_tx.take() else {
            return;
        };

        warn!("Aborting {} (PID {:?})", self.program, self.pid);
        // The wait task may be done with kill_rx already; the send is then ignored.
        let _ = kill_tx.send(KillReason::Abort);
    }

    /// Wait until `Finished` has been enqueued.
    pub async fn wait_finished(&self) {
        // Create the future before checking, so a notification between the
        // check and the await cannot be missed.
        let notified = self.finish_notify.notified();
        if self.is_finished() {
            return;
        }
        notified.await;
    }

    /// Check if the child has been reaped.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Logical complement of `has_exited()`.
    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// True once `Finished` has been enqueued
    pub fn is_finished(&self) -> bool {
        self.gate.is_finished()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Drop for StreamedProcess {
    fn drop(&mut self) {
        if self.is_running() && self.kill_tx.is_some() {
            warn!("StreamedProcess dropped while {} may still be running", self.program);
            self.abort();
        }
        // kill_on_drop(true) on the Child is the final safety net.
        debug!("StreamedProcess dropped");
    }
}

/// Wait for the readers to hit EOF, cancelling them after `timeout` or when a
/// kill request arrives. Returns the kill reason if there was one.
async fn drain_readers(
    readers: Vec<JoinHandle<()>>,
    kill_rx: &mut mpsc::UnboundedReceiver<KillReason>,
    timeout: Duration,
) -> Option<KillReason> {
    let handles: Vec<_> = readers.iter().map(JoinHandle::abort_handle).collect();
    let join_all = async {
        for reader in readers {
            let _ = reader.await;
        }
    };

    tokio::select! {
        result = tokio::time::timeout(timeout, join_all) => {
            if result.is_err() {
                warn!(
                    "Output pipes still open {:?} after exit, dropping remaining output",
                    timeout
                );
                for handle in &handles {
                    handle.abort();
                }
            }
            // A reader that failed on its last read has already asked for a kill.
            kill_rx.try_recv().ok()
        }
        Some(reason) = kill_rx.recv() => {
            info!("Kill requested ({:?}) while draining output", reason);
            for handle in &handles {
                handle.abort();
            }
            Some(reason)
        }
    }
}

/// Exit code, or `128 + signal` for a child killed by a signal on Unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipdeck_core::{message_queue, MessageReceiver, ABORTED_EXIT_CODE};

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    /// Collect messages until `Finished` or the deadline passes.
    async fn collect(rx: &mut MessageReceiver) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Some(msg)) => {
                    let done = msg.is_finished();
                    messages.push(msg);
                    if done {
                        break;
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
        messages
    }

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"  spaced  \n"), "  spaced  ");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn test_decode_line_lossy() {
        assert_eq!(decode_line(b"caf\xff\n"), "caf\u{fffd}");
    }

    #[tokio::test]
    async fn test_line_reader_splits_overlong_lines() {
        let mut reader = LineReader::with_max_len(&b"abcdefghij\nxy"[..], 4);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[tokio::test]
    async fn test_line_reader_newline_at_cap_ends_line() {
        let mut reader = LineReader::with_max_len(&b"abcd\nef\r\n"[..], 4);
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("abcd"));
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("ef"));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[test]
    fn test_read_error_requests_kill_and_stops_reader() {
        let (tx, mut rx) = message_queue();
        let gate = OutputGate::new(tx);
        let (kill_tx, mut kill_rx) = mpsc::unbounded_channel();

        let step = handle_read(
            Err(std::io::Error::new(std::io::ErrorKind::Other, "pipe broke")),
            LineSource::Stdout,
            &gate,
            &kill_tx,
        );

        assert!(matches!(step, ReadStep::Stop));
        assert_eq!(kill_rx.try_recv().ok(), Some(KillReason::ReadFailed));
        assert!(rx.try_recv().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_failure_finishes_with_stream_error_code() {
        let (tx, mut rx) = message_queue();
        let gate = OutputGate::new(tx);
        let child = Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        kill_tx.send(KillReason::ReadFailed).unwrap();

        let exited = Arc::new(AtomicBool::new(false));
        StreamedProcess::wait_for_exit(
            child,
            kill_rx,
            Vec::new(),
            gate.clone(),
            Arc::clone(&exited),
            Arc::new(Notify::new()),
            DEFAULT_DRAIN_TIMEOUT,
        )
        .await;

        assert!(exited.load(Ordering::Acquire));
        assert_eq!(
            rx.try_recv().unwrap(),
            StreamMessage::Finished(RunStatus::Exited(STREAM_ERROR_EXIT_CODE))
        );
        assert!(!gate.line(LineSource::Stdout, "late".into()));
    }

    #[tokio::test]
    async fn test_empty_command_is_spawn_error() {
        let (tx, mut rx) = message_queue();
        let result = StreamedProcess::start(&[], tx, StreamOptions::default());
        assert!(matches!(result, Err(Error::ProcessSpawn { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_executable_enqueues_nothing() {
        let (tx, mut rx) = message_queue();
        let command = vec!["pipdeck-definitely-not-a-real-binary".to_string()];
        let result = StreamedProcess::start(&command, tx, StreamOptions::default());
        assert!(matches!(result, Err(Error::ExecutableNotFound { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_started_is_enqueued_before_start_returns() {
        let (tx, mut rx) = message_queue();
        let _process = StreamedProcess::start(&sh("sleep 1"), tx, StreamOptions::default())
            .expect("sh must be available");
        assert_eq!(rx.try_recv().unwrap(), StreamMessage::Started);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_captured() {
        let (tx, mut rx) = message_queue();
        let _process =
            StreamedProcess::start(&sh("exit 42"), tx, StreamOptions::default()).unwrap();
        let messages = collect(&mut rx).await;
        assert_eq!(
            messages.last(),
            Some(&StreamMessage::Finished(RunStatus::Exited(42)))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_partial_last_line_is_delivered() {
        let (tx, mut rx) = message_queue();
        let _process =
            StreamedProcess::start(&sh("printf 'a\\nb'"), tx, StreamOptions::default()).unwrap();
        let messages = collect(&mut rx).await;
        assert_eq!(
            messages,
            vec![
                StreamMessage::Started,
                StreamMessage::Stdout("a".into()),
                StreamMessage::Stdout("b".into()),
                StreamMessage::Finished(RunStatus::Exited(0)),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_is_passed_to_child() {
        let (tx, mut rx) = message_queue();
        let _process = StreamedProcess::start(
            &sh("echo $PYTHONIOENCODING"),
            tx,
            StreamOptions::default(),
        )
        .unwrap();
        let messages = collect(&mut rx).await;
        assert!(messages.contains(&StreamMessage::Stdout("utf-8".into())));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abort_sets_has_exited() {
        let (tx, mut rx) = message_queue();
        let mut process =
            StreamedProcess::start(&sh("exec sleep 30"), tx, StreamOptions::default()).unwrap();
        assert!(process.is_running());

        process.abort();
        process.wait_finished().await;

        assert!(process.has_exited());
        assert!(process.is_finished());
        let messages = collect(&mut rx).await;
        let last = messages.last().unwrap();
        assert_eq!(last, &StreamMessage::Finished(RunStatus::Aborted));
        if let StreamMessage::Finished(status) = last {
            assert_eq!(status.code(), ABORTED_EXIT_CODE);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abort_after_natural_exit_is_noop() {
        let (tx, mut rx) = message_queue();
        let mut process =
            StreamedProcess::start(&sh("echo done"), tx, StreamOptions::default()).unwrap();
        process.wait_finished().await;

        process.abort();
        process.abort();

        let messages = collect(&mut rx).await;
        assert_eq!(
            messages,
            vec![
                StreamMessage::Started,
                StreamMessage::Stdout("done".into()),
                StreamMessage::Finished(RunStatus::Exited(0)),
            ]
        );
        assert!(rx.try_recv().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abort_while_draining_inherited_pipes() {
        // The shell exits at once; the background loop keeps writing to the
        // inherited stdout, so the run is still draining when abort() lands.
        let (tx, mut rx) = message_queue();
        let options = StreamOptions::default().with_drain_timeout(Duration::from_secs(5));
        let mut process = StreamedProcess::start(
            &sh("(while true; do echo tick; sleep 0.01; done) & exit 0"),
            tx,
            options,
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        process.abort();
        let aborted_at = std::time::Instant::now();

        while rx.try_recv().is_ok() {}
        let after = collect(&mut rx).await;

        assert!(
            after.iter().all(|m| m.as_line().is_none()),
            "line enqueued after abort returned: {:?}",
            after
        );
        assert_eq!(after, vec![StreamMessage::Finished(RunStatus::Aborted)]);
        assert!(aborted_at.elapsed() < Duration::from_secs(2));
        assert!(process.is_finished());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_drain_timeout_bounds_inherited_pipes() {
        // The background sleep inherits stdout and keeps it open past exit.
        let (tx, mut rx) = message_queue();
        let options = StreamOptions::default().with_drain_timeout(Duration::from_millis(200));
        let _process =
            StreamedProcess::start(&sh("echo first; sleep 10 & exit 0"), tx, options).unwrap();

        let start = std::time::Instant::now();
        let messages = collect(&mut rx).await;
        assert!(start.elapsed() < Duration::from_secs(4));
        assert_eq!(messages.first(), Some(&StreamMessage::Started));
        assert!(messages.contains(&StreamMessage::Stdout("first".into())));
        assert_eq!(
            messages.last(),
            Some(&StreamMessage::Finished(RunStatus::Exited(0)))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_exit_maps_to_128_plus_signal() {
        let (tx, mut rx) = message_queue();
        let _process =
            StreamedProcess::start(&sh("kill -9 $$"), tx, StreamOptions::default()).unwrap();
        let messages = collect(&mut rx).await;
        assert_eq!(
            messages.last(),
            Some(&StreamMessage::Finished(RunStatus::Exited(137)))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropping_running_process_finishes_run() {
        let (tx, mut rx) = message_queue();
        let process =
            StreamedProcess::start(&sh("exec sleep 30"), tx, StreamOptions::default()).unwrap();
        drop(process);

        let messages = collect(&mut rx).await;
        assert_eq!(
            messages.last(),
            Some(&StreamMessage::Finished(RunStatus::Aborted))
        );
    }
}
