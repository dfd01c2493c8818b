//! End-to-end tests for streamed child output
//!
//! These spawn real `sh`/`echo`/`sleep` processes, so they only run on Unix.

#![cfg(unix)]

use std::time::Duration;

use pipdeck_app::{OutputLog, PollOutcome};
use pipdeck_core::{
    message_queue, Error, LineSource, MessageReceiver, RunStatus, StreamMessage,
    ABORTED_EXIT_CODE,
};
use pipdeck_daemon::{ReadStrategy, StreamOptions, StreamedProcess};

const STRATEGIES: [ReadStrategy; 2] = [ReadStrategy::Multiplexed, ReadStrategy::PerStream];

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn options(strategy: ReadStrategy) -> StreamOptions {
    StreamOptions::default().with_strategy(strategy)
}

/// Collect messages until `Finished` or the deadline passes
async fn collect(rx: &mut MessageReceiver) -> Vec<StreamMessage> {
    let mut messages = Vec::new();
    while let Ok(Some(msg)) = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
        let done = msg.is_finished();
        messages.push(msg);
        if done {
            break;
        }
    }
    messages
}

fn lines_from(messages: &[StreamMessage], source: LineSource) -> Vec<&str> {
    messages
        .iter()
        .filter_map(|m| m.as_line())
        .filter(|(s, _)| *s == source)
        .map(|(_, text)| text)
        .collect()
}

fn finished_count(messages: &[StreamMessage]) -> usize {
    messages.iter().filter(|m| m.is_finished()).count()
}

#[tokio::test]
async fn echo_produces_started_line_finished() {
    for strategy in STRATEGIES {
        let (tx, mut rx) = message_queue();
        let _process =
            StreamedProcess::start(&["echo".into(), "hello".into()], tx, options(strategy))
                .unwrap();

        assert_eq!(
            collect(&mut rx).await,
            vec![
                StreamMessage::Started,
                StreamMessage::Stdout("hello".into()),
                StreamMessage::Finished(RunStatus::Exited(0)),
            ],
            "strategy {:?}",
            strategy
        );
    }
}

#[tokio::test]
async fn same_stream_lines_keep_order() {
    for strategy in STRATEGIES {
        let (tx, mut rx) = message_queue();
        let _process =
            StreamedProcess::start(&sh("printf 'line1\\nline2\\n'"), tx, options(strategy))
                .unwrap();

        assert_eq!(
            collect(&mut rx).await,
            vec![
                StreamMessage::Started,
                StreamMessage::Stdout("line1".into()),
                StreamMessage::Stdout("line2".into()),
                StreamMessage::Finished(RunStatus::Exited(0)),
            ],
            "strategy {:?}",
            strategy
        );
    }
}

#[tokio::test]
async fn nonexistent_executable_fails_with_empty_queue() {
    for strategy in STRATEGIES {
        let (tx, mut rx) = message_queue();
        let result = StreamedProcess::start(
            &["pipdeck-no-such-executable".into()],
            tx,
            options(strategy),
        );

        let err = result.err().expect("spawn must fail");
        assert!(err.is_spawn_error());
        assert!(matches!(err, Error::ExecutableNotFound { .. }));
        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn abort_stops_lines_and_finishes_once() {
    for strategy in STRATEGIES {
        let (tx, mut rx) = message_queue();
        let mut process = StreamedProcess::start(
            &sh("while true; do echo tick; sleep 0.01; done"),
            tx,
            options(strategy),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        process.abort();

        // Everything enqueued before abort returned
        let mut before = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            before.push(msg);
        }

        let after = collect(&mut rx).await;
        assert!(
            after.iter().all(|m| m.as_line().is_none()),
            "strategy {:?}: line enqueued after abort returned: {:?}",
            strategy,
            after
        );

        let all: Vec<_> = before.into_iter().chain(after).collect();
        assert_eq!(all.first(), Some(&StreamMessage::Started));
        assert_eq!(finished_count(&all), 1);
        assert_eq!(all.last(), Some(&StreamMessage::Finished(RunStatus::Aborted)));
        assert_eq!(RunStatus::Aborted.code(), ABORTED_EXIT_CODE);
    }
}

#[tokio::test]
async fn per_stream_counts_and_order_are_preserved() {
    let script = "i=1; while [ $i -le 200 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done";
    for strategy in STRATEGIES {
        let (tx, mut rx) = message_queue();
        let _process = StreamedProcess::start(&sh(script), tx, options(strategy)).unwrap();
        let messages = collect(&mut rx).await;

        let expected_out: Vec<String> = (1..=200).map(|i| format!("out{}", i)).collect();
        let expected_err: Vec<String> = (1..=200).map(|i| format!("err{}", i)).collect();
        assert_eq!(lines_from(&messages, LineSource::Stdout), expected_out);
        assert_eq!(lines_from(&messages, LineSource::Stderr), expected_err);

        assert_eq!(messages.first(), Some(&StreamMessage::Started));
        assert_eq!(
            messages.last(),
            Some(&StreamMessage::Finished(RunStatus::Exited(0)))
        );
        assert_eq!(finished_count(&messages), 1);
    }
}

#[tokio::test]
async fn silent_command_yields_only_started_and_finished() {
    for strategy in STRATEGIES {
        let (tx, mut rx) = message_queue();
        let _process = StreamedProcess::start(&["true".into()], tx, options(strategy)).unwrap();

        assert_eq!(
            collect(&mut rx).await,
            vec![
                StreamMessage::Started,
                StreamMessage::Finished(RunStatus::Exited(0)),
            ]
        );
    }
}

#[tokio::test]
async fn repeated_abort_is_idempotent() {
    let (tx, mut rx) = message_queue();
    let mut process =
        StreamedProcess::start(&sh("exec sleep 30"), tx, StreamOptions::default()).unwrap();

    process.abort();
    process.abort();
    process.wait_finished().await;
    process.abort();

    let messages = collect(&mut rx).await;
    assert_eq!(
        messages,
        vec![
            StreamMessage::Started,
            StreamMessage::Finished(RunStatus::Aborted)
        ]
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn polling_consumer_drains_a_real_run() {
    let (tx, mut rx) = message_queue();
    let _process = StreamedProcess::start(
        &sh("echo one; sleep 0.05; echo two >&2; sleep 0.05; echo three; exit 4"),
        tx,
        StreamOptions::default(),
    )
    .unwrap();

    let mut log = OutputLog::new(100);
    let mut seen = Vec::new();
    let outcome = log
        .drive(&mut rx, Duration::from_millis(10), |line| {
            seen.push(line.text.clone())
        })
        .await;

    assert_eq!(outcome, PollOutcome::Finished(RunStatus::Exited(4)));
    assert!(log.started());
    assert_eq!(seen, vec!["one", "two", "three"]);
    assert_eq!(log.stderr_count(), 1);
    assert_eq!(log.status(), Some(RunStatus::Exited(4)));
}

#[tokio::test]
async fn polling_never_blocks_while_child_is_quiet() {
    let (tx, mut rx) = message_queue();
    let mut process =
        StreamedProcess::start(&sh("exec sleep 30"), tx, StreamOptions::default()).unwrap();

    let mut log = OutputLog::default();
    let start = std::time::Instant::now();
    assert_eq!(log.poll(&mut rx), PollOutcome::Pending);
    assert_eq!(log.poll(&mut rx), PollOutcome::Pending);
    assert!(start.elapsed() < Duration::from_secs(1));

    process.abort();
    process.wait_finished().await;
    assert_eq!(log.poll(&mut rx), PollOutcome::Finished(RunStatus::Aborted));
}
