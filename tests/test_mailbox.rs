//! Integration tests for the mailbox bus: cursor reads, polling, routing
//!
//! Everything here runs against a throwaway workspace directory — no tmux,
//! no backend. Agent directories are created through the session store the
//! same way the manager would.

use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;

use agentmux::mailbox::{MailboxBus, PollConfig, read_records, wait_for_record};
use agentmux::store::{NewAgentRecord, SessionLayout, SessionStore};
use agentmux::types::{Agent, Entity, Payload, SessionId, Target, WaitOutcome};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn layout(root: &Path, session: &str) -> SessionLayout {
    SessionLayout::new(root, SessionId::new(session))
}

async fn spawn_record(store: &SessionStore, name: &str) -> Agent {
    store
        .create_agent_record(NewAgentRecord {
            name: name.to_string(),
            role: "worker".to_string(),
            pane_ref: "$1:@1:%9".to_string(),
            metadata: serde_json::Map::new(),
        })
        .await
        .unwrap()
}

fn message(text: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("type".to_string(), Value::String("note".to_string()));
    payload.insert("text".to_string(), Value::String(text.to_string()));
    payload
}

async fn log_content(path: &Path) -> String {
    tokio::fs::read_to_string(path).await.unwrap_or_default()
}

fn fast_poll() -> PollConfig {
    PollConfig {
        poll_interval: Duration::from_millis(25),
        default_timeout: Duration::from_millis(500),
    }
}

// ============================================================================
// CursorReader
// ============================================================================

#[tokio::test]
async fn missing_log_reads_as_empty_with_cursor_unchanged() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let page = read_records(&dir.path().join("nope.jsonl"), 5, None).await;
    assert!(page.records.is_empty());
    assert_eq!(page.next_cursor, 5);
}

#[tokio::test]
async fn malformed_line_is_dropped_but_still_consumed() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("inbox.jsonl");
    tokio::fs::write(&log, "BAD\n{\"type\":\"task\",\"taskId\":\"x\"}\n")
        .await
        .unwrap();

    let page = read_records(&log, 0, None).await;
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0]["taskId"], "x");
    assert_eq!(page.next_cursor, 2);
}

#[tokio::test]
async fn limit_windows_resume_without_overlap() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-limit");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let agent = spawn_record(&store, "a1").await;

    for i in 0..3 {
        bus.send(
            &Entity::Master,
            message(&format!("m{i}")),
            &Target::One(agent.id.clone()),
        )
        .await
        .unwrap();
    }

    let first = read_records(&lay.inbox(&agent.id), 0, Some(2)).await;
    assert_eq!(first.records.len(), 2);
    assert_eq!(first.next_cursor, 2);

    let rest = read_records(&lay.inbox(&agent.id), first.next_cursor, None).await;
    assert_eq!(rest.records.len(), 1);
    assert_eq!(rest.records[0]["text"], "m2");
    assert_eq!(rest.next_cursor, 3);
}

#[tokio::test]
async fn cursor_at_or_past_end_is_a_noop() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("inbox.jsonl");
    tokio::fs::write(&log, "{\"a\":1}\n{\"b\":2}\n").await.unwrap();

    let at_end = read_records(&log, 2, None).await;
    assert!(at_end.records.is_empty());
    assert_eq!(at_end.next_cursor, 2);

    let past_end = read_records(&log, 10, Some(4)).await;
    assert!(past_end.records.is_empty());
    assert_eq!(past_end.next_cursor, 10);
}

#[tokio::test]
async fn resuming_from_next_cursor_visits_every_record_exactly_once() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("inbox.jsonl");
    tokio::fs::write(
        &log,
        "{\"n\":0}\nGARBAGE\n{\"n\":1}\n{\"n\":2}\nALSO BAD\n{\"n\":3}\n",
    )
    .await
    .unwrap();

    let mut cursor = 0;
    let mut seen = Vec::new();
    loop {
        let page = read_records(&log, cursor, Some(1)).await;
        if page.next_cursor == cursor {
            break;
        }
        seen.extend(page.records);
        cursor = page.next_cursor;
    }

    let numbers: Vec<i64> = seen.iter().map(|r| r["n"].as_i64().unwrap()).collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
    assert_eq!(cursor, 6);
}

// ============================================================================
// PollWaiter
// ============================================================================

#[tokio::test]
async fn wait_on_missing_log_times_out_with_cursor_unchanged() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let timeout = Duration::from_millis(200);

    let start = Instant::now();
    let outcome = wait_for_record(&dir.path().join("nope.jsonl"), 3, timeout, &fast_poll()).await;
    assert!(start.elapsed() >= timeout);
    assert!(matches!(outcome, WaitOutcome::Timeout { next_cursor: 3 }));
}

#[tokio::test]
async fn wait_returns_existing_record_immediately() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("inbox.jsonl");
    tokio::fs::write(&log, "{\"type\":\"task\",\"taskId\":\"t1\"}\n")
        .await
        .unwrap();

    let outcome = wait_for_record(&log, 0, Duration::from_secs(5), &fast_poll()).await;
    match outcome {
        WaitOutcome::Command {
            record,
            next_cursor,
        } => {
            assert_eq!(record["taskId"], "t1");
            assert_eq!(next_cursor, 1);
        }
        WaitOutcome::Timeout { .. } => panic!("expected a command"),
    }
}

#[tokio::test]
async fn wait_skips_malformed_lines_without_sleeping() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("inbox.jsonl");
    tokio::fs::write(&log, "BAD\nWORSE\n{\"type\":\"task\",\"taskId\":\"t2\"}\n")
        .await
        .unwrap();

    // The interval exceeds the timeout: if the waiter slept even once on the
    // malformed lines it could not reach the valid record in time.
    let poll = PollConfig {
        poll_interval: Duration::from_secs(60),
        default_timeout: Duration::from_millis(500),
    };
    let outcome = wait_for_record(&log, 0, Duration::from_millis(500), &poll).await;
    match outcome {
        WaitOutcome::Command {
            record,
            next_cursor,
        } => {
            assert_eq!(record["taskId"], "t2");
            assert_eq!(next_cursor, 3);
        }
        WaitOutcome::Timeout { .. } => panic!("malformed lines must not add latency"),
    }
}

#[tokio::test]
async fn wait_timeout_after_malformed_lines_returns_original_cursor() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("inbox.jsonl");
    tokio::fs::write(&log, "NOT JSON\n").await.unwrap();

    let outcome =
        wait_for_record(&log, 0, Duration::from_millis(150), &fast_poll()).await;
    // The malformed line was consumed during the wait, but a timeout always
    // hands back the cursor the caller passed in.
    assert!(matches!(outcome, WaitOutcome::Timeout { next_cursor: 0 }));
}

#[tokio::test]
async fn wait_picks_up_record_appended_mid_poll() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("inbox.jsonl");
    tokio::fs::write(&log, "").await.unwrap();

    let writer_log = log.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::fs::write(&writer_log, "{\"type\":\"task\",\"taskId\":\"late\"}\n")
            .await
            .unwrap();
    });

    let outcome = wait_for_record(&log, 0, Duration::from_secs(5), &fast_poll()).await;
    writer.await.unwrap();
    match outcome {
        WaitOutcome::Command { record, .. } => assert_eq!(record["taskId"], "late"),
        WaitOutcome::Timeout { .. } => panic!("expected the late record"),
    }
}

// ============================================================================
// MailboxBus routing
// ============================================================================

#[tokio::test]
async fn master_target_reaches_only_the_orchestrator_log() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-master");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let a = spawn_record(&store, "a").await;
    let b = spawn_record(&store, "b").await;

    bus.send(&Entity::Agent(a.id.clone()), message("to master"), &Target::Master)
        .await
        .unwrap();

    assert!(log_content(&lay.master_inbox()).await.contains("to master"));
    assert!(log_content(&lay.inbox(&a.id)).await.is_empty());
    assert!(log_content(&lay.inbox(&b.id)).await.is_empty());
}

#[tokio::test]
async fn broadcast_reaches_everyone_except_the_sender() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-all");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let a = spawn_record(&store, "a").await;
    let b = spawn_record(&store, "b").await;
    let c = spawn_record(&store, "c").await;

    bus.send(&Entity::Agent(a.id.clone()), message("fanout"), &Target::All)
        .await
        .unwrap();

    assert!(log_content(&lay.master_inbox()).await.contains("fanout"));
    assert!(log_content(&lay.inbox(&a.id)).await.is_empty());
    assert!(log_content(&lay.inbox(&b.id)).await.contains("fanout"));
    assert!(log_content(&lay.inbox(&c.id)).await.contains("fanout"));
}

#[tokio::test]
async fn broadcast_from_master_skips_the_master_log() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-all-master");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let a = spawn_record(&store, "a").await;

    bus.send(&Entity::Master, message("orders"), &Target::All)
        .await
        .unwrap();

    assert!(!log_content(&lay.master_inbox()).await.contains("orders"));
    assert!(log_content(&lay.inbox(&a.id)).await.contains("orders"));
}

#[tokio::test]
async fn explicit_target_list_reaches_exactly_the_named_inboxes() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-many");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let a = spawn_record(&store, "a").await;
    let b = spawn_record(&store, "b").await;
    let c = spawn_record(&store, "c").await;

    bus.send(
        &Entity::Master,
        message("pair"),
        &Target::Many(vec![a.id.clone(), b.id.clone()]),
    )
    .await
    .unwrap();

    assert!(log_content(&lay.inbox(&a.id)).await.contains("pair"));
    assert!(log_content(&lay.inbox(&b.id)).await.contains("pair"));
    assert!(log_content(&lay.inbox(&c.id)).await.is_empty());
    assert!(!log_content(&lay.master_inbox()).await.contains("pair"));
}

#[tokio::test]
async fn sender_is_excluded_even_from_an_explicit_target_list() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-self");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let a = spawn_record(&store, "a").await;
    let b = spawn_record(&store, "b").await;

    bus.send(
        &Entity::Agent(a.id.clone()),
        message("no echo"),
        &Target::Many(vec![a.id.clone(), b.id.clone()]),
    )
    .await
    .unwrap();

    assert!(log_content(&lay.inbox(&a.id)).await.is_empty());
    assert!(log_content(&lay.inbox(&b.id)).await.contains("no echo"));
}

#[tokio::test]
async fn records_are_stamped_with_sender_and_timestamp() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-stamp");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let a = spawn_record(&store, "a").await;

    bus.send(&Entity::Master, message("hi"), &Target::One(a.id.clone()))
        .await
        .unwrap();

    let page = read_records(&lay.inbox(&a.id), 0, None).await;
    assert_eq!(page.records.len(), 1);
    let record = &page.records[0];
    assert_eq!(record["from"], "master");
    assert!(record["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(record["text"], "hi");
}

#[tokio::test]
async fn enqueued_task_is_the_next_command() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay = layout(dir.path(), "s-task");
    let store = SessionStore::new(lay.clone());
    let bus = MailboxBus::new(lay.clone());
    let a = spawn_record(&store, "a").await;

    let task_id = bus
        .enqueue_task(&a.id, json!({ "instruction": "do it" }))
        .await
        .unwrap();

    let outcome =
        wait_for_record(&lay.inbox(&a.id), 0, Duration::from_secs(2), &fast_poll()).await;
    match outcome {
        WaitOutcome::Command {
            record,
            next_cursor,
        } => {
            assert_eq!(record["type"], "task");
            assert_eq!(record["taskId"], task_id);
            assert_eq!(record["payload"]["instruction"], "do it");
            assert_eq!(next_cursor, 1);
        }
        WaitOutcome::Timeout { .. } => panic!("expected the enqueued task"),
    }
}

#[tokio::test]
async fn broadcast_events_stay_inside_their_session() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let lay1 = layout(dir.path(), "session-one");
    let lay2 = layout(dir.path(), "session-two");
    let store1 = SessionStore::new(lay1.clone());
    let bus1 = MailboxBus::new(lay1.clone());
    let a = spawn_record(&store1, "reporter").await;

    bus1.emit_event(&a.id, message("hello session one"))
        .await
        .unwrap();

    let own = log_content(&lay1.broadcast_log()).await;
    assert!(own.contains("hello session one"));
    assert!(own.contains(a.id.as_str()));
    assert!(log_content(&lay2.broadcast_log()).await.is_empty());
}
