//! Blocking poll-with-timeout over one mailbox log
//!
//! Wraps the cursor reader in a bounded sleep-and-retry loop, turning
//! "check once" into "block until a command is available or the timeout
//! elapses". This is the primitive a spawned agent's consumption loop is
//! built on.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

use super::cursor::read_records;
use crate::types::WaitOutcome;

/// Polling behavior for [`wait_for_record`]
///
/// Explicit constructor input rather than ambient environment state, so the
/// core stays testable with millisecond-scale values.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between polls when no record is available
    pub poll_interval: Duration,
    /// Timeout applied when the caller does not supply one
    pub default_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            default_timeout: Duration::from_millis(1_800_000),
        }
    }
}

/// Block until the record at `cursor` exists in `path`, or `timeout` elapses.
///
/// Reads exactly one record per call: this primitive answers "is there a
/// *next* command", not "give me everything new", because it drives a
/// long-lived external consumption loop where exactly one authoritative
/// command must be handed back at a time.
///
/// A malformed line at the cursor position is consumed (cursor advances by
/// one) and the next position is re-checked immediately without sleeping —
/// corrupt input must not add artificial latency. An absent record or a
/// missing log sleeps `config.poll_interval` and retries. On timeout the
/// *original* cursor is returned unchanged so the caller can retry the same
/// position; a timeout is not lossy and not an error.
pub async fn wait_for_record(
    path: &Path,
    cursor: u64,
    timeout: Duration,
    config: &PollConfig,
) -> WaitOutcome {
    let start = Instant::now();
    let mut position = cursor;

    while start.elapsed() < timeout {
        let page = read_records(path, position, Some(1)).await;

        if let Some(record) = page.records.into_iter().next() {
            return WaitOutcome::Command {
                record,
                next_cursor: page.next_cursor,
            };
        }

        if page.next_cursor > position {
            // Malformed line at this position: it is consumed, re-check the
            // next position immediately.
            log::error!(
                "wait_for_record: skipping malformed JSONL line at cursor {position} in {}",
                path.display()
            );
            position = page.next_cursor;
            continue;
        }

        tokio::time::sleep(config.poll_interval).await;
    }

    WaitOutcome::Timeout {
        next_cursor: cursor,
    }
}
