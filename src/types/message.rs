//! Message payloads and read results
//!
//! A mailbox record is one JSON object per line: the caller's payload fields
//! merged with `from` and `timestamp` stamped by the bus at append time.
//! Records are loose maps rather than a closed enum — the bus routes them,
//! it does not interpret them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message body: arbitrary JSON object fields chosen by the sender
pub type Payload = serde_json::Map<String, Value>;

/// Result of a ranged cursor read over one log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPage {
    /// Parsed records in append order; malformed lines are absent here but
    /// still counted in `next_cursor`
    pub records: Vec<Value>,
    /// Raw-line offset to resume from; replaying from it never re-delivers
    /// a line, valid or not
    pub next_cursor: u64,
}

impl ReadPage {
    /// An empty page that leaves the cursor where it was
    #[must_use]
    pub fn empty(cursor: u64) -> Self {
        Self {
            records: Vec::new(),
            next_cursor: cursor,
        }
    }
}

/// Result of a blocking poll for the next command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// A record was present at the polled cursor position
    Command {
        /// The parsed record
        record: Value,
        /// Cursor to resume from (polled position + 1)
        next_cursor: u64,
    },
    /// The timeout elapsed with no record available
    ///
    /// Carries the original cursor unchanged: a timed-out poll is always
    /// safely retriable, not an error.
    Timeout {
        /// The caller's cursor, unchanged
        next_cursor: u64,
    },
}
