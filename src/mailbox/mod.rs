//! The session message bus: cursor reads, blocking polls, routed writes
//!
//! - [`cursor`] - stateless ranged reads over one JSONL log
//! - [`wait`] - blocking poll-with-timeout built on the cursor reader
//! - [`bus`] - multi-target routing and fan-out

pub mod bus;
pub mod cursor;
pub mod wait;

pub use bus::MailboxBus;
pub use cursor::read_records;
pub use wait::{PollConfig, wait_for_record};
