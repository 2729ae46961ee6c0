//! Session persistence: directory layout and agent records
//!
//! - [`layout`] - path arithmetic for the session subtree
//! - [`session`] - the durable `SessionStore`

pub mod layout;
pub mod session;

pub use layout::SessionLayout;
pub use session::{NewAgentRecord, SessionStore};
