//! Follow-up chat bound to a finished report.

mod preamble;
mod session;

pub use preamble::build_chat_preamble;
pub use session::{ChatSession, IgnoreReason, SendOutcome};
