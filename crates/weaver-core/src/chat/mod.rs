//! Follow-up conversation types.

mod message;

pub use message::{ChatMessage, ChatRole};

/// Reply used when the model answers with no text.
pub const EMPTY_REPLY_FALLBACK: &str =
    "I seem to have lost my way deep in the dream. Could you say that again?";

/// Reply appended when a chat turn fails.
pub const CHAT_FAILURE_APOLOGY: &str =
    "I'm sorry, my connection to the dream was interrupted for a moment.";

/// Prompt shown while the transcript is still empty.
pub const CHAT_EMPTY_STATE_PROMPT: &str =
    "Is there anything else about this dream you'd like to share or ask?";
