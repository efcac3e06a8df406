//! Follow-up conversation scoped to one report.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use weaver_core::WeaverError;
use weaver_core::chat::{CHAT_FAILURE_APOLOGY, ChatMessage, EMPTY_REPLY_FALLBACK};
use weaver_core::model::{GenerateRequest, ModelClient, ModelError, Turn};

/// Why a message was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Nothing left after trimming.
    Empty,
    /// A turn is already outstanding. The input is dropped, not queued.
    Busy,
    /// The session was reset.
    Closed,
}

/// Result of [`ChatSession::send_user_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The model answered; carries the appended model message.
    Replied(ChatMessage),
    /// The turn failed; carries the appended apology.
    Apologized(ChatMessage),
    /// No mutation happened and no request was issued.
    Ignored(IgnoreReason),
    /// The session was reset while the request was in flight; the reply was dropped.
    Discarded,
}

#[derive(Default)]
struct ChatState {
    /// Everything shown to the user, apologies included.
    messages: Vec<ChatMessage>,
    /// Completed exchanges as the provider saw them.
    history: Vec<Turn>,
    is_typing: bool,
}

fn lock(state: &Mutex<ChatState>) -> MutexGuard<'_, ChatState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks one outstanding turn.
///
/// Dropped without [`TurnGuard::finish`], the turn was abandoned by its
/// caller: `is_typing` is cleared and, unless the session was reset, the
/// apology closes the exchange.
struct TurnGuard<'a> {
    state: &'a Mutex<ChatState>,
    cancel: &'a CancellationToken,
    turn: usize,
}

impl<'a> TurnGuard<'a> {
    /// Ends the turn and hands back the locked state, so the outcome is
    /// appended before another turn can start.
    fn finish(self) -> MutexGuard<'a, ChatState> {
        let mut state = lock(self.state);
        state.is_typing = false;
        std::mem::forget(self);
        state
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.is_typing = false;
        if !self.cancel.is_cancelled() {
            tracing::warn!(turn = self.turn, "chat turn abandoned before the reply arrived");
            state.messages.push(ChatMessage::model(CHAT_FAILURE_APOLOGY));
        }
    }
}

/// A stateful follow-up conversation.
///
/// The transcript is append-only and at most one turn is in flight; the
/// `is_typing` flag is checked and set under the same lock as the append.
pub struct ChatSession {
    client: Arc<dyn ModelClient>,
    preamble: String,
    timeout: Duration,
    cancel: CancellationToken,
    state: Mutex<ChatState>,
}

impl ChatSession {
    pub fn new(
        client: Arc<dyn ModelClient>,
        preamble: String,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            preamble,
            timeout,
            cancel,
            state: Mutex::new(ChatState::default()),
        }
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Snapshot of the transcript.
    pub fn messages(&self) -> Vec<ChatMessage> {
        lock(&self.state).messages.clone()
    }

    pub fn is_typing(&self) -> bool {
        lock(&self.state).is_typing
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sends one user message and waits for the reply.
    ///
    /// The user message is appended before the request goes out. Failures
    /// are absorbed as an apology message; the session stays usable, also
    /// when the returned future is dropped before the reply arrives.
    pub async fn send_user_message(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::Empty);
        }
        if self.cancel.is_cancelled() {
            return SendOutcome::Ignored(IgnoreReason::Closed);
        }

        let (request, turn) = {
            let mut state = lock(&self.state);
            if state.is_typing {
                tracing::debug!("chat turn outstanding, dropping new input");
                return SendOutcome::Ignored(IgnoreReason::Busy);
            }
            state.messages.push(ChatMessage::user(text));
            state.is_typing = true;

            let mut contents = state.history.clone();
            contents.push(Turn::user(text));
            let request = GenerateRequest {
                system_instruction: Some(self.preamble.clone()),
                contents,
                response_schema: None,
            };
            (request, state.history.len() / 2 + 1)
        };

        let guard = TurnGuard {
            state: &self.state,
            cancel: &self.cancel,
            turn,
        };

        tracing::debug!(turn, input_len = text.len(), "sending chat turn");
        let result = tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = tokio::time::timeout(self.timeout, self.client.generate(request)) => Some(result),
        };

        let mut state = guard.finish();

        let result = match result {
            Some(result) if !self.cancel.is_cancelled() => result,
            _ => {
                tracing::debug!(turn, "chat session reset, discarding reply");
                return SendOutcome::Discarded;
            }
        };

        match result.unwrap_or(Err(ModelError::Timeout(self.timeout))) {
            Ok(reply) => {
                let reply = if reply.trim().is_empty() {
                    tracing::warn!(turn, "model returned an empty chat reply");
                    EMPTY_REPLY_FALLBACK.to_string()
                } else {
                    reply
                };
                let message = ChatMessage::model(reply);
                state.history.push(Turn::user(text));
                state.history.push(Turn::model(message.text.clone()));
                state.messages.push(message.clone());
                SendOutcome::Replied(message)
            }
            Err(err) => {
                let retryable = err.is_retryable();
                let err = WeaverError::ChatTurn(err.to_string());
                tracing::warn!(turn, retryable, error = %err, "chat turn failed");
                let message = ChatMessage::model(CHAT_FAILURE_APOLOGY);
                state.messages.push(message.clone());
                SendOutcome::Apologized(message)
            }
        }
    }
}
