//! Report session: `Idle -> Requesting -> Ready | Failed`.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use weaver_core::config::SessionTimeouts;
use weaver_core::dream::DreamRecord;
use weaver_core::error::REPORT_FAILURE_MESSAGE;
use weaver_core::model::{ModelClient, ModelError};
use weaver_core::report::AnalysisReport;
use weaver_core::{Result, WeaverError};

use super::request::ReportRequestBuilder;
use crate::chat::{ChatSession, build_chat_preamble};

/// Lifecycle of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportState {
    Idle,
    Requesting,
    Ready(Arc<AnalysisReport>),
    /// Carries the user-facing message.
    Failed(String),
}

impl ReportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportState::Ready(_) | ReportState::Failed(_))
    }
}

/// Moves an abandoned request to `Failed`.
///
/// Held for the whole of `ReportSession::request`. The state still reads
/// `Requesting` on drop only when that future was dropped mid-flight.
struct PendingRequest<'a> {
    state: &'a watch::Sender<ReportState>,
    cancel: &'a CancellationToken,
    dream_id: &'a str,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let abandoned = self.state.send_if_modified(|state| {
            if *state == ReportState::Requesting {
                *state = ReportState::Failed(REPORT_FAILURE_MESSAGE.to_string());
                true
            } else {
                false
            }
        });
        if abandoned {
            tracing::warn!(dream_id = self.dream_id, "report request abandoned before it settled");
        }
    }
}

/// Generation of the report for one dream record.
///
/// The request is issued at most once. Repeated or concurrent calls to
/// [`ReportSession::run`] share the first call's outcome. On success the
/// session creates its [`ChatSession`].
pub struct ReportSession {
    record: DreamRecord,
    client: Arc<dyn ModelClient>,
    builder: Arc<ReportRequestBuilder>,
    timeouts: SessionTimeouts,
    state: watch::Sender<ReportState>,
    chat: OnceLock<Arc<ChatSession>>,
    cancel: CancellationToken,
}

impl ReportSession {
    pub fn new(
        record: DreamRecord,
        client: Arc<dyn ModelClient>,
        builder: Arc<ReportRequestBuilder>,
        timeouts: SessionTimeouts,
    ) -> Self {
        let (state, _) = watch::channel(ReportState::Idle);
        Self {
            record,
            client,
            builder,
            timeouts,
            state,
            chat: OnceLock::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn record(&self) -> &DreamRecord {
        &self.record
    }

    pub fn state(&self) -> ReportState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<ReportState> {
        self.state.subscribe()
    }

    /// The follow-up chat, available once the report is ready.
    pub fn chat(&self) -> Option<Arc<ChatSession>> {
        self.chat.get().cloned()
    }

    /// Drops any in-flight response and closes the chat.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Generates the report, or returns the outcome of the earlier attempt.
    ///
    /// Dropping the future of the call that issued the request fails the
    /// session, so other callers never wait on a request nobody drives.
    pub async fn run(&self) -> Result<Arc<AnalysisReport>> {
        let mut started = false;
        self.state.send_if_modified(|state| {
            if *state == ReportState::Idle {
                *state = ReportState::Requesting;
                started = true;
                true
            } else {
                false
            }
        });

        if started {
            self.request().await
        } else {
            self.settled().await
        }
    }

    /// Waits until the session is `Ready` or `Failed`.
    pub async fn settled(&self) -> Result<Arc<AnalysisReport>> {
        let mut rx = self.state.subscribe();
        let state = tokio::select! {
            _ = self.cancel.cancelled() => return Err(WeaverError::Cancelled),
            state = rx.wait_for(ReportState::is_terminal) => {
                state.map_err(|_| WeaverError::Cancelled)?.clone()
            }
        };
        match state {
            ReportState::Ready(report) => Ok(report),
            ReportState::Failed(message) => Err(WeaverError::ReportGeneration {
                message,
                detail: "report session already failed".to_string(),
            }),
            ReportState::Idle | ReportState::Requesting => Err(WeaverError::internal(
                "report session settled in a non-terminal state",
            )),
        }
    }

    async fn request(&self) -> Result<Arc<AnalysisReport>> {
        let started = Instant::now();
        let dream_id = self.record.id.as_str();
        let _pending = PendingRequest {
            state: &self.state,
            cancel: &self.cancel,
            dream_id,
        };
        tracing::info!(
            dream_id,
            model = self.client.model_name(),
            content_len = self.record.content.len(),
            tags = self.record.tags.len(),
            perspectives = self.record.perspectives.len(),
            "requesting dream report"
        );

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => None,
            outcome = self.generate() => Some(outcome),
        };
        let outcome = match outcome {
            Some(outcome) if !self.cancel.is_cancelled() => outcome,
            _ => {
                tracing::info!(dream_id, "session reset, discarding report response");
                return Err(WeaverError::Cancelled);
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok((report, chat)) => {
                let _ = self.chat.set(chat);
                self.state.send_replace(ReportState::Ready(report.clone()));
                tracing::info!(
                    dream_id,
                    elapsed_ms,
                    sections = report.sections.len(),
                    is_nightmare = report.is_nightmare,
                    healing = report.has_healing_block(),
                    "dream report ready"
                );
                Ok(report)
            }
            Err(err) => {
                let err = into_report_error(err);
                if let WeaverError::ReportGeneration { detail, .. } = &err {
                    tracing::warn!(dream_id, elapsed_ms, detail = %detail, "dream report failed");
                }
                self.state.send_replace(ReportState::Failed(err.user_message()));
                Err(err)
            }
        }
    }

    async fn generate(&self) -> Result<(Arc<AnalysisReport>, Arc<ChatSession>)> {
        let request = self.builder.build_for(&self.record)?;
        let payload = tokio::time::timeout(self.timeouts.report, self.client.generate(request))
            .await
            .unwrap_or(Err(ModelError::Timeout(self.timeouts.report)))?;
        let report = Arc::new(self.builder.parse_response(&payload)?);

        let preamble = build_chat_preamble(&self.record, &report)?;
        let chat = Arc::new(ChatSession::new(
            Arc::clone(&self.client),
            preamble,
            self.timeouts.chat,
            self.cancel.child_token(),
        ));
        Ok((report, chat))
    }
}

fn into_report_error(err: WeaverError) -> WeaverError {
    match err {
        err @ WeaverError::ReportGeneration { .. } => err,
        other => WeaverError::report_generation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedModelClient, record_with_tags, report_json, sample_report};
    use std::time::Duration;

    fn session_with(client: Arc<ScriptedModelClient>) -> ReportSession {
        ReportSession::new(
            record_with_tags("I was falling endlessly", &[]),
            client,
            Arc::new(ReportRequestBuilder::new()),
            SessionTimeouts::default(),
        )
    }

    #[tokio::test]
    async fn success_moves_to_ready_and_opens_chat() {
        let report = sample_report(true);
        let client = Arc::new(ScriptedModelClient::with_replies([report_json(&report)]));
        let session = session_with(client.clone());
        assert_eq!(session.state(), ReportState::Idle);
        assert!(session.chat().is_none());

        let ready = session.run().await.unwrap();
        assert_eq!(*ready, report);
        assert_eq!(session.state(), ReportState::Ready(ready.clone()));

        let chat = session.chat().expect("chat is created with the report");
        assert!(chat.preamble().contains("I was falling endlessly"));
        assert!(chat.preamble().contains(&report.main_analysis));
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn run_is_not_repeated_once_settled() {
        let client = Arc::new(ScriptedModelClient::with_replies([report_json(&sample_report(false))]));
        let session = session_with(client.clone());

        let first = session.run().await.unwrap();
        let second = session.run().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_runs_share_one_request() {
        let client = Arc::new(
            ScriptedModelClient::with_replies([report_json(&sample_report(false))]).gated(),
        );
        let session = Arc::new(session_with(client.clone()));

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.run().await }
        });
        client.wait_for_call().await;
        assert_eq!(session.state(), ReportState::Requesting);

        let second = tokio::spawn({
            let session = session.clone();
            async move { session.run().await }
        });
        client.release();

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_fails_with_message() {
        let client = Arc::new(ScriptedModelClient::with_replies(["not json at all"]));
        let session = session_with(client);

        let err = session.run().await.unwrap_err();
        assert!(err.is_report_generation());
        assert_eq!(
            session.state(),
            ReportState::Failed(REPORT_FAILURE_MESSAGE.to_string())
        );
        assert!(session.chat().is_none());

        // a failed session is not retried
        assert!(session.run().await.unwrap_err().is_report_generation());
    }

    #[tokio::test]
    async fn provider_error_fails_session() {
        let client = Arc::new(ScriptedModelClient::with_results(vec![Err(ModelError::Http {
            status: 500,
            message: "INTERNAL".into(),
            is_retryable: true,
            retry_after: None,
        })]));
        let session = session_with(client);

        match session.run().await.unwrap_err() {
            WeaverError::ReportGeneration { message, detail } => {
                assert_eq!(message, REPORT_FAILURE_MESSAGE);
                assert!(detail.contains("500"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_request_times_out() {
        let client = Arc::new(ScriptedModelClient::echo().with_delay(Duration::from_secs(600)));
        let session = ReportSession::new(
            record_with_tags("a long corridor", &[]),
            client,
            Arc::new(ReportRequestBuilder::new()),
            SessionTimeouts {
                report: Duration::from_secs(2),
                chat: Duration::from_secs(2),
            },
        );

        let err = session.run().await.unwrap_err();
        match err {
            WeaverError::ReportGeneration { detail, .. } => assert!(detail.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(session.state(), ReportState::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_run_fails_instead_of_hanging() {
        let client = Arc::new(
            ScriptedModelClient::with_replies([report_json(&sample_report(false))])
                .with_delay(Duration::from_secs(10)),
        );
        let session = session_with(client.clone());

        let abandoned = tokio::time::timeout(Duration::from_secs(1), session.run()).await;
        assert!(abandoned.is_err());
        assert_eq!(
            session.state(),
            ReportState::Failed(REPORT_FAILURE_MESSAGE.to_string())
        );

        let again = tokio::time::timeout(Duration::from_secs(3600), session.run())
            .await
            .expect("settled session answers at once");
        assert!(again.unwrap_err().is_report_generation());
        assert_eq!(client.call_count(), 1);
        assert!(session.chat().is_none());
    }

    #[tokio::test]
    async fn cancelled_session_discards_late_response() {
        let client = Arc::new(
            ScriptedModelClient::with_replies([report_json(&sample_report(false))]).gated(),
        );
        let session = Arc::new(session_with(client.clone()));

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.run().await }
        });
        client.wait_for_call().await;
        session.cancel();
        client.release();

        assert_eq!(running.await.unwrap(), Err(WeaverError::Cancelled));
        assert_eq!(session.state(), ReportState::Requesting);
        assert!(session.chat().is_none());
        assert_eq!(session.settled().await, Err(WeaverError::Cancelled));
    }
}
