//! Test doubles shared by the session tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use weaver_core::dream::{DreamDraft, DreamRecord};
use weaver_core::model::{GenerateRequest, ModelClient, ModelError};
use weaver_core::report::{AnalysisReport, ReportSection};

/// A `ModelClient` that replays queued results.
///
/// With an empty queue it echoes the newest user text as `echo: <text>`.
/// A gate holds every call until [`ScriptedModelClient::release`] is called.
pub struct ScriptedModelClient {
    results: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    gate: Option<Arc<Notify>>,
    started: Arc<Notify>,
    delay: Option<Duration>,
}

impl ScriptedModelClient {
    pub fn echo() -> Self {
        Self::with_results(Vec::new())
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn with_results(results: Vec<Result<String, ModelError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            started: Arc::new(Notify::new()),
            delay: None,
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Lets one held call through.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Resolves once a call has been received.
    pub async fn wait_for_call(&self) {
        self.started.notified().await;
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ModelError> {
        let echo = request
            .latest_user_text()
            .map(|text| format!("echo: {text}"))
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(echo))
    }
}

pub fn record_with_tags(content: &str, tags: &[&str]) -> DreamRecord {
    let mut draft = DreamDraft::new();
    draft.set_content(content);
    for tag in tags {
        draft.add_tag(tag).unwrap();
    }
    draft.submit().unwrap()
}

pub fn sample_report(is_nightmare: bool) -> AnalysisReport {
    AnalysisReport {
        main_analysis: "The fall speaks of losing control.".into(),
        sections: vec![ReportSection {
            title: "Compensation of the unconscious".into(),
            content: "Your psyche is asking for rest.".into(),
        }],
        life_work_advice: "Delegate one task this week.".into(),
        adjustment_tips: "Write the dream down each morning.".into(),
        is_nightmare,
        healing_message: is_nightmare.then(|| "Falling is also learning to land.".to_string()),
    }
}

pub fn report_json(report: &AnalysisReport) -> String {
    serde_json::to_string(report).unwrap()
}
