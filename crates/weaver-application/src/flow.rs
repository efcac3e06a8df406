//! Top-level navigation between the entry form and the report view.

use std::sync::Arc;

use weaver_core::Result;
use weaver_core::config::SessionTimeouts;
use weaver_core::dream::DreamDraft;
use weaver_core::model::ModelClient;

use crate::report::{ReportRequestBuilder, ReportSession};

/// What the shell is currently showing.
pub enum View {
    EntryForm(DreamDraft),
    Report(Arc<ReportSession>),
}

/// Owns the active view and the single live report session.
///
/// Leaving the report view cancels its session, so a late report or chat
/// reply can never land in the next dream's view.
pub struct DreamFlow {
    client: Arc<dyn ModelClient>,
    builder: Arc<ReportRequestBuilder>,
    timeouts: SessionTimeouts,
    view: View,
}

impl DreamFlow {
    pub fn new(client: Arc<dyn ModelClient>, timeouts: SessionTimeouts) -> Self {
        Self {
            client,
            builder: Arc::new(ReportRequestBuilder::new()),
            timeouts,
            view: View::EntryForm(DreamDraft::new()),
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// The draft being edited, if the entry form is showing.
    pub fn draft_mut(&mut self) -> Option<&mut DreamDraft> {
        match &mut self.view {
            View::EntryForm(draft) => Some(draft),
            View::Report(_) => None,
        }
    }

    pub fn report_session(&self) -> Option<Arc<ReportSession>> {
        match &self.view {
            View::Report(session) => Some(Arc::clone(session)),
            View::EntryForm(_) => None,
        }
    }

    /// Submits the draft and starts generating its report in the background.
    ///
    /// Blank content is rejected and the draft stays as it is. Submitting
    /// from the report view returns the current session.
    pub fn submit(&mut self) -> Result<Arc<ReportSession>> {
        let draft = match &self.view {
            View::EntryForm(draft) => draft,
            View::Report(session) => return Ok(Arc::clone(session)),
        };
        let record = draft.submit()?;
        tracing::info!(dream_id = %record.id, "dream submitted");

        let session = Arc::new(ReportSession::new(
            record,
            Arc::clone(&self.client),
            Arc::clone(&self.builder),
            self.timeouts,
        ));
        self.view = View::Report(Arc::clone(&session));

        let running = Arc::clone(&session);
        tokio::spawn(async move {
            // the outcome is observed through the session state
            let _ = running.run().await;
        });
        Ok(session)
    }

    /// Returns to an empty entry form, abandoning the current report and chat.
    pub fn reset(&mut self) {
        if let View::Report(session) = &self.view {
            session.cancel();
            tracing::info!(dream_id = %session.record().id, "report session reset");
        }
        self.view = View::EntryForm(DreamDraft::new());
    }
}
