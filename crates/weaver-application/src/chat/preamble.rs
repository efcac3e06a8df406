//! System preamble bound to a chat session.

use minijinja::{Environment, context};
use weaver_core::dream::DreamRecord;
use weaver_core::report::AnalysisReport;
use weaver_core::{Result, WeaverError};

const CHAT_PREAMBLE_TEMPLATE: &str = r#"You are a gentle dream analyst with a deep understanding of the human heart.
The user has just recorded a dream and received an in-depth analysis report.

Dream content: {{ dream }}
Key images: {{ tags | join(", ") }}
Report core: {{ main_analysis }}

Your responsibilities:
1. Answer the user's follow-up questions about this dream in a warm, wise tone, like a trusted friend.
2. Guide the user to observe their own inner feelings instead of simply handing out conclusions.
3. Stay empathetic, especially when the user expresses unease or confusion.
4. Make your answers illuminating, helping the user integrate this experience into their sense of self."#;

/// Renders the preamble from the dream and its report.
pub fn build_chat_preamble(record: &DreamRecord, report: &AnalysisReport) -> Result<String> {
    Environment::new()
        .render_str(
            CHAT_PREAMBLE_TEMPLATE,
            context! {
                dream => &record.content,
                tags => record.tag_labels(),
                main_analysis => &report.main_analysis,
            },
        )
        .map_err(|err| WeaverError::internal(format!("chat preamble template: {err}")))
}
