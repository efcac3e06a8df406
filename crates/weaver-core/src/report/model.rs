//! Structured interpretive report.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaverError};

/// One perspective section of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
}

/// The report produced once per dream.
///
/// Field names follow the provider schema (`mainAnalysis`, `isNightmare`, ...).
/// Every field except `healing_message` is required on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub main_analysis: String,
    pub sections: Vec<ReportSection>,
    pub life_work_advice: String,
    pub adjustment_tips: String,
    pub is_nightmare: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing_message: Option<String>,
}

impl AnalysisReport {
    /// Parses and validates a model payload.
    ///
    /// Fails closed: any missing or mistyped required field yields
    /// `ReportGeneration`, never a partially filled report.
    pub fn from_model_json(payload: &str) -> Result<Self> {
        let body = strip_code_fence(payload.trim());
        if body.is_empty() {
            return Err(WeaverError::report_generation("model returned an empty payload"));
        }
        serde_json::from_str::<AnalysisReport>(body)
            .map_err(|err| WeaverError::report_generation(format!("schema mismatch: {err}")))
    }

    /// Healing text, present only for nightmares with a non-blank message.
    pub fn healing_text(&self) -> Option<&str> {
        if !self.is_nightmare {
            return None;
        }
        self.healing_message
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Models occasionally wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // the info string runs to the end of the fence line
    let rest = match rest.split_once('\n') {
        Some((info, body)) if !info.contains('{') => body,
        _ if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) => &rest[4..],
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "mainAnalysis": "Falling mirrors a loss of footing.",
        "sections": [{"title": "The unconscious", "content": "Control is slipping."}],
        "lifeWorkAdvice": "Name one thing you can let go of at work.",
        "adjustmentTips": "Try a grounding breath before sleep.",
        "isNightmare": true,
        "healingMessage": "The fall is also a release."
    }"#;

    #[test]
    fn parses_complete_payload() {
        let report = AnalysisReport::from_model_json(VALID).unwrap();
        assert_eq!(report.sections.len(), 1);
        assert!(report.is_nightmare);
        assert_eq!(report.healing_text(), Some("The fall is also a release."));
    }

    #[test]
    fn missing_required_field_fails_closed() {
        let payload = r#"{
            "mainAnalysis": "x",
            "sections": [],
            "adjustmentTips": "y",
            "isNightmare": false
        }"#;
        let err = AnalysisReport::from_model_json(payload).unwrap_err();
        match err {
            WeaverError::ReportGeneration { message, detail } => {
                assert!(!message.is_empty());
                assert!(detail.contains("lifeWorkAdvice"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mistyped_fields_are_rejected() {
        let payload = r#"{
            "mainAnalysis": "x",
            "sections": [{"title": "t"}],
            "lifeWorkAdvice": "a",
            "adjustmentTips": "b",
            "isNightmare": "no"
        }"#;
        assert!(AnalysisReport::from_model_json(payload).unwrap_err().is_report_generation());
    }

    #[test]
    fn non_json_is_report_generation_error() {
        let err = AnalysisReport::from_model_json("The dream is too deep to read.").unwrap_err();
        assert!(err.is_report_generation());
        assert!(AnalysisReport::from_model_json("  ").unwrap_err().is_report_generation());
    }

    #[test]
    fn fenced_json_is_accepted() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(AnalysisReport::from_model_json(&fenced).is_ok());
        for fenced in [
            format!("```JSON\n{VALID}\n```"),
            format!("``` Json \n{VALID}\n```"),
            format!("```\n{VALID}\n```"),
            format!("```JSON{VALID}```"),
        ] {
            assert!(AnalysisReport::from_model_json(&fenced).is_ok(), "{fenced}");
        }
    }

    #[test]
    fn healing_ignored_unless_nightmare() {
        let mut report = AnalysisReport::from_model_json(VALID).unwrap();
        report.is_nightmare = false;
        assert_eq!(report.healing_text(), None);

        report.is_nightmare = true;
        report.healing_message = Some("   ".into());
        assert_eq!(report.healing_text(), None);
    }
}
