//! Report request builder.
//!
//! Turns a dream into one `GenerateRequest`: a system instruction describing
//! the report structure and tone, a user prompt embedding the dream, and the
//! JSON schema the provider must answer with.

use minijinja::{Environment, context};
use serde_json::{Value, json};
use weaver_core::dream::{DreamRecord, PerspectiveSet};
use weaver_core::model::{GenerateRequest, Turn};
use weaver_core::report::AnalysisReport;
use weaver_core::{Result, WeaverError};

const REPORT_SYSTEM_TEMPLATE: &str = r#"You are a leading dream analyst who combines Jungian psychology, social anthropology and career counseling experience.
Produce one "multi-dimensional dream report" for the user. Do not branch into dialogue; deliver the complete, in-depth analysis in a single answer.

The report must contain these modules:
1. Core synthesis: the overall atmosphere of the dream and its underlying motives.
2. Multi-perspective analysis: an in-depth analysis from each perspective the user selected ({{ perspectives | join(", ") }}), and from no other perspective. Write one entry in "sections" per perspective.
3. Reality guidance: concrete insights and advice for daily life, work and relationships.
4. Self-adjustment: ways to regulate the emotions of the dream, or concrete actions (for example meditation, journaling, an honest conversation).

Tone: professional, wise and deeply humane.
If the dream is a nightmare or stress dream: add a "healing transformation" module that explains the strength hidden behind the fear and offers gentle reassurance. Set "isNightmare" to true and put that module in "healingMessage". Otherwise set "isNightmare" to false and leave "healingMessage" out.

Output format: return a strict JSON object only."#;

const REPORT_PROMPT_TEMPLATE: &str = r#"[Dream]: "{{ dream }}"
[Key elements]: {{ tags | join(", ") }}
[Selected perspectives]: {{ perspectives | join(", ") }}

Write the in-depth report from this. Life and work advice must be specific, and self-adjustment tips must be actionable."#;

/// Builds report requests and validates report responses.
pub struct ReportRequestBuilder {
    env: Environment<'static>,
}

impl ReportRequestBuilder {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    pub fn build_for(&self, record: &DreamRecord) -> Result<GenerateRequest> {
        self.build(&record.content, &record.perspectives, &record.tag_labels())
    }

    pub fn build(
        &self,
        dream_content: &str,
        perspectives: &PerspectiveSet,
        tag_labels: &[String],
    ) -> Result<GenerateRequest> {
        let perspective_names = perspectives.display_names();
        let system_instruction = self
            .env
            .render_str(
                REPORT_SYSTEM_TEMPLATE,
                context! { perspectives => &perspective_names },
            )
            .map_err(|err| WeaverError::internal(format!("report instruction template: {err}")))?;
        let prompt = self
            .env
            .render_str(
                REPORT_PROMPT_TEMPLATE,
                context! {
                    dream => dream_content,
                    tags => tag_labels,
                    perspectives => &perspective_names,
                },
            )
            .map_err(|err| WeaverError::internal(format!("report prompt template: {err}")))?;

        Ok(GenerateRequest {
            system_instruction: Some(system_instruction),
            contents: vec![Turn::user(prompt)],
            response_schema: Some(report_schema()),
        })
    }

    /// Validates a provider payload against the report schema.
    pub fn parse_response(&self, payload: &str) -> Result<AnalysisReport> {
        AnalysisReport::from_model_json(payload)
    }
}

impl Default for ReportRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Output schema declared to the provider.
pub fn report_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "mainAnalysis": {
                "type": "STRING",
                "description": "Core in-depth synthesis of the dream."
            },
            "sections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {
                            "type": "STRING",
                            "description": "Section title, e.g. 'Projections of the unconscious'."
                        },
                        "content": {
                            "type": "STRING",
                            "description": "The analysis from this perspective."
                        }
                    },
                    "required": ["title", "content"]
                }
            },
            "lifeWorkAdvice": {
                "type": "STRING",
                "description": "Concrete advice for life and work."
            },
            "adjustmentTips": {
                "type": "STRING",
                "description": "Self-adjustment and mental well-being suggestions."
            },
            "isNightmare": {
                "type": "BOOLEAN",
                "description": "Whether the dream is judged to be a stress dream or nightmare."
            },
            "healingMessage": {
                "type": "STRING",
                "description": "For nightmares only: words of transformation and healing."
            }
        },
        "required": ["mainAnalysis", "sections", "lifeWorkAdvice", "adjustmentTips", "isNightmare"]
    })
}
