//! Ordered, render-ready blocks of a report.
//!
//! Front ends walk [`AnalysisReport::blocks`] instead of reading fields
//! directly, so the conditional healing block is decided in one place.

use serde::Serialize;

use super::model::AnalysisReport;

/// Closing line shown beneath every report.
pub const REPORT_DISCLAIMER: &str = "This interpretation is for reference only. \
The one who understands your dream best is always you.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    Synthesis,
    /// 1-based position among the perspective sections.
    Perspective { ordinal: usize },
    LifeWorkAdvice,
    AdjustmentTips,
    Healing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportBlock {
    pub kind: BlockKind,
    /// Small caption above the heading, e.g. `SECTION 01`.
    pub eyebrow: String,
    pub heading: String,
    pub body: String,
}

impl ReportBlock {
    fn new(kind: BlockKind, eyebrow: impl Into<String>, heading: impl Into<String>, body: &str) -> Self {
        Self {
            kind,
            eyebrow: eyebrow.into(),
            heading: heading.into(),
            body: body.to_string(),
        }
    }
}

impl AnalysisReport {
    pub fn blocks(&self) -> Vec<ReportBlock> {
        let mut blocks = Vec::with_capacity(self.sections.len() + 4);
        blocks.push(ReportBlock::new(
            BlockKind::Synthesis,
            "CORE SYNTHESIS",
            "Core Synthesis",
            &self.main_analysis,
        ));
        for (idx, section) in self.sections.iter().enumerate() {
            let ordinal = idx + 1;
            blocks.push(ReportBlock::new(
                BlockKind::Perspective { ordinal },
                format!("SECTION {ordinal:02}"),
                section.title.clone(),
                &section.content,
            ));
        }
        blocks.push(ReportBlock::new(
            BlockKind::LifeWorkAdvice,
            "REALITY GUIDANCE",
            "Life & Work Guidance",
            &self.life_work_advice,
        ));
        blocks.push(ReportBlock::new(
            BlockKind::AdjustmentTips,
            "SELF-ADJUSTMENT TIPS",
            "A Prescription for the Heart",
            &self.adjustment_tips,
        ));
        if let Some(healing) = self.healing_text() {
            blocks.push(ReportBlock::new(
                BlockKind::Healing,
                "HEALING TRANSFORMATION",
                "Light in the Shadows",
                healing,
            ));
        }
        blocks
    }

    pub fn has_healing_block(&self) -> bool {
        self.healing_text().is_some()
    }
}
