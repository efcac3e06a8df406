//! Interpretive report model and its render order.

mod model;
mod view;

pub use model::{AnalysisReport, ReportSection};
pub use view::{BlockKind, REPORT_DISCLAIMER, ReportBlock};
