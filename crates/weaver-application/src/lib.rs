//! Dreamweaver application layer.
//!
//! Sessions that drive the model through [`weaver_core::model::ModelClient`]:
//! the report lifecycle, the follow-up chat, and the flow between the entry
//! form and the report view.

pub mod chat;
pub mod flow;
pub mod report;

pub use chat::{ChatSession, IgnoreReason, SendOutcome};
pub use flow::{DreamFlow, View};
pub use report::{ReportRequestBuilder, ReportSession, ReportState};

#[cfg(test)]
mod test_helpers;
