//! Report request building and the report session lifecycle.

mod request;
mod session;

pub use request::{ReportRequestBuilder, report_schema};
pub use session::{ReportSession, ReportState};
