// src/grader/mod.rs
//! Doctest grading: shape validation, harness injection and parsing of the
//! interpreter's free-text output into reports.

use serde::{Deserialize, Serialize};

pub mod report;
pub mod transform;
pub mod validate;

pub use report::{process_test_error, process_test_results};
pub use transform::prepare_code;
pub use validate::{validate_source, ValidationError};

/// Header used for every rejected submission.
pub const ERROR_RUNNING_TESTS: &str = "Error running tests";

/// Status of a freshly prepared submission.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Success,
    Pass,
    Fail,
}

/// Output of validation + transform. `code` and `start_line` are only set
/// when the submission is ready to run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    pub header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<i64>,
}

impl SubmissionResult {
    /// Converts a non-runnable result into the report shown to the learner.
    /// Returns `None` for a `Success` result, which has nothing to report yet.
    pub fn into_report(self) -> Option<ParsedReport> {
        let status = match self.status {
            SubmissionStatus::Success => return None,
            SubmissionStatus::Pass => ReportStatus::Pass,
            SubmissionStatus::Fail => ReportStatus::Fail,
        };
        Some(ParsedReport {
            status,
            header: self.header,
            details: self.details.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Pass => write!(f, "pass"),
            ReportStatus::Fail => write!(f, "fail"),
        }
    }
}

/// The final, UI-facing outcome of a run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    pub status: ReportStatus,
    pub header: String,
    #[serde(default)]
    pub details: String,
}

impl ParsedReport {
    pub fn fail(header: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Fail,
            header: header.into(),
            details: details.into(),
        }
    }
}
