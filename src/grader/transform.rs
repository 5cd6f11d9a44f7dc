// src/grader/transform.rs
use super::validate::validate_source;
use super::{SubmissionResult, SubmissionStatus};

pub const RUNNING_TESTS: &str = "Running tests...";

/// Statements appended after the learner's code: redirect stdout so the
/// transcript can be returned, then run the doctests verbosely.
pub const HARNESS_LINES: [&str; 5] = [
    "import sys",
    "import io",
    "sys.stdout = io.StringIO()",
    "import doctest",
    "doctest.testmod(verbose=True)",
];

/// Appends the harness after the source. Existing lines are untouched, so
/// interpreter line numbers still point into the original submission.
pub fn append_harness(source: &str) -> String {
    let mut lines: Vec<&str> = source.split('\n').collect();
    lines.extend(HARNESS_LINES);
    lines.join("\n")
}

/// Validates the submission and, if it has the right shape, returns the
/// code ready to hand to a worker.
pub fn prepare_code(source: &str) -> SubmissionResult {
    if let Err(err) = validate_source(source) {
        log::debug!("Rejected submission: {}", err);
        return err.to_result();
    }

    SubmissionResult {
        status: SubmissionStatus::Success,
        header: RUNNING_TESTS.to_string(),
        details: None,
        code: Some(append_harness(source)),
        start_line: Some(0),
    }
}
