// src/grader/validate.rs
use thiserror::Error;

use super::{SubmissionResult, SubmissionStatus, ERROR_RUNNING_TESTS};

/// Ways a submission can have the wrong shape to be graded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("First code line must be `def` or `class` declaration")]
    MissingDeclaration,

    #[error(
        "All lines in a function or class definition should be indented at least once. It looks like you have a line that has no indentation."
    )]
    UnindentedLine {
        /// Zero-based index of the offending line.
        line: usize,
    },
}

impl ValidationError {
    /// The fixed fail result shown to the learner.
    pub fn to_result(&self) -> SubmissionResult {
        SubmissionResult {
            status: SubmissionStatus::Fail,
            header: ERROR_RUNNING_TESTS.to_string(),
            details: Some(self.to_string()),
            code: None,
            start_line: None,
        }
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn declares_function_or_class(line: &str) -> bool {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == "def" || word == "class")
}

/// Index of the next non-blank line with no leading indentation, starting at
/// `start`. Returns `lines.len()` when every remaining line is indented.
fn find_next_unindented_line(lines: &[&str], start: usize) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, line)| !is_blank(line) && !line.starts_with([' ', '\t']))
        .map(|(idx, _)| idx)
        .unwrap_or(lines.len())
}

/// Checks that the source is one `def`/`class` block whose body is indented.
pub fn validate_source(source: &str) -> Result<(), ValidationError> {
    let lines: Vec<&str> = source.split('\n').collect();

    let declaration = lines
        .iter()
        .position(|line| !is_blank(line))
        .ok_or(ValidationError::MissingDeclaration)?;
    if !declares_function_or_class(lines[declaration]) {
        return Err(ValidationError::MissingDeclaration);
    }

    let unindented = find_next_unindented_line(&lines, declaration + 1);
    if unindented != lines.len() {
        return Err(ValidationError::UnindentedLine { line: unindented });
    }

    Ok(())
}
