// src/grader/report.rs
//! Turns interpreter output into reports. Everything here scrapes the text
//! format printed by `doctest` and by Python tracebacks; a change in either
//! format breaks these functions, not the callers.

use regex::Regex;
use std::sync::LazyLock;

use super::{ParsedReport, ReportStatus};
use crate::sandbox::{ExecutionError, TIMEOUT_MESSAGE};

static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\spassed\sand\s(\d+)\sfailed.").unwrap());

// Python 3.13+ drops the "and 0 failed" part when everything passed.
static ALL_PASSED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d+) passed\.$").unwrap());

static NO_TESTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+ items? had no tests:").unwrap());

static EXEC_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"File "<exec>", line (\d+)"#).unwrap());

const TEST_SECTION_MARKER: &str = "File \"__main__\"";
const TRYING_MARKER: &str = "Trying:";
const FAILED_EXAMPLE: &str = "Failed example:";
const FAILED_TEST: &str = "\n❌ Failed test:";

pub const SYNTAX_ERROR: &str = "Syntax error";
pub const INFINITE_LOOP: &str = "Infinite loop";
pub const UNEXPECTED_ERROR: &str = "Unexpected error occurred";
pub const NO_ERROR_REPORT: &str = "No error report found.";
pub const INFINITE_LOOP_DETAILS: &str = "Your code did not finish executing within 60 seconds. Please look to see if you accidentally coded an infinite loop.";

fn parse_count(text: &str) -> Option<u64> {
    text.parse().ok()
}

/// Finds the `(passed, failed)` counts in a doctest summary.
///
/// The first match whose counts parse and whose total fits in a `u64` wins.
/// Verbose transcripts echo expected output, so a submission can plant a
/// summary-looking line with absurd counts ahead of the real one.
fn summary_counts(output: &str) -> Option<(u64, u64)> {
    let counted = |passed: &str, failed: u64| -> Option<(u64, u64)> {
        let passed = parse_count(passed)?;
        passed.checked_add(failed).map(|_| (passed, failed))
    };

    SUMMARY_RE
        .captures_iter(output)
        .find_map(|caps| parse_count(&caps[2]).and_then(|failed| counted(&caps[1], failed)))
        .or_else(|| {
            ALL_PASSED_RE
                .captures_iter(output)
                .find_map(|caps| counted(&caps[1], 0))
        })
}

/// Keeps only the per-test sections of a verbose doctest transcript.
///
/// A section starts at a `File "__main__"` line and ends before the next
/// `Trying:` line or the "items had no tests" trailer. Neither the start
/// line nor the stop line is kept.
pub fn cleanup_transcript(output: &str) -> String {
    let mut kept = Vec::new();
    let mut in_section = false;

    for line in output.split('\n') {
        if line.starts_with(TEST_SECTION_MARKER) {
            in_section = true;
            continue;
        } else if line.starts_with(TRYING_MARKER) || NO_TESTS_RE.is_match(line) {
            in_section = false;
        }
        if in_section {
            kept.push(line.replace(FAILED_EXAMPLE, FAILED_TEST));
        }
    }

    kept.join("\n").trim().to_string()
}

/// Builds a report from the captured doctest transcript. Returns `None` when
/// the output holds no test summary.
pub fn process_test_results(output: &str) -> Option<ParsedReport> {
    let (passed, failed) = summary_counts(output)?;
    let total = passed.checked_add(failed)?;

    Some(ParsedReport {
        status: if passed == total {
            ReportStatus::Pass
        } else {
            ReportStatus::Fail
        },
        header: format!("{} of {} tests passed", passed, total),
        details: cleanup_transcript(output),
    })
}

/// Pulls the syntax error excerpt out of a traceback, with the line number
/// mapped back onto the learner's source.
fn extract_error(traceback: &str, start_line: i64) -> String {
    let lines: Vec<&str> = traceback.split('\n').collect();
    let mut end = None;
    let mut start = None;

    for (idx, line) in lines.iter().enumerate().rev() {
        if line.starts_with("SyntaxError") || line.starts_with("IndentationError") {
            end = Some(idx);
        } else if let Some(caps) = EXEC_LINE_RE.captures(line) {
            if let Ok(raw) = caps[1].parse::<i64>() {
                start = Some((idx, raw - (start_line - 1)));
                break;
            }
        }
    }

    match (start, end) {
        (Some((start, line_number)), Some(end)) if end > start => format!(
            "Error at line {}:\n{}",
            line_number,
            lines[start + 1..=end].join("\n")
        ),
        _ => NO_ERROR_REPORT.to_string(),
    }
}

/// Builds a report from an error raised while running the submission.
pub fn process_test_error(error: &ExecutionError, start_line: i64) -> ParsedReport {
    if error.message.starts_with("Traceback") {
        ParsedReport::fail(SYNTAX_ERROR, extract_error(&error.message, start_line))
    } else if error.message == TIMEOUT_MESSAGE {
        ParsedReport::fail(INFINITE_LOOP, INFINITE_LOOP_DETAILS)
    } else {
        ParsedReport::fail(UNEXPECTED_ERROR, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAILING_TRANSCRIPT: &str = "Trying:
    lesser_num(45, 10)
Expecting:
    10
**********************************************************************
File \"__main__\", line 4, in __main__.lesser_num
Failed example:
    lesser_num(45, 10)
Expected:
    10
Got:
    45
Trying:
    lesser_num(20, 20)
Expecting:
    20
ok
1 items had no tests:
    __main__
**********************************************************************
1 items had failures:
   1 of   2 in __main__.lesser_num
2 tests in 2 items.
1 passed and 1 failed.
***Test Failed*** 1 failures.";

    fn error(message: &str) -> ExecutionError {
        ExecutionError {
            message: message.to_string(),
            filename: None,
            lineno: None,
        }
    }

    #[test]
    fn test_all_passing_summary() {
        let output = "Trying:\n    foo()\nExpecting:\n    1\nok\nFile \"__main__\", line 3, in foo\n5 passed and 0 failed.\nTest passed.";
        let report = process_test_results(output).unwrap();
        assert_eq!(report.status, ReportStatus::Pass);
        assert_eq!(report.header, "5 of 5 tests passed");
    }

    #[test]
    fn test_failing_summary() {
        let report = process_test_results("3 passed and 2 failed.").unwrap();
        assert_eq!(report.status, ReportStatus::Fail);
        assert_eq!(report.header, "3 of 5 tests passed");
    }

    #[test]
    fn test_short_summary_from_newer_doctest() {
        let report = process_test_results("3 tests in 2 items.\n3 passed.\nTest passed.").unwrap();
        assert_eq!(report.status, ReportStatus::Pass);
        assert_eq!(report.header, "3 of 3 tests passed");
    }

    #[test]
    fn test_no_summary_is_none() {
        assert_eq!(process_test_results("hello world"), None);
        assert_eq!(process_test_results(""), None);
    }

    #[test]
    fn test_transcript_cleanup() {
        let report = process_test_results(FAILING_TRANSCRIPT).unwrap();
        assert_eq!(report.header, "1 of 2 tests passed");
        assert_eq!(
            report.details,
            "❌ Failed test:\n    lesser_num(45, 10)\nExpected:\n    10\nGot:\n    45"
        );
    }

    #[test]
    fn test_cleanup_drops_markers() {
        let cleaned = cleanup_transcript(FAILING_TRANSCRIPT);
        for line in cleaned.lines() {
            assert!(!line.starts_with(TEST_SECTION_MARKER), "{:?}", line);
            assert!(!line.starts_with(TRYING_MARKER), "{:?}", line);
            assert!(!NO_TESTS_RE.is_match(line), "{:?}", line);
            assert!(!line.contains(FAILED_EXAMPLE), "{:?}", line);
        }
        // Nothing left to strip on a second pass through the parser.
        let report = process_test_results(&format!("{}\n1 passed and 1 failed.", cleaned)).unwrap();
        assert_eq!(report.header, "1 of 2 tests passed");
    }

    #[test]
    fn test_echoed_summary_near_u64_max_is_skipped() {
        let output = "Trying:
    print('18446744073709551615 passed and 1 failed.')
Expecting:
    18446744073709551615 passed and 1 failed.
ok
2 tests in 2 items.
2 passed and 0 failed.
Test passed.";
        let report = process_test_results(output).unwrap();
        assert_eq!(report.status, ReportStatus::Pass);
        assert_eq!(report.header, "2 of 2 tests passed");
    }

    #[test]
    fn test_overlong_counts_fall_through_to_real_summary() {
        let output = format!(
            "Expecting:\n    {} passed and 0 failed.\nok\n1 passed and 2 failed.",
            "9".repeat(40)
        );
        let report = process_test_results(&output).unwrap();
        assert_eq!(report.status, ReportStatus::Fail);
        assert_eq!(report.header, "1 of 3 tests passed");
    }

    #[test]
    fn test_only_overflowing_summary_is_none() {
        assert_eq!(process_test_results("18446744073709551615 passed and 1 failed."), None);
    }

    #[test]
    fn test_syntax_error_is_remapped() {
        let report = process_test_error(
            &error("Traceback...\n  File \"<exec>\", line 12\nSyntaxError: invalid syntax"),
            0,
        );
        assert_eq!(report.status, ReportStatus::Fail);
        assert_eq!(report.header, "Syntax error");
        assert_eq!(report.details, "Error at line 13:\nSyntaxError: invalid syntax");
    }

    #[test]
    fn test_indentation_error_excerpt() {
        let traceback = "Traceback (most recent call last):
  File \"<string>\", line 30, in <module>
  File \"<exec>\", line 3
    return x
    ^
IndentationError: unexpected indent";
        let report = process_test_error(&error(traceback), 1);
        assert_eq!(
            report.details,
            "Error at line 3:\n    return x\n    ^\nIndentationError: unexpected indent"
        );
    }

    #[test]
    fn test_traceback_without_syntax_error() {
        let traceback = "Traceback (most recent call last):\n  File \"<exec>\", line 2, in <module>\nNameError: name 'x' is not defined";
        let report = process_test_error(&error(traceback), 0);
        assert_eq!(report.header, "Syntax error");
        assert_eq!(report.details, "No error report found.");
    }

    #[test]
    fn test_infinite_loop() {
        let report = process_test_error(&error("Infinite loop"), 0);
        assert_eq!(report.header, "Infinite loop");
        assert!(report.details.contains("60 seconds"));
    }

    #[test]
    fn test_unexpected_error() {
        let report = process_test_error(&error("worker exploded"), 0);
        assert_eq!(report.header, "Unexpected error occurred");
        assert!(report.details.is_empty());
    }
}
