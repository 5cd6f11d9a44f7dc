// src/runner.rs
use async_trait::async_trait;
use std::time::Instant;

use crate::errors::GraderError;
use crate::grader::transform::RUNNING_TESTS;
use crate::grader::{prepare_code, process_test_error, process_test_results, ParsedReport};
use crate::sandbox::{ExecutionError, ExecutionOutcome, FiniteWorker};

/// Trailing expression whose value the worker sends back: the captured
/// doctest transcript.
pub const CAPTURE_EXPRESSION: &str = "sys.stdout.getvalue()";

/// Receives progress for one run. Implemented by whatever shows results to
/// the learner.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// The run has started; `status` is the text to show while it runs.
    async fn running(&self, status: &str);

    /// The run finished. Also clears the running status.
    async fn publish(&self, report: &ParsedReport);
}

/// Sink for callers that only want the returned report.
pub struct NullSink;

#[async_trait]
impl ReportSink for NullSink {
    async fn running(&self, _status: &str) {}
    async fn publish(&self, _report: &ParsedReport) {}
}

/// Validate, transform, execute and parse one submission.
pub async fn run_submission(worker: &FiniteWorker, source: &str) -> ParsedReport {
    let prepared = prepare_code(source);
    let start_line = prepared.start_line.unwrap_or(0);
    let Some(code) = prepared.code.clone() else {
        return prepared.into_report().unwrap_or_else(unexpected_error);
    };

    let code = format!("{}\n{}", code, CAPTURE_EXPRESSION);
    match worker.run(&code).await {
        Ok(ExecutionOutcome::Results(output)) => process_test_results(&output).unwrap_or_else(|| {
            log::debug!("No doctest summary in worker output");
            process_test_error(&ExecutionError::new(output), start_line)
        }),
        Ok(ExecutionOutcome::Error(error)) => process_test_error(&error, start_line),
        Err(GraderError::Channel {
            message,
            filename,
            lineno,
        }) => {
            log::warn!(
                "Error in worker at {}, Line: {}, {}",
                filename.as_deref().unwrap_or("<unknown>"),
                lineno.map(|l| l.to_string()).unwrap_or_else(|| "?".to_string()),
                message
            );
            unexpected_error()
        }
        Err(e) => {
            log::error!("Failed to run submission: {}", e);
            unexpected_error()
        }
    }
}

fn unexpected_error() -> ParsedReport {
    process_test_error(&ExecutionError::new(String::new()), 0)
}

/// Drives submissions through [`run_submission`] and reports progress.
#[derive(Clone)]
pub struct Runner {
    worker: FiniteWorker,
}

impl Runner {
    pub fn new(worker: FiniteWorker) -> Self {
        Self { worker }
    }

    pub async fn run(&self, source: &str, sink: &dyn ReportSink) -> ParsedReport {
        let started = Instant::now();
        sink.running(RUNNING_TESTS).await;

        let report = run_submission(&self.worker, source).await;

        log::info!(
            "Run finished: {} ({}) in {}ms",
            report.status,
            report.header,
            started.elapsed().as_millis()
        );
        sink.publish(&report).await;
        report
    }
}
