// src/models.rs
use serde::{Deserialize, Serialize};

use crate::grader::{ParsedReport, ReportStatus};

#[derive(Deserialize, Clone, Debug)]
pub struct CodeRequest {
    pub code: String,
}

/// Result of one exercise run as returned to the client.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunResponse {
    pub id: String,
    pub exercise: String,
    pub status: ReportStatus,
    pub header: String,
    pub details: String,
    pub created_at: String,
}

impl RunResponse {
    pub fn new(id: String, exercise: String, report: ParsedReport) -> Self {
        Self {
            id,
            exercise,
            status: report.status,
            header: report.header,
            details: report.details,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct ApiError {
    pub error: String,
}
