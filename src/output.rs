//! JSON output types for CLI responses.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::SharpenError;

/// Success envelope printed to stdout after a run.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteReport {
    pub status: &'static str,
    /// ISO 8601 timestamp of report creation.
    pub timestamp: String,
    /// The input path as given on the command line.
    pub path: String,
    pub files_scanned: usize,
    pub files_changed: usize,
    /// Paths written back, in processing order.
    pub changed_files: Vec<String>,
}

impl RewriteReport {
    pub fn new(path: String, files_scanned: usize, changed_files: Vec<String>) -> Self {
        Self {
            status: "ok",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            path,
            files_scanned,
            files_changed: changed_files.len(),
            changed_files,
        }
    }

    pub fn to_json(&self) -> Result<String, SharpenError> {
        serde_json::to_string_pretty(self).map_err(|e| SharpenError::InternalError {
            message: format!("failed to serialize report: {e}"),
        })
    }
}

/// Error envelope printed to stderr.
pub fn error_json(err: &SharpenError) -> String {
    serde_json::json!({
        "status": "error",
        "error": {
            "code": err.error_code().code(),
            "name": err.error_name(),
            "message": err.to_string(),
        }
    })
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_changed_files() {
        let report = RewriteReport::new(
            ".".to_string(),
            3,
            vec!["a.cs".to_string(), "b.cs".to_string()],
        );
        assert_eq!(report.status, "ok");
        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_changed, 2);
        let json = report.to_json().expect("serializable");
        assert!(json.contains("\"files_changed\": 2"));
    }

    #[test]
    fn error_json_carries_code_and_name() {
        let err = SharpenError::PathNotFound {
            path: "gone".to_string(),
        };
        let json = error_json(&err);
        assert!(json.contains("\"code\":2"));
        assert!(json.contains("\"name\":\"PathNotFound\""));
        assert!(json.contains("path not found: gone"));
    }
}
