//! REST API payloads.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::pipeline::{ConversionPreview, ConversionResult, UnitSummary};

/// Response to `POST /api/preview`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Unique job identifier
    pub job_id: String,
    /// "ready", or "empty" when the upload has no data rows
    pub status: String,
    pub file_name: Option<String>,
    pub preview: ConversionPreview,
}

impl PreviewResponse {
    pub fn new(preview: ConversionPreview, file_name: Option<String>) -> Self {
        let status = if preview.units.is_empty() { "empty" } else { "ready" };
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            file_name,
            preview,
        }
    }
}

/// Short summary sent in the `X-Multiship-Summary` header of `/api/convert`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertSummary {
    pub job_id: String,
    pub group_column: String,
    pub row_count: usize,
    pub files: Vec<UnitSummary>,
}

impl From<&ConversionResult> for ConvertSummary {
    fn from(result: &ConversionResult) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            group_column: result.group_column.clone(),
            row_count: result.source.row_count,
            files: result.units.clone(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Template;
    use crate::transform::pipeline::{preview_bytes, ConvertOptions};

    #[test]
    fn test_error_response_shape() {
        let value = error_response("boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
        assert!(value["jobId"].as_str().is_some());
    }

    #[test]
    fn test_preview_response_status() {
        let template = Template::default();
        let options = ConvertOptions::default();

        let empty = preview_bytes("상품명,수취인\n".as_bytes(), &template, &options).unwrap();
        assert_eq!(PreviewResponse::new(empty, None).status, "empty");

        let full = preview_bytes("상품명,수취인\nA,b\n".as_bytes(), &template, &options).unwrap();
        let response = PreviewResponse::new(full, Some("orders.csv".into()));
        assert_eq!(response.status, "ready");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["fileName"], "orders.csv");
        assert_eq!(json["preview"]["groupColumn"], "상품명");
        assert_eq!(json["preview"]["units"][0]["name"], "A.xlsx");
    }
}
