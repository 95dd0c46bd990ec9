//! Analytics report generation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::{Backend, Method};
use crate::error::ClientError;

pub const REPORTS_ENDPOINT: &str = "/api/admin/reports/generate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub report_type: String,
    pub date_range: String,
    pub format: String,
}

impl ReportRequest {
    pub fn new(report_type: impl Into<String>) -> Self {
        Self {
            report_type: report_type.into(),
            date_range: "last_30_days".to_string(),
            format: "pdf".to_string(),
        }
    }

    pub fn date_range(mut self, range: impl Into<String>) -> Self {
        self.date_range = range.into();
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Ask the backend to generate a report.
///
/// A 2xx answer whose `status` is not `"success"` is returned as
/// [`ClientError::Rejected`] carrying the server message.
pub async fn generate_report(
    backend: &dyn Backend,
    request: &ReportRequest,
) -> Result<ReportResponse, ClientError> {
    if request.report_type.trim().is_empty() {
        return Err(cashper_core::DomainError::validation("report type cannot be empty").into());
    }
    let body = serde_json::to_value(request).map_err(|e| ClientError::Parse(e.to_string()))?;
    let raw = backend.send_json(Method::Post, REPORTS_ENDPOINT, &body).await?;
    let response: ReportResponse =
        serde_json::from_value(raw).map_err(|e| ClientError::Parse(format!("report response: {e}")))?;

    if !response.is_success() {
        let message = response
            .message
            .clone()
            .unwrap_or_else(|| format!("report generation returned status '{}'", response.status));
        tracing::warn!(report_type = %request.report_type, status = %response.status, "report rejected");
        return Err(ClientError::Rejected(message));
    }
    tracing::info!(report_type = %request.report_type, "report generated");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{Reply, ScriptedBackend};
    use serde_json::json;

    #[tokio::test]
    async fn success_status_is_returned() {
        let backend = ScriptedBackend::new();
        backend.reply(
            REPORTS_ENDPOINT,
            Reply::Json(json!({"status": "success", "message": "queued", "report_id": "r-1"})),
        );

        let req = ReportRequest::new("loans").date_range("this_month").format("csv");
        let resp = generate_report(&backend, &req).await.unwrap();

        assert_eq!(resp.message.as_deref(), Some("queued"));
        assert_eq!(resp.extra.get("report_id"), Some(&json!("r-1")));
        let call = &backend.calls()[0];
        assert_eq!(call.method, "POST");
        assert_eq!(
            call.body,
            Some(json!({"report_type": "loans", "date_range": "this_month", "format": "csv"}))
        );
    }

    #[tokio::test]
    async fn non_success_status_is_rejected_with_message() {
        let backend = ScriptedBackend::new();
        backend.reply(
            REPORTS_ENDPOINT,
            Reply::Json(json!({"status": "error", "message": "no data for range"})),
        );

        let err = generate_report(&backend, &ReportRequest::new("tax")).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m == "no data for range"));
    }

    #[tokio::test]
    async fn http_failure_propagates() {
        let backend = ScriptedBackend::new();
        backend.reply(REPORTS_ENDPOINT, Reply::Status(422, "{\"detail\":\"bad format\"}".into()));

        let err = generate_report(&backend, &ReportRequest::new("tax")).await.unwrap_err();
        assert_eq!(err.user_message(), "bad format");
    }
}
