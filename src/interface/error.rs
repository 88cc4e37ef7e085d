//! HTTP error mapping. Every failure renders as `{"detail": "<message>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::types::ToolError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "Request failed");
        } else {
            tracing::debug!(status = %self.status, detail = %self.detail, "Request rejected");
        }
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        let status = match &err {
            ToolError::PathEscape(_) => StatusCode::FORBIDDEN,
            ToolError::NotFound(_) => StatusCode::NOT_FOUND,
            ToolError::InvalidInput(_) | ToolError::UnknownTool(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ToolError::NotEmpty(_) => StatusCode::CONFLICT,
            ToolError::Upstream(_) | ToolError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ToolError>() {
            Ok(tool) => tool.into(),
            Err(other) => Self::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ToolError::PathEscape("../x".into()), StatusCode::FORBIDDEN),
            (ToolError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ToolError::InvalidInput("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ToolError::UnknownTool("nope".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ToolError::NotEmpty("app".into()), StatusCode::CONFLICT),
            (ToolError::Upstream("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_anyhow_keeps_tool_status() {
        let err = anyhow::Error::from(ToolError::NotFound("File does not exist: a".into()));
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.detail, "File does not exist: a");

        let api = ApiError::from(anyhow::anyhow!("[anthropic] HTTP request failed"));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
