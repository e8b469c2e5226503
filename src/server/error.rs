use crate::core::error::AppError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::SourceUnavailable(details) => json!({
                "error": "External data source unavailable",
                "details": details,
            }),
            AppError::NotFound(_) => json!({ "error": self.to_string() }),
            other => {
                error!(kind = other.kind(), error = %other, "Request failed");
                json!({ "error": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_bodies() {
        let (status, body) = body_of(AppError::SourceUnavailable("timed out".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "External data source unavailable");
        assert_eq!(body["details"], "timed out");

        let (status, body) = body_of(AppError::NotFound("Country".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Country not found" }));

        // Internal detail stays out of the body
        let (status, body) = body_of(AppError::Persistence("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));

        let (status, _) = body_of(AppError::SourceDataInvalid("bad json".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
