//! `{success, data?, error?}` envelope shared by every route.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Serialize)]
pub struct ApiError {
    /// Stable, machine-readable code, e.g. `INVALID_FIELD`.
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ApiErrorDetail>,
}

/// Points the client at the offending request field.
#[derive(Serialize)]
pub struct ApiErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiErrorDetail {
    pub fn field(path: &str, hint: Option<&str>) -> Self {
        Self {
            path: Some(path.to_string()),
            hint: hint.map(str::to_string),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(
        code: &'static str,
        message: impl Into<String>,
        details: Vec<ApiErrorDetail>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
                details,
            }),
        }
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelopes_omit_empty_parts() {
        let ok = serde_json::to_value(ApiResponse::success(json!({"n": 1}))).unwrap();
        assert_eq!(ok, json!({"success": true, "data": {"n": 1}}));

        let err = ApiResponse::<()>::error(
            "INVALID_FIELD",
            "bad top_k",
            vec![ApiErrorDetail::field("top_k", None)],
        );
        assert_eq!(
            serde_json::to_value(err).unwrap(),
            json!({
                "success": false,
                "error": {"code": "INVALID_FIELD", "message": "bad top_k", "details": [{"path": "top_k"}]}
            })
        );
    }
}
