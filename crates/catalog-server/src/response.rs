//! JSON envelopes shared by every endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const CODE_VALIDATION: &str = "validation error";
pub const CODE_INTERNAL: &str = "internal error";
pub const CODE_PRODUCT_INVALID_ID: &str = "product/invalid-id";
pub const CODE_PRODUCT_NOT_FOUND: &str = "product/not-found";
pub const CODE_CATEGORY_INVALID_ID: &str = "category/invalid-id";
pub const CODE_CATEGORY_NOT_FOUND: &str = "category/not-found";

/// One page of a listing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

/// A single result.
#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Canonical reason phrase of the HTTP status.
    pub status: String,
}

/// An error response: status plus `{code, message, status}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_VALIDATION, message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    /// The detail stays in the logs; clients see a fixed message.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            CODE_INTERNAL,
            "internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.to_string(),
            message: self.message,
            status: self
                .status
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginated_uses_camel_case() {
        let page = Paginated {
            data: vec![1, 2],
            total_count: 7,
            page: 2,
            page_size: 2,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"data": [1, 2], "totalCount": 7, "page": 2, "pageSize": 2})
        );
    }

    #[tokio::test]
    async fn error_body_carries_reason_phrase() {
        let response =
            ApiError::not_found(CODE_PRODUCT_NOT_FOUND, "product not found: 9").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, "product/not-found");
        assert_eq!(body.message, "product not found: 9");
        assert_eq!(body.status, "Not Found");
    }

    #[test]
    fn internal_hides_detail() {
        let err = ApiError::internal();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
        assert_eq!(err.code, CODE_INTERNAL);
    }
}
