use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::domain::order::{ApprovalError, OrderError};
use crate::store::StoreError;

// ============================================================================
// HTTP Error Mapping
// ============================================================================
//
// Validation and state errors become 4xx with their message. Store failures
// are logged where they are converted and answered with a generic 500.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}

impl From<OrderError> for ApiError {
    fn from(error: OrderError) -> Self {
        if error.is_invalid_state() {
            ApiError::InvalidState(error.to_string())
        } else {
            ApiError::Validation(error.to_string())
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        tracing::error!(error = %error, "Store operation failed");
        ApiError::Internal
    }
}

impl From<ApprovalError> for ApiError {
    fn from(error: ApprovalError) -> Self {
        match error {
            ApprovalError::NotFound(_) => ApiError::NotFound("Order not found".to_string()),
            ApprovalError::Modified(_) => {
                ApiError::Conflict("Order was modified concurrently, reload and retry".to_string())
            }
            ApprovalError::Rule(rule) => rule.into(),
            ApprovalError::Store(store) => store.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use actix_web::body::to_bytes;
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidState("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_state_message_names_current_status() {
        let error: ApiError = ApprovalError::Rule(OrderError::InvalidState(OrderStatus::Approved)).into();
        assert!(matches!(error, ApiError::InvalidState(_)));
        assert!(error.to_string().contains("approved"));
    }

    #[test]
    fn test_concurrent_modification_is_conflict() {
        let error: ApiError = ApprovalError::Modified(Uuid::new_v4()).into();
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_rule_violation_is_validation() {
        let error: ApiError = OrderError::QuantityExceedsRequested {
            item_id: Uuid::new_v4(),
            requested: 1,
            approved: 2,
        }
        .into();
        assert!(matches!(error, ApiError::Validation(_)));
    }

    #[actix_web::test]
    async fn test_store_failure_hides_details() {
        let error: ApiError = ApprovalError::Store(StoreError::Backend("node 10.0.0.7 down".into())).into();
        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Internal server error");
    }
}
