use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use uuid::Uuid;

use crate::placement::PlacementError;
use crate::store::StoreError;

/// Seconds a client is asked to wait after a storage failure
const STORAGE_RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("order {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            item_code: None,
            message: message.into(),
        }
    }

    pub fn out_of_stock(item_code: &str) -> Self {
        Self {
            error: "out_of_stock",
            item_code: Some(item_code.to_string()),
            message: format!("Product with code {item_code} is not in stock"),
        }
    }
}

impl ApiError {
    fn is_storage(&self) -> bool {
        matches!(
            self,
            ApiError::Store(_) | ApiError::Placement(PlacementError::Storage(_))
        )
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Placement(PlacementError::InvalidRequest(e)) => {
                ErrorBody::new("invalid_request", e.to_string())
            }
            ApiError::BadRequest(message) => ErrorBody::new("invalid_request", message.clone()),
            ApiError::NotFound(id) => ErrorBody::new("not_found", format!("Order {id} not found")),
            ApiError::Placement(PlacementError::Storage(_)) | ApiError::Store(_) => {
                ErrorBody::new("storage_unavailable", "Order storage is temporarily unavailable")
            }
            ApiError::Placement(PlacementError::Interrupted(_)) => {
                ErrorBody::new("internal", "Internal error")
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Placement(PlacementError::InvalidRequest(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Placement(PlacementError::Storage(_)) | ApiError::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Placement(PlacementError::Interrupted(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if self.is_storage() {
            response.insert_header((header::RETRY_AFTER, STORAGE_RETRY_AFTER_SECS.to_string()));
        }
        response.json(self.body())
    }
}
