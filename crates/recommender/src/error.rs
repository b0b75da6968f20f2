use actix_web::{HttpResponse, ResponseError};

pub type Result<T> = std::result::Result<T, RecommenderError>;

/// Failures surfaced by the recommendation core
///
/// Callers tell "no data" (`StoreUnavailable`), "not ready" (`ModelNotReady`)
/// and "bad input" (`InvalidRequest`) apart by variant.
#[derive(Debug, thiserror::Error)]
pub enum RecommenderError {
    #[error("Interaction store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Model not ready: no training pass has completed")]
    ModelNotReady,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommenderError {
    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            RecommenderError::StoreUnavailable(_) => "store_unavailable",
            RecommenderError::ModelNotReady => "model_not_ready",
            RecommenderError::InvalidRequest(_) => "invalid_request",
            RecommenderError::Training(_) => "training_failed",
            RecommenderError::Internal(_) => "internal_error",
        }
    }
}

impl From<sqlx::Error> for RecommenderError {
    fn from(err: sqlx::Error) -> Self {
        RecommenderError::StoreUnavailable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RecommenderError {
    fn from(err: tokio::task::JoinError) -> Self {
        RecommenderError::Internal(err.to_string())
    }
}

impl ResponseError for RecommenderError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            RecommenderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RecommenderError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            RecommenderError::StoreUnavailable(_) => StatusCode::BAD_GATEWAY,
            RecommenderError::Training(_) | RecommenderError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let description = match self {
            RecommenderError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.code(),
            "error_description": description
        }))
    }
}
