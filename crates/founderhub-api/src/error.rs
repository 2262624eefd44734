use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use founderhub_social::SocialError;

/// Error body returned by every handler: `{ "message": ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        let status = match &err {
            SocialError::NotFound { .. } => StatusCode::NOT_FOUND,
            SocialError::InvalidKind(_) | SocialError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SocialError::Forbidden(_) => StatusCode::FORBIDDEN,
            SocialError::Conflict(_) => StatusCode::CONFLICT,
            SocialError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            SocialError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Store internals stay in the log.
        let message = match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                error!("Transient store failure: {:#}", err);
                "temporarily unavailable, retry".to_string()
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Store failure: {:#}", err);
                "internal error".to_string()
            }
            _ => err.to_string(),
        };

        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "message": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SocialError::not_found("story", Uuid::nil()), StatusCode::NOT_FOUND),
            (SocialError::InvalidKind("block".into()), StatusCode::BAD_REQUEST),
            (SocialError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (SocialError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (SocialError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                SocialError::TransientStore(anyhow::anyhow!("busy")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (SocialError::Store(anyhow::anyhow!("disk")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_store_details_hidden() {
        let cause = anyhow::anyhow!("/var/db/secret.db: disk I/O");
        let api = ApiError::from(SocialError::Store(cause));
        assert_eq!(api.message, "internal error");

        let api = ApiError::from(SocialError::not_found("story", Uuid::nil()));
        assert!(api.message.starts_with("story not found"));
    }
}
