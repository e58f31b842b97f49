use application::errors::UseCaseError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub kind: String,
    pub message: String,
}

/// HTTP face of a use-case failure.
#[derive(Debug)]
pub struct AppError(pub UseCaseError);

impl From<UseCaseError> for AppError {
    fn from(err: UseCaseError) -> Self {
        AppError(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            UseCaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UseCaseError::Unauthorized => StatusCode::UNAUTHORIZED,
            UseCaseError::QuotaExceeded(_) => StatusCode::FORBIDDEN,
            UseCaseError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            UseCaseError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            UseCaseError::Conflict(_) => StatusCode::CONFLICT,
            UseCaseError::BadRequest(_) => StatusCode::BAD_REQUEST,
            UseCaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            UseCaseError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            kind: self.0.kind().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> ErrorResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn maps_every_kind_to_its_status() {
        let cases = [
            (UseCaseError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (UseCaseError::Unauthorized, StatusCode::UNAUTHORIZED),
            (UseCaseError::QuotaExceeded("x".into()), StatusCode::FORBIDDEN),
            (UseCaseError::InvalidSignature("x".into()), StatusCode::BAD_REQUEST),
            (UseCaseError::ProviderUnavailable("x".into()), StatusCode::BAD_GATEWAY),
            (UseCaseError::Conflict("x".into()), StatusCode::CONFLICT),
            (UseCaseError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                UseCaseError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError(err).status(), status);
        }
    }

    #[tokio::test]
    async fn quota_message_reaches_the_client() {
        let response =
            AppError(UseCaseError::QuotaExceeded("Free tier limit reached".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_of(response).await;
        assert_eq!(body.code, 403);
        assert_eq!(body.kind, "quota_exceeded");
        assert!(body.message.contains("Free tier limit reached"));
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let response =
            AppError(UseCaseError::Internal(anyhow::anyhow!("password=hunter2"))).into_response();

        let body = body_of(response).await;
        assert_eq!(body.kind, "internal");
        assert_eq!(body.message, "Internal server error");
    }
}
