use thiserror::Error;

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("{0}")]
    NotFound(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    QuotaExceeded(String),
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UseCaseError {
    pub fn kind(&self) -> &'static str {
        match self {
            UseCaseError::NotFound(_) => "not_found",
            UseCaseError::Unauthorized => "unauthorized",
            UseCaseError::QuotaExceeded(_) => "quota_exceeded",
            UseCaseError::InvalidSignature(_) => "invalid_signature",
            UseCaseError::ProviderUnavailable(_) => "provider_unavailable",
            UseCaseError::Conflict(_) => "conflict",
            UseCaseError::BadRequest(_) => "bad_request",
            UseCaseError::Internal(_) => "internal",
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;
