use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chain::ChainError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file provided")]
    MissingFile,

    #[error("Invalid file type {0}. Only JPEG, PNG, GIF, and WebP are allowed.")]
    InvalidFileType(String),

    #[error("File too large. Maximum size is 10MB.")]
    FileTooLarge,

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("IPFS service not configured")]
    PinningNotConfigured,

    #[error("Failed to upload to IPFS: {0}")]
    Upstream(String),

    #[error("NFT metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile
            | AppError::InvalidFileType(_)
            | AppError::FileTooLarge
            | AppError::MalformedPayload
            | AppError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MetadataUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::PinningNotConfigured | AppError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Chain(e) => match e {
                ChainError::Validation(_) => StatusCode::BAD_REQUEST,
                ChainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ChainError::WrongNetwork { .. } | ChainError::NotConnected => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ChainError::Connection(_)
                | ChainError::Rejected(_)
                | ChainError::Reverted(_)
                | ChainError::Rpc { .. }
                | ChainError::Decode(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            warn!("Request failed with {status}: {self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chain::ValidationError;

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotFound("Meme 4".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::PinningNotConfigured.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::MetadataUnavailable("gateway returned 503".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(ChainError::Timeout(Duration::from_secs(10))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::from(ChainError::Connection("refused".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(ChainError::from(ValidationError::InvalidAddress("0x12".into()))).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ChainError::WrongNetwork {
                expected: 97,
                actual: 56
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body() {
        let response = AppError::FileTooLarge.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
