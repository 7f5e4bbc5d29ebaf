//! Error responses of the signature service.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// API key or secret absent; `prefixed` records whether only the
    /// bundler-prefixed variables were found.
    #[error("Missing CLOUDINARY_API_KEY or CLOUDINARY_API_SECRET in server environment. {}", missing_details(.prefixed))]
    MissingCredentials { prefixed: bool },

    #[error("Invalid request payload")]
    InvalidPayload,
}

fn missing_details(prefixed: &bool) -> &'static str {
    if *prefixed {
        "Detected VITE_CLOUDINARY_* vars. Use the non-prefixed CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET server env vars."
    } else {
        "Set CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET in the signer's environment."
    }
}

impl ResponseError for SignerError {
    fn status_code(&self) -> StatusCode {
        match self {
            SignerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            SignerError::MissingCredentials { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SignerError::InvalidPayload => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}
