//! Error handling

use axum::response::IntoResponse;
use tracing::info;

/// definitions for the heraldry application.
#[derive(Debug)]
pub enum HeraldryError {
    /// When you didn't do the right thing
    BadRequest,
    /// The Replicate API token isn't configured
    MissingCredential,
    /// A remote inference call failed or returned something unusable
    Inference(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl std::fmt::Display for HeraldryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest => write!(f, "Bad request"),
            Self::MissingCredential => write!(
                f,
                "Missing REPLICATE_API_TOKEN environment variable. Get one at https://replicate.com/account/api-tokens"
            ),
            Self::Inference(message) => write!(f, "{message}"),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for HeraldryError {}

impl From<reqwest::Error> for HeraldryError {
    fn from(err: reqwest::Error) -> Self {
        HeraldryError::Inference(err.to_string())
    }
}

impl From<serde_json::Error> for HeraldryError {
    fn from(err: serde_json::Error) -> Self {
        HeraldryError::Inference(format!("Unreadable model response: {err}"))
    }
}

impl From<url::ParseError> for HeraldryError {
    fn from(err: url::ParseError) -> Self {
        HeraldryError::InternalServerError(err.to_string())
    }
}

impl From<image::ImageError> for HeraldryError {
    fn from(err: image::ImageError) -> Self {
        HeraldryError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for HeraldryError {
    fn into_response(self) -> axum::response::Response {
        match self {
            HeraldryError::BadRequest => {
                info!("Bad request received");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Bad Request"));
                *response.status_mut() = axum::http::StatusCode::BAD_REQUEST;
                response
            }
            HeraldryError::MissingCredential => {
                tracing::error!("{}", self);
                let mut response = axum::response::Response::new(axum::body::Body::from(
                    "Server is missing its Replicate API token",
                ));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
            HeraldryError::Inference(message) => {
                tracing::error!("Inference error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Upstream model error"));
                *response.status_mut() = axum::http::StatusCode::BAD_GATEWAY;
                response
            }
            HeraldryError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
