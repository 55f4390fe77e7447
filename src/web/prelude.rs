pub(crate) use crate::error::HeraldryError;
pub(crate) use crate::notice::Notice;
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::{Multipart, State};
pub(crate) use axum::response::{IntoResponse, Response};
pub(crate) use tracing::{debug, info};
