//! The web front end

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tracing::{error, info};

use crate::config::Settings;
use crate::descriptors::DescriptorCache;
use crate::inference::Inference;

mod prelude;
mod upload;
mod views;

use views::{home_handler, proclaim_handler};

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    inference: Arc<dyn Inference>,
    descriptors: Arc<DescriptorCache>,
}

impl AppState {
    /// Wires the settings to a model client.
    pub fn new(settings: Settings, inference: Arc<dyn Inference>) -> Self {
        let descriptors = DescriptorCache::new(settings.descriptor_ttl, settings.refresh_descriptors);
        Self {
            settings: Arc::new(settings),
            inference,
            descriptors: Arc::new(descriptors),
        }
    }
}

/// Builds the router, ready to serve.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;
    Router::new()
        .route("/", axum::routing::get(home_handler))
        .route("/proclaim", axum::routing::post(proclaim_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

/// Binds the listener and serves until the process stops.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
) -> Result<(), anyhow::Error> {
    let app = create_router(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use clap::Parser;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::cli::CliOptions;
    use crate::inference::testing::{ScriptedInference, tiny_jpeg};

    const BOUNDARY: &str = "heraldry-test-boundary";

    fn state(inference: ScriptedInference, extra: &[&str]) -> AppState {
        let mut argv = vec![
            "heraldry",
            "--replicate-api-token",
            "r8_test",
            "--static-descriptors",
        ];
        argv.extend_from_slice(extra);
        let settings = Settings::from_cli(&CliOptions::parse_from(argv)).expect("settings");
        AppState::new(settings, Arc::new(inference))
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"portrait.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn proclaim_request(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/proclaim")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("request")
    }

    async fn read_body(response: axum::response::Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    #[tokio::test]
    async fn home_renders_the_form() {
        let app = create_router(state(ScriptedInference::default(), &[]));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("action=\"/proclaim\""));
        assert!(body.contains("enctype=\"multipart/form-data\""));
        assert!(body.contains("https://replicate.com/google/nano-banana"));
    }

    #[tokio::test]
    async fn styles_are_served() {
        let app = create_router(state(ScriptedInference::default(), &[]));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/styles.css")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"text/css"[..])
        );
    }

    #[tokio::test]
    async fn text_only_proclamation() {
        let app = create_router(state(ScriptedInference::default(), &[]));
        let jpeg = tiny_jpeg();
        let response = app
            .oneshot(proclaim_request(&[
                Part::File("image", &jpeg),
                Part::Text("name", "Alice"),
                Part::Text("analysis", "random"),
                Part::Text("portrait", "text"),
            ]))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("ROYAL PROCLAMATION"));
        assert!(body.contains("Alice"));
        assert!(body.contains("Royal Proclamation Complete!"));
        assert!(!body.contains("mystical viewing crystal"));
    }

    #[tokio::test]
    async fn royal_portrait_links_the_result() {
        let inference = ScriptedInference {
            edit: Some(Ok(json!("https://example.com/royal.jpg"))),
            ..Default::default()
        };
        let app = create_router(state(inference, &[]));
        let jpeg = tiny_jpeg();
        let response = app
            .oneshot(proclaim_request(&[
                Part::File("image", &jpeg),
                Part::Text("name", "Bob"),
                Part::Text("analysis", "random"),
                Part::Text("portrait", "royal"),
            ]))
            .await
            .expect("response");

        let body = read_body(response).await;
        assert!(body.contains("src=\"https://example.com/royal.jpg\""));
        assert!(body.contains("View/Download"));
        assert!(body.contains("Medieval Royal Portrait Complete!"));
    }

    #[tokio::test]
    async fn base64_portrait_is_embedded() {
        let jpeg = tiny_jpeg();
        let inference = ScriptedInference {
            edit: Some(Ok(json!({
                "b64_json": base64::engine::general_purpose::STANDARD.encode(&jpeg)
            }))),
            ..Default::default()
        };
        let app = create_router(state(inference, &[]));
        let response = app
            .oneshot(proclaim_request(&[
                Part::File("image", &jpeg),
                Part::Text("name", "Bob"),
                Part::Text("analysis", "random"),
                Part::Text("portrait", "royal"),
            ]))
            .await
            .expect("response");

        let body = read_body(response).await;
        assert!(body.contains("alt=\"Thy royal medieval transformation\""));
        assert!(!body.contains("binary output"));
        // the uploaded original and the edit are both inline
        assert!(body.matches("src=\"data:image/jpeg;base64,").count() >= 2);
        assert!(body.contains("download=\"medieval_royal_Bob.jpg\""));
    }

    #[tokio::test]
    async fn missing_image_rerenders_the_form() {
        let app = create_router(state(ScriptedInference::default(), &[]));
        let response = app
            .oneshot(proclaim_request(&[
                Part::File("image", b""),
                Part::Text("name", "Alice"),
            ]))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains(views::UPLOAD_PROMPT));
        assert!(body.contains("action=\"/proclaim\""));
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let jpeg = tiny_jpeg();
        for parts in [
            vec![Part::File("image", b"definitely not a picture")],
            vec![Part::File("image", &jpeg), Part::Text("portrait", "cubist")],
            vec![Part::File("image", &jpeg), Part::Text("analysis", "tarot")],
        ] {
            let app = create_router(state(ScriptedInference::default(), &[]));
            let response = app
                .oneshot(proclaim_request(&parts))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = create_router(state(
            ScriptedInference::default(),
            &["--max-upload-bytes", "64"],
        ));
        let big = vec![0u8; 4096];
        let response = app
            .oneshot(proclaim_request(&[Part::File("image", &big)]))
            .await
            .expect("response");
        assert!(response.status().is_client_error());
    }
}
