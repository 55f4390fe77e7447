//! Client for Replicate's predictions API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use super::{ImageEditPrompt, Inference, TextPrompt, VisionPrompt};
use crate::artifact::{ByteReader, TransformResult};
use crate::config::{Models, Settings};
use crate::constants::PREDICTION_POLL_INTERVAL_SECONDS;
use crate::error::HeraldryError;

/// How a model is addressed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ModelRef<'a> {
    /// `owner/name`, runs the latest deployment of an official model
    Named { owner: &'a str, name: &'a str },
    /// `owner/name:version`, runs one pinned version
    Versioned { version: &'a str },
}

impl<'a> ModelRef<'a> {
    pub(crate) fn parse(model: &'a str) -> Result<Self, HeraldryError> {
        let invalid = || HeraldryError::Inference(format!("Invalid model reference: {model:?}"));
        let (path, version) = match model.split_once(':') {
            Some((path, version)) => (path, Some(version)),
            None => (model, None),
        };
        let (owner, name) = path.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        match version {
            Some("") => Err(invalid()),
            Some(version) => Ok(ModelRef::Versioned { version }),
            None => Ok(ModelRef::Named { owner, name }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

impl Prediction {
    fn is_running(&self) -> bool {
        matches!(self.status.as_str(), "starting" | "processing")
    }
}

/// Talks to Replicate over HTTPS.
#[derive(Clone)]
pub struct ReplicateClient {
    client: reqwest::Client,
    api_token: String,
    api_base: Url,
    models: Models,
    download_output: bool,
}

impl ReplicateClient {
    /// Builds a client from validated settings.
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(reqwest::Client::new(), settings)
    }

    /// Builds a client that reuses an existing connection pool.
    pub fn with_client(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            api_token: settings.api_token.clone(),
            api_base: settings.api_base.clone(),
            models: settings.models.clone(),
            download_output: settings.download_output,
        }
    }

    fn endpoint(&self, model: &ModelRef<'_>) -> String {
        let base = self.api_base.as_str().trim_end_matches('/');
        match model {
            ModelRef::Named { owner, name } => format!("{base}/models/{owner}/{name}/predictions"),
            ModelRef::Versioned { .. } => format!("{base}/predictions"),
        }
    }

    fn request_body<I: Serialize>(model: &ModelRef<'_>, input: &I) -> Value {
        match model {
            ModelRef::Named { .. } => json!({ "input": input }),
            ModelRef::Versioned { version } => json!({ "version": version, "input": input }),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Prediction, HeraldryError> {
        let resp = request.bearer_auth(&self.api_token).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(HeraldryError::Inference(format!(
                "Replicate returned {status}: {body}"
            )));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Creates a prediction, waits for it, and returns its output.
    async fn run<I: Serialize + Sync>(&self, model: &str, input: &I) -> Result<Value, HeraldryError> {
        let model_ref = ModelRef::parse(model)?;
        let endpoint = self.endpoint(&model_ref);
        debug!("Running {} via {}", model, endpoint);

        let mut prediction = self
            .send(
                self.client
                    .post(&endpoint)
                    .header("Prefer", HeaderValue::from_static("wait"))
                    .json(&Self::request_body(&model_ref, input)),
            )
            .await?;

        while prediction.is_running() {
            let Some(poll_url) = prediction.urls.as_ref().and_then(|urls| urls.get.clone()) else {
                return Err(HeraldryError::Inference(format!(
                    "Prediction for {model} is {} with nowhere to poll",
                    prediction.status
                )));
            };
            tokio::time::sleep(Duration::from_secs(PREDICTION_POLL_INTERVAL_SECONDS)).await;
            debug!(
                "Polling prediction {} ({})",
                prediction.id.as_deref().unwrap_or("?"),
                prediction.status
            );
            prediction = self.send(self.client.get(&poll_url)).await?;
        }

        match prediction.status.as_str() {
            "succeeded" => {
                info!("Prediction for {} succeeded", model);
                Ok(prediction.output)
            }
            status => {
                let reason = match prediction.error {
                    Some(Value::String(message)) => message,
                    Some(Value::Null) | None => "no reason given".to_string(),
                    Some(other) => other.to_string(),
                };
                Err(HeraldryError::Inference(format!(
                    "Prediction for {model} {status}: {reason}"
                )))
            }
        }
    }

    fn download_reader(&self) -> impl Fn(&str) -> ByteReader + '_ {
        move |url: &str| {
            let client = self.client.clone();
            let url = url.to_string();
            ByteReader::new(move || async move {
                debug!("Downloading {}", url);
                let resp = client.get(&url).send().await?.error_for_status()?;
                Ok(resp.bytes().await?.to_vec())
            })
        }
    }
}

impl std::fmt::Debug for ReplicateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateClient")
            .field("api_base", &self.api_base.as_str())
            .field("models", &self.models)
            .field("download_output", &self.download_output)
            .finish_non_exhaustive()
    }
}

/// Text models stream tokens, so their output is usually a list of fragments.
pub(crate) fn output_text(output: Value) -> Result<String, HeraldryError> {
    match output {
        Value::String(text) => Ok(text),
        Value::Array(parts) => Ok(parts
            .iter()
            .map(|part| match part {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect()),
        Value::Null => Err(HeraldryError::Inference(
            "Model finished without any output".to_string(),
        )),
        other => Ok(other.to_string()),
    }
}

#[async_trait]
impl Inference for ReplicateClient {
    async fn generate_text(&self, request: &TextPrompt) -> Result<String, HeraldryError> {
        output_text(self.run(&self.models.text, request).await?)
    }

    async fn describe_image(&self, request: &VisionPrompt) -> Result<String, HeraldryError> {
        output_text(self.run(&self.models.vision, request).await?)
    }

    async fn edit_image(
        &self,
        request: &ImageEditPrompt,
    ) -> Result<TransformResult, HeraldryError> {
        let output = self.run(&self.models.image, request).await?;
        if self.download_output {
            let make_reader: &dyn Fn(&str) -> ByteReader = &self.download_reader();
            Ok(TransformResult::classify(output, Some(make_reader)))
        } else {
            Ok(TransformResult::classify(output, None))
        }
    }
}
