//! Remote inference calls: the seam between the proclamation logic and hosted models.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use serde::Serialize;

use crate::artifact::TransformResult;
use crate::error::HeraldryError;

pub mod replicate;

pub use replicate::ReplicateClient;

/// Request body for a text generation model.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TextPrompt {
    /// what to ask
    pub prompt: String,
    /// output length budget
    pub max_tokens: u32,
    /// sampling temperature, higher is sillier
    pub temperature: f32,
}

/// Request body for a vision model.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct VisionPrompt {
    /// the image, as a `data:` URI
    pub image: String,
    /// what to ask about it
    pub prompt: String,
}

/// Request body for an image editing model.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ImageEditPrompt {
    /// editing instructions
    pub prompt: String,
    /// source images, as `data:` URIs
    pub image_input: Vec<String>,
    /// always `match_input_image`
    pub aspect_ratio: String,
    /// always `jpg`
    pub output_format: String,
}

impl ImageEditPrompt {
    /// Edits a single image, keeping its aspect ratio and producing a JPEG.
    pub fn new(prompt: String, image: String) -> Self {
        Self {
            prompt,
            image_input: vec![image],
            aspect_ratio: "match_input_image".to_string(),
            output_format: "jpg".to_string(),
        }
    }
}

/// Hosted models used to build a proclamation.
///
/// Every method is one remote call, attempted exactly once.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Runs a text generation model and returns its whole output.
    async fn generate_text(&self, request: &TextPrompt) -> Result<String, HeraldryError>;

    /// Runs a vision model over an image and returns its answer.
    async fn describe_image(&self, request: &VisionPrompt) -> Result<String, HeraldryError>;

    /// Runs an image editing model; the reply shape isn't fixed, so it comes back classified.
    async fn edit_image(&self, request: &ImageEditPrompt)
    -> Result<TransformResult, HeraldryError>;
}

/// Wraps JPEG bytes in a `data:` URI.
pub fn jpeg_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(bytes)
    )
}
