use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use heraldry::artifact::TransformResult;
use heraldry::config::setup_logging;
use heraldry::descriptors::DescriptorCache;
use heraldry::error::HeraldryError;
use heraldry::inference::{ImageEditPrompt, Inference, TextPrompt, VisionPrompt};
use heraldry::notice::{Notice, NoticeLevel};
use heraldry::pipeline::{AnalysisMode, Pipeline, PortraitRequest, PortraitStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};

/// A model host that answers from a fixed script and remembers what it was asked.
struct Court {
    titles: Option<&'static str>,
    vision: Option<&'static str>,
    edit: Option<Value>,
    asked: Mutex<Vec<String>>,
}

impl Court {
    fn new() -> Self {
        Self {
            titles: None,
            vision: None,
            edit: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    fn note(&self, what: &str) {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(what.to_string());
        }
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|asked| asked.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Inference for Court {
    async fn generate_text(&self, request: &TextPrompt) -> Result<String, HeraldryError> {
        self.note("text");
        assert_eq!(request.max_tokens, 100);
        self.titles
            .map(str::to_string)
            .ok_or_else(|| HeraldryError::Inference("the scribes are on strike".to_string()))
    }

    async fn describe_image(&self, request: &VisionPrompt) -> Result<String, HeraldryError> {
        self.note("vision");
        assert!(request.image.starts_with("data:image/jpeg;base64,"));
        self.vision
            .map(str::to_string)
            .ok_or_else(|| HeraldryError::Inference("fog on the crystal".to_string()))
    }

    async fn edit_image(
        &self,
        request: &ImageEditPrompt,
    ) -> Result<TransformResult, HeraldryError> {
        self.note("edit");
        assert_eq!(request.image_input.len(), 1);
        self.edit
            .clone()
            .map(|value| TransformResult::classify(value, None))
            .ok_or_else(|| HeraldryError::Inference("the painter fled".to_string()))
    }
}

fn portrait() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(16, 16, image::Rgb([20, 60, 160]));
    let mut output = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut output)
        .encode_image(&image)
        .expect("encode jpeg");
    output
}

fn request(name: &str, analysis: AnalysisMode, style: PortraitStyle) -> PortraitRequest {
    PortraitRequest {
        image_jpeg: portrait(),
        name: name.to_string(),
        analysis,
        style,
    }
}

#[tokio::test]
async fn refreshed_vocabulary_and_inline_portrait() {
    let _ = setup_logging(true);
    let inference = Court {
        titles: Some(
            "Marquis, Viscountess, Baron, Margrave, Thane, Squire, Herald, Jester, Extra",
        ),
        vision: Some("Smiling woman outdoors"),
        edit: Some(json!({
            "url": "https://example.com/portrait.jpg",
            "b64_json": general_purpose::STANDARD.encode(b"royal bytes"),
        })),
        ..Court::new()
    };
    let cache = DescriptorCache::new(Duration::from_secs(3600), true);
    let pipeline = Pipeline::new(&inference, &cache);

    let outcome = pipeline
        .run(
            &request("Ada", AnalysisMode::Vision, PortraitStyle::Royal),
            &mut StdRng::seed_from_u64(42),
        )
        .await;

    let text = outcome.proclamation.as_str();
    assert!(text.contains("Ada the Eternally Cheerful of"));
    let refreshed = [
        "Marquis", "Viscountess", "Baron", "Margrave", "Thane", "Squire", "Herald", "Jester",
    ];
    assert!(
        refreshed
            .iter()
            .any(|title| text.contains(&format!("**{title} Ada ")))
    );
    assert!(!text.contains("Extra Ada"));

    let artifact = outcome.artifact.expect("artifact");
    assert_eq!(artifact.url.as_deref(), Some("https://example.com/portrait.jpg"));
    assert_eq!(artifact.bytes.as_deref(), Some(&b"royal bytes"[..]));
    assert!(
        outcome
            .notices
            .iter()
            .all(|notice| notice.level == NoticeLevel::Success)
    );
    assert_eq!(
        inference.asked(),
        vec!["text", "text", "text", "vision", "edit"]
    );

    // second request inside the window reuses the vocabulary
    pipeline
        .run(
            &request("Ada", AnalysisMode::Random, PortraitStyle::TextOnly),
            &mut StdRng::seed_from_u64(43),
        )
        .await;
    assert_eq!(inference.asked().len(), 5);
}

#[tokio::test]
async fn everything_fails_but_the_text_survives() {
    let inference = Court::new();
    let cache = DescriptorCache::new(Duration::from_secs(3600), true);

    let outcome = Pipeline::new(&inference, &cache)
        .run(
            &request("", AnalysisMode::Vision, PortraitStyle::Overlay),
            &mut StdRng::seed_from_u64(7),
        )
        .await;

    assert!(outcome.proclamation.as_str().contains("The Unnamed One"));
    assert!(
        !outcome
            .proclamation
            .as_str()
            .contains("mystical viewing crystal")
    );
    assert!(outcome.artifact.is_none());
    assert_eq!(
        outcome.notices,
        vec![
            Notice::warning(
                "AI descriptor generation failed: the scribes are on strike. Using default lists."
            ),
            Notice::warning("AI analysis failed: fog on the crystal"),
            Notice::success("Royal Proclamation Complete!"),
            Notice::error("Image overlay generation failed: the painter fled"),
        ]
    );
    // one failed text call aborts the refresh
    assert_eq!(inference.asked(), vec!["text", "vision", "edit"]);
}
