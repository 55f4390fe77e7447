//! Turning the portrait into something more regal.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{error, info};

use crate::artifact::TransformResult;
use crate::inference::{ImageEditPrompt, Inference, jpeg_data_uri};
use crate::notice::Notice;
use crate::proclamation::Proclamation;

/// Decorations for a royal portrait, a few are picked for each request.
pub const ROYAL_ELEMENTS: [&str; 7] = [
    "Add a golden ornate medieval frame around the portrait.",
    "Give the person a royal crown or medieval headdress.",
    "Add a flowing medieval cape or royal robes.",
    "Include heraldic symbols and coat of arms in the background.",
    "Add medieval castle towers in the distant background.",
    "Give the scene a warm, candlelit medieval atmosphere.",
    "Add some medieval props like a scepter, sword, or royal orb.",
];

/// What the image model is asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformMode {
    /// Keep the photo, add the proclamation on scrolls
    Overlay,
    /// Repaint the subject as medieval royalty
    Royal,
}

impl TransformMode {
    /// Prefix for the error notice when the edit fails.
    pub(crate) fn failure_message(self) -> &'static str {
        match self {
            TransformMode::Overlay => "Image overlay generation failed",
            TransformMode::Royal => "Medieval image transformation failed",
        }
    }
}

fn overlay_prompt(proclamation: &Proclamation) -> String {
    format!(
        "IMPORTANT: Keep the original image completely unchanged. Only add text overlay.\n\n\
        Add elegant medieval scroll text overlay to this image with the royal proclamation:\n\
        '{}'\n\n\
        DO NOT modify the original image - only add text overlays on decorative parchment scrolls.\n\
        Keep the person and background exactly as they are in the original photo.\n\
        Place the text on ornate medieval scroll banners that appear to be placed over the image.\n\
        Use medieval calligraphy and make the text readable and elegant.\n\
        The original image should remain fully visible underneath the text scrolls.",
        proclamation.cleaned()
    )
}

fn royal_prompt<R: Rng + ?Sized>(proclamation: &Proclamation, name: &str, rng: &mut R) -> String {
    let count = rng.random_range(3..=4);
    let elements = ROYAL_ELEMENTS
        .choose_multiple(rng, count)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let title = proclamation.title_phrase(name);
    format!(
        "Transform this portrait into a humorous medieval royal painting style.\n\
        {elements}\n\n\
        MOST IMPORTANT: Keep the original person's face clearly visible and recognizable.\n\
        Transform the image style to medieval royal portrait but preserve the person's identity.\n\n\
        Add a small elegant medieval scroll banner at the bottom with just the title: '{title}'\n\n\
        Focus on visual transformation: medieval styling, royal clothing, majestic background.\n\
        Make it look like a classical royal portrait but with modern humorous touches.\n\
        Use rich medieval colors: deep reds, royal blues, gold accents.\n\
        Make it both majestic and slightly silly in a fun way.\n\n\
        The person should still be clearly recognizable in medieval royal attire."
    )
}

/// Sends the portrait to the image model.
///
/// A failed call adds an error to `notices` and returns `None`; the
/// proclamation itself is only read.
pub async fn transform<R: Rng + ?Sized>(
    inference: &dyn Inference,
    image_jpeg: &[u8],
    mode: TransformMode,
    proclamation: &Proclamation,
    name: &str,
    rng: &mut R,
    notices: &mut Vec<Notice>,
) -> Option<TransformResult> {
    let prompt = match mode {
        TransformMode::Overlay => overlay_prompt(proclamation),
        TransformMode::Royal => royal_prompt(proclamation, name, rng),
    };
    let request = ImageEditPrompt::new(prompt, jpeg_data_uri(image_jpeg));

    match inference.edit_image(&request).await {
        Ok(result) => {
            info!("Image edit ({:?}) returned {}", mode, result);
            Some(result)
        }
        Err(err) => {
            error!("Image edit ({:?}) failed: {}", mode, err);
            notices.push(Notice::error(format!("{}: {err}", mode.failure_message())));
            None
        }
    }
}
