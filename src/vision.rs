//! Asking a vision model what the portrait looks like.

use tracing::{debug, warn};

use crate::inference::{Inference, VisionPrompt, jpeg_data_uri};
use crate::notice::Notice;
use crate::proclamation::VisionHint;

/// Instruction sent with the portrait.
pub const VISION_INSTRUCTION: &str = "Describe this person in 2-3 words focusing on their appearance or setting. Be brief and simple.";

/// Describes the portrait in a few words.
///
/// A failed call is not an error: it adds a warning to `notices` and returns `None`.
pub async fn annotate(
    inference: &dyn Inference,
    image_jpeg: &[u8],
    notices: &mut Vec<Notice>,
) -> Option<VisionHint> {
    let request = VisionPrompt {
        image: jpeg_data_uri(image_jpeg),
        prompt: VISION_INSTRUCTION.to_string(),
    };
    match inference.describe_image(&request).await {
        Ok(answer) => {
            let hint = VisionHint::new(&answer);
            debug!("Vision model says {:?}", hint.as_str());
            Some(hint)
        }
        Err(err) => {
            warn!("Vision annotation failed: {}", err);
            notices.push(Notice::warning(format!("AI analysis failed: {err}")));
            None
        }
    }
}
