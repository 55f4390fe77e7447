//! One request, start to finish.

use std::str::FromStr;

use rand::Rng;
use tracing::{info, warn};

use crate::artifact::{DisplayArtifact, normalize};
use crate::descriptors::DescriptorCache;
use crate::error::HeraldryError;
use crate::inference::Inference;
use crate::notice::Notice;
use crate::proclamation::{Proclamation, compose, display_name};
use crate::transform::{TransformMode, transform};
use crate::vision::annotate;

/// Shown whenever the text is ready.
pub const PROCLAMATION_COMPLETE: &str = "Royal Proclamation Complete!";

/// How the proclamation is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Random descriptors only, no vision call
    #[default]
    Random,
    /// Ask the vision model about the portrait first
    Vision,
}

impl FromStr for AnalysisMode {
    type Err = HeraldryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "random" => Ok(AnalysisMode::Random),
            "vision" => Ok(AnalysisMode::Vision),
            _ => Err(HeraldryError::BadRequest),
        }
    }
}

/// What happens to the portrait.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PortraitStyle {
    /// Leave it alone
    TextOnly,
    /// Add the proclamation on scrolls
    Overlay,
    /// Full medieval makeover
    #[default]
    Royal,
}

impl FromStr for PortraitStyle {
    type Err = HeraldryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "text" => Ok(PortraitStyle::TextOnly),
            "overlay" => Ok(PortraitStyle::Overlay),
            "royal" => Ok(PortraitStyle::Royal),
            _ => Err(HeraldryError::BadRequest),
        }
    }
}

impl PortraitStyle {
    /// The image edit this style needs, if any
    pub fn transform_mode(self) -> Option<TransformMode> {
        match self {
            PortraitStyle::TextOnly => None,
            PortraitStyle::Overlay => Some(TransformMode::Overlay),
            PortraitStyle::Royal => Some(TransformMode::Royal),
        }
    }

    fn success_message(self) -> Option<&'static str> {
        match self {
            PortraitStyle::TextOnly => None,
            PortraitStyle::Overlay => Some("Royal Portrait with Proclamation Complete!"),
            PortraitStyle::Royal => Some("Medieval Royal Portrait Complete!"),
        }
    }

    /// File name offered when downloading the edited portrait.
    pub fn download_filename(self, name: &str) -> Option<String> {
        let name = display_name(name).replace(' ', "_");
        match self {
            PortraitStyle::TextOnly => None,
            PortraitStyle::Overlay => Some(format!("royal_portrait_{name}.jpg")),
            PortraitStyle::Royal => Some(format!("medieval_royal_{name}.jpg")),
        }
    }
}

/// A validated upload.
#[derive(Clone, Debug)]
pub struct PortraitRequest {
    /// The portrait, already converted to JPEG
    pub image_jpeg: Vec<u8>,
    /// As typed, may be blank
    pub name: String,
    /// How to pick the words
    pub analysis: AnalysisMode,
    /// What to do with the picture
    pub style: PortraitStyle,
}

/// Everything the result page shows.
#[derive(Debug)]
pub struct PortraitOutcome {
    /// The text, always present
    pub proclamation: Proclamation,
    /// The edited portrait, when one was asked for and produced
    pub artifact: Option<DisplayArtifact>,
    /// Messages, in the order they happened
    pub notices: Vec<Notice>,
}

/// Runs the remote calls for one request, in order.
pub struct Pipeline<'a> {
    inference: &'a dyn Inference,
    descriptors: &'a DescriptorCache,
}

impl<'a> Pipeline<'a> {
    /// Borrows the shared services
    pub fn new(inference: &'a dyn Inference, descriptors: &'a DescriptorCache) -> Self {
        Self {
            inference,
            descriptors,
        }
    }

    /// Builds the proclamation and, if asked, the edited portrait.
    ///
    /// Never fails: every remote failure turns into a notice and a substitute.
    pub async fn run<R: Rng + Send + ?Sized>(
        &self,
        request: &PortraitRequest,
        rng: &mut R,
    ) -> PortraitOutcome {
        let mut notices = Vec::new();

        let (descriptors, descriptor_notice) = self.descriptors.get(self.inference).await;
        notices.extend(descriptor_notice);

        let hint = match request.analysis {
            AnalysisMode::Random => None,
            AnalysisMode::Vision => annotate(self.inference, &request.image_jpeg, &mut notices).await,
        };

        let proclamation = compose(&request.name, &descriptors, hint.as_ref(), rng);
        notices.push(Notice::success(PROCLAMATION_COMPLETE));
        info!(
            "Proclaimed {} ({:?}, {:?})",
            display_name(&request.name),
            request.analysis,
            request.style
        );

        let mut artifact = None;
        if let Some(mode) = request.style.transform_mode() {
            let name = display_name(&request.name);
            if let Some(result) = transform(
                self.inference,
                &request.image_jpeg,
                mode,
                &proclamation,
                name,
                rng,
                &mut notices,
            )
            .await
            {
                let normalized = normalize(result, &mut notices).await;
                if normalized.is_empty() {
                    warn!("Image edit ({:?}) produced nothing displayable", mode);
                    notices.push(Notice::error(format!(
                        "{}: the model returned no image",
                        mode.failure_message()
                    )));
                } else {
                    notices.extend(request.style.success_message().map(Notice::success));
                    artifact = Some(normalized);
                }
            }
        }

        PortraitOutcome {
            proclamation,
            artifact,
            notices,
        }
    }
}
