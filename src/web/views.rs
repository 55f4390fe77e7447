use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::field::{self, Empty};
use tracing::{Span, instrument};

use super::prelude::*;
use crate::artifact::DisplayArtifact;
use crate::config::Models;
use crate::inference::jpeg_data_uri;
use crate::pipeline::{Pipeline, PortraitOutcome, PortraitRequest, PortraitStyle};
use crate::proclamation::display_name;
use crate::web::upload::{normalize_image_to_jpeg, read_form};

/// Shown when the form comes back without a picture.
pub(crate) const UPLOAD_PROMPT: &str =
    "Upload an image above to receive thy royal medieval description!";

/// A hosted model, for the credits list.
#[derive(Clone, Debug)]
pub(crate) struct ModelCredit {
    pub(crate) model: String,
    pub(crate) page: String,
    pub(crate) purpose: &'static str,
}

impl ModelCredit {
    fn new(model: &str, purpose: &'static str) -> Self {
        let path = model.split_once(':').map_or(model, |(path, _)| path);
        Self {
            model: path.to_string(),
            page: format!("https://replicate.com/{path}"),
            purpose,
        }
    }
}

fn credits(models: &Models) -> Vec<ModelCredit> {
    vec![
        ModelCredit::new(&models.text, "Dreams up fresh titles, places and skills"),
        ModelCredit::new(&models.vision, "Peers into thy portrait"),
        ModelCredit::new(&models.image, "Paints the royal portrait and scrolls"),
    ]
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) notices: Vec<Notice>,
    pub(crate) credits: Vec<ModelCredit>,
}

/// The edited portrait, as the page shows it.
#[derive(Clone, Debug)]
pub(crate) struct PortraitView {
    pub(crate) caption: &'static str,
    pub(crate) src: String,
    pub(crate) download_href: String,
    /// set when the bytes are inline, so the browser saves rather than navigates
    pub(crate) download_name: Option<String>,
}

impl PortraitView {
    fn new(style: PortraitStyle, name: &str, artifact: DisplayArtifact) -> Option<Self> {
        let caption = match style {
            PortraitStyle::TextOnly => return None,
            PortraitStyle::Overlay => "Thy proclaimed portrait",
            PortraitStyle::Royal => "Thy royal medieval transformation",
        };
        let linkable = artifact.linkable_url().map(str::to_string);
        let inline = artifact.bytes.as_deref().map(jpeg_data_uri);
        // placeholder urls like "<binary output>" lose to the bytes
        let src = linkable.or_else(|| inline.clone()).or(artifact.url)?;
        let (download_href, download_name) = match inline {
            Some(data_uri) => (data_uri, style.download_filename(name)),
            None => (src.clone(), None),
        };
        Some(Self {
            caption,
            src,
            download_href,
            download_name,
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "proclamation.html")]
pub(crate) struct ProclamationTemplate {
    pub(crate) name: String,
    pub(crate) notices: Vec<Notice>,
    pub(crate) proclamation_html: String,
    pub(crate) original_src: String,
    pub(crate) portrait: Option<PortraitView>,
    pub(crate) credits: Vec<ModelCredit>,
}

impl ProclamationTemplate {
    fn new(request: &PortraitRequest, outcome: PortraitOutcome, credits: Vec<ModelCredit>) -> Self {
        let PortraitOutcome {
            proclamation,
            artifact,
            notices,
        } = outcome;
        Self {
            name: display_name(&request.name).to_string(),
            notices,
            proclamation_html: proclamation.to_html(),
            original_src: jpeg_data_uri(&request.image_jpeg),
            portrait: artifact
                .and_then(|artifact| PortraitView::new(request.style, &request.name, artifact)),
            credits,
        }
    }
}

/// handles the / GET
pub(crate) async fn home_handler(State(state): State<AppState>) -> HomeTemplate {
    HomeTemplate {
        notices: Vec::new(),
        credits: credits(&state.settings.models),
    }
}

/// handles the /proclaim POST
#[instrument(skip_all, fields(name = Empty, analysis = Empty, style = Empty))]
pub(crate) async fn proclaim_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, HeraldryError> {
    let form = read_form(multipart).await?;
    let credits = credits(&state.settings.models);

    let Some(upload) = form.image else {
        debug!("Proclamation requested without an image");
        return Ok(HomeTemplate {
            notices: vec![Notice::info(UPLOAD_PROMPT)],
            credits,
        }
        .into_response());
    };

    let request = PortraitRequest {
        image_jpeg: normalize_image_to_jpeg(&upload)?,
        name: form.name,
        analysis: form.analysis,
        style: form.style,
    };
    let span = Span::current();
    span.record("name", display_name(&request.name));
    span.record("analysis", field::debug(request.analysis));
    span.record("style", field::debug(request.style));
    info!(
        "Proclaiming {} ({} bytes, {:?}, {:?})",
        display_name(&request.name),
        request.image_jpeg.len(),
        request.analysis,
        request.style
    );

    let mut rng = StdRng::from_os_rng();
    let outcome = Pipeline::new(state.inference.as_ref(), &state.descriptors)
        .run(&request, &mut rng)
        .await;

    Ok(ProclamationTemplate::new(&request, outcome, credits).into_response())
}
