//! Config handling

use std::time::Duration;

use tracing::log::LevelFilter;
use url::Url;

use crate::cli::CliOptions;
use crate::error::HeraldryError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Which hosted models answer which question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Models {
    /// Text generation, `owner/name[:version]`
    pub text: String,
    /// Vision description, `owner/name[:version]`
    pub vision: String,
    /// Image editing, `owner/name[:version]`
    pub image: String,
}

/// Validated runtime settings, built once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Replicate API token
    pub api_token: String,
    /// Replicate API base, without a trailing slash
    pub api_base: Url,
    /// Models to call
    pub models: Models,
    /// Lifetime of a cached descriptor set
    pub descriptor_ttl: Duration,
    /// Whether descriptors are refreshed from the text model at all
    pub refresh_descriptors: bool,
    /// Whether transformed portraits are fetched for download
    pub download_output: bool,
    /// Upload body limit
    pub max_upload_bytes: usize,
}

impl Settings {
    /// Validates the CLI options. A missing or blank API token is fatal.
    pub fn from_cli(cli: &CliOptions) -> Result<Self, HeraldryError> {
        let api_token = cli
            .replicate_api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(HeraldryError::MissingCredential)?
            .to_string();

        let api_base = Url::parse(cli.replicate_api_base.trim().trim_end_matches('/'))?;

        Ok(Self {
            api_token,
            api_base,
            models: Models {
                text: cli.text_model.trim().to_string(),
                vision: cli.vision_model.trim().to_string(),
                image: cli.image_model.trim().to_string(),
            },
            descriptor_ttl: Duration::from_secs(cli.descriptor_ttl),
            refresh_descriptors: !cli.static_descriptors,
            download_output: !cli.no_download_output,
            max_upload_bytes: cli.max_upload_bytes,
        })
    }
}
