//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;

use crate::constants::{
    DEFAULT_DESCRIPTOR_TTL_SECONDS, DEFAULT_IMAGE_MODEL, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_REPLICATE_API_BASE, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL,
};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "HERALDRY_DEBUG")]
    /// Enable debug logging. Env: HERALDRY_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "HERALDRY_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: HERALDRY_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "HERALDRY_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: HERALDRY_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    /// Replicate API token, get one at <https://replicate.com/account/api-tokens>.
    /// Env: REPLICATE_API_TOKEN
    pub replicate_api_token: Option<String>,

    #[clap(long, default_value = DEFAULT_REPLICATE_API_BASE, env = "REPLICATE_API_BASE")]
    /// Base URL of the Replicate HTTP API.
    /// Env: REPLICATE_API_BASE
    pub replicate_api_base: String,

    #[clap(long, default_value = DEFAULT_TEXT_MODEL, env = "HERALDRY_TEXT_MODEL")]
    /// Model used to invent new titles, locations and skills.
    /// Env: HERALDRY_TEXT_MODEL
    pub text_model: String,

    #[clap(long, default_value = DEFAULT_VISION_MODEL, env = "HERALDRY_VISION_MODEL")]
    /// Model used to describe the uploaded portrait.
    /// Env: HERALDRY_VISION_MODEL
    pub vision_model: String,

    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "HERALDRY_IMAGE_MODEL")]
    /// Image editing model used for overlays and royal transformations.
    /// Env: HERALDRY_IMAGE_MODEL
    pub image_model: String,

    #[clap(
        long,
        default_value_t = DEFAULT_DESCRIPTOR_TTL_SECONDS,
        env = "HERALDRY_DESCRIPTOR_TTL"
    )]
    /// How long (in seconds) AI generated descriptors are reused.
    /// Env: HERALDRY_DESCRIPTOR_TTL
    pub descriptor_ttl: u64,

    #[clap(long, env = "HERALDRY_STATIC_DESCRIPTORS")]
    /// Never ask the text model for descriptors, always use the built-in lists.
    /// Env: HERALDRY_STATIC_DESCRIPTORS
    pub static_descriptors: bool,

    #[clap(long, env = "HERALDRY_NO_DOWNLOAD_OUTPUT")]
    /// Don't fetch transformed portraits for the download button, only link to them.
    /// Env: HERALDRY_NO_DOWNLOAD_OUTPUT
    pub no_download_output: bool,

    #[clap(
        long,
        default_value_t = DEFAULT_MAX_UPLOAD_BYTES,
        env = "HERALDRY_MAX_UPLOAD_BYTES"
    )]
    /// Largest accepted upload body, in bytes.
    /// Env: HERALDRY_MAX_UPLOAD_BYTES
    pub max_upload_bytes: usize,
}
