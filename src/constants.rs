//! Shared constants for things
//!

/// Default Replicate API base
pub const DEFAULT_REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";

/// Default text model, invents titles, locations and skills
pub const DEFAULT_TEXT_MODEL: &str = "meta/meta-llama-3-70b-instruct";

/// Default vision model, describes the portrait in a few words
pub const DEFAULT_VISION_MODEL: &str =
    "yorickvp/llava-13b:b5f6212d032508382d61ff00469ddda3e32fd8a0e75dc39d8a4191bb742157fb";

/// Default image editing model
pub const DEFAULT_IMAGE_MODEL: &str = "google/nano-banana";

/// How long (in seconds) a descriptor set is reused.
pub const DEFAULT_DESCRIPTOR_TTL_SECONDS: u64 = 60 * 60;

/// Largest accepted upload, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Stand-in name when the user doesn't give one
pub const UNNAMED_ONE: &str = "The Unnamed One";

/// Entries requested from (and accepted from) the text model per category
pub const DESCRIPTORS_PER_CATEGORY: usize = 8;

/// Output budget for each descriptor request
pub const DESCRIPTOR_MAX_TOKENS: u32 = 100;

/// Sampling temperature for each descriptor request
pub const DESCRIPTOR_TEMPERATURE: f32 = 0.8;

/// Seconds between polls of a prediction that is still running
pub const PREDICTION_POLL_INTERVAL_SECONDS: u64 = 1;
