//! Vocabulary for proclamations: titles, locations, skills and traits.
//!
//! The built-in lists are always available. When enabled, the text model is
//! asked for fresh titles, locations and skills once per cache window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::constants::{DESCRIPTOR_MAX_TOKENS, DESCRIPTOR_TEMPERATURE, DESCRIPTORS_PER_CATEGORY};
use crate::error::HeraldryError;
use crate::inference::{Inference, TextPrompt};
use crate::notice::Notice;

const DEFAULT_TITLES: [&str; 8] = [
    "Sir", "Lady", "Lord", "Dame", "Duke", "Duchess", "Earl", "Countess",
];

const DEFAULT_LOCATIONS: [&str; 8] = [
    "the Cubicle",
    "the Coffee Shop",
    "the WiFi Router",
    "the Netflix Queue",
    "the Zoom Call",
    "the Instagram Feed",
    "the Group Chat",
    "the Self-Checkout Lane",
];

const DEFAULT_SKILLS: [&str; 8] = [
    "wielder of spreadsheets",
    "master of microwaves",
    "guardian of the remote control",
    "slayer of email notifications",
    "ruler of WiFi passwords",
    "sage of memes",
    "tamer of the office printer",
    "keeper of forty open browser tabs",
];

const DEFAULT_TRAITS: [&str; 4] = [
    "possesses the wisdom of a thousand customer service calls",
    "bears the noble burden of unread messages",
    "commands the mystical forces of autocorrect",
    "survived the great reply-all storm unscathed",
];

/// The four word lists a proclamation is drawn from. Every list is non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorSet {
    /// "Sir", "Duchess", ...
    pub titles: Vec<String>,
    /// "the Cubicle", ...
    pub locations: Vec<String>,
    /// "wielder of spreadsheets", ...
    pub skills: Vec<String>,
    /// "bears the noble burden of unread messages", ...
    pub traits: Vec<String>,
}

impl Default for DescriptorSet {
    fn default() -> Self {
        Self {
            titles: owned(&DEFAULT_TITLES),
            locations: owned(&DEFAULT_LOCATIONS),
            skills: owned(&DEFAULT_SKILLS),
            traits: owned(&DEFAULT_TRAITS),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn titles_prompt() -> String {
    format!(
        "Generate {DESCRIPTORS_PER_CATEGORY} creative medieval titles similar to these examples: {}. Make them funny and modern-medieval fusion. Return as comma-separated list.",
        DEFAULT_TITLES[..5].join(", ")
    )
}

fn locations_prompt() -> String {
    format!(
        "Generate {DESCRIPTORS_PER_CATEGORY} funny modern 'locations' for medieval titles, similar to: {}. Format: 'the [modern place]'. Return as comma-separated list.",
        DEFAULT_LOCATIONS[..3].join(", ")
    )
}

fn skills_prompt() -> String {
    format!(
        "Generate {DESCRIPTORS_PER_CATEGORY} funny medieval 'skills' for modern life, similar to: {}. Return as comma-separated list.",
        DEFAULT_SKILLS[..3].join(", ")
    )
}

/// Splits a comma separated model answer, trimming whitespace and quotes.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_matches('"').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// All or nothing: enough entries are truncated to size, too few means the defaults.
fn accept(parsed: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if parsed.len() >= DESCRIPTORS_PER_CATEGORY {
        parsed
            .into_iter()
            .take(DESCRIPTORS_PER_CATEGORY)
            .collect()
    } else {
        debug!(
            "Only {} usable entries, using the default list",
            parsed.len()
        );
        owned(defaults)
    }
}

async fn ask(inference: &dyn Inference, prompt: String) -> Result<Vec<String>, HeraldryError> {
    let request = TextPrompt {
        prompt,
        max_tokens: DESCRIPTOR_MAX_TOKENS,
        temperature: DESCRIPTOR_TEMPERATURE,
    };
    let raw = inference.generate_text(&request).await?;
    Ok(parse_list(&raw))
}

/// Asks the text model for new titles, locations and skills.
///
/// Any failed call fails the whole refresh. Traits always come from the
/// built-in list.
pub async fn generate_descriptors(
    inference: &dyn Inference,
) -> Result<DescriptorSet, HeraldryError> {
    let titles = ask(inference, titles_prompt()).await?;
    let locations = ask(inference, locations_prompt()).await?;
    let skills = ask(inference, skills_prompt()).await?;

    Ok(DescriptorSet {
        titles: accept(titles, &DEFAULT_TITLES),
        locations: accept(locations, &DEFAULT_LOCATIONS),
        skills: accept(skills, &DEFAULT_SKILLS),
        traits: owned(&DEFAULT_TRAITS),
    })
}

/// [`generate_descriptors`], falling back to the built-in lists with a warning.
pub async fn refresh_descriptors(inference: &dyn Inference) -> (DescriptorSet, Option<Notice>) {
    match generate_descriptors(inference).await {
        Ok(descriptors) => {
            info!("Generated fresh descriptors");
            (descriptors, None)
        }
        Err(err) => {
            warn!("AI descriptor generation failed: {}", err);
            (
                DescriptorSet::default(),
                Some(Notice::warning(format!(
                    "AI descriptor generation failed: {err}. Using default lists."
                ))),
            )
        }
    }
}

#[derive(Debug)]
struct CachedDescriptors {
    value: Arc<DescriptorSet>,
    /// `None` when the window is too long to represent
    expires_at: Option<Instant>,
}

impl CachedDescriptors {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// The current descriptor set, rebuilt lazily once its window has passed.
///
/// The lock is never held across a model call; two requests racing past an
/// expiry both refresh and the later one wins.
#[derive(Debug)]
pub struct DescriptorCache {
    ttl: Duration,
    refresh_from_model: bool,
    entry: RwLock<Option<CachedDescriptors>>,
}

impl DescriptorCache {
    /// An empty cache. With `refresh_from_model` off, the built-in lists are
    /// used and no model is ever called.
    pub fn new(ttl: Duration, refresh_from_model: bool) -> Self {
        Self {
            ttl,
            refresh_from_model,
            entry: RwLock::new(None),
        }
    }

    /// The descriptor set for right now.
    pub async fn get(&self, inference: &dyn Inference) -> (Arc<DescriptorSet>, Option<Notice>) {
        self.get_at(inference, Instant::now()).await
    }

    /// The descriptor set as of `now`, with a notice if a refresh had to fall back.
    pub async fn get_at(
        &self,
        inference: &dyn Inference,
        now: Instant,
    ) -> (Arc<DescriptorSet>, Option<Notice>) {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref().filter(|cached| cached.is_fresh(now)) {
                return (cached.value.clone(), None);
            }
        }

        let (descriptors, notice) = if self.refresh_from_model {
            refresh_descriptors(inference).await
        } else {
            (DescriptorSet::default(), None)
        };
        let value = Arc::new(descriptors);

        *self.entry.write().await = Some(CachedDescriptors {
            value: value.clone(),
            expires_at: now.checked_add(self.ttl),
        });
        (value, notice)
    }
}
