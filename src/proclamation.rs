//! Composing the royal proclamation.

use std::fmt;
use std::sync::LazyLock;

use pulldown_cmark::{Event, Parser, Tag, html};
use rand::Rng;
use rand::seq::IndexedRandom;
use regex::Regex;
use tracing::warn;

use crate::constants::UNNAMED_ONE;
use crate::descriptors::DescriptorSet;

/// Fallback honorific when a hint matches nothing in [`HONORIFICS`].
pub const DEFAULT_HONORIFIC: &str = "the Mysterious";

/// Extra line in proclamations informed by the vision model.
pub const DIVINATION_LINE: &str = "*As divined by the Royal Court's mystical viewing crystal* 🔮";

/// Keyword rules, checked in order; the first rule with a matching keyword wins.
const HONORIFICS: [(&[&str], &str); 7] = [
    (&["smile", "smiling", "happy"], "the Eternally Cheerful"),
    (&["serious", "stern", "focused"], "the Contemplative"),
    (&["glasses", "spectacles"], "the Wise-Eyed Scholar"),
    (&["beard", "mustache"], "the Magnificently Whiskered"),
    (&["hat", "cap"], "the Crown-Bearer"),
    (&["young", "child"], "the Youthful"),
    (&["outdoor", "outside", "nature"], "the Wild Wanderer"),
];

const ABILITIES: [&str; 8] = [
    "find the perfect meme for any occasion",
    "remember where they put their keys (sometimes)",
    "distinguish between similar-looking apps",
    "order food without looking at the menu",
    "pretend to understand cryptocurrency",
    "nod knowingly during technical meetings",
    "keep plants alive for more than a week",
    "fold fitted sheets with minimal cursing",
];

const PROWESS: [&str; 8] = [
    "conquering the weekly grocery quest",
    "navigating the treacherous realm of IKEA",
    "mastering the ancient art of untangling earphones",
    "wielding the power of perfect emoji selection",
    "commanding respect from voice assistants",
    "achieving legendary status in online shopping",
    "maintaining the sacred ritual of coffee consumption",
    "defending the realm against spam calls",
];

static MARKUP_AND_EMOJI: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\*|\p{Extended_Pictographic}|\x{FE0F}|\x{200D}")
        .map_err(|err| warn!("Failed to build markup regex: {}", err))
        .ok()
});

/// What the vision model said about the portrait, lower-cased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisionHint(String);

impl VisionHint {
    /// Wraps a raw model answer.
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// The lower-cased text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The honorific the hint earns.
    pub fn honorific(&self) -> &'static str {
        HONORIFICS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|keyword| self.0.contains(keyword)))
            .map(|(_, honorific)| *honorific)
            .unwrap_or(DEFAULT_HONORIFIC)
    }
}

/// A finished proclamation, in markdown. Never changes once composed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proclamation {
    text: String,
}

impl Proclamation {
    /// The markdown text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Plain text with markup and emoji removed, for image prompts.
    pub fn cleaned(&self) -> String {
        let stripped = match MARKUP_AND_EMOJI.as_ref() {
            Some(regex) => regex.replace_all(&self.text, "").into_owned(),
            None => self.text.replace('*', ""),
        };
        stripped
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// The "title name of place" part, for a banner.
    ///
    /// Best effort: the text between "stands" and the next comma. Anything
    /// unexpected gives `"{name} - Royal Personage"`.
    pub fn title_phrase(&self, name: &str) -> String {
        let fallback = || format!("{name} - Royal Personage");
        if !(self.text.contains("stands") && self.text.contains("of")) {
            return fallback();
        }
        self.text
            .split("stands")
            .nth(1)
            .and_then(|rest| rest.split(',').next())
            .map(|phrase| phrase.replace("**", "").trim().to_string())
            .filter(|phrase| !phrase.is_empty())
            .unwrap_or_else(fallback)
    }

    /// HTML for the page. Raw HTML and links in the text are shown as plain text.
    pub fn to_html(&self) -> String {
        let events = Parser::new(&self.text).filter_map(|event| match event {
            Event::Html(raw) => Some(Event::Text(raw)),
            Event::Start(Tag::Link(..) | Tag::Image(..))
            | Event::End(Tag::Link(..) | Tag::Image(..)) => None,
            other => Some(other),
        });
        let mut output = String::new();
        html::push_html(&mut output, events);
        output
    }
}

impl fmt::Display for Proclamation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The name as it appears in the proclamation.
///
/// Only an empty name is replaced, anything else is used exactly as typed.
pub fn display_name(name: &str) -> &str {
    if name.is_empty() { UNNAMED_ONE } else { name }
}

fn pick<'a, R: Rng + ?Sized>(items: &'a [String], rng: &mut R) -> &'a str {
    items.choose(rng).map(String::as_str).unwrap_or_default()
}

/// Builds a proclamation from random descriptors.
///
/// With a hint, the honorific and the divination line are included and the
/// closing ability comes from a different list.
pub fn compose<R: Rng + ?Sized>(
    name: &str,
    descriptors: &DescriptorSet,
    hint: Option<&VisionHint>,
    rng: &mut R,
) -> Proclamation {
    let name = display_name(name);
    let title = pick(&descriptors.titles, rng);

    let text = match hint {
        None => {
            let location = pick(&descriptors.locations, rng);
            let skill = pick(&descriptors.skills, rng);
            let trait_ = pick(&descriptors.traits, rng);
            let ability = ABILITIES.choose(rng).copied().unwrap_or_default();
            format!(
                "🏰 **ROYAL PROCLAMATION** 🏰\n\
                \n\
                Hearken all! Before thee stands **{title} {name} of {location}**,\n\
                noble {skill} and {trait_}.\n\
                \n\
                By royal decree, this distinguished personage shall be remembered\n\
                throughout the realm for their legendary ability to {ability}.\n\
                \n\
                *Sealed with the Royal Stamp of Ridiculous Importance* 👑"
            )
        }
        Some(hint) => {
            let honorific = hint.honorific();
            let location = pick(&descriptors.locations, rng);
            let skill = pick(&descriptors.skills, rng);
            let trait_ = pick(&descriptors.traits, rng);
            let prowess = PROWESS.choose(rng).copied().unwrap_or_default();
            format!(
                "🏰 **ROYAL PROCLAMATION** 🏰\n\
                \n\
                Hearken all! Before thee stands **{title} {name} {honorific} of {location}**,\n\
                noble {skill} and {trait_}.\n\
                \n\
                {DIVINATION_LINE}\n\
                \n\
                By royal decree, this distinguished personage shall be remembered\n\
                throughout the realm for their legendary prowess in {prowess}.\n\
                \n\
                *Sealed with the Royal Stamp of AI-Enhanced Ridiculousness* 👑✨"
            )
        }
    };

    Proclamation { text }
}
