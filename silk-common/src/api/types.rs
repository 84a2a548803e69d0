//! Shared request/response types for the interpretation flow

use serde::{Deserialize, Serialize};

/// One entry of the fortune-stick catalog, as submitted by the client
/// with an interpretation request.
///
/// The catalog itself lives client-side; the server only consumes the
/// textual fields when building the oracle prompt. Field names mirror the
/// catalog's JSON keys, including the `...EN` English-translation variants,
/// so a catalog entry can be posted unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FortuneStick {
    /// Stick number (1-100)
    pub number: u32,

    /// Fortune level, e.g. 大吉 / 中平 / 下下
    pub level: String,

    /// Fortune level rendered as an English concept
    #[serde(default, rename = "levelEN", skip_serializing_if = "Option::is_none")]
    pub level_en: Option<String>,

    /// Verse content (original language)
    pub content: String,

    /// Poetic English rendition of the verse
    #[serde(default, rename = "contentEN", skip_serializing_if = "Option::is_none")]
    pub content_en: Option<String>,

    /// Plain-language explanation of the verse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail2: Option<String>,

    /// English translation of the explanation
    #[serde(default, rename = "detail2EN", skip_serializing_if = "Option::is_none")]
    pub detail2_en: Option<String>,

    /// Name of the associated legend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,

    /// Legend's hero archetype (English)
    #[serde(default, rename = "storyEN", skip_serializing_if = "Option::is_none")]
    pub story_en: Option<String>,

    /// Brief retelling of the legend
    #[serde(default, rename = "storyBrief", skip_serializing_if = "Option::is_none")]
    pub story_brief: Option<String>,

    /// Brief retelling of the legend (English)
    #[serde(default, rename = "storyBriefEN", skip_serializing_if = "Option::is_none")]
    pub story_brief_en: Option<String>,
}

impl FortuneStick {
    /// English level when available, original level otherwise
    pub fn display_level(&self) -> &str {
        self.level_en.as_deref().unwrap_or(&self.level)
    }

    /// English verse when available, original verse otherwise
    pub fn display_content(&self) -> &str {
        self.content_en.as_deref().unwrap_or(&self.content)
    }
}

/// The three-part personalized reading returned by the interpret endpoint.
///
/// Ephemeral - assembled per request, never persisted. All three fields are
/// guaranteed non-empty by the response normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    /// How the lot's energy responds to the seeker's question
    pub resonance: String,
    /// The legend's metaphor applied to the seeker's situation
    pub weaving: String,
    /// One simple reflective practice for the week
    pub ritual: String,
}
