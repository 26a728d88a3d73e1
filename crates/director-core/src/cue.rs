//! Structured lighting cue produced by the cue generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CueId;

/// A lighting cue derived from a natural-language description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueRecord {
    /// Unique cue identifier.
    pub id: CueId,
    /// Short display label.
    pub label: String,
    /// The description the cue was generated from.
    pub source_text: String,
    /// Named colour, if one was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Intensity in percent (0–100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
    /// Fade time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_secs: Option<f32>,
    /// Effect name (strobe, chase, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    /// When the cue was generated.
    pub created_at: DateTime<Utc>,
}

impl CueRecord {
    /// Create a cue with only a label and source text.
    pub fn new(label: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            id: CueId::new(),
            label: label.into(),
            source_text: source_text.into(),
            color: None,
            intensity: None,
            fade_secs: None,
            effect: None,
            created_at: Utc::now(),
        }
    }
}
