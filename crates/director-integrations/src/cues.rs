//! Natural-language cue generation.

use async_trait::async_trait;
use director_core::{CollaboratorError, CueRecord};
use tracing::debug;

/// Turns a free-text description into a [`CueRecord`].
#[async_trait]
pub trait CueGenerator: Send + Sync {
    /// Build a cue from `text`.
    async fn generate(&self, text: &str) -> Result<CueRecord, CollaboratorError>;
}

const COLORS: &[&str] = &[
    "red", "orange", "amber", "yellow", "green", "cyan", "blue", "magenta", "purple", "pink",
    "white", "uv",
];

const EFFECTS: &[&str] = &["strobe", "chase", "blackout", "pulse"];

const LABEL_WORDS: usize = 4;
const LABEL_MAX_CHARS: usize = 48;
const MAX_FADE_SECS: f32 = 3600.0;

/// Keyword-driven cue generator.
///
/// Recognizes colour names, `NN%` intensities (`full` and `half` too),
/// `fade N`/`fade Ns` times and a handful of effects. Anything else in the
/// text only contributes to the label.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordCueGenerator;

impl KeywordCueGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`CueGenerator::generate`].
    pub fn parse(text: &str) -> Result<CueRecord, CollaboratorError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CollaboratorError::Rejected("cue text is empty".into()));
        }

        let tokens: Vec<String> = trimmed
            .split_whitespace()
            .map(|t| {
                t.trim_matches(|c: char| !c.is_alphanumeric() && c != '%' && c != '.')
                    .to_lowercase()
            })
            .filter(|t| !t.is_empty())
            .collect();

        let mut cue = CueRecord::new(label_for(trimmed), trimmed);
        cue.color = tokens
            .iter()
            .find(|t| COLORS.contains(&t.as_str()))
            .cloned();
        cue.effect = tokens
            .iter()
            .find(|t| EFFECTS.contains(&t.as_str()))
            .cloned();
        cue.intensity = tokens.iter().find_map(|t| intensity_of(t));
        if cue.effect.as_deref() == Some("blackout") {
            cue.intensity = Some(0);
        }
        cue.fade_secs = tokens
            .windows(2)
            .find(|w| w[0] == "fade")
            .and_then(|w| leading_number(&w[1]));

        debug!(
            label = %cue.label,
            color = ?cue.color,
            intensity = ?cue.intensity,
            effect = ?cue.effect,
            "cue generated"
        );
        Ok(cue)
    }
}

#[async_trait]
impl CueGenerator for KeywordCueGenerator {
    async fn generate(&self, text: &str) -> Result<CueRecord, CollaboratorError> {
        Self::parse(text)
    }
}

fn label_for(text: &str) -> String {
    let label: String = text
        .split_whitespace()
        .take(LABEL_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    label.chars().take(LABEL_MAX_CHARS).collect()
}

fn intensity_of(token: &str) -> Option<u8> {
    match token {
        "full" => return Some(100),
        "half" => return Some(50),
        _ => {}
    }
    let digits = token.strip_suffix('%')?;
    let pct: u32 = digits.parse().ok()?;
    u8::try_from(pct.min(100)).ok()
}

fn leading_number(token: &str) -> Option<f32> {
    let end = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    let secs: f32 = token[..end].parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs.min(MAX_FADE_SECS))
}
