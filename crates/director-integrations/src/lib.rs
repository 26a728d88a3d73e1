//! # director-integrations
//!
//! External collaborators of the Director backend, each behind an
//! `async_trait` seam so the server can be driven by test doubles:
//!
//! - [`ConsoleClient`]: lighting console session ([`TelnetConsole`])
//! - [`AudioEngine`]: audio capture and tempo analysis ([`ManualTempoEngine`])
//! - [`CueGenerator`]: text to lighting cue ([`KeywordCueGenerator`])

#![deny(unsafe_code)]

pub mod audio;
pub mod console;
pub mod cues;

pub use audio::{AudioConfig, AudioEngine, ManualTempoEngine};
pub use console::{ConsoleClient, TelnetConsole};
pub use cues::{CueGenerator, KeywordCueGenerator};
