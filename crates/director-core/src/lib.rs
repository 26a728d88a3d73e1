//! # director-core
//!
//! Foundation types shared by every Director crate:
//!
//! - **Branded IDs**: `SessionId`, `CueId` as prefixed newtypes
//! - **Shared state**: [`StateStore`] guarding the process-wide [`SharedState`]
//! - **Events**: the [`Event`] enum pushed to realtime clients
//! - **Cues**: [`CueRecord`], the structured lighting cue
//! - **Errors**: validation and collaborator error types via `thiserror`
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod cue;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod state;

pub use cue::CueRecord;
pub use errors::{CollaboratorError, ValidationError};
pub use events::Event;
pub use ids::{CueId, SessionId};
pub use state::{ConsoleEndpoint, SharedState, StateStore};

/// Crate version reported by the HTTP surface.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
