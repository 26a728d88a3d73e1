//! # director-settings
//!
//! Layered configuration for the Director backend.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults**: [`DirectorSettings::default()`]
//! 2. **Settings file**: `~/.director/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `DIRECTOR_*` overrides (highest priority)
//!
//! The merged result is validated before it is returned.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, load_with_env, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_path_lives_under_dot_director() {
        let path = settings_path();
        assert!(path.ends_with(".director/settings.json"));
    }

    #[test]
    fn re_exports_work() {
        let merged = deep_merge(serde_json::json!({"x": 1}), serde_json::json!({"y": 2}));
        assert_eq!(merged["y"], 2);
        let _ = DirectorSettings::default();
    }
}
