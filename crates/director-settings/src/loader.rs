//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DirectorSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `DIRECTOR_*` environment overrides (highest priority)
//! 4. Validate cross-field constraints

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::DirectorSettings;

/// Resolve the default settings file (`~/.director/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".director").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DirectorSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with process env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DirectorSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, resolving overrides through `lookup`.
pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<DirectorSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(DirectorSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: DirectorSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, arrays and scalars are replaced, and `null` in
/// `source` leaves the target value in place.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `DIRECTOR_*` overrides. Invalid values are ignored with a warning.
pub fn apply_env_overrides<F>(settings: &mut DirectorSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("DIRECTOR_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("DIRECTOR_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.usize("DIRECTOR_MAX_CONNECTIONS", 1, 100_000) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.usize("DIRECTOR_SEND_QUEUE", 1, 65_536) {
        settings.server.max_send_queue = v;
    }
    if let Some(v) = env.u64("DIRECTOR_HEARTBEAT_INTERVAL", 1, 3_600) {
        settings.server.heartbeat_interval_secs = v;
        // keep the timeout at least one interval long
        if settings.server.heartbeat_timeout_secs < v {
            settings.server.heartbeat_timeout_secs = v * 3;
        }
    }
    if let Some(v) = env.u64("DIRECTOR_CONSOLE_TIMEOUT_MS", 100, 120_000) {
        settings.console.connect_timeout_ms = v;
    }
    if let Some(v) = env.u64("DIRECTOR_TEMPO_POLL_MS", 10, 60_000) {
        settings.audio.tempo_poll_interval_ms = v;
    }
    if let Some(v) = env.string("DIRECTOR_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("DIRECTOR_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within an inclusive range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `usize` within an inclusive range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ── Env readers ─────────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T>(&self, name: &str, kind: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = (self.lookup)(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, kind, "invalid env var, ignoring");
        }
        result
    }

    fn bool(&self, name: &str) -> Option<bool> {
        self.parsed(name, "bool", parse_bool)
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        self.parsed(name, "u16", |v| parse_u16_range(v, min, max))
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        self.parsed(name, "u64", |v| parse_u64_range(v, min, max))
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        self.parsed(name, "usize", |v| parse_usize_range(v, min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8000, "host": "127.0.0.1"}});
        let source = serde_json::json!({"server": {"port": 9000}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9000);
        assert_eq!(merged["server"]["host"], "127.0.0.1");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replaces() {
        let target = serde_json::json!({"devices": ["default"]});
        let source = serde_json::json!({"devices": ["usb", "line-in"]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["devices"], serde_json::json!(["usb", "line-in"]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    #[test]
    fn merge_adds_new_keys() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged, serde_json::json!({"a": 1, "b": 2}));
    }

    // ── loading ─────────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_with_env(Path::new("/nonexistent/settings.json"), no_env).unwrap();
        assert_eq!(settings, DirectorSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9100, "maxConnections": 8}, "audio": {"devices": ["usb"]}}"#,
        )
        .unwrap();

        let settings = load_with_env(&path, no_env).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.max_connections, 8);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.audio.devices, vec!["usb".to_string()]);
        assert_eq!(settings.audio.tempo_poll_interval_ms, 500);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load_with_env(&path, no_env).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "eight thousand"}}"#).unwrap();

        assert!(matches!(
            load_with_env(&path, no_env),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn file_failing_validation_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"maxSendQueue": 0}}"#).unwrap();

        assert!(matches!(
            load_with_env(&path, no_env),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 9100}}"#).unwrap();

        let settings = load_with_env(
            &path,
            env(&[("DIRECTOR_PORT", "9200"), ("DIRECTOR_LOG_JSON", "yes")]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9200);
        assert!(settings.logging.json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = DirectorSettings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("DIRECTOR_PORT", "0"),
                ("DIRECTOR_MAX_CONNECTIONS", "lots"),
                ("DIRECTOR_LOG_JSON", "maybe"),
                ("DIRECTOR_HOST", "   "),
            ]),
        );
        assert_eq!(settings, DirectorSettings::default());
    }

    #[test]
    fn env_overrides_every_documented_key() {
        let mut settings = DirectorSettings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("DIRECTOR_HOST", "0.0.0.0"),
                ("DIRECTOR_PORT", "8088"),
                ("DIRECTOR_MAX_CONNECTIONS", "4"),
                ("DIRECTOR_SEND_QUEUE", "32"),
                ("DIRECTOR_HEARTBEAT_INTERVAL", "10"),
                ("DIRECTOR_CONSOLE_TIMEOUT_MS", "250"),
                ("DIRECTOR_TEMPO_POLL_MS", "100"),
                ("DIRECTOR_LOG_LEVEL", "debug"),
                ("DIRECTOR_LOG_JSON", "1"),
            ]),
        );
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.server.max_connections, 4);
        assert_eq!(settings.server.max_send_queue, 32);
        assert_eq!(settings.server.heartbeat_interval_secs, 10);
        assert_eq!(settings.server.heartbeat_timeout_secs, 90);
        assert_eq!(settings.console.connect_timeout_ms, 250);
        assert_eq!(settings.audio.tempo_poll_interval_ms, 100);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
        settings.validate().unwrap();
    }

    #[test]
    fn long_heartbeat_interval_stretches_timeout() {
        let mut settings = DirectorSettings::default();
        apply_env_overrides(&mut settings, env(&[("DIRECTOR_HEARTBEAT_INTERVAL", "120")]));
        assert_eq!(settings.server.heartbeat_interval_secs, 120);
        assert_eq!(settings.server.heartbeat_timeout_secs, 360);
        settings.validate().unwrap();
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "on", "TRUE", " On "] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "no", "off", "No"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("8000", 1, 65535), Some(8000));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
        assert_eq!(parse_u16_range("port", 1, 65535), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("500", 10, 60_000), Some(500));
        assert_eq!(parse_u64_range("5", 10, 60_000), None);
        assert_eq!(parse_u64_range("60001", 10, 60_000), None);
    }

    #[test]
    fn parse_usize_bounds() {
        assert_eq!(parse_usize_range("64", 1, 100_000), Some(64));
        assert_eq!(parse_usize_range("0", 1, 100_000), None);
    }
}
