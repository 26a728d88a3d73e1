//! Gateway command inputs and their validation.

use director_core::ValidationError;
use director_integrations::AudioConfig;
use serde::Deserialize;

/// Default console remote port.
pub const DEFAULT_CONSOLE_PORT: u16 = 30000;
/// Longest accepted host name.
pub const MAX_HOST_LENGTH: usize = 253;
/// Longest accepted cue description, in characters.
pub const MAX_CUE_TEXT_LENGTH: usize = 2000;
/// Longest accepted console command line, in characters.
pub const MAX_COMMAND_LENGTH: usize = 256;
/// Tempo range accepted from tap tempo, in BPM.
pub const TAP_TEMPO_RANGE: std::ops::RangeInclusive<f64> = 20.0..=300.0;

const SUPPORTED_PROTOCOLS: &[&str] = &["telnet"];
const SAMPLE_RATES: std::ops::RangeInclusive<u32> = 8_000..=384_000;
const BUFFER_SIZES: std::ops::RangeInclusive<u32> = 16..=16_384;

/// `POST /console/connect` body.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectConsoleRequest {
    /// Console host name or IP address.
    pub host: String,
    /// Console port.
    pub port: u16,
    /// Remote protocol.
    pub protocol: String,
}

impl Default for ConnectConsoleRequest {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_CONSOLE_PORT,
            protocol: "telnet".to_string(),
        }
    }
}

impl ConnectConsoleRequest {
    /// Check host, port and protocol.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_host(&self.host)?;
        if self.port == 0 {
            return Err(ValidationError::new("port", "must be between 1 and 65535"));
        }
        if !SUPPORTED_PROTOCOLS.contains(&self.protocol.as_str()) {
            return Err(ValidationError::new(
                "protocol",
                format!("unsupported protocol '{}'", self.protocol),
            ));
        }
        Ok(())
    }
}

fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::new("host", "must not be empty"));
    }
    if host.len() > MAX_HOST_LENGTH {
        return Err(ValidationError::new(
            "host",
            format!("must be at most {MAX_HOST_LENGTH} characters"),
        ));
    }
    let valid = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'));
    if !valid || host.starts_with('-') || host.starts_with('.') {
        return Err(ValidationError::new(
            "host",
            "must be a host name or IP address",
        ));
    }
    Ok(())
}

/// `POST /audio/start` body. Accepts camelCase and snake_case keys.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartMonitoringRequest {
    /// Input device name.
    #[serde(alias = "input_device")]
    pub input_device: String,
    /// Sample rate in Hz.
    #[serde(alias = "sample_rate")]
    pub sample_rate: u32,
    /// Frames per analysis buffer.
    #[serde(alias = "buffer_size")]
    pub buffer_size: u32,
}

impl Default for StartMonitoringRequest {
    fn default() -> Self {
        let config = AudioConfig::default();
        Self {
            input_device: config.input_device,
            sample_rate: config.sample_rate,
            buffer_size: config.buffer_size,
        }
    }
}

impl StartMonitoringRequest {
    /// Check device name, sample rate and buffer size.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.input_device.trim().is_empty() {
            return Err(ValidationError::new("inputDevice", "must not be empty"));
        }
        if !SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(ValidationError::new(
                "sampleRate",
                format!(
                    "must be between {} and {} Hz",
                    SAMPLE_RATES.start(),
                    SAMPLE_RATES.end()
                ),
            ));
        }
        if !BUFFER_SIZES.contains(&self.buffer_size) || !self.buffer_size.is_power_of_two() {
            return Err(ValidationError::new(
                "bufferSize",
                format!(
                    "must be a power of two between {} and {}",
                    BUFFER_SIZES.start(),
                    BUFFER_SIZES.end()
                ),
            ));
        }
        Ok(())
    }

    /// Capture configuration for the audio engine.
    pub fn to_config(&self) -> AudioConfig {
        AudioConfig {
            input_device: self.input_device.clone(),
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
        }
    }
}

/// `POST /cue/generate` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GenerateCueRequest {
    /// Natural-language cue description.
    pub text: String,
}

impl GenerateCueRequest {
    /// Check the description is present and bounded.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::new("text", "must not be empty"));
        }
        if self.text.chars().count() > MAX_CUE_TEXT_LENGTH {
            return Err(ValidationError::new(
                "text",
                format!("must be at most {MAX_CUE_TEXT_LENGTH} characters"),
            ));
        }
        Ok(())
    }
}

/// `POST /console/command` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleCommandRequest {
    /// One command line, sent as-is.
    pub command: String,
}

impl ConsoleCommandRequest {
    /// Check the command is a single bounded line.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.command.trim().is_empty() {
            return Err(ValidationError::new("command", "must not be empty"));
        }
        if self.command.contains(['\r', '\n']) {
            return Err(ValidationError::new("command", "must be a single line"));
        }
        if self.command.chars().count() > MAX_COMMAND_LENGTH {
            return Err(ValidationError::new(
                "command",
                format!("must be at most {MAX_COMMAND_LENGTH} characters"),
            ));
        }
        Ok(())
    }
}

/// `POST /audio/tempo` body.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SetTempoRequest {
    /// Tempo in BPM.
    pub bpm: f64,
}

impl SetTempoRequest {
    /// Check the tempo is within the tap range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !TAP_TEMPO_RANGE.contains(&self.bpm) {
            return Err(ValidationError::new(
                "bpm",
                format!(
                    "must be between {} and {}",
                    TAP_TEMPO_RANGE.start(),
                    TAP_TEMPO_RANGE.end()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(host: &str) -> ConnectConsoleRequest {
        ConnectConsoleRequest {
            host: host.into(),
            ..ConnectConsoleRequest::default()
        }
    }

    #[test]
    fn connect_defaults() {
        let req: ConnectConsoleRequest = serde_json::from_str(r#"{"host":"10.0.0.5"}"#).unwrap();
        assert_eq!(req.port, 30000);
        assert_eq!(req.protocol, "telnet");
        req.validate().unwrap();
    }

    #[test]
    fn accepts_hostnames_and_ips() {
        for host in ["console.local", "10.0.0.5", "::1", "ma3-main_1"] {
            connect(host).validate().unwrap();
        }
    }

    #[test]
    fn rejects_bad_hosts() {
        for host in ["", "has space", "-leading", "a/b", "host;rm"] {
            let err = connect(host).validate().unwrap_err();
            assert_eq!(err.field, "host", "host {host:?}");
        }
        let long = "a".repeat(MAX_HOST_LENGTH + 1);
        assert!(connect(&long).validate().is_err());
    }

    #[test]
    fn rejects_port_zero() {
        let req = ConnectConsoleRequest {
            port: 0,
            ..connect("10.0.0.5")
        };
        assert_eq!(req.validate().unwrap_err().field, "port");
    }

    #[test]
    fn rejects_unknown_protocol() {
        let req = ConnectConsoleRequest {
            protocol: "ssh".into(),
            ..connect("10.0.0.5")
        };
        assert_eq!(req.validate().unwrap_err().field, "protocol");
    }

    #[test]
    fn out_of_range_port_fails_to_parse() {
        let parsed = serde_json::from_str::<ConnectConsoleRequest>(r#"{"host":"h","port":70000}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn monitoring_defaults() {
        let req: StartMonitoringRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.input_device, "default");
        assert_eq!(req.sample_rate, 44_100);
        assert_eq!(req.buffer_size, 512);
        req.validate().unwrap();
    }

    #[test]
    fn monitoring_accepts_both_spellings() {
        let camel: StartMonitoringRequest =
            serde_json::from_str(r#"{"inputDevice":"usb","sampleRate":48000,"bufferSize":256}"#)
                .unwrap();
        let snake: StartMonitoringRequest =
            serde_json::from_str(r#"{"input_device":"usb","sample_rate":48000,"buffer_size":256}"#)
                .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.to_config().input_device, "usb");
    }

    #[test]
    fn monitoring_rejects_bad_values() {
        let base = StartMonitoringRequest::default();
        let cases = [
            (
                StartMonitoringRequest {
                    input_device: " ".into(),
                    ..base.clone()
                },
                "inputDevice",
            ),
            (
                StartMonitoringRequest {
                    sample_rate: 100,
                    ..base.clone()
                },
                "sampleRate",
            ),
            (
                StartMonitoringRequest {
                    buffer_size: 500,
                    ..base.clone()
                },
                "bufferSize",
            ),
            (
                StartMonitoringRequest {
                    buffer_size: 32_768,
                    ..base.clone()
                },
                "bufferSize",
            ),
        ];
        for (req, field) in cases {
            assert_eq!(req.validate().unwrap_err().field, field);
        }
    }

    #[test]
    fn cue_text_bounds() {
        assert!(GenerateCueRequest::default().validate().is_err());
        assert!(GenerateCueRequest { text: "  ".into() }.validate().is_err());
        GenerateCueRequest {
            text: "blue wash".into(),
        }
        .validate()
        .unwrap();
        let long = GenerateCueRequest {
            text: "x".repeat(MAX_CUE_TEXT_LENGTH + 1),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn command_must_be_one_bounded_line() {
        let ok = ConsoleCommandRequest {
            command: "Go+ Sequence 1".into(),
        };
        ok.validate().unwrap();
        for bad in ["", "   ", "Go+\r\nClear", "Go+\n"] {
            let req = ConsoleCommandRequest {
                command: bad.into(),
            };
            assert_eq!(req.validate().unwrap_err().field, "command", "{bad:?}");
        }
        let long = ConsoleCommandRequest {
            command: "x".repeat(MAX_COMMAND_LENGTH + 1),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn tap_tempo_range() {
        let parsed: SetTempoRequest = serde_json::from_str(r#"{"bpm":128.5}"#).unwrap();
        parsed.validate().unwrap();
        for bpm in [0.0, 19.9, 300.5, f64::NAN, f64::INFINITY] {
            assert_eq!(SetTempoRequest { bpm }.validate().unwrap_err().field, "bpm");
        }
        assert!(SetTempoRequest::default().validate().is_err());
    }
}
