//! Configuration loading and types for blinkspeak
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/blinkspeak/config.toml)
//! 3. Environment variables (BLINKSPEAK_*)
//! 4. CLI arguments (highest priority)

use crate::error::BlinkspeakError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Blinkspeak Configuration
#
# Location: ~/.config/blinkspeak/config.toml
# All settings can be overridden via CLI flags

# State file for external renderers and status bars.
# Use "auto" for the default location ($XDG_RUNTIME_DIR/blinkspeak/state),
# a custom path, or "disabled" to turn off. The daemon writes the current
# render model as JSON to this file whenever it changes.
# Required for the `blinkspeak status` command.
state_file = "auto"

[scan]
# How long a target stays solid green before it starts flashing
green_ms = 1000

# How long a target flashes before focus moves on
flash_ms = 1500

# Frame cadence of the driving loop
frame_ms = 33

[keyboard]
# Scan rows, top to bottom. "." inserts a space, "/" deletes the last
# character and "-" speaks the sentence.
rows = ["QWERTYUIOP", "ASDFGHJKL", "ZXCVBNM./-"]

[phrases]
# TOML file with a `phrases = [...]` list, or "auto" for
# ~/.config/blinkspeak/phrases.toml
file = "auto"

# Phrase panel grid
rows = 5
columns = 3

[dictionary]
# Word list used to predict the next letter (one word per line)
# "auto" tries /usr/share/dict/american-english, then /usr/share/dict/words
file = "auto"

[activation]
# Where the single activation signal comes from:
# - evdev: a key or switch on any input device (requires the 'input' group)
# - stdin: one activation per line, e.g. piped from a blink detector
# - signal: SIGUSR1 only, e.g. from `blinkspeak activate`
# SIGUSR1 is accepted with every source.
source = "evdev"

# Key for the evdev source
key = "SPACE"

# Ignore activations arriving sooner than this after the previous one
cooldown_ms = 500

[speech]
# Speech engine: "auto" (espeak-ng, espeak, spd-say), "espeak", "spd-say",
# or "command" to pipe text into a custom command
engine = "auto"

# Words per minute
rate = 140

# Pitch (0-99)
pitch = 70

# Optional voice name
# voice = "en-us"

# Custom command for engine = "command" (text arrives on stdin)
# command = "piper --model en_US-amy-medium.onnx --output-raw | aplay -r 22050 -f S16_LE"

# [audio.feedback]
# Play a short sound on every activation
# enabled = true
#
# Sound theme: "default", "subtle", "mechanical", or path to custom theme directory
# theme = "default"
#
# Volume level (0.0 to 1.0)
# volume = 0.7
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub keyboard: KeyboardConfig,

    #[serde(default)]
    pub phrases: PhraseConfig,

    #[serde(default)]
    pub dictionary: DictionaryConfig,

    #[serde(default)]
    pub activation: ActivationConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    /// Optional path to state file for external renderers
    /// When set, the daemon writes the render model as JSON to this file
    /// whenever it changes.
    #[serde(default = "default_state_file")]
    pub state_file: Option<String>,
}

/// Dwell timing of the scan engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Solid highlight before flashing starts
    #[serde(default = "default_green_ms")]
    pub green_ms: u64,

    /// Flashing highlight before auto-advance
    #[serde(default = "default_flash_ms")]
    pub flash_ms: u64,

    /// Frame cadence of the driving loop
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

impl ScanConfig {
    pub fn green(&self) -> Duration {
        Duration::from_millis(self.green_ms)
    }

    pub fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            green_ms: default_green_ms(),
            flash_ms: default_flash_ms(),
            frame_ms: default_frame_ms(),
        }
    }
}

/// On-screen keyboard layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyboardConfig {
    /// Rows of characters, scanned top to bottom
    #[serde(default = "default_rows")]
    pub rows: Vec<String>,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
        }
    }
}

/// Phrase library source and panel geometry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhraseConfig {
    /// Path to the phrase file, or "auto"
    #[serde(default = "default_auto")]
    pub file: String,

    #[serde(default = "default_phrase_rows")]
    pub rows: usize,

    #[serde(default = "default_phrase_columns")]
    pub columns: usize,
}

impl PhraseConfig {
    /// Number of phrases shown per page (at least one)
    pub fn page_size(&self) -> usize {
        (self.rows * self.columns).max(1)
    }
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            file: default_auto(),
            rows: default_phrase_rows(),
            columns: default_phrase_columns(),
        }
    }
}

/// Dictionary source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DictionaryConfig {
    /// Path to a newline-separated word list, or "auto"
    #[serde(default = "default_auto")]
    pub file: String,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            file: default_auto(),
        }
    }
}

/// Where activation events come from
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationSourceKind {
    /// Key or switch read from /dev/input (default)
    #[default]
    Evdev,
    /// One activation per line read from stdin
    Stdin,
    /// SIGUSR1 delivered to the daemon
    Signal,
}

impl std::str::FromStr for ActivationSourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "evdev" => Ok(Self::Evdev),
            "stdin" => Ok(Self::Stdin),
            "signal" => Ok(Self::Signal),
            other => Err(format!(
                "unknown activation source '{}', expected evdev, stdin or signal",
                other
            )),
        }
    }
}

impl std::fmt::Display for ActivationSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Evdev => write!(f, "evdev"),
            Self::Stdin => write!(f, "stdin"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

/// Activation signal configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivationConfig {
    #[serde(default)]
    pub source: ActivationSourceKind,

    /// Key name (evdev KEY_* constant name, without the KEY_ prefix)
    #[serde(default = "default_activation_key")]
    pub key: String,

    /// Minimum spacing between two accepted activations
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            source: ActivationSourceKind::default(),
            key: default_activation_key(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Speech engine selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechEngine {
    /// espeak-ng, then espeak, then spd-say
    #[default]
    Auto,
    /// espeak-ng or espeak only
    Espeak,
    /// speech-dispatcher's spd-say only
    SpdSay,
    /// Custom shell command reading text on stdin
    Command,
}

/// Text-to-speech configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub engine: SpeechEngine,

    /// Words per minute
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Pitch, 0-99
    #[serde(default = "default_pitch")]
    pub pitch: u32,

    /// Optional voice name passed to the engine
    #[serde(default)]
    pub voice: Option<String>,

    /// Shell command for engine = "command"
    #[serde(default)]
    pub command: Option<String>,

    /// Give up on a single utterance after this long
    #[serde(default = "default_speech_timeout")]
    pub timeout_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechEngine::default(),
            rate: default_rate(),
            pitch: default_pitch(),
            voice: None,
            command: None,
            timeout_ms: default_speech_timeout(),
        }
    }
}

/// Audio configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AudioConfig {
    /// Audio feedback settings
    #[serde(default)]
    pub feedback: AudioFeedbackConfig,
}

/// Audio feedback configuration for sound cues
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioFeedbackConfig {
    /// Enable audio feedback sounds
    #[serde(default)]
    pub enabled: bool,

    /// Sound theme: "default", "subtle", "mechanical", or path to custom theme directory
    #[serde(default = "default_sound_theme")]
    pub theme: String,

    /// Volume level (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for AudioFeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            theme: default_sound_theme(),
            volume: default_volume(),
        }
    }
}

fn default_green_ms() -> u64 {
    1000
}

fn default_flash_ms() -> u64 {
    1500
}

fn default_frame_ms() -> u64 {
    33
}

fn default_rows() -> Vec<String> {
    vec![
        "QWERTYUIOP".to_string(),
        "ASDFGHJKL".to_string(),
        "ZXCVBNM./-".to_string(),
    ]
}

fn default_state_file() -> Option<String> {
    Some("auto".to_string())
}

fn default_auto() -> String {
    "auto".to_string()
}

fn default_phrase_rows() -> usize {
    5
}

fn default_phrase_columns() -> usize {
    3
}

fn default_activation_key() -> String {
    "SPACE".to_string()
}

fn default_cooldown_ms() -> u64 {
    500
}

fn default_rate() -> u32 {
    140
}

fn default_pitch() -> u32 {
    70
}

fn default_speech_timeout() -> u64 {
    30000
}

fn default_sound_theme() -> String {
    "default".to_string()
}

fn default_volume() -> f32 {
    0.7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            keyboard: KeyboardConfig::default(),
            phrases: PhraseConfig::default(),
            dictionary: DictionaryConfig::default(),
            activation: ActivationConfig::default(),
            speech: SpeechConfig::default(),
            audio: AudioConfig::default(),
            state_file: default_state_file(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "blinkspeak")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the runtime directory for ephemeral files (state, pid)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("blinkspeak")
    }

    /// Resolve the state file path from config
    /// Returns None if state_file is not configured or explicitly disabled
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file.as_ref().and_then(|path| {
            match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            }
        })
    }

    /// Resolve the phrase file path; "auto" lives next to config.toml
    pub fn resolve_phrase_file(&self) -> Option<PathBuf> {
        match self.phrases.file.as_str() {
            "auto" => Self::config_dir().map(|dir| dir.join("phrases.toml")),
            path => Some(PathBuf::from(path)),
        }
    }

    /// Resolve the dictionary path; "auto" picks the first system word list found
    pub fn resolve_dictionary_file(&self) -> Option<PathBuf> {
        match self.dictionary.file.as_str() {
            "auto" => [
                "/usr/share/dict/american-english",
                "/usr/share/dict/words",
            ]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()),
            path => Some(PathBuf::from(path)),
        }
    }

    /// Check values the engine cannot run with
    pub fn validate(&self) -> Result<(), BlinkspeakError> {
        if self.keyboard.rows.iter().all(|row| row.trim().is_empty()) {
            return Err(BlinkspeakError::Config(
                "keyboard.rows must contain at least one character".to_string(),
            ));
        }
        if self.scan.green_ms == 0 && self.scan.flash_ms == 0 {
            return Err(BlinkspeakError::Config(
                "scan.green_ms and scan.flash_ms cannot both be zero".to_string(),
            ));
        }
        if self.speech.engine == SpeechEngine::Command && self.speech.command.is_none() {
            return Err(BlinkspeakError::Config(
                "speech.engine = \"command\" requires speech.command".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, BlinkspeakError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| BlinkspeakError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| BlinkspeakError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(file) = std::env::var("BLINKSPEAK_DICTIONARY") {
        config.dictionary.file = file;
    }
    if let Ok(file) = std::env::var("BLINKSPEAK_PHRASES") {
        config.phrases.file = file;
    }
    if let Ok(source) = std::env::var("BLINKSPEAK_ACTIVATION") {
        config.activation.source = source.parse().map_err(BlinkspeakError::Config)?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.green_ms, 1000);
        assert_eq!(config.scan.flash_ms, 1500);
        assert_eq!(config.keyboard.rows.len(), 3);
        assert_eq!(config.phrases.page_size(), 15);
        assert_eq!(config.activation.source, ActivationSourceKind::Evdev);
        assert_eq!(config.speech.engine, SpeechEngine::Auto);
        assert!(!config.audio.feedback.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_text_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.keyboard.rows, default_rows());
        assert_eq!(config.speech.rate, 140);
        assert_eq!(config.activation.cooldown_ms, 500);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
            [scan]
            green_ms = 800
            flash_ms = 1200

            [phrases]
            file = "/tmp/my-phrases.toml"
            rows = 4
            columns = 2

            [activation]
            source = "signal"

            [speech]
            engine = "spd-say"
            voice = "en-gb"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scan.green(), Duration::from_millis(800));
        assert_eq!(config.scan.flash(), Duration::from_millis(1200));
        assert_eq!(config.scan.frame_ms, 33); // default
        assert_eq!(config.phrases.page_size(), 8);
        assert_eq!(
            config.resolve_phrase_file(),
            Some(PathBuf::from("/tmp/my-phrases.toml"))
        );
        assert_eq!(config.activation.source, ActivationSourceKind::Signal);
        assert_eq!(config.activation.key, "SPACE");
        assert_eq!(config.speech.engine, SpeechEngine::SpdSay);
        assert_eq!(config.speech.voice.as_deref(), Some("en-gb"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.keyboard.rows, default_rows());
        assert_eq!(config.state_file.as_deref(), Some("auto"));
    }

    #[test]
    fn test_state_file_resolution() {
        let mut config = Config::default();
        config.state_file = Some("disabled".to_string());
        assert!(config.resolve_state_file().is_none());

        config.state_file = Some("/tmp/blink-state".to_string());
        assert_eq!(
            config.resolve_state_file(),
            Some(PathBuf::from("/tmp/blink-state"))
        );

        config.state_file = Some("auto".to_string());
        assert!(config.resolve_state_file().unwrap().ends_with("blinkspeak/state"));
    }

    #[test]
    fn test_validate_rejects_empty_layout() {
        let mut config = Config::default();
        config.keyboard.rows = vec!["   ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_command_for_command_engine() {
        let mut config = Config::default();
        config.speech.engine = SpeechEngine::Command;
        assert!(config.validate().is_err());

        config.speech.command = Some("cat > /dev/null".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_activation_source_from_str() {
        assert_eq!(
            "STDIN".parse::<ActivationSourceKind>().unwrap(),
            ActivationSourceKind::Stdin
        );
        assert!("blink".parse::<ActivationSourceKind>().is_err());
    }
}
