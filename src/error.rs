//! Error types for blinkspeak
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the blinkspeak application
#[derive(Error, Debug)]
pub enum BlinkspeakError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Activation error: {0}")]
    Activation(#[from] ActivationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to receiving the single activation signal
#[derive(Error, Debug)]
pub enum ActivationError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("No switch or keyboard device found in /dev/input/")]
    NoDevice,

    #[error("Activation source '{0}' is not supported on this platform")]
    NotSupported(String),

    #[error("Signal handler error: {0}")]
    Signal(String),
}

/// Errors related to speaking text aloud
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("{0} not found in PATH. Install espeak-ng or speech-dispatcher via your package manager.")]
    EngineNotFound(&'static str),

    #[error("Speech command failed: {0}")]
    CommandFailed(String),

    #[error("Speech command timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("All speech engines failed. Ensure espeak-ng, espeak or spd-say is available.")]
    AllEnginesFailed,
}

/// Result type alias using BlinkspeakError
pub type Result<T> = std::result::Result<T, BlinkspeakError>;
