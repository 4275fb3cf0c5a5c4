//! Activation input
//!
//! The scanner consumes a single kind of input: "commit the highlighted
//! target". Sources:
//! - evdev: a key or assistive switch read at the kernel level (Linux).
//!   Requires the user to be in the 'input' group.
//! - stdin: every line read is one activation, so an external blink
//!   detector can pipe into the daemon.
//! - signal: no dedicated source. The daemon always treats SIGUSR1 as an
//!   activation, which is what `blinkspeak activate` sends.

#[cfg(target_os = "linux")]
pub mod evdev_listener;
pub mod stdin;

use crate::config::{ActivationConfig, ActivationSourceKind};
use crate::error::ActivationError;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// One activation from some source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationEvent {
    /// Which adapter produced it, for logging
    pub source: &'static str,
}

impl ActivationEvent {
    pub fn new(source: &'static str) -> Self {
        Self { source }
    }
}

/// Trait for activation sources
#[async_trait::async_trait]
pub trait ActivationSource: Send + Sync {
    /// Start listening for activations
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<ActivationEvent>, ActivationError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), ActivationError>;
}

/// Create the configured source
///
/// Returns `None` for `source = "signal"`, where SIGUSR1 is the only input.
pub fn create_source(
    config: &ActivationConfig,
) -> Result<Option<Box<dyn ActivationSource>>, ActivationError> {
    match config.source {
        ActivationSourceKind::Evdev => create_evdev_source(config).map(Some),
        ActivationSourceKind::Stdin => Ok(Some(Box::new(stdin::StdinSource::new()))),
        ActivationSourceKind::Signal => Ok(None),
    }
}

#[cfg(target_os = "linux")]
fn create_evdev_source(
    config: &ActivationConfig,
) -> Result<Box<dyn ActivationSource>, ActivationError> {
    Ok(Box::new(evdev_listener::EvdevSource::new(config)?))
}

#[cfg(not(target_os = "linux"))]
fn create_evdev_source(
    _config: &ActivationConfig,
) -> Result<Box<dyn ActivationSource>, ActivationError> {
    Err(ActivationError::NotSupported(
        "evdev (use source = \"stdin\" or \"signal\" instead)".to_string(),
    ))
}

/// Drops activations that arrive too soon after an accepted one
///
/// A blink detector or a bouncy switch can fire twice for one intended
/// activation; the second would answer the YES/NO prompt immediately.
#[derive(Debug, Clone)]
pub struct Cooldown {
    window: Duration,
    last: Option<Instant>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether an activation at `now` should be passed to the engine
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_suppresses_bounce() {
        let t0 = Instant::now();
        let mut cooldown = Cooldown::new(Duration::from_millis(500));

        assert!(cooldown.accept(t0));
        assert!(!cooldown.accept(t0 + Duration::from_millis(100)));
        assert!(!cooldown.accept(t0 + Duration::from_millis(499)));
        assert!(cooldown.accept(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_cooldown_window_measured_from_accepted_event() {
        let t0 = Instant::now();
        let mut cooldown = Cooldown::new(Duration::from_millis(500));

        assert!(cooldown.accept(t0));
        // Rejected events do not extend the window
        assert!(!cooldown.accept(t0 + Duration::from_millis(400)));
        assert!(cooldown.accept(t0 + Duration::from_millis(600)));
    }

    #[test]
    fn test_zero_cooldown_accepts_everything() {
        let t0 = Instant::now();
        let mut cooldown = Cooldown::new(Duration::ZERO);
        assert!(cooldown.accept(t0));
        assert!(cooldown.accept(t0));
    }

    #[test]
    fn test_signal_source_has_no_adapter() {
        let config = ActivationConfig {
            source: ActivationSourceKind::Signal,
            ..Default::default()
        };
        assert!(create_source(&config).unwrap().is_none());
    }

    #[test]
    fn test_stdin_source_created() {
        let config = ActivationConfig {
            source: ActivationSourceKind::Stdin,
            ..Default::default()
        };
        assert!(create_source(&config).unwrap().is_some());
    }
}
