//! State types for the scan engine
//!
//! Defines the interface modes and the dwell timer that drives
//! automatic scanning:
//! Keyboard → PhrasePanel / ConfirmSelection / ConfirmQuit → Keyboard

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Which screen the engine is scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Scanning letters, controls and the PHRASES/QUIT buttons
    Keyboard,

    /// Scanning one page of the phrase library
    PhrasePanel,

    /// YES/NO guard before a key or phrase is committed
    ConfirmSelection,

    /// YES/NO guard before the session ends
    ConfirmQuit,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Keyboard => write!(f, "keyboard"),
            Mode::PhrasePanel => write!(f, "phrases"),
            Mode::ConfirmSelection => write!(f, "confirm"),
            Mode::ConfirmQuit => write!(f, "quit"),
        }
    }
}

/// Highlight phase of the focused target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DwellPhase {
    /// Solid highlight, focus just arrived
    Green,
    /// Flashing highlight, focus is about to move on
    Flash,
}

/// Dwell timer for the focused target
///
/// Time is always supplied by the caller so the timer is a pure function
/// of its inputs.
#[derive(Debug, Clone)]
pub struct Dwell {
    phase: DwellPhase,
    started_at: Instant,
    green: Duration,
    flash: Duration,
}

impl Dwell {
    /// Start a dwell cycle at `now`
    pub fn new(green: Duration, flash: Duration, now: Instant) -> Self {
        Self {
            phase: DwellPhase::Green,
            started_at: now,
            green,
            flash,
        }
    }

    /// Begin a fresh cycle in the green phase
    pub fn restart(&mut self, now: Instant) {
        self.phase = DwellPhase::Green;
        self.started_at = now;
    }

    pub fn phase(&self) -> DwellPhase {
        self.phase
    }

    /// Time spent on the current target, zero if `now` precedes the start
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Move the phase forward for `now`
    ///
    /// Returns true when the full green + flash window has passed and the
    /// caller should advance focus. The timer does not restart itself.
    pub fn poll(&mut self, now: Instant) -> bool {
        let elapsed = self.elapsed(now);

        if self.phase == DwellPhase::Green && elapsed >= self.green {
            self.phase = DwellPhase::Flash;
        }

        self.phase == DwellPhase::Flash && elapsed >= self.green + self.flash
    }
}

impl std::fmt::Display for DwellPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DwellPhase::Green => write!(f, "green"),
            DwellPhase::Flash => write!(f, "flash"),
        }
    }
}
