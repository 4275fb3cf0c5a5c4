//! Blinkspeak: single-switch scanning keyboard with speech output
//!
//! This library provides the core functionality for:
//! - Scanning a keyboard layout with a timed highlight (dwell, flash, advance)
//! - Predicting which letters can continue a dictionary word
//! - Confirming every selection with a YES/NO prompt
//! - Browsing a paged library of canned phrases
//! - Speaking sentences via espeak-ng/espeak/spd-say or a custom command
//! - Receiving the single activation from evdev, stdin or SIGUSR1
//!
//! # Architecture
//!
//! ```text
//!                            ┌─────────────────────────────────────┐
//!                            │              Daemon                 │
//!                            │   frame clock, signals, state file  │
//!                            └─────────────────────────────────────┘
//!                                            │
//!                   ┌────────────────────────┼────────────────────────┐
//!                   │                        │                        │
//!                   ▼                        ▼                        ▼
//!          ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!          │  Activation  │         │    Scan      │         │    Speech    │
//!          │ evdev/stdin/ │────────▶│   Engine     │────────▶│    Worker    │
//!          │   SIGUSR1    │ activate│              │ text    │ espeak chain │
//!          └──────────────┘         └──────────────┘         └──────────────┘
//!                                     │    │    │
//!                      ┌──────────────┘    │    └──────────────┐
//!                      ▼                   ▼                   ▼
//!              ┌──────────────┐   ┌──────────────┐    ┌──────────────┐
//!              │   Registry   │   │  Predictive  │    │    Render    │
//!              │  scan order  │   │    Filter    │    │    Model     │
//!              └──────────────┘   └──────────────┘    └──────────────┘
//!                                        │                   │
//!                                        ▼                   ▼ JSON
//!                                 ┌──────────────┐    ┌──────────────┐
//!                                 │  Dictionary  │    │  State file  │
//!                                 │   Phrases    │    │  (status)    │
//!                                 └──────────────┘    └──────────────┘
//! ```

pub mod activation;
pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod scan;
pub mod speech;
pub mod state;
pub mod vocab;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{BlinkspeakError, Result};
pub use scan::{Outcome, ScanEngine};
