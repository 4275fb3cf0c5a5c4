//! Audio module
//!
//! Non-speech sound cues played through rodio. Speech itself is produced by
//! external engines, see [`crate::speech`].

pub mod feedback;

pub use feedback::{AudioFeedback, SoundEvent};
