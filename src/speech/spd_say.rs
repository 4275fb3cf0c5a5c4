//! speech-dispatcher output via spd-say
//!
//! spd-say takes rate and pitch on a -100..100 scale, so the espeak-style
//! settings are mapped onto it. `-w` makes it block until speech is done.

use super::{run_engine, SpeechOutput};
use crate::config::SpeechConfig;
use crate::error::SpeechError;
use std::time::Duration;
use tokio::process::Command;

/// espeak's default speed in words per minute, maps to spd-say rate 0
const NEUTRAL_WPM: i32 = 175;
/// espeak's default pitch, maps to spd-say pitch 0
const NEUTRAL_PITCH: i32 = 50;

pub struct SpdSayOutput {
    rate: i32,
    pitch: i32,
    voice: Option<String>,
    timeout: Duration,
}

impl SpdSayOutput {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            rate: map_rate(config.rate),
            pitch: map_pitch(config.pitch),
            voice: config.voice.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    fn args(&self, text: &str) -> Vec<String> {
        let mut args = vec![
            "-w".to_string(),
            "-r".to_string(),
            self.rate.to_string(),
            "-p".to_string(),
            self.pitch.to_string(),
        ];
        if let Some(ref voice) = self.voice {
            args.push("-y".to_string());
            args.push(voice.clone());
        }
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

fn map_rate(wpm: u32) -> i32 {
    let wpm = wpm.min(1000) as i32;
    ((wpm - NEUTRAL_WPM) / 2).clamp(-100, 100)
}

fn map_pitch(pitch: u32) -> i32 {
    let pitch = pitch.min(99) as i32;
    ((pitch - NEUTRAL_PITCH) * 2).clamp(-100, 100)
}

#[async_trait::async_trait]
impl SpeechOutput for SpdSayOutput {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let mut cmd = Command::new("spd-say");
        cmd.args(self.args(text));
        run_engine("spd-say", &mut cmd, self.timeout).await
    }

    async fn is_available(&self) -> bool {
        which::which("spd-say").is_ok()
    }

    fn name(&self) -> &'static str {
        "spd-say"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_mapping() {
        assert_eq!(map_rate(175), 0);
        assert_eq!(map_rate(140), -17);
        assert_eq!(map_rate(0), -87);
        assert_eq!(map_rate(900), 100);
    }

    #[test]
    fn test_pitch_mapping() {
        assert_eq!(map_pitch(50), 0);
        assert_eq!(map_pitch(70), 40);
        assert_eq!(map_pitch(0), -100);
        assert_eq!(map_pitch(500), 98);
    }

    #[test]
    fn test_args() {
        let engine = SpdSayOutput::new(&SpeechConfig::default());
        assert_eq!(
            engine.args("HI"),
            vec!["-w", "-r", "-17", "-p", "40", "--", "HI"]
        );
    }
}
