//! espeak / espeak-ng speech output
//!
//! Both binaries share the same command line, so one driver covers them.
//! The text is passed as a single argument after `--`.

use super::{run_engine, SpeechOutput};
use crate::config::SpeechConfig;
use crate::error::SpeechError;
use std::time::Duration;
use tokio::process::Command;

/// espeak-family speech output
pub struct EspeakOutput {
    binary: &'static str,
    rate: u32,
    pitch: u32,
    voice: Option<String>,
    timeout: Duration,
}

impl EspeakOutput {
    fn with_binary(binary: &'static str, config: &SpeechConfig) -> Self {
        Self {
            binary,
            rate: config.rate,
            pitch: config.pitch.min(99),
            voice: config.voice.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub fn espeak_ng(config: &SpeechConfig) -> Self {
        Self::with_binary("espeak-ng", config)
    }

    pub fn espeak(config: &SpeechConfig) -> Self {
        Self::with_binary("espeak", config)
    }

    fn args(&self, text: &str) -> Vec<String> {
        let mut args = vec![
            "-s".to_string(),
            self.rate.to_string(),
            "-p".to_string(),
            self.pitch.to_string(),
        ];
        if let Some(ref voice) = self.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

#[async_trait::async_trait]
impl SpeechOutput for EspeakOutput {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let mut cmd = Command::new(self.binary);
        cmd.args(self.args(text));
        run_engine(self.binary, &mut cmd, self.timeout).await
    }

    async fn is_available(&self) -> bool {
        which::which(self.binary).is_ok()
    }

    fn name(&self) -> &'static str {
        self.binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let engine = EspeakOutput::espeak(&SpeechConfig::default());
        assert_eq!(
            engine.args("HELLO THERE"),
            vec!["-s", "140", "-p", "70", "--", "HELLO THERE"]
        );
    }

    #[test]
    fn test_voice_and_pitch_clamp() {
        let config = SpeechConfig {
            pitch: 150,
            voice: Some("en-us".to_string()),
            ..Default::default()
        };
        let engine = EspeakOutput::espeak_ng(&config);
        assert_eq!(engine.name(), "espeak-ng");
        assert_eq!(
            engine.args("-dash"),
            vec!["-s", "140", "-p", "99", "-v", "en-us", "--", "-dash"]
        );
    }

    #[tokio::test]
    async fn test_blank_text_is_silent() {
        let engine = EspeakOutput::espeak(&SpeechConfig::default());
        assert!(engine.speak("   ").await.is_ok());
    }
}
