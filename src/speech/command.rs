//! Custom speech command
//!
//! Runs a user-supplied shell command and writes the text to its stdin,
//! e.g. `piper --model en_US-amy-medium.onnx --output-raw | aplay -r 22050 -f S16_LE`.
//!
//! Configuration:
//! ```toml
//! [speech]
//! engine = "command"
//! command = "festival --tts"
//! timeout_ms = 30000
//! ```

use super::SpeechOutput;
use crate::error::SpeechError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

pub struct CommandOutput {
    command: String,
    timeout: Duration,
}

impl CommandOutput {
    pub fn new(command: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl SpeechOutput for CommandOutput {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let mut child = Command::new("sh")
            .args(["-c", &self.command])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::CommandFailed(format!("spawn failed: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| SpeechError::CommandFailed(format!("write failed: {}", e)))?;
            // EOF lets the command start speaking
            drop(stdin);
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SpeechError::Timeout(self.timeout))?
            .map_err(|e| SpeechError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::CommandFailed(format!(
                "exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn is_available(&self) -> bool {
        which::which("sh").is_ok()
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
