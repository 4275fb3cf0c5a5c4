//! Text-to-speech output
//!
//! Fallback chain for `engine = "auto"`:
//! 1. espeak-ng - maintained fork, preferred when installed
//! 2. espeak - the classic engine
//! 3. spd-say - speech-dispatcher, uses whatever synthesizer it is configured for
//!
//! Speech runs on a background worker so a long utterance never stalls the
//! scan loop.

pub mod command;
pub mod espeak;
pub mod spd_say;

use crate::config::{SpeechConfig, SpeechEngine};
use crate::error::SpeechError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Utterances waiting to be spoken before new ones are dropped
const QUEUE_DEPTH: usize = 16;

/// Trait for speech engines
#[async_trait::async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak the text and wait until the engine is done
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;

    /// Check if this engine is installed
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the engines to try, in order
pub fn create_speech_chain(config: &SpeechConfig) -> Vec<Box<dyn SpeechOutput>> {
    let mut chain: Vec<Box<dyn SpeechOutput>> = Vec::new();

    match config.engine {
        SpeechEngine::Auto => {
            chain.push(Box::new(espeak::EspeakOutput::espeak_ng(config)));
            chain.push(Box::new(espeak::EspeakOutput::espeak(config)));
            chain.push(Box::new(spd_say::SpdSayOutput::new(config)));
        }
        SpeechEngine::Espeak => {
            chain.push(Box::new(espeak::EspeakOutput::espeak_ng(config)));
            chain.push(Box::new(espeak::EspeakOutput::espeak(config)));
        }
        SpeechEngine::SpdSay => {
            chain.push(Box::new(spd_say::SpdSayOutput::new(config)));
        }
        SpeechEngine::Command => {
            // validate() rejects a missing command, so this only skips on misuse
            if let Some(ref cmd) = config.command {
                chain.push(Box::new(command::CommandOutput::new(
                    cmd,
                    Duration::from_millis(config.timeout_ms),
                )));
            }
        }
    }

    chain
}

/// Try each engine in the chain until one succeeds
pub async fn speak_with_fallback(
    chain: &[Box<dyn SpeechOutput>],
    text: &str,
) -> Result<(), SpeechError> {
    for engine in chain {
        if !engine.is_available().await {
            tracing::debug!("{} not available, trying next", engine.name());
            continue;
        }

        match engine.speak(text).await {
            Ok(()) => {
                tracing::debug!("Spoke via {}", engine.name());
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("{} failed: {}, trying next", engine.name(), e);
            }
        }
    }

    Err(SpeechError::AllEnginesFailed)
}

/// Spawn the background speaker
///
/// Utterances are spoken one at a time in the order they were queued. The
/// worker exits once every sender is dropped.
pub fn spawn_worker(chain: Vec<Box<dyn SpeechOutput>>) -> (mpsc::Sender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(QUEUE_DEPTH);

    let handle = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            tracing::info!("Speaking: {:?}", text);
            if let Err(e) = speak_with_fallback(&chain, &text).await {
                tracing::error!("Speech failed: {}", e);
            }
        }
        tracing::debug!("Speech worker stopped");
    });

    (tx, handle)
}

/// Run an engine binary to completion under a timeout
pub(crate) async fn run_engine(
    name: &'static str,
    command: &mut Command,
    limit: Duration,
) -> Result<(), SpeechError> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(limit, output)
        .await
        .map_err(|_| SpeechError::Timeout(limit))?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SpeechError::EngineNotFound(name)
            } else {
                SpeechError::CommandFailed(format!("{}: {}", name, e))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SpeechError::CommandFailed(format!(
            "{} exited with {}: {}",
            name,
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        available: bool,
        fail: bool,
        spoken: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(available: bool, fail: bool) -> (Self, Arc<Mutex<Vec<String>>>) {
            let spoken = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    available,
                    fail,
                    spoken: spoken.clone(),
                },
                spoken,
            )
        }
    }

    #[async_trait::async_trait]
    impl SpeechOutput for Recorder {
        async fn speak(&self, text: &str) -> Result<(), SpeechError> {
            if self.fail {
                return Err(SpeechError::CommandFailed("boom".to_string()));
            }
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[test]
    fn test_auto_chain_order() {
        let chain = create_speech_chain(&SpeechConfig::default());
        let names: Vec<_> = chain.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["espeak-ng", "espeak", "spd-say"]);
    }

    #[test]
    fn test_command_chain() {
        let config = SpeechConfig {
            engine: SpeechEngine::Command,
            command: Some("cat > /dev/null".to_string()),
            ..Default::default()
        };
        let chain = create_speech_chain(&config);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name(), "command");
    }

    #[tokio::test]
    async fn test_fallback_skips_unavailable_and_failing() {
        let (missing, missing_log) = Recorder::new(false, false);
        let (broken, _) = Recorder::new(true, true);
        let (working, working_log) = Recorder::new(true, false);
        let chain: Vec<Box<dyn SpeechOutput>> =
            vec![Box::new(missing), Box::new(broken), Box::new(working)];

        speak_with_fallback(&chain, "HELLO").await.unwrap();
        assert!(missing_log.lock().unwrap().is_empty());
        assert_eq!(*working_log.lock().unwrap(), vec!["HELLO".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_all_failed() {
        let (broken, _) = Recorder::new(true, true);
        let chain: Vec<Box<dyn SpeechOutput>> = vec![Box::new(broken)];
        assert!(matches!(
            speak_with_fallback(&chain, "HELLO").await,
            Err(SpeechError::AllEnginesFailed)
        ));
        assert!(matches!(
            speak_with_fallback(&[], "HELLO").await,
            Err(SpeechError::AllEnginesFailed)
        ));
    }

    #[tokio::test]
    async fn test_worker_speaks_in_order() {
        let (recorder, log) = Recorder::new(true, false);
        let (tx, handle) = spawn_worker(vec![Box::new(recorder)]);

        tx.send("ONE".to_string()).await.unwrap();
        tx.send("TWO".to_string()).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["ONE".to_string(), "TWO".to_string()]
        );
    }

    #[tokio::test]
    async fn test_run_engine_missing_binary() {
        let mut cmd = Command::new("blinkspeak-no-such-engine");
        let result = run_engine("missing", &mut cmd, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(SpeechError::EngineNotFound("missing"))));
    }

    #[tokio::test]
    async fn test_run_engine_nonzero_exit() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo nope >&2; exit 3"]);
        let result = run_engine("sh", &mut cmd, Duration::from_secs(5)).await;
        match result {
            Err(SpeechError::CommandFailed(msg)) => assert!(msg.contains("nope")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_engine_timeout() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let result = run_engine("sleep", &mut cmd, Duration::from_millis(100)).await;
        match result {
            Err(e @ SpeechError::Timeout(_)) => {
                assert_eq!(e.to_string(), "Speech command timed out after 100ms");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
