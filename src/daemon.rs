//! Daemon module - main event loop orchestration
//!
//! Owns the scan engine and drives it from a fixed frame clock. Activation
//! sources and the speech worker run as separate tasks and talk to the loop
//! over channels.
//!
//! Within one frame the engine is ticked first, then every activation that
//! arrived since the previous frame is applied at the same instant.

use crate::activation::{self, ActivationEvent, Cooldown};
use crate::audio::{AudioFeedback, SoundEvent};
use crate::config::Config;
use crate::error::{ActivationError, Result};
use crate::scan::registry::{Choice, Target};
use crate::scan::{Outcome, ScanEngine};
use crate::speech;
use crate::vocab;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Write the render model for external renderers
///
/// Goes through a temporary file and a rename so readers never see a
/// partial document.
fn write_state_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    let tmp = path.with_extension("tmp");
    let result = std::fs::write(&tmp, contents).and_then(|_| std::fs::rename(&tmp, path));
    match result {
        Ok(()) => tracing::trace!("State file updated ({} bytes)", contents.len()),
        Err(e) => tracing::warn!("Failed to write state file: {}", e),
    }
}

fn remove_file_quietly(path: &Path, what: &str) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove {}: {}", what, e);
        }
    }
}

/// Path of the PID file used by `blinkspeak activate`
pub fn pid_file_path() -> PathBuf {
    Config::runtime_dir().join("pid")
}

/// Write PID file for external control via signals
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = pid_file_path();

    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

/// What one activation did, for feedback and speech
#[derive(Debug, Clone, PartialEq)]
struct Applied {
    /// Target under focus when the activation landed
    target: Option<Target>,
    outcome: Outcome,
}

/// Run one frame: tick, then apply `activations` at the same instant
fn run_frame(engine: &mut ScanEngine, activations: usize, now: Instant) -> Vec<Applied> {
    engine.tick(now);

    let mut applied = Vec::with_capacity(activations);
    for _ in 0..activations {
        if engine.terminated() {
            break;
        }
        let target = engine.highlighted();
        let outcome = engine.activate(now);
        applied.push(Applied { target, outcome });
    }
    applied
}

/// Cue for an applied activation, beyond the plain activation sound
fn answer_sound(target: Option<Target>) -> Option<SoundEvent> {
    match target {
        Some(Target::Option(Choice::Yes)) => Some(SoundEvent::Confirm),
        Some(Target::Option(Choice::No)) => Some(SoundEvent::Cancel),
        _ => None,
    }
}

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
    state_file_path: Option<PathBuf>,
    pid_file_path: Option<PathBuf>,
    audio_feedback: Option<AudioFeedback>,
    last_state: Option<String>,
}

impl Daemon {
    /// Create a new daemon with the given configuration
    pub fn new(config: Config) -> Self {
        let state_file_path = config.resolve_state_file();

        let audio_feedback = if config.audio.feedback.enabled {
            match AudioFeedback::new(&config.audio.feedback) {
                Ok(feedback) => {
                    tracing::info!(
                        "Audio feedback enabled (theme: {}, volume: {:.0}%)",
                        config.audio.feedback.theme,
                        config.audio.feedback.volume * 100.0
                    );
                    Some(feedback)
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize audio feedback: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            state_file_path,
            pid_file_path: None,
            audio_feedback,
            last_state: None,
        }
    }

    fn play_feedback(&self, event: SoundEvent) {
        if let Some(ref feedback) = self.audio_feedback {
            feedback.play(event);
        }
    }

    /// Publish the render model if it changed since the last write
    fn publish(&mut self, engine: &ScanEngine) {
        let Some(ref path) = self.state_file_path else {
            return;
        };

        let json = match serde_json::to_string(&engine.render_model()) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize render model: {}", e);
                return;
            }
        };

        if self.last_state.as_deref() != Some(json.as_str()) {
            write_state_file(path, &json);
            self.last_state = Some(json);
        }
    }

    fn speak(&self, speech_tx: &mpsc::Sender<String>, text: String) {
        if let Err(e) = speech_tx.try_send(text) {
            tracing::warn!("Speech queue rejected utterance: {}", e);
            self.play_feedback(SoundEvent::Error);
        }
    }

    fn load_vocabulary(&self) -> (vocab::Dictionary, vocab::PhraseLibrary) {
        let dictionary = vocab::load_dictionary(self.config.resolve_dictionary_file().as_deref());
        let phrases = vocab::load_phrases(self.config.resolve_phrase_file().as_deref());
        tracing::info!(
            "Vocabulary: {} words, {} phrases",
            dictionary.len(),
            phrases.len()
        );
        (dictionary, phrases)
    }

    /// Act on what a frame's activations produced
    ///
    /// Returns false once the user confirmed QUIT.
    fn handle(
        &self,
        engine: &mut ScanEngine,
        applied: Vec<Applied>,
        speech_tx: &mpsc::Sender<String>,
    ) -> bool {
        for Applied { target, outcome } in applied {
            if let Some(sound) = answer_sound(target) {
                self.play_feedback(sound);
            }

            match outcome {
                Outcome::Nothing => {}
                Outcome::Enter => {
                    let sentence = engine.buffer().trim().to_string();
                    if sentence.is_empty() {
                        tracing::debug!("ENTER with an empty buffer, nothing to speak");
                    } else {
                        self.speak(speech_tx, sentence);
                    }
                    engine.clear_buffer();
                }
                Outcome::Phrase(text) => self.speak(speech_tx, text),
                Outcome::Quit => {
                    tracing::info!("Quit confirmed");
                    return false;
                }
            }
        }
        true
    }

    /// Main event loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting blinkspeak daemon");

        self.pid_file_path = write_pid_file();

        let mut sigusr1 = signal(SignalKind::user_defined1())
            .map_err(|e| ActivationError::Signal(format!("SIGUSR1: {}", e)))?;
        let mut sighup = signal(SignalKind::hangup())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        if let Some(ref path) = self.state_file_path {
            tracing::info!("State file: {:?}", path);
        }

        // Activation source (SIGUSR1 is always accepted as well)
        let mut source = activation::create_source(&self.config.activation)?;
        let mut activation_rx = match source {
            Some(ref mut source) => Some(source.start().await?),
            None => None,
        };
        tracing::info!(
            "Activation: {} (key {}), SIGUSR1 via 'blinkspeak activate'",
            self.config.activation.source,
            self.config.activation.key
        );
        let mut cooldown = Cooldown::new(Duration::from_millis(self.config.activation.cooldown_ms));

        // Speech worker
        let chain = speech::create_speech_chain(&self.config.speech);
        tracing::debug!(
            "Speech chain: {}",
            chain.iter().map(|e| e.name()).collect::<Vec<_>>().join(" -> ")
        );
        let (speech_tx, speech_task) = speech::spawn_worker(chain);

        let (dictionary, phrases) = self.load_vocabulary();
        let mut engine = ScanEngine::from_config(&self.config, dictionary, phrases, Instant::now());

        let mut frame = tokio::time::interval(self.config.scan.frame());
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Activations received since the last frame
        let mut queued = 0usize;

        self.publish(&engine);
        tracing::info!("Scanning started");

        loop {
            tokio::select! {
                _ = frame.tick() => {
                    let applied = run_frame(&mut engine, queued, Instant::now());
                    queued = 0;
                    let keep_running = self.handle(&mut engine, applied, &speech_tx);
                    self.publish(&engine);
                    if !keep_running {
                        break;
                    }
                }

                event = async {
                    match &mut activation_rx {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match event {
                        Some(event) => self.receive(event, &mut cooldown, &mut queued),
                        None => {
                            tracing::warn!("Activation source closed, SIGUSR1 still accepted");
                            activation_rx = None;
                        }
                    }
                }

                _ = sigusr1.recv() => {
                    self.receive(ActivationEvent::new("signal"), &mut cooldown, &mut queued);
                }

                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading dictionary and phrases");
                    let (dictionary, phrases) = self.load_vocabulary();
                    engine.replace_dictionary(dictionary);
                    engine.replace_phrases(phrases);
                    self.publish(&engine);
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        if let Some(mut source) = source {
            source.stop().await?;
        }

        // Let queued speech (e.g. a last sentence) finish
        drop(speech_tx);
        if let Err(e) = speech_task.await {
            tracing::warn!("Speech worker ended abnormally: {}", e);
        }

        if let Some(ref path) = self.state_file_path {
            remove_file_quietly(path, "state file");
        }
        if let Some(ref path) = self.pid_file_path {
            remove_file_quietly(path, "PID file");
        }

        tracing::info!("Daemon stopped");

        Ok(())
    }

    fn receive(&self, event: ActivationEvent, cooldown: &mut Cooldown, queued: &mut usize) {
        if !cooldown.accept(Instant::now()) {
            tracing::debug!("Activation from {} within cooldown, ignored", event.source);
            return;
        }
        tracing::debug!("Activation from {}", event.source);
        self.play_feedback(SoundEvent::Activate);
        *queued += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::registry::{Registry, Special};
    use crate::scan::ScanSettings;
    use crate::state::Mode;
    use crate::vocab::{Dictionary, PhraseLibrary};

    fn engine(now: Instant) -> ScanEngine {
        ScanEngine::new(
            Registry::default(),
            Dictionary::new(["THANK", "YOU"]),
            PhraseLibrary::default(),
            ScanSettings::default(),
            now,
        )
    }

    #[test]
    fn test_frame_ticks_before_activations() {
        let t0 = Instant::now();
        let mut engine = engine(t0);
        assert_eq!(engine.highlighted(), Some(Target::Key('Q')));

        // The dwell on Q expired; the activation must land on T
        let applied = run_frame(&mut engine, 1, t0 + Duration::from_millis(2600));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].target, Some(Target::Key('T')));
        assert_eq!(engine.mode(), Mode::ConfirmSelection);
        assert_eq!(engine.pending().as_deref(), Some("T"));
    }

    #[test]
    fn test_frame_applies_all_queued_activations() {
        let t0 = Instant::now();
        let mut engine = engine(t0);
        run_frame(&mut engine, 0, t0 + Duration::from_millis(2600));

        // Select T then answer YES in the same frame
        let applied = run_frame(&mut engine, 2, t0 + Duration::from_millis(2700));
        assert_eq!(applied[1].target, Some(Target::Option(Choice::Yes)));
        assert_eq!(engine.buffer(), "T");
        assert_eq!(engine.mode(), Mode::Keyboard);
    }

    #[test]
    fn test_frame_stops_after_quit() {
        let mut now = Instant::now();
        let mut engine = engine(now);
        while engine.highlighted() != Some(Target::Special(Special::Quit)) {
            now += Duration::from_millis(2600);
            run_frame(&mut engine, 0, now);
        }

        let applied = run_frame(&mut engine, 3, now);
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[1].outcome, Outcome::Quit);
    }

    #[test]
    fn test_answer_sounds() {
        assert_eq!(
            answer_sound(Some(Target::Option(Choice::Yes))),
            Some(SoundEvent::Confirm)
        );
        assert_eq!(
            answer_sound(Some(Target::Option(Choice::No))),
            Some(SoundEvent::Cancel)
        );
        assert_eq!(answer_sound(Some(Target::Key('A'))), None);
    }

    #[test]
    fn test_state_file_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state");

        write_state_file(&path, "{\"mode\":\"keyboard\"}");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"mode\":\"keyboard\"}"
        );
        assert!(!path.with_extension("tmp").exists());

        remove_file_quietly(&path, "state file");
        assert!(!path.exists());
    }
}
