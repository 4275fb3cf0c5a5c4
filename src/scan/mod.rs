//! Scan-and-select engine
//!
//! A timer-driven automaton that moves a highlight through the targets of
//! the active mode and treats a single activation as "commit the highlighted
//! target". Every commit goes through a YES/NO confirmation so one stray
//! activation never changes the sentence.
//!
//! The engine never reads a clock: the host passes `now` to [`ScanEngine::tick`]
//! and [`ScanEngine::activate`]. Within one host frame the host ticks first
//! and then delivers the frame's activations, so an activation arriving as
//! the dwell expires applies to the newly highlighted target.

pub mod predict;
pub mod registry;
pub mod render;

use crate::config::Config;
use crate::state::{Dwell, DwellPhase, Mode};
use crate::vocab::{Dictionary, PhraseLibrary};
use predict::{compute_valid_keys, key_enabled, BACKSPACE_KEY, ENTER_KEY, SPACE_KEY};
use registry::{Choice, Registry, Special, Target};
use render::{PhrasePage, RenderModel, RenderTarget};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// What the host should do after an activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to speak
    Nothing,
    /// Speak the trimmed buffer, then call [`ScanEngine::clear_buffer`]
    Enter,
    /// Speak this phrase
    Phrase(String),
    /// The user confirmed QUIT; the host should end the session
    Quit,
}

/// Timing and geometry for an engine
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub green: Duration,
    pub flash: Duration,
    /// Phrases per panel page
    pub page_size: usize,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            green: config.scan.green(),
            flash: config.scan.flash(),
            page_size: config.phrases.page_size(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            green: Duration::from_millis(1000),
            flash: Duration::from_millis(1500),
            page_size: 15,
        }
    }
}

/// Focus inside the phrase panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelCursor {
    Back,
    /// Index into the visible page
    Slot(usize),
    Next,
}

/// What a YES/NO prompt is guarding
#[derive(Debug, Clone, PartialEq, Eq)]
enum Subject {
    Key(char),
    Phrase(String),
    Quit,
}

#[derive(Debug, Clone)]
struct Confirmation {
    subject: Subject,
    choice: Choice,
    /// Mode to resume once answered
    return_to: Mode,
}

/// The scan engine for one session
pub struct ScanEngine {
    registry: Registry,
    dictionary: Dictionary,
    phrases: PhraseLibrary,
    page_size: usize,

    mode: Mode,
    key_index: usize,
    panel_offset: usize,
    panel_cursor: PanelCursor,
    confirmation: Option<Confirmation>,
    dwell: Dwell,

    buffer: String,
    terminated: bool,
}

impl ScanEngine {
    /// Create an engine in keyboard mode with the first target highlighted
    pub fn new(
        registry: Registry,
        dictionary: Dictionary,
        phrases: PhraseLibrary,
        settings: ScanSettings,
        now: Instant,
    ) -> Self {
        Self {
            registry,
            dictionary,
            phrases,
            page_size: settings.page_size.max(1),
            mode: Mode::Keyboard,
            key_index: 0,
            panel_offset: 0,
            panel_cursor: PanelCursor::Back,
            confirmation: None,
            dwell: Dwell::new(settings.green, settings.flash, now),
            buffer: String::new(),
            terminated: false,
        }
    }

    /// Create an engine from the layout and timing in `config`
    pub fn from_config(
        config: &Config,
        dictionary: Dictionary,
        phrases: PhraseLibrary,
        now: Instant,
    ) -> Self {
        Self::new(
            Registry::from_rows(&config.keyboard.rows),
            dictionary,
            phrases,
            ScanSettings::from_config(config),
            now,
        )
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn dwell_phase(&self) -> DwellPhase {
        self.dwell.phase()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Clear the sentence after the host has spoken it
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// True once the user has confirmed QUIT
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Position of the keyboard highlight in the scan order
    pub fn key_index(&self) -> usize {
        self.key_index
    }

    /// First phrase shown on the current panel page
    pub fn phrase_offset(&self) -> usize {
        self.panel_offset
    }

    /// Text of the key or phrase awaiting confirmation
    pub fn pending(&self) -> Option<String> {
        self.confirmation.as_ref().and_then(|c| match &c.subject {
            Subject::Key(k) => Some(k.to_string()),
            Subject::Phrase(text) => Some(text.clone()),
            Subject::Quit => None,
        })
    }

    /// Characters the predictive filter currently allows
    pub fn valid_keys(&self) -> BTreeSet<char> {
        compute_valid_keys(&self.buffer, &self.dictionary)
    }

    /// The highlighted target of the active mode
    pub fn highlighted(&self) -> Option<Target> {
        match self.mode {
            Mode::Keyboard => self.registry.get(self.key_index),
            Mode::PhrasePanel => Some(match self.panel_cursor {
                PanelCursor::Back => Target::Special(Special::Back),
                PanelCursor::Slot(i) => Target::Phrase(self.panel_offset + i),
                PanelCursor::Next => Target::Special(Special::Next),
            }),
            Mode::ConfirmSelection | Mode::ConfirmQuit => self
                .confirmation
                .as_ref()
                .map(|c| Target::Option(c.choice)),
        }
    }

    /// Swap in a reloaded phrase library, clamping stale panel state
    pub fn replace_phrases(&mut self, phrases: PhraseLibrary) {
        self.phrases = phrases;
        self.clamp_panel();
    }

    /// Swap in a reloaded dictionary
    pub fn replace_dictionary(&mut self, dictionary: Dictionary) {
        self.dictionary = dictionary;
    }

    /// Advance the dwell timer, moving focus when the dwell expires
    pub fn tick(&mut self, now: Instant) {
        if self.terminated {
            return;
        }

        if self.dwell.poll(now) {
            self.advance();
            self.dwell.restart(now);
            tracing::trace!("Focus moved to {:?}", self.highlighted());
        }
    }

    /// Handle one activation, committing or navigating per the active mode
    pub fn activate(&mut self, now: Instant) -> Outcome {
        if self.terminated {
            return Outcome::Nothing;
        }

        self.dwell.restart(now);
        tracing::debug!("Activation in {} on {:?}", self.mode, self.highlighted());

        match self.mode {
            Mode::Keyboard => self.activate_keyboard(),
            Mode::PhrasePanel => self.activate_panel(),
            Mode::ConfirmSelection => self.answer_selection(),
            Mode::ConfirmQuit => self.answer_quit(),
        }
    }

    /// Snapshot for the renderer
    pub fn render_model(&self) -> RenderModel {
        let (targets, phrase_page) = match self.mode {
            Mode::Keyboard => (self.keyboard_targets(), None),
            Mode::PhrasePanel => (self.panel_targets(), Some(self.phrase_page())),
            Mode::ConfirmSelection | Mode::ConfirmQuit => (self.option_targets(), None),
        };

        let prompt = self.confirmation.as_ref().map(|c| match &c.subject {
            Subject::Key(k) => format!("Select '{}'? YES / NO", k),
            Subject::Phrase(text) => format!("Say \"{}\"? YES / NO", text),
            Subject::Quit => "Are you sure you want to quit? YES / NO".to_string(),
        });

        RenderModel {
            mode: self.mode,
            dwell_phase: self.dwell.phase(),
            targets,
            buffer: self.buffer.clone(),
            pending: self.pending(),
            prompt,
            phrase_page,
        }
    }

    // === Advance ===

    fn advance(&mut self) {
        match self.mode {
            Mode::Keyboard => {
                let valid = self.valid_keys();
                self.key_index = self
                    .registry
                    .next_eligible(self.key_index, |c| key_enabled(&valid, c));
            }
            Mode::PhrasePanel => {
                self.clamp_panel();
                self.panel_cursor = self.next_cursor();
            }
            Mode::ConfirmSelection | Mode::ConfirmQuit => {
                if let Some(ref mut confirmation) = self.confirmation {
                    confirmation.choice = confirmation.choice.toggled();
                }
            }
        }
    }

    fn next_cursor(&self) -> PanelCursor {
        let visible = self.visible_count();
        let after_phrases = if self.has_next_page() {
            PanelCursor::Next
        } else {
            PanelCursor::Back
        };

        match self.panel_cursor {
            PanelCursor::Back if visible > 0 => PanelCursor::Slot(0),
            PanelCursor::Back => after_phrases,
            PanelCursor::Slot(i) if i + 1 < visible => PanelCursor::Slot(i + 1),
            PanelCursor::Slot(_) => after_phrases,
            PanelCursor::Next => PanelCursor::Back,
        }
    }

    // === Activation ===

    fn activate_keyboard(&mut self) -> Outcome {
        match self.registry.get(self.key_index) {
            Some(Target::Key(c)) => {
                if key_enabled(&self.valid_keys(), c) {
                    self.confirm(Subject::Key(c), Mode::ConfirmSelection, Mode::Keyboard);
                } else {
                    tracing::debug!("Key {:?} is not selectable, ignoring activation", c);
                }
            }
            Some(Target::Special(Special::Phrases)) => {
                self.mode = Mode::PhrasePanel;
                self.panel_offset = 0;
                self.panel_cursor = PanelCursor::Back;
            }
            Some(Target::Special(Special::Quit)) => {
                self.confirm(Subject::Quit, Mode::ConfirmQuit, Mode::Keyboard);
            }
            _ => {}
        }
        Outcome::Nothing
    }

    fn activate_panel(&mut self) -> Outcome {
        self.clamp_panel();

        match self.panel_cursor {
            PanelCursor::Back if self.panel_offset == 0 => {
                self.mode = Mode::Keyboard;
            }
            PanelCursor::Back => {
                self.panel_offset = self.panel_offset.saturating_sub(self.page_size);
            }
            PanelCursor::Next => {
                self.panel_offset += self.page_size;
                if self.panel_offset >= self.phrases.len() {
                    self.panel_offset = 0;
                }
                self.panel_cursor = PanelCursor::Back;
                tracing::debug!("Phrase page offset now {}", self.panel_offset);
            }
            PanelCursor::Slot(i) => {
                if let Some(text) = self.phrases.get(self.panel_offset + i) {
                    let subject = Subject::Phrase(text.to_string());
                    self.confirm(subject, Mode::ConfirmSelection, Mode::PhrasePanel);
                }
            }
        }
        Outcome::Nothing
    }

    fn answer_selection(&mut self) -> Outcome {
        let Some(confirmation) = self.confirmation.take() else {
            self.mode = Mode::Keyboard;
            return Outcome::Nothing;
        };
        self.mode = confirmation.return_to;

        if confirmation.choice == Choice::No {
            tracing::debug!("Selection cancelled");
            return Outcome::Nothing;
        }

        match confirmation.subject {
            Subject::Key(c) => self.commit_key(c),
            Subject::Phrase(text) => Outcome::Phrase(text),
            Subject::Quit => Outcome::Nothing,
        }
    }

    fn answer_quit(&mut self) -> Outcome {
        let choice = self
            .confirmation
            .take()
            .map(|c| c.choice)
            .unwrap_or(Choice::No);

        if choice == Choice::Yes {
            tracing::info!("Quit confirmed");
            self.terminated = true;
            return Outcome::Quit;
        }

        self.mode = Mode::Keyboard;
        Outcome::Nothing
    }

    fn confirm(&mut self, subject: Subject, mode: Mode, return_to: Mode) {
        self.confirmation = Some(Confirmation {
            subject,
            choice: Choice::Yes,
            return_to,
        });
        self.mode = mode;
    }

    fn commit_key(&mut self, key: char) -> Outcome {
        match key {
            SPACE_KEY => self.buffer.push(' '),
            BACKSPACE_KEY => {
                self.buffer.pop();
            }
            ENTER_KEY => return Outcome::Enter,
            c => self.buffer.push(c),
        }
        tracing::debug!("Buffer: {:?}", self.buffer);
        Outcome::Nothing
    }

    // === Phrase panel ===

    fn visible_count(&self) -> usize {
        self.phrases.page(self.panel_offset, self.page_size).len()
    }

    /// Pages wrap around, so NEXT exists whenever there is more than one page
    fn has_next_page(&self) -> bool {
        self.phrases.len() > self.page_size
    }

    fn clamp_panel(&mut self) {
        if self.panel_offset != 0 && self.panel_offset >= self.phrases.len() {
            tracing::debug!(
                "Phrase offset {} out of range for {} phrases, resetting",
                self.panel_offset,
                self.phrases.len()
            );
            self.panel_offset = 0;
            self.panel_cursor = PanelCursor::Back;
        }

        let stale = match self.panel_cursor {
            PanelCursor::Slot(i) => i >= self.visible_count(),
            PanelCursor::Next => !self.has_next_page(),
            PanelCursor::Back => false,
        };
        if stale {
            self.panel_cursor = PanelCursor::Back;
        }
    }

    fn phrase_page(&self) -> PhrasePage {
        PhrasePage {
            offset: self.panel_offset,
            page_size: self.page_size,
            total: self.phrases.len(),
            has_previous: self.panel_offset > 0,
            has_next: self.has_next_page(),
        }
    }

    // === Render ===

    fn keyboard_targets(&self) -> Vec<RenderTarget> {
        let valid = self.valid_keys();
        self.registry
            .targets()
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let (label, enabled) = match *target {
                    Target::Key(c) => (c.to_string(), key_enabled(&valid, c)),
                    Target::Special(s) => (s.label().to_string(), true),
                    _ => (String::new(), false),
                };
                RenderTarget {
                    target: *target,
                    label,
                    enabled,
                    highlighted: i == self.key_index,
                }
            })
            .collect()
    }

    fn panel_targets(&self) -> Vec<RenderTarget> {
        let button = |special: Special, cursor: PanelCursor| RenderTarget {
            target: Target::Special(special),
            label: special.label().to_string(),
            enabled: true,
            highlighted: self.panel_cursor == cursor,
        };

        let mut targets = vec![button(Special::Back, PanelCursor::Back)];
        let page = self.phrases.page(self.panel_offset, self.page_size);
        targets.extend(page.iter().enumerate().map(|(i, text)| RenderTarget {
            target: Target::Phrase(self.panel_offset + i),
            label: text.clone(),
            enabled: true,
            highlighted: self.panel_cursor == PanelCursor::Slot(i),
        }));
        if self.has_next_page() {
            targets.push(button(Special::Next, PanelCursor::Next));
        }
        targets
    }

    fn option_targets(&self) -> Vec<RenderTarget> {
        let selected = self.confirmation.as_ref().map(|c| c.choice);
        [Choice::Yes, Choice::No]
            .into_iter()
            .map(|choice| RenderTarget {
                target: Target::Option(choice),
                label: choice.label().to_string(),
                enabled: true,
                highlighted: selected == Some(choice),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(2600);

    fn engine_with(words: &[&str], phrases: usize, t0: Instant) -> ScanEngine {
        ScanEngine::new(
            Registry::default(),
            Dictionary::new(words.iter().copied()),
            PhraseLibrary::new((0..phrases).map(|i| format!("phrase {}", i))),
            ScanSettings::default(),
            t0,
        )
    }

    fn commit(engine: &mut ScanEngine, key: char) -> Outcome {
        engine.commit_key(key)
    }

    #[test]
    fn test_commit_space_and_backspace() {
        let mut engine = engine_with(&[], 0, Instant::now());
        commit(&mut engine, 'H');
        commit(&mut engine, 'I');
        assert_eq!(engine.buffer(), "HI");

        assert_eq!(commit(&mut engine, '.'), Outcome::Nothing);
        assert_eq!(engine.buffer(), "HI ");

        assert_eq!(commit(&mut engine, '/'), Outcome::Nothing);
        assert_eq!(engine.buffer(), "HI");
    }

    #[test]
    fn test_commit_enter_leaves_buffer() {
        let mut engine = engine_with(&[], 0, Instant::now());
        commit(&mut engine, 'H');
        assert_eq!(commit(&mut engine, '-'), Outcome::Enter);
        assert_eq!(engine.buffer(), "H");
    }

    #[test]
    fn test_backspace_on_empty_buffer() {
        let mut engine = engine_with(&[], 0, Instant::now());
        assert_eq!(commit(&mut engine, '/'), Outcome::Nothing);
        assert_eq!(engine.buffer(), "");
    }

    #[test]
    fn test_next_cursor_with_single_page() {
        let t0 = Instant::now();
        let mut engine = engine_with(&[], 2, t0);
        engine.mode = Mode::PhrasePanel;

        assert_eq!(engine.next_cursor(), PanelCursor::Slot(0));
        engine.panel_cursor = PanelCursor::Slot(1);
        assert_eq!(engine.next_cursor(), PanelCursor::Back);
    }

    #[test]
    fn test_next_cursor_with_empty_library() {
        let mut engine = engine_with(&[], 0, Instant::now());
        engine.mode = Mode::PhrasePanel;
        assert_eq!(engine.next_cursor(), PanelCursor::Back);
    }

    #[test]
    fn test_clamp_after_library_shrinks() {
        let t0 = Instant::now();
        let mut engine = engine_with(&[], 40, t0);
        engine.mode = Mode::PhrasePanel;
        engine.panel_offset = 30;
        engine.panel_cursor = PanelCursor::Slot(8);

        engine.replace_phrases(PhraseLibrary::new(["only one"]));
        assert_eq!(engine.phrase_offset(), 0);
        assert_eq!(engine.panel_cursor, PanelCursor::Back);

        engine.tick(t0 + STEP);
        assert_eq!(engine.highlighted(), Some(Target::Phrase(0)));
    }

    #[test]
    fn test_stale_slot_on_same_page_resets_to_back() {
        let mut engine = engine_with(&[], 10, Instant::now());
        engine.mode = Mode::PhrasePanel;
        engine.panel_cursor = PanelCursor::Slot(9);

        engine.replace_phrases(PhraseLibrary::new(["a", "b"]));
        assert_eq!(engine.panel_cursor, PanelCursor::Back);
    }

    #[test]
    fn test_terminated_engine_ignores_input() {
        let t0 = Instant::now();
        let mut engine = engine_with(&[], 0, t0);
        engine.terminated = true;
        engine.tick(t0 + STEP);
        assert_eq!(engine.key_index(), 0);
        assert_eq!(engine.activate(t0 + STEP), Outcome::Nothing);
    }
}
