//! Passive snapshot of the scanner for external renderers
//!
//! The daemon serialises this to the state file as JSON; `to_text` gives a
//! terminal rendering for `blinkspeak status`.

use super::registry::Target;
use crate::state::{DwellPhase, Mode};
use serde::{Deserialize, Serialize};

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    pub mode: Mode,
    pub dwell_phase: DwellPhase,
    /// Targets of the active mode, in scan order
    pub targets: Vec<RenderTarget>,
    /// Sentence typed so far
    pub buffer: String,
    /// Key or phrase awaiting YES/NO
    pub pending: Option<String>,
    /// Question shown on a YES/NO prompt
    pub prompt: Option<String>,
    /// Paging state, present in the phrase panel
    pub phrase_page: Option<PhrasePage>,
}

/// One drawable target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTarget {
    pub target: Target,
    pub label: String,
    pub enabled: bool,
    pub highlighted: bool,
}

/// Phrase panel paging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhrasePage {
    pub offset: usize,
    pub page_size: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PhrasePage {
    /// No phrases were loaded; BACK is the only target
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl RenderModel {
    /// Plain-text rendering for terminals
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        if let Some(ref prompt) = self.prompt {
            out.push_str(prompt);
            out.push('\n');
        } else {
            out.push_str(&format!("> {}_\n", self.buffer));
        }

        match self.mode {
            Mode::Keyboard => {
                let mut line = String::new();
                for t in &self.targets {
                    if matches!(t.target, Target::Special(_)) {
                        line.push_str(&cell(t));
                        out.push_str(line.trim_end());
                        out.push('\n');
                        line.clear();
                    } else {
                        line.push_str(&cell(t));
                    }
                }
            }
            Mode::PhrasePanel => {
                if self.phrase_page.as_ref().is_some_and(PhrasePage::is_empty) {
                    out.push_str("(no phrases available)\n");
                }
                for t in &self.targets {
                    out.push_str(cell(t).trim_end());
                    out.push('\n');
                }
            }
            Mode::ConfirmSelection | Mode::ConfirmQuit => {
                let line: String = self.targets.iter().map(cell).collect();
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }

        out
    }
}

fn cell(t: &RenderTarget) -> String {
    let label = if t.enabled {
        t.label.clone()
    } else {
        t.label.to_lowercase()
    };
    if t.highlighted {
        format!("[{}] ", label)
    } else {
        format!(" {}  ", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::registry::{Choice, Special};

    fn target(target: Target, label: &str, enabled: bool, highlighted: bool) -> RenderTarget {
        RenderTarget {
            target,
            label: label.to_string(),
            enabled,
            highlighted,
        }
    }

    #[test]
    fn test_keyboard_text_breaks_after_specials() {
        let model = RenderModel {
            mode: Mode::Keyboard,
            dwell_phase: DwellPhase::Green,
            targets: vec![
                target(Target::Key('A'), "A", true, false),
                target(Target::Key('B'), "B", false, false),
                target(Target::Special(Special::Phrases), "PHRASES", true, false),
                target(Target::Special(Special::Quit), "QUIT", true, true),
            ],
            buffer: "HI".to_string(),
            pending: None,
            prompt: None,
            phrase_page: None,
        };
        let text = model.to_text();
        assert_eq!(text, "> HI_\n A   b   PHRASES\n[QUIT]\n");
    }

    #[test]
    fn test_confirm_text_shows_prompt() {
        let model = RenderModel {
            mode: Mode::ConfirmSelection,
            dwell_phase: DwellPhase::Flash,
            targets: vec![
                target(Target::Option(Choice::Yes), "YES", true, false),
                target(Target::Option(Choice::No), "NO", true, true),
            ],
            buffer: String::new(),
            pending: Some("A".to_string()),
            prompt: Some("Select 'A'? YES / NO".to_string()),
            phrase_page: None,
        };
        assert_eq!(model.to_text(), "Select 'A'? YES / NO\n YES  [NO]\n");
    }

    #[test]
    fn test_empty_phrase_panel_text() {
        let model = RenderModel {
            mode: Mode::PhrasePanel,
            dwell_phase: DwellPhase::Green,
            targets: vec![target(Target::Special(Special::Back), "BACK", true, true)],
            buffer: String::new(),
            pending: None,
            prompt: None,
            phrase_page: Some(PhrasePage {
                offset: 0,
                page_size: 15,
                total: 0,
                has_previous: false,
                has_next: false,
            }),
        };
        assert!(model.to_text().contains("(no phrases available)"));
    }

    #[test]
    fn test_render_model_serializes_target_kinds() {
        let t = target(Target::Key('A'), "A", true, true);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["target"]["kind"], "key");
        assert_eq!(json["target"]["value"], "A");
    }
}
