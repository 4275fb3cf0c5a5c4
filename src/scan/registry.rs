//! Scan targets and the keyboard scan order

use serde::{Deserialize, Serialize};

/// Non-character buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Special {
    /// Open the phrase panel
    Phrases,
    /// Ask to end the session
    Quit,
    /// Leave the phrase panel, or go back one page
    Back,
    /// Show the next page of phrases
    Next,
}

impl Special {
    pub fn label(&self) -> &'static str {
        match self {
            Special::Phrases => "PHRASES",
            Special::Quit => "QUIT",
            Special::Back => "BACK",
            Special::Next => "NEXT",
        }
    }
}

/// Answer on a YES/NO prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Yes,
    No,
}

impl Choice {
    pub fn toggled(self) -> Self {
        match self {
            Choice::Yes => Choice::No,
            Choice::No => Choice::Yes,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Choice::Yes => "YES",
            Choice::No => "NO",
        }
    }
}

/// Anything the scanner can highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A layout character
    Key(char),
    /// A navigation button
    Special(Special),
    /// A phrase, by index into the phrase library
    Phrase(usize),
    /// A YES/NO answer
    Option(Choice),
}

/// Fixed keyboard scan order
///
/// Each layout row is followed by a PHRASES button and the whole order ends
/// with a single QUIT button, so the order is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    order: Vec<Target>,
}

impl Registry {
    /// Build the scan order from layout rows
    ///
    /// Characters are uppercased; whitespace and repeats of an earlier
    /// character are dropped. Rows left empty get no PHRASES button.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        let mut order = Vec::new();
        let mut seen = Vec::new();

        for row in rows {
            let before = order.len();
            for c in row.as_ref().chars().flat_map(char::to_uppercase) {
                if c.is_whitespace() || seen.contains(&c) {
                    continue;
                }
                seen.push(c);
                order.push(Target::Key(c));
            }
            if order.len() > before {
                order.push(Target::Special(Special::Phrases));
            }
        }

        order.push(Target::Special(Special::Quit));
        Self { order }
    }

    pub fn targets(&self) -> &[Target] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Target> {
        self.order.get(index).copied()
    }

    /// Index of the next eligible target after `from`, wrapping around
    ///
    /// Specials are always eligible; keys only when `enabled` accepts them.
    /// Stops after one full pass and returns `from` if nothing qualifies.
    pub fn next_eligible<F>(&self, from: usize, enabled: F) -> usize
    where
        F: Fn(char) -> bool,
    {
        if self.is_empty() {
            return from;
        }
        let len = self.len();

        let mut index = from % len;
        for _ in 0..len {
            index = (index + 1) % len;
            match self.order[index] {
                Target::Key(c) if !enabled(c) => continue,
                _ => return index,
            }
        }
        from
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::from_rows(&["QWERTYUIOP", "ASDFGHJKL", "ZXCVBNM./-"])
    }
}
