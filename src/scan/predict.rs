//! Dictionary-driven next-letter prediction
//!
//! Restricts which letters can be scanned based on the partial word at the
//! end of the buffer. The control keys are always available.

use crate::vocab::Dictionary;
use std::collections::BTreeSet;

/// Inserts a space
pub const SPACE_KEY: char = '.';
/// Deletes the last character
pub const BACKSPACE_KEY: char = '/';
/// Speaks the sentence
pub const ENTER_KEY: char = '-';

/// Keys that are never restricted by prediction
pub const CONTROL_KEYS: [char; 3] = [SPACE_KEY, BACKSPACE_KEY, ENTER_KEY];

const WORD_BOUNDARY: char = ' ';

pub fn is_control_key(c: char) -> bool {
    CONTROL_KEYS.contains(&c)
}

/// A–Z plus the control keys
pub fn full_key_set() -> BTreeSet<char> {
    ('A'..='Z').chain(CONTROL_KEYS).collect()
}

/// Characters that may be entered next
///
/// At a word boundary every key is allowed. Otherwise only letters that
/// extend the partial word towards some longer dictionary word are allowed.
/// If no word extends it, every key is allowed again so the user can never
/// be locked out.
pub fn compute_valid_keys(buffer: &str, dictionary: &Dictionary) -> BTreeSet<char> {
    if buffer.ends_with(WORD_BOUNDARY) {
        return full_key_set();
    }

    let partial = buffer
        .rsplit(WORD_BOUNDARY)
        .next()
        .unwrap_or_default()
        .to_uppercase();

    let mut keys = dictionary.next_letters(&partial);

    if keys.is_empty() {
        return full_key_set();
    }

    keys.extend(CONTROL_KEYS);
    keys
}

/// Whether a layout key can be selected given the predicted set
///
/// Prediction only governs letters and control keys; any other layout
/// character (digits, extra punctuation) is always selectable.
pub fn key_enabled(valid: &BTreeSet<char>, key: char) -> bool {
    if key.is_ascii_alphabetic() || is_control_key(key) {
        valid.contains(&key)
    } else {
        true
    }
}
