//! Word list and phrase library
//!
//! Both collections are loaded once at startup (and again on SIGHUP).
//! Loading never fails: a missing or unreadable source is logged and
//! replaced by a built-in default so the scanner always has something
//! to offer.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::path::Path;

/// Words used when no word list can be read
pub const DEFAULT_WORDS: &[&str] = &[
    "HELLO", "YES", "NO", "PLEASE", "THANK", "YOU", "HELP", "STOP", "GO", "LOVE",
];

/// Starter phrase file written by `blinkspeak setup`
pub const SAMPLE_PHRASES: &str = r#"# Blinkspeak phrases
#
# Shown in the phrase panel in this order, 15 per page by default.
phrases = [
    "I need help",
    "I am thirsty",
    "I am hungry",
    "I am in pain",
    "Please call the nurse",
    "Please reposition me",
    "I am too hot",
    "I am too cold",
    "I need the bathroom",
    "I want to rest",
    "Thank you",
    "I love you",
    "Yes",
    "No",
    "Please wait",
    "Turn on the light",
    "Turn off the light",
    "I want to watch TV",
]
"#;

/// Known words, uppercase ASCII letters only
///
/// Kept sorted so every word sharing a prefix sits in one contiguous range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    words: BTreeSet<String>,
}

impl Dictionary {
    /// Build from arbitrary strings, normalising case and dropping anything
    /// that is not purely alphabetic
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .filter_map(|w| normalize_word(w.as_ref()))
            .collect();
        Self { words }
    }

    /// The built-in fallback set
    pub fn builtin() -> Self {
        Self::new(DEFAULT_WORDS.iter().copied())
    }

    /// Parse a newline-separated word list
    pub fn parse(contents: &str) -> Self {
        Self::new(contents.lines())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Letters that follow `prefix` in some longer word
    ///
    /// Seeks once per distinct letter instead of walking every word under
    /// the prefix, so an empty prefix costs at most 26 range lookups.
    pub fn next_letters(&self, prefix: &str) -> BTreeSet<char> {
        let mut letters = BTreeSet::new();
        let mut seek: Option<String> = None;

        loop {
            let next = match seek {
                None => self
                    .words
                    .range::<str, _>((Bound::Excluded(prefix), Bound::Unbounded))
                    .next(),
                Some(ref from) => self
                    .words
                    .range::<str, _>((Bound::Included(from.as_str()), Bound::Unbounded))
                    .next(),
            };

            let Some(word) = next.filter(|w| w.starts_with(prefix)) else {
                break;
            };
            let Some(letter) = word[prefix.len()..].chars().next() else {
                break;
            };
            letters.insert(letter);

            // Skip every remaining word sharing `prefix + letter`
            let Some(after) = char::from_u32(letter as u32 + 1) else {
                break;
            };
            seek = Some(format!("{}{}", prefix, after));
        }

        letters
    }
}

fn normalize_word(raw: &str) -> Option<String> {
    let word = raw.trim();
    if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(word.to_ascii_uppercase())
}

/// Ordered list of canned phrases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseLibrary {
    phrases: Vec<String>,
}

#[derive(Deserialize)]
struct PhraseFile {
    #[serde(default)]
    phrases: Vec<String>,
}

impl PhraseLibrary {
    /// Build from phrases in display order; blank entries are skipped
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrases
            .into_iter()
            .map(Into::into)
            .map(|p: String| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// Parse a TOML document with a top-level `phrases` array
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let file: PhraseFile = toml::from_str(contents)?;
        Ok(Self::new(file.phrases))
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.phrases.get(index).map(String::as_str)
    }

    /// Phrases from `offset`, at most `count` of them
    pub fn page(&self, offset: usize, count: usize) -> &[String] {
        let start = offset.min(self.phrases.len());
        let end = start.saturating_add(count).min(self.phrases.len());
        &self.phrases[start..end]
    }
}

/// Load the word list, falling back to the built-in set
pub fn load_dictionary(path: Option<&Path>) -> Dictionary {
    let Some(path) = path else {
        tracing::warn!("No dictionary found, falling back to built-in words");
        return Dictionary::builtin();
    };

    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let dictionary = Dictionary::parse(&contents);
            if dictionary.is_empty() {
                tracing::warn!(
                    "Dictionary {:?} has no usable words, falling back to built-in words",
                    path
                );
                return Dictionary::builtin();
            }
            tracing::info!("Loaded {} words from {:?}", dictionary.len(), path);
            dictionary
        }
        Err(e) => {
            tracing::warn!(
                "Could not read dictionary {:?}: {}, falling back to built-in words",
                path,
                e
            );
            Dictionary::builtin()
        }
    }
}

/// Load the phrase library, falling back to an empty list
pub fn load_phrases(path: Option<&Path>) -> PhraseLibrary {
    let Some(path) = path else {
        tracing::warn!("No phrase file configured, phrase panel will be empty");
        return PhraseLibrary::default();
    };

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("Could not read phrases {:?}: {}", path, e);
            return PhraseLibrary::default();
        }
    };

    match PhraseLibrary::parse(&contents) {
        Ok(library) => {
            tracing::info!("Loaded {} phrases from {:?}", library.len(), path);
            library
        }
        Err(e) => {
            tracing::warn!("Invalid phrase file {:?}: {}", path, e);
            PhraseLibrary::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_normalizes_words() {
        let dict = Dictionary::parse("hello\nHelp\n  stop  \ndon't\n\nx-ray\nGO\n");
        assert_eq!(dict.len(), 4);
        assert!(dict.contains("HELLO"));
        assert!(dict.contains("HELP"));
        assert!(dict.contains("STOP"));
        assert!(dict.contains("GO"));
        assert!(!dict.contains("DON'T"));
    }

    #[test]
    fn test_next_letters() {
        let dict = Dictionary::new(["HELLO", "HELP", "HEAT", "HI", "GO"]);
        assert_eq!(dict.next_letters("HEL"), BTreeSet::from(['L', 'P']));
        assert_eq!(dict.next_letters("H"), BTreeSet::from(['E', 'I']));
        assert_eq!(dict.next_letters(""), BTreeSet::from(['G', 'H']));
        assert!(dict.next_letters("Z").is_empty());
    }

    #[test]
    fn test_next_letters_skips_exact_word() {
        let dict = Dictionary::new(["GO", "GOAT", "GOD"]);
        assert_eq!(dict.next_letters("GO"), BTreeSet::from(['A', 'D']));
        assert!(dict.next_letters("GOAT").is_empty());
    }

    #[test]
    fn test_next_letters_large_dictionary() {
        // Every two-letter word over A..=Y plus a few longer ones
        let mut words: Vec<String> = Vec::new();
        for a in 'A'..='Y' {
            for b in 'A'..='Z' {
                words.push(format!("{}{}", a, b));
                words.push(format!("{}{}ZZ", a, b));
            }
        }
        let dict = Dictionary::new(&words);

        let first: BTreeSet<char> = ('A'..='Y').collect();
        assert_eq!(dict.next_letters(""), first);
        assert_eq!(dict.next_letters("Q"), ('A'..='Z').collect());
        assert_eq!(dict.next_letters("QB"), BTreeSet::from(['Z']));
        assert!(dict.next_letters("Z").is_empty());
    }

    #[test]
    fn test_builtin_dictionary() {
        let dict = Dictionary::builtin();
        assert_eq!(dict.len(), DEFAULT_WORDS.len());
        assert!(dict.contains("THANK"));
    }

    #[test]
    fn test_phrase_parse() {
        let library = PhraseLibrary::parse(
            r#"
            phrases = ["I am thirsty", "  ", "Please call the nurse"]
            "#,
        )
        .unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.get(1), Some("Please call the nurse"));
    }

    #[test]
    fn test_phrase_parse_missing_key_is_empty() {
        let library = PhraseLibrary::parse("title = \"mine\"").unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn test_sample_phrases_parse() {
        let library = PhraseLibrary::parse(SAMPLE_PHRASES).unwrap();
        assert_eq!(library.len(), 18);
        assert_eq!(library.get(0), Some("I need help"));
    }

    #[test]
    fn test_phrase_parse_malformed() {
        assert!(PhraseLibrary::parse("phrases = [unterminated").is_err());
    }

    #[test]
    fn test_phrase_page_bounds() {
        let library = PhraseLibrary::new((0..20).map(|i| format!("phrase {}", i)));
        assert_eq!(library.page(0, 15).len(), 15);
        assert_eq!(library.page(15, 15).len(), 5);
        assert_eq!(library.page(15, 15)[0], "phrase 15");
        assert!(library.page(30, 15).is_empty());
    }

    #[test]
    fn test_load_missing_sources_fall_back() {
        let missing = Path::new("/nonexistent/blinkspeak/words");
        assert_eq!(load_dictionary(Some(missing)), Dictionary::builtin());
        assert_eq!(load_dictionary(None), Dictionary::builtin());
        assert!(load_phrases(Some(missing)).is_empty());
        assert!(load_phrases(None).is_empty());
    }
}
