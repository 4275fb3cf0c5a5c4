//! Word list and phrase file loading with fallbacks

use blinkspeak::config::{load_config, Config};
use blinkspeak::vocab::{load_dictionary, load_phrases, Dictionary, DEFAULT_WORDS};
use std::io::Write;
use tempfile::NamedTempFile;

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn system_style_word_list_is_normalized() {
    let file = file_with("aardvark\nAaron's\napple\nApple\nzebra\n");
    let dict = load_dictionary(Some(file.path()));

    assert_eq!(dict.len(), 3);
    assert!(dict.contains("AARDVARK"));
    assert!(dict.contains("APPLE"));
    assert!(dict.contains("ZEBRA"));
}

#[test]
fn unreadable_dictionary_falls_back_to_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let dict = load_dictionary(Some(&dir.path().join("missing")));
    assert_eq!(dict, Dictionary::builtin());
    assert_eq!(dict.len(), DEFAULT_WORDS.len());
}

#[test]
fn dictionary_without_words_falls_back_to_builtin() {
    let file = file_with("123\n---\n\n");
    assert_eq!(load_dictionary(Some(file.path())), Dictionary::builtin());
}

#[test]
fn no_dictionary_path_uses_builtin() {
    assert_eq!(load_dictionary(None), Dictionary::builtin());
}

#[test]
fn phrase_file_keeps_order() {
    let file = file_with(
        r#"
phrases = [
    "I need help",
    "  Thank you  ",
    "",
    "Please wait",
]
"#,
    );
    let phrases = load_phrases(Some(file.path()));

    assert_eq!(phrases.len(), 3);
    assert_eq!(phrases.get(0), Some("I need help"));
    assert_eq!(phrases.get(1), Some("Thank you"));
    assert_eq!(phrases.get(2), Some("Please wait"));
}

#[test]
fn malformed_phrase_file_gives_empty_library() {
    let file = file_with("phrases = \"not a list\"");
    assert!(load_phrases(Some(file.path())).is_empty());
}

#[test]
fn missing_phrase_file_gives_empty_library() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_phrases(Some(&dir.path().join("phrases.toml"))).is_empty());
    assert!(load_phrases(None).is_empty());
}

#[test]
fn config_file_points_at_vocabulary() {
    let words = file_with("hello\nhelp\n");
    let phrases = file_with("phrases = [\"Hi\"]");
    let config_file = file_with(&format!(
        "[dictionary]\nfile = {:?}\n\n[phrases]\nfile = {:?}\n",
        words.path().display().to_string(),
        phrases.path().display().to_string(),
    ));

    let config: Config = load_config(Some(config_file.path())).unwrap();
    let dict = load_dictionary(config.resolve_dictionary_file().as_deref());
    let library = load_phrases(config.resolve_phrase_file().as_deref());

    assert_eq!(dict.len(), 2);
    assert_eq!(library.get(0), Some("Hi"));
}

#[test]
fn invalid_config_file_is_an_error() {
    let config_file = file_with("[scan]\ngreen_ms = \"soon\"\n");
    assert!(load_config(Some(config_file.path())).is_err());
}
