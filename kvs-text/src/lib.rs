//! # Script Detection
//!
//! Purpose: Tell whether a string contains at least one character of a given
//! Unicode script, e.g. whether user input contains Han characters.
//!
//! Characters shared between scripts (digits, punctuation, spaces) carry the
//! `Common` or `Inherited` script and never match a specific one.

use thiserror::Error;
use unicode_script::UnicodeScript;

pub use unicode_script::Script;

/// A script name that is neither a full nor a short Unicode script name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown unicode script {0:?}")]
pub struct UnknownScript(pub String);

/// True iff some character of `text` belongs to `script`.
///
/// Stops at the first match.
pub fn contains_script(text: &str, script: Script) -> bool {
    text.chars().any(|ch| ch.script() == script)
}

/// Like [`contains_script`], resolving the script from its name.
///
/// Accepts full names ("Han", "Latin") and four-letter codes ("Hani", "Latn").
pub fn contains_script_named(text: &str, name: &str) -> Result<bool, UnknownScript> {
    let script = Script::from_full_name(name)
        .or_else(|| Script::from_short_name(name))
        .ok_or_else(|| UnknownScript(name.to_string()))?;
    Ok(contains_script(text, script))
}

/// True iff `text` contains a Han (CJK ideograph) character.
pub fn contains_han(text: &str) -> bool {
    contains_script(text, Script::Han)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_has_no_han() {
        assert!(!contains_han("hello"));
        assert!(!contains_script("hello", Script::Cyrillic));
        assert!(contains_script("hello", Script::Latin));
    }

    #[test]
    fn single_han_character_matches() {
        assert!(contains_han("order #12 中"));
        assert!(contains_script("東京 tower", Script::Han));
        assert!(!contains_script("東京", Script::Latin));
    }

    #[test]
    fn kana_is_not_han() {
        assert!(!contains_han("ひらがな カタカナ"));
        assert!(contains_script("ひらがな", Script::Hiragana));
    }

    #[test]
    fn shared_characters_match_no_specific_script() {
        let text = "12 + 3 = 15!";
        assert!(!contains_script(text, Script::Latin));
        assert!(!contains_han(text));
        assert!(!contains_han(""));
    }

    #[test]
    fn resolves_full_and_short_names() {
        assert_eq!(contains_script_named("你好", "Han"), Ok(true));
        assert_eq!(contains_script_named("你好", "Hani"), Ok(true));
        assert_eq!(contains_script_named("привет", "Cyrillic"), Ok(true));
        assert_eq!(contains_script_named("hello", "Greek"), Ok(false));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = contains_script_named("hello", "Klingon").unwrap_err();
        assert_eq!(err, UnknownScript("Klingon".to_string()));
        assert_eq!(err.to_string(), "unknown unicode script \"Klingon\"");
    }
}
