//! XML 1.0 name and character rules.
//!
//! `quick-xml` writes whatever bytes it is given, so the encoder checks tag
//! names and text content itself before emitting them.

use std::borrow::Cow;

/// Whether `name` is a legal un-prefixed element tag (an XML `NCName`).
pub fn is_valid_tag(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) => chars.all(is_name_char),
        _ => false,
    }
}

/// First character in `text` that XML 1.0 cannot represent, if any.
pub fn first_illegal_char(text: &str) -> Option<char> {
    text.chars().find(|&c| !is_xml_char(c))
}

/// `text` with every character XML 1.0 cannot represent removed.
pub fn strip_illegal_chars(text: &str) -> Cow<'_, str> {
    if first_illegal_char(text).is_none() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_tags() {
        for name in ["misconducts", "technical_specifications", "_x", "a-b.c1", "Item", "données"] {
            assert!(is_valid_tag(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_illegal_tags() {
        for name in ["", "two words", "1st", "-dash", ".dot", "ns:tag", "a<b", "tab\there"] {
            assert!(!is_valid_tag(name), "{name:?} should be rejected");
        }
    }

    #[test]
    fn finds_control_characters() {
        assert_eq!(first_illegal_char("plain text\n\ttabbed"), None);
        assert_eq!(first_illegal_char("bell\u{7}"), Some('\u{7}'));
        assert_eq!(first_illegal_char("nul\u{0}"), Some('\u{0}'));
    }

    #[test]
    fn strips_only_illegal_characters() {
        assert!(matches!(strip_illegal_chars("clean\ttext"), Cow::Borrowed("clean\ttext")));
        assert_eq!(strip_illegal_chars("be\u{7}ll\u{0}!\u{FFFE}"), "bell!");
    }
}
