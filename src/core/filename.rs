use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const MAX_LEN: usize = 200;

/// Produces a filesystem-safe path component from an arbitrary title or
/// username: NFC-normalizes, strips reserved and control characters,
/// collapses whitespace runs, trims and caps the length. Idempotent, and
/// never returns an empty string.
pub fn sanitize(raw: &str) -> String {
    let name: String = raw.nfc().collect();
    // whitespace-class controls (\t, \n) stay for the collapse step below
    let name: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    let name = WS_RE.replace_all(&name, " ");
    let name = name.trim();

    let mut result: String = name.chars().take(MAX_LEN).collect();
    // the cap can expose trailing whitespace that was mid-string before
    while result.ends_with(' ') {
        result.pop();
    }

    if result.is_empty() {
        return "untitled".to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_reserved_characters() {
        assert_eq!(sanitize("My: Video???"), "My Video");
        assert_eq!(sanitize(r#"a<b>c:d"e/f\g|h?i*j"#), "abcdefghij");
    }

    #[test]
    fn strips_non_whitespace_control_characters() {
        assert_eq!(sanitize("abc\u{7}def"), "abcdef");
        assert_eq!(sanitize("x\u{0}\u{1b}y"), "xy");
        let once = sanitize("a\u{7}b");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(sanitize("hello \t  world\n!"), "hello world !");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitize("  padded title  "), "padded title");
    }

    #[test]
    fn caps_length_at_200_chars() {
        let long = "x".repeat(500);
        assert_eq!(sanitize(&long).chars().count(), 200);
    }

    #[test]
    fn length_cap_is_char_boundary_safe() {
        let long = "é".repeat(500);
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), 200);
    }

    #[test]
    fn is_idempotent() {
        for raw in [
            "My: Video???",
            "  a   b  ",
            "normal name",
            &"é".repeat(300),
            r#"A/B\C|D"#,
        ] {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn never_emits_reserved_characters() {
        let out = sanitize("x<>:\"/\\|?*y");
        for c in ['<', '>', ':', '"', '/', '\\', '|', '?', '*'] {
            assert!(!out.contains(c));
        }
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(sanitize(""), "untitled");
        assert_eq!(sanitize("???"), "untitled");
        assert_eq!(sanitize("   "), "untitled");
    }

    #[test]
    fn normalizes_to_nfc() {
        let decomposed = "e\u{0301}";
        assert_eq!(sanitize(decomposed), "\u{00e9}");
    }
}
