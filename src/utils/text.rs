use regex::Regex;
use std::sync::LazyLock;

/// Monospace block that stands in for removed symbols
pub const BLOCK: char = '\u{275A}';

static EMOJI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\p{Extended_Pictographic}\p{Regional_Indicator}]").ok());

/// Replace emoji and flag letters with a monospace block
pub fn sanitize_text(text: &str) -> String {
    match EMOJI.as_ref() {
        Some(re) => re.replace_all(text, BLOCK.to_string().as_str()).into_owned(),
        None => text.to_string(),
    }
}

/// First line of `text`, cut to `max` characters plus `...`
pub fn first_line(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        let cut: String = line.chars().take(max).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

/// Pad or cut to exactly `width` characters
pub fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count >= width {
        text.chars().take(width).collect()
    } else {
        format!("{text}{}", " ".repeat(width - count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_emoji() {
        assert_eq!(sanitize_text("hi 😀 there"), "hi \u{275A} there");
        // Flags are two regional indicators
        assert_eq!(sanitize_text("🇺🇸"), "\u{275A}\u{275A}");
        assert_eq!(sanitize_text("plain ascii"), "plain ascii");
        assert_eq!(sanitize_text("ñandú"), "ñandú");
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("one\ntwo", 80), "one");
        let long = "x".repeat(100);
        assert_eq!(first_line(&long, 80), format!("{}...", "x".repeat(80)));
        assert_eq!(first_line(&"y".repeat(80), 80), "y".repeat(80));
        assert_eq!(first_line("", 80), "");
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 3), "abc");
        assert_eq!(fit("ñu", 3), "ñu ");
    }
}
