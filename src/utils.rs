use regex::Regex;

/// Remove HTML tags and common entities from feed-supplied markup.
///
/// RSS descriptions routinely embed `<p>`, `<img>` and tracking markup; the
/// store only keeps plain text. Handles a trailing unterminated tag, which
/// shows up when feeds truncate their own descriptions mid-markup.
pub fn strip_html(text: &str) -> String {
    let incomplete_tag = Regex::new(r"<[^>]*$").unwrap();
    let cleaned = incomplete_tag.replace_all(text, "");

    let tag = Regex::new(r"</?[^>]*>").unwrap();
    let cleaned = tag.replace_all(&cleaned, " ");

    let cleaned = cleaned
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&hellip;", "…");

    let numeric_entity = Regex::new(r"&#\d+;").unwrap();
    let cleaned = numeric_entity.replace_all(&cleaned, "'");

    let whitespace = Regex::new(r"\s+").unwrap();
    whitespace.replace_all(&cleaned, " ").trim().to_string()
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// True when more than half of the non-whitespace characters are ASCII.
///
/// Used to tag items `EN` vs `KO` for the translation prompt.
pub fn is_english_text(text: &str) -> bool {
    let mut ascii = 0usize;
    let mut total = 0usize;
    for c in text.chars() {
        if c.is_whitespace() {
            continue;
        }
        total += 1;
        if (c as u32) < 128 {
            ascii += 1;
        }
    }
    total > 0 && ascii * 2 > total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags_and_entities() {
        let input = r#"<p>OpenAI&#8217;s new model</p> is <strong>out</strong> &amp; trending"#;
        assert_eq!(strip_html(input), "OpenAI's new model is out & trending");
    }

    #[test]
    fn strip_html_drops_trailing_unterminated_tag() {
        let input = "Some text here <img src='cut off";
        assert_eq!(strip_html(input), "Some text here");
    }

    #[test]
    fn strip_html_collapses_whitespace() {
        let input = "<div>first</div>\n\n  <div>second</div>";
        assert_eq!(strip_html(input), "first second");
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("에듀테크 뉴스", 4), "에듀테크");
        assert_eq!(truncate_chars("short", 500), "short");
    }

    #[test]
    fn is_english_text_ratio() {
        assert!(is_english_text("OpenAI releases GPT update"));
        assert!(!is_english_text("에듀테크 시장 동향 분석"));
        // mixed: hangul dominates the non-whitespace count
        assert!(!is_english_text("AI 교육과정 개편안 발표 임박"));
        assert!(!is_english_text(""));
        assert!(!is_english_text("   "));
    }
}
