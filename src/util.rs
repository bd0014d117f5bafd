/// Cut `text` to at most `max` characters, ending with `…` when shortened.
///
/// For example, with `max = 8`, `"ransomware wave"` becomes `"ransomw…"`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    if max == 0 {
        return String::new();
    }

    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}
