/// Height in decimetres shown as metres, e.g. `4` -> `"0.40 m"`.
pub fn format_height(decimetres: u32) -> String {
    format!("{:.2} m", decimetres as f64 / 10.0)
}

/// Weight in hectograms shown as kilograms, e.g. `60` -> `"6.00 kg"`.
pub fn format_weight(hectograms: u32) -> String {
    format!("{:.2} kg", hectograms as f64 / 10.0)
}

/// Uppercase the first letter of every word; words are split on anything
/// that is not alphanumeric or `_`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        let is_word = ch.is_alphanumeric() || ch == '_';
        if is_word && at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !is_word;
    }
    out
}

/// Categories as a single display string: `["grass", "poison"]` -> `"Grass, Poison"`.
pub fn format_categories(categories: &[String]) -> String {
    title_case(&categories.join(", "))
}

/// Truncate to `max` chars, appending an ellipsis when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}
