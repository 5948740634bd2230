//! Canonical comparison form for horse names.
//!
//! Ratings, odds and scratchings providers all punctuate names differently
//! ("O'Reilly's Pride", "OREILLYS PRIDE", "O’Reilly’s Pride."), so every name
//! comparison goes through [`normalize`] first.

const APOSTROPHES: [char; 4] = ['\'', '`', '\u{2019}', '\u{2018}'];
const DASHES: [char; 3] = ['-', '\u{2013}', '\u{2014}'];

/// Lowercase `name` and strip punctuation variants.
///
/// Steps run in a fixed order: apostrophes dropped, periods dropped, dashes
/// turned into spaces, whitespace collapsed and trimmed. Swapping the order
/// changes the output for names such as "Mary-Jane's".
///
/// Absent or empty input yields an empty string.
pub fn normalize(name: Option<&str>) -> String {
    let Some(raw) = name else {
        return String::new();
    };
    if raw.is_empty() {
        return String::new();
    }

    let lower = raw.to_lowercase();
    let mut stripped = String::with_capacity(lower.len());
    for ch in lower.chars() {
        if APOSTROPHES.contains(&ch) || ch == '.' {
            continue;
        }
        if DASHES.contains(&ch) {
            stripped.push(' ');
        } else {
            stripped.push(ch);
        }
    }

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convenience for callers holding a plain `&str`.
pub fn normalize_str(name: &str) -> String {
    normalize(Some(name))
}
