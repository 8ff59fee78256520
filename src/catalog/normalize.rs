use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonical form used for every header and keyword comparison: decomposed,
/// accents stripped, whitespace runs collapsed, trimmed and lowercased.
pub fn normalize(text: &str) -> String {
    let stripped: String = text.nfd().filter(|ch| !is_combining_mark(*ch)).collect();
    let mut out = String::with_capacity(stripped.len());
    for word in stripped.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// Parses a free-text price cell such as `$1,234.50` or `1.234,50`.
///
/// Everything except digits, `,`, `.` and `-` is dropped first. A separator
/// followed by exactly three digits is a thousands separator; a trailing comma
/// with one or two digits is a decimal comma. `None` when nothing numeric is
/// left.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: Vec<char> = text
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let mut kept = String::with_capacity(cleaned.len());
    for (idx, ch) in cleaned.iter().enumerate() {
        if matches!(ch, ',' | '.') && is_thousands_group(&cleaned[idx + 1..]) {
            continue;
        }
        kept.push(*ch);
    }

    let normalized = match kept.rfind(',') {
        Some(pos)
            if (1..=2).contains(&(kept.len() - pos - 1))
                && kept[pos + 1..].chars().all(|ch| ch.is_ascii_digit()) =>
        {
            format!("{}.{}", &kept[..pos], &kept[pos + 1..])
        }
        _ => kept,
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn is_thousands_group(rest: &[char]) -> bool {
    rest.len() >= 3
        && rest[..3].iter().all(char::is_ascii_digit)
        && rest.get(3).is_none_or(|ch| !ch.is_ascii_digit())
}

pub fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
