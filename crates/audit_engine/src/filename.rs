use chrono::NaiveDate;

const MAX_STEM_CHARS: usize = 80;
const FALLBACK_STEM: &str = "audit";

/// `data-YYYY-MM-DD.csv`, the name of a synchronous result without a server-provided name.
pub fn default_csv_file_name(date: NaiveDate) -> String {
    format!("data-{}.csv", date.format("%Y-%m-%d"))
}

/// Make a server- or user-provided name safe to create inside the output directory.
///
/// Path separators and characters Windows forbids become `_`, leading and
/// trailing dots/underscores/spaces go, and reserved device names get a
/// trailing underscore. The extension survives truncation.
pub fn sanitize_file_name(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = collapse_underscores(cleaned.trim_matches(&['_', ' ', '.'][..]));

    let (stem, extension) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (cleaned.as_str(), None),
    };

    let mut stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn collapse_underscores(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
