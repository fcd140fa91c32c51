//! Small string helpers used by the UI layer.

/// Whether `url` is absolute over http(s) or protocol-relative.
pub fn is_valid_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://", "//"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Whether `url` mentions any of the given schemes (`mailto`, `tel`, ...).
pub fn has_protocol(url: &str, protocols: &[&str]) -> bool {
    protocols
        .iter()
        .any(|protocol| url.contains(&format!("{protocol}:")))
}

/// Convert a `dd/mm/yyyy` date into `yyyy-mm-dd`. Returns `None` for
/// anything that is not three numeric parts.
pub fn to_iso_date(date: &str) -> Option<String> {
    let mut parts = date.split('/').map(|p| p.trim().parse::<u32>());
    let (Some(Ok(day)), Some(Ok(month)), Some(Ok(year)), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Uppercase the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Remove markup tags, keeping their text content.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|n| n.is_ascii_alphabetic() || *n == '/') =>
            {
                in_tag = true;
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => out.push(c),
        }
    }
    out
}

/// Truncate to `max` characters, appending `end` when anything was cut.
pub fn truncate(s: &str, max: usize, end: &str) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str(end);
    out
}
