//! Size-string parsing.
//!
//! The legacy CLI schema reports sizes as human strings ("1.2GB", "512 MB",
//! "734b"); the current schema reports raw byte counts. Everything funnels
//! through [`parse_size`] so both end up as bytes.

/// Parse a size string of the form `<number>[ ]<unit>` where unit is one of
/// B, KB, MB, GB, TB (1024-based, case-insensitive). A bare number is taken
/// as bytes. Anything that does not match yields 0: size is advisory data,
/// never worth failing a whole listing over.
pub fn parse_size(input: &str) -> u64 {
    try_parse_size(input).unwrap_or(0)
}

/// Strict variant: `None` when the input is not a size string at all.
/// The progress classifier needs the distinction; [`parse_size`] does not.
pub(crate) fn try_parse_size(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let digits_end = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());

    let (number, rest) = trimmed.split_at(digits_end);
    let value: f64 = number.parse().ok()?;

    let multiplier: u64 = match rest.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        "TB" => 1024u64.pow(4),
        _ => return None,
    };

    let bytes = value * multiplier as f64;
    if bytes.is_finite() && bytes >= 0.0 {
        Some(bytes.round() as u64)
    } else {
        None
    }
}
