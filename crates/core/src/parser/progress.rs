//! Pull/build progress classification.
//!
//! The CLI reports transfer progress as free text, one line at a time.
//! Each line is classified independently through an ordered decision list;
//! first match wins. The classifier is pure and per-line: percent values
//! across a stream are not guaranteed monotonic; smoothing is the caller's
//! job.

use crate::model::{ProgressEvent, ProgressPhase};
use crate::parser::ansi::strip_ansi;
use crate::parser::units::try_parse_size;

/// Classify one line of `image pull` output.
///
/// Decision order:
/// 1. a leading `<8+ lowercase hex>: ` prefix becomes `layer_id`
/// 2. error/fail keywords
/// 3. completion keywords
/// 4. `<n><unit> / <m><unit>` byte progress
/// 5. a bare `NN%`
/// 6. phase keywords with fixed fallback percents
pub fn parse_pull_progress(line: &str) -> ProgressEvent {
    let clean = strip_ansi(line);
    let text = clean.trim();

    let (layer_id, remainder) = split_layer_prefix(text);
    let mut event = classify_line(remainder);
    event.layer_id = layer_id.map(str::to_string);
    event
}

/// Classify one line of `image build` output.
///
/// Build output adds a `Step N/M` pattern reported as `extracting` with
/// step counters. Finishing the last step does not flip the phase to
/// `complete`; only an explicit "successfully built/tagged" message does.
pub fn parse_build_progress(line: &str) -> ProgressEvent {
    let clean = strip_ansi(line);
    let text = clean.trim();
    let lower = text.to_lowercase();

    if is_error_line(&lower) {
        return ProgressEvent::new(ProgressPhase::Error, 0, text);
    }
    if lower.contains("successfully built") || lower.contains("successfully tagged") {
        return ProgressEvent::new(ProgressPhase::Complete, 100, text);
    }
    if let Some((step, total_steps)) = parse_step_counter(text) {
        let percent = if total_steps == 0 {
            0
        } else {
            ratio_percent(step as f64, total_steps as f64)
        };
        let mut event = ProgressEvent::new(ProgressPhase::Extracting, percent, text);
        event.step = Some(step);
        event.total_steps = Some(total_steps);
        return event;
    }

    classify_line(text)
}

// ── Decision list internals ─────────────────────────────────────

fn classify_line(text: &str) -> ProgressEvent {
    let lower = text.to_lowercase();

    if is_error_line(&lower) {
        return ProgressEvent::new(ProgressPhase::Error, 0, text);
    }
    if is_complete_line(&lower) {
        return ProgressEvent::new(ProgressPhase::Complete, 100, text);
    }
    if let Some((current, total)) = find_byte_progress(text) {
        let percent = if total == 0 {
            0
        } else {
            ratio_percent(current as f64, total as f64)
        };
        let mut event = ProgressEvent::new(refine_transfer_phase(&lower), percent, text);
        event.current = Some(current);
        event.total = Some(total);
        return event;
    }
    if let Some(percent) = find_bare_percent(text) {
        return ProgressEvent::new(refine_transfer_phase(&lower), percent, text);
    }

    let phase = keyword_phase(&lower).unwrap_or(ProgressPhase::Resolving);
    ProgressEvent::new(phase, phase.fallback_percent(), text)
}

fn is_error_line(lower: &str) -> bool {
    lower.contains("error") || lower.contains("fail") || lower.contains("denied")
}

fn is_complete_line(lower: &str) -> bool {
    lower.contains("complete")
        || lower.contains("success")
        || lower.contains("already exists")
        || lower.contains("done")
}

/// `extracting`/`verifying` when those keywords appear alongside measurable
/// progress; plain transfers are `downloading`.
fn refine_transfer_phase(lower: &str) -> ProgressPhase {
    if lower.contains("extract") {
        ProgressPhase::Extracting
    } else if lower.contains("verif") {
        ProgressPhase::Verifying
    } else {
        ProgressPhase::Downloading
    }
}

fn keyword_phase(lower: &str) -> Option<ProgressPhase> {
    if lower.contains("download") {
        Some(ProgressPhase::Downloading)
    } else if lower.contains("extract") {
        Some(ProgressPhase::Extracting)
    } else if lower.contains("verif") {
        Some(ProgressPhase::Verifying)
    } else if lower.contains("pull") || lower.contains("resolv") {
        Some(ProgressPhase::Resolving)
    } else {
        None
    }
}

fn ratio_percent(numerator: f64, denominator: f64) -> u8 {
    ((numerator / denominator) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Split a leading `<8+ lowercase hex>: ` layer prefix off the line.
fn split_layer_prefix(text: &str) -> (Option<&str>, &str) {
    if let Some((prefix, rest)) = text.split_once(':') {
        let is_layer = prefix.len() >= 8
            && prefix.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if is_layer {
            return (Some(prefix), rest.trim_start());
        }
    }
    (None, text)
}

/// Find a `<number><unit> / <number><unit>` byte-progress pattern. Units are
/// required on both sides so step counters like `3 / 5` never match.
fn find_byte_progress(text: &str) -> Option<(u64, u64)> {
    let (left, right) = text.split_once(" / ")?;
    let current = trailing_size(left)?;
    let total = leading_size(right)?;
    Some((current, total))
}

/// Parse the trailing `<number>[ ]<unit>` token of a string.
fn trailing_size(s: &str) -> Option<u64> {
    let s = s.trim_end();
    let unit_start = s
        .rfind(|c: char| !c.is_ascii_alphabetic())
        .map(|i| i + s[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let unit = &s[unit_start.min(s.len())..];
    if unit.is_empty() {
        return None;
    }
    let before_unit = s[..unit_start.min(s.len())].trim_end();
    let num_start = before_unit
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|i| i + before_unit[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let number = &before_unit[num_start..];
    if number.is_empty() {
        return None;
    }
    try_parse_size(&format!("{} {}", number, unit))
}

/// Parse the leading `<number>[ ]<unit>` token of a string.
fn leading_size(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let num_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let number = &s[..num_end];
    if number.is_empty() {
        return None;
    }
    let rest = s[num_end..].trim_start();
    let unit_end = rest.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(rest.len());
    let unit = &rest[..unit_end];
    if unit.is_empty() {
        return None;
    }
    try_parse_size(&format!("{} {}", number, unit))
}

/// Find a bare `NN%` (or `NN.N%`) token and return it clamped to [0, 100].
fn find_bare_percent(text: &str) -> Option<u8> {
    let idx = text.find('%')?;
    let before = &text[..idx];
    let num_start = before
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let number = &before[num_start..];
    if number.is_empty() {
        return None;
    }
    let value: f64 = number.parse().ok()?;
    Some(value.round().clamp(0.0, 100.0) as u8)
}

/// Parse `Step N/M` anywhere at the start of a build line.
fn parse_step_counter(text: &str) -> Option<(u32, u32)> {
    let rest = strip_prefix_ci(text, "step ")?;
    let (n_str, after_n) = rest.split_once('/')?;
    let n: u32 = n_str.trim().parse().ok()?;
    let m_end = after_n
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_n.len());
    let m: u32 = after_n[..m_end].trim().parse().ok()?;
    Some((n, m))
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}
