/// Byte-count formatting and parsing for logs, alerts, and operator input.
///
/// All internal sizes are `u64` bytes. Floating point only appears at the
/// formatting and parsing boundary.

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Format a byte count with a binary unit (KB = 1024), e.g. `"1.5 GB"`.
pub fn format_size(bytes: u64) -> String {
    let b = bytes as f64;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", b / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", b / MB as f64)
    } else if bytes < TB {
        format!("{:.2} GB", b / GB as f64)
    } else {
        format!("{:.2} TB", b / TB as f64)
    }
}

/// Parse an operator-supplied size such as `"10 GB"`, `"512mb"`, or `"4096"`.
///
/// A bare number is taken as bytes. Units are binary and case-insensitive;
/// an optional trailing `B` / `iB` is accepted (`"1.5GiB"`).
pub fn parse_size(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KB,
        "m" | "mb" | "mib" => MB,
        "g" | "gb" | "gib" => GB,
        "t" | "tb" | "tib" => TB,
        _ => return None,
    };

    let bytes = value * multiplier as f64;
    if bytes > u64::MAX as f64 {
        return None;
    }
    Some(bytes.round() as u64)
}
