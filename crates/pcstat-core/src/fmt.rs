//! Human-readable sizes and durations for log lines.

use std::time::Duration;

/// Bytes per counted page.
pub const PAGE_BYTES: u64 = 4096;

/// Format byte count as human-readable size: `"1.5G"`, `"100.3M"`,
/// `"50.0K"`, `"512B"`.
pub fn format_bytes(bytes: u64) -> String {
    let f = bytes as f64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}G", f / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}M", f / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", f / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a 4 KiB page count as a size.
pub fn format_pages(pages: u64) -> String {
    format_bytes(pages.saturating_mul(PAGE_BYTES))
}

/// `"1.5m"`, `"2.3s"`, `"45ms"`, `"0.4ms"`.
pub fn format_elapsed(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 60_000.0 {
        format!("{:.1}m", ms / 60_000.0)
    } else if ms >= 1_000.0 {
        format!("{:.1}s", ms / 1_000.0)
    } else if ms >= 1.0 {
        format!("{:.0}ms", ms)
    } else {
        format!("{:.1}ms", ms)
    }
}
