//! Clock-face formatting for remaining time.

/// `m:ss`, truncating sub-second precision. Minutes are not capped at 59.
pub fn format_clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// `m:ss.t` with tenths of a second, truncated.
pub fn format_clock_tenths(ms: u64) -> String {
    let tenths = (ms / 100) % 10;
    format!("{}.{tenths}", format_clock(ms))
}
