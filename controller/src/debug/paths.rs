use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};

fn fmt_ts(ms: i64) -> String {
    let dt: DateTime<Utc> = Utc
        .timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now);
    dt.format("%Y%m%dT%H%M%S%3fZ").to_string()
}

fn date_str(ms: i64) -> String {
    let dt: DateTime<Utc> = Utc
        .timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now);
    dt.format("%Y-%m-%d").to_string()
}

/// Directory holding one day's artifacts, e.g. `debug/2026-02-18`.
pub fn day_dir(root: &Path, captured_at_ms: i64) -> PathBuf {
    root.join(date_str(captured_at_ms))
}

/// Path of the binary mask image for a frame.
/// e.g. "debug/2026-02-18/20260218T093000000Z_000042_mask.png"
pub fn mask_path(root: &Path, captured_at_ms: i64, seq: u64) -> PathBuf {
    day_dir(root, captured_at_ms).join(format!("{}_{seq:06}_mask.png", fmt_ts(captured_at_ms)))
}

/// Path of the annotated color frame.
/// e.g. "debug/2026-02-18/20260218T093000000Z_000042_frame.png"
pub fn frame_path(root: &Path, captured_at_ms: i64, seq: u64) -> PathBuf {
    day_dir(root, captured_at_ms).join(format!("{}_{seq:06}_frame.png", fmt_ts(captured_at_ms)))
}
