//! Wall-clock access, kept in one place so lifecycle code can take explicit
//! `now` parameters and stay deterministic under test.

/// Seconds since the UNIX epoch.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
