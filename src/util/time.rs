//! Time utilities for the tick loop

use std::time::{Duration, Instant};

/// Default simulation rate
pub const DEFAULT_TPS: u32 = 30;
pub const MIN_TPS: u32 = 10;
pub const MAX_TPS: u32 = 120;

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Clamp a configured tick rate into the supported range
pub fn clamp_tick_rate(rate: u32) -> u32 {
    rate.clamp(MIN_TPS, MAX_TPS)
}

/// Fixed simulation step in seconds
pub fn tick_delta(rate: u32) -> f32 {
    1.0 / rate.max(1) as f32
}

/// Wall-clock period of one tick
pub fn tick_duration(rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / rate.max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_rate_is_clamped() {
        assert_eq!(clamp_tick_rate(1), MIN_TPS);
        assert_eq!(clamp_tick_rate(500), MAX_TPS);
        assert_eq!(clamp_tick_rate(DEFAULT_TPS), 30);
    }

    #[test]
    fn delta_matches_duration() {
        assert!((tick_delta(30) - 1.0 / 30.0).abs() < 1e-6);
        assert_eq!(tick_duration(50), Duration::from_millis(20));
    }
}
