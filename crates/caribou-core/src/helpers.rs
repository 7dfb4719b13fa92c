//! Formatting helpers shared by the controller, logs, and demos.

/// Format a frequency in hertz as a human-readable MHz string.
///
/// Returns a string like `"915.000000 MHz"` with six decimal places (1 Hz
/// resolution).
///
/// # Example
///
/// ```
/// use caribou_core::format_freq_mhz;
///
/// assert_eq!(format_freq_mhz(915_000_000), "915.000000 MHz");
/// assert_eq!(format_freq_mhz(2_400_000_000), "2400.000000 MHz");
/// ```
pub fn format_freq_mhz(freq_hz: u64) -> String {
    let mhz = freq_hz as f64 / 1_000_000.0;
    format!("{mhz:.6} MHz")
}

/// Format a filter bandwidth in hertz as kHz, e.g. `"1250 kHz"`.
///
/// ```
/// use caribou_core::format_bandwidth_khz;
///
/// assert_eq!(format_bandwidth_khz(1_250_000.0), "1250 kHz");
/// assert_eq!(format_bandwidth_khz(315_000.0), "315 kHz");
/// ```
pub fn format_bandwidth_khz(bw_hz: f64) -> String {
    let khz = (bw_hz / 1_000.0).round() as i64;
    format!("{khz} kHz")
}
