//! Human readable rendering of rates, byte counts and durations.

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Render a rate in bytes per second, e.g. `"512 B/s"`, `"1.5 KB/s"`, `"2.0 MB/s"`.
pub fn speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec < KIB {
        format!("{} B/s", bytes_per_sec as i64)
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", round1(bytes_per_sec / KIB))
    } else {
        format!("{:.1} MB/s", round1(bytes_per_sec / MIB))
    }
}

/// Render a cumulative byte count. Anything below a megabyte is shown in KB.
pub fn bytes(bytes: f64) -> String {
    if bytes < MIB {
        format!("{:.1} KB", round1(bytes / KIB))
    } else if bytes < GIB {
        format!("{:.1} MB", round1(bytes / MIB))
    } else {
        format!("{:.1} GB", round1(bytes / GIB))
    }
}

/// Render an elapsed number of seconds.
///
/// - `d > 0`: `"1d 2h 3m"`
/// - `h > 0`: `"2h 3m"`
/// - otherwise: `"3m 4s"`
pub fn duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    let seconds = seconds % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {seconds}s")
    }
}
