//! ui::format
//!
//! Cell formatting helpers shared by column projectors.

use chrono::{DateTime, Utc};

/// Text shown for an unset time.
pub const NIL: &str = "<nil>";

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS +0000 UTC`.
pub fn time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S +0000 UTC").to_string()
}

/// Format an optional timestamp, rendering `None` as `<nil>`.
pub fn opt_time(t: Option<&DateTime<Utc>>) -> String {
    t.map_or_else(|| NIL.to_string(), time)
}

/// Format an optional string, rendering `None` as empty.
pub fn opt_str(s: Option<&str>) -> String {
    s.unwrap_or_default().to_string()
}

/// Format a list as `[a b c]`.
pub fn list<T: std::fmt::Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
    format!("[{}]", parts.join(" "))
}

const SI_UNITS: [&str; 6] = ["kB", "MB", "GB", "TB", "PB", "EB"];

/// Format a byte count with SI units, e.g. `1.97 MB`.
pub fn bytes(n: u64) -> String {
    if n < 1000 {
        return format!("{} B", n);
    }
    let mut value = n as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < SI_UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, SI_UNITS[unit])
}

/// Format a disk size given in GiB, e.g. `10 GiB` or `1.01 GiB`.
pub fn gib(size: f64) -> String {
    if size.fract() == 0.0 {
        format!("{} GiB", size as i64)
    } else {
        format!("{:.2} GiB", size)
    }
}
