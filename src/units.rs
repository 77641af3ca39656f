//! Human-readable rendering of raw counter values.
//!
//! Readings keep their raw numeric type everywhere in the crate; conversion
//! to display strings happens only at serialization time through the
//! `serialize_with` helpers below, so threshold checks never parse strings.

use serde::Serializer;
use std::fmt;

const BYTE_SYMBOLS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// A raw reading tagged with its semantic kind.
///
/// The wrapped value stays raw for threshold checks; `Display` gives the
/// human-readable rendering used in records and warning lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<'a> {
    /// A byte count
    Bytes(u64),
    /// A percentage in 0..=100
    Percent(f64),
    /// Filesystem type, mount point, device path and the like
    Opaque(&'a str),
}

impl fmt::Display for Reading<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reading::Bytes(n) => f.write_str(&format_bytes(n)),
            Reading::Percent(p) => f.write_str(&format_percent(p)),
            Reading::Opaque(s) => f.write_str(s),
        }
    }
}

/// Render a byte count with the largest fitting binary unit.
///
/// `1073741824` renders as `"1.00G"`, values below 1 KiB as `"<n>B"`.
pub fn format_bytes(n: u64) -> String {
    for (i, symbol) in BYTE_SYMBOLS.iter().enumerate().rev() {
        let prefix = 1u64 << ((i + 1) * 10);
        if n >= prefix {
            return format!("{:.2}{}", n as f64 / prefix as f64, symbol);
        }
    }
    format!("{}B", n)
}

/// Render a percentage as `"<value>%"`, rounded to one decimal.
///
/// Whole values drop the fraction: `42.0` renders as `"42%"`.
pub fn format_percent(p: f64) -> String {
    format!("{}%", round1(p))
}

/// Round to one decimal place.
pub fn round1(p: f64) -> f64 {
    (p * 10.0).round() / 10.0
}

/// `serialize_with` helper for byte-count fields.
pub fn human_bytes<S: Serializer>(n: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&Reading::Bytes(*n))
}

/// `serialize_with` helper for percentage fields.
pub fn human_percent<S: Serializer>(p: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&Reading::Percent(*p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(1023), "1023B");
        assert_eq!(format_bytes(1024), "1.00K");
        assert_eq!(format_bytes(1536), "1.50K");
        assert_eq!(format_bytes(100_001_221), "95.37M");
        assert_eq!(format_bytes(1_073_741_824), "1.00G");
        assert_eq!(format_bytes(1u64 << 40), "1.00T");
        assert_eq!(format_bytes(u64::MAX), "16.00E");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(42.0), "42%");
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(12.5), "12.5%");
        assert_eq!(format_percent(33.333_333), "33.3%");
        assert_eq!(format_percent(99.96), "100%");
    }

    #[test]
    fn test_reading_display() {
        assert_eq!(Reading::Bytes(1_073_741_824).to_string(), "1.00G");
        assert_eq!(Reading::Percent(42.0).to_string(), "42%");
        assert_eq!(Reading::Opaque("/dev/sda1").to_string(), "/dev/sda1");
    }

    #[derive(serde::Serialize)]
    struct Usage {
        #[serde(serialize_with = "human_bytes")]
        total: u64,
        #[serde(serialize_with = "human_percent")]
        percent: f64,
    }

    #[test]
    fn test_serializers_render_readings() {
        let value = serde_json::to_value(Usage {
            total: 1_073_741_824,
            percent: 42.0,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"total": "1.00G", "percent": "42%"}));
    }
}
