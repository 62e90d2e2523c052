use chrono::{DateTime, Local, NaiveDateTime};

use crate::report::Timestamp;

const SIZE_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Base-1024 size with two decimals, e.g. `1.50 KiB`.
pub fn format_byte_size(size: u64) -> String {
    let mut value = size as f64;
    let mut unit_index = 0;
    while value >= 1024.0 && unit_index < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }
    format!("{:.2} {}", value, SIZE_UNITS[unit_index])
}

/// A size factor in `[0, 1]` as a percentage, e.g. `0.25` -> `25.00%`.
pub fn format_percentage(factor: f64) -> String {
    format!("{:.2}%", factor * 100.0)
}

/// Red/green channels for a bar of `percentage` (0-100). Red saturates at 10%.
pub fn percentage_color(percentage: f64) -> (u8, u8) {
    let red = (percentage * 255.0 / 10.0).clamp(0.0, 255.0);
    let green = 255.0 - red;
    (red.round() as u8, green.round() as u8)
}

/// Local time rendering of the report timestamp.
pub fn format_timestamp(timestamp: &Timestamp) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    match timestamp {
        Timestamp::Millis(millis) => DateTime::from_timestamp_millis(*millis as i64)
            .map(|utc| utc.with_timezone(&Local).format(FORMAT).to_string())
            .unwrap_or_else(|| format!("{}", millis)),
        Timestamp::Text(text) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return parsed.with_timezone(&Local).format(FORMAT).to_string();
            }
            // The exporter writes naive local time.
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.format(FORMAT).to_string())
                .unwrap_or_else(|_| text.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_byte_size() {
        assert_eq!(format_byte_size(0), "0.00 B");
        assert_eq!(format_byte_size(1023), "1023.00 B");
        assert_eq!(format_byte_size(1536), "1.50 KiB");
        assert_eq!(format_byte_size(1024 * 1024), "1.00 MiB");
        assert_eq!(format_byte_size(5 * 1024u64.pow(4)), "5.00 TiB");
        // No unit beyond TiB.
        assert_eq!(format_byte_size(2048 * 1024u64.pow(4)), "2048.00 TiB");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.25), "25.00%");
        assert_eq!(format_percentage(1.0), "100.00%");
        assert_eq!(format_percentage(0.0), "0.00%");
    }

    #[test]
    fn test_percentage_color() {
        assert_eq!(percentage_color(0.0), (0, 255));
        assert_eq!(percentage_color(5.0), (128, 128));
        assert_eq!(percentage_color(10.0), (255, 0));
        assert_eq!(percentage_color(80.0), (255, 0));
    }

    #[test]
    fn test_format_timestamp_text() {
        let ts = Timestamp::Text("2024-05-01T12:30:00.123456".to_string());
        assert_eq!(format_timestamp(&ts), "2024-05-01 12:30:00");

        let ts = Timestamp::Text("yesterday".to_string());
        assert_eq!(format_timestamp(&ts), "yesterday");
    }

    #[test]
    fn test_format_timestamp_millis() {
        let ts = Timestamp::Millis(1_700_000_000_000.0);
        let text = format_timestamp(&ts);
        assert!(text.starts_with("2023-11-1"), "{}", text);
    }
}
