use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// `MM:SS.CC`
    #[default]
    Centiseconds,
    /// `MM:SS`
    Seconds,
}

/// Format milliseconds for display. Minutes are not wrapped at 60.
pub fn format_time(ms: u64, granularity: Granularity) -> String {
    let total_secs = ms / 1000;
    let m = total_secs / 60;
    let s = total_secs % 60;
    match granularity {
        Granularity::Centiseconds => {
            let cs = (ms % 1000) / 10;
            format!("{:02}:{:02}.{:02}", m, s, cs)
        }
        Granularity::Seconds => format!("{:02}:{:02}", m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centiseconds() {
        assert_eq!(format_time(0, Granularity::Centiseconds), "00:00.00");
        assert_eq!(format_time(65_430, Granularity::Centiseconds), "01:05.43");
        assert_eq!(format_time(9, Granularity::Centiseconds), "00:00.00");
    }

    #[test]
    fn seconds() {
        assert_eq!(format_time(59_999, Granularity::Seconds), "00:59");
        assert_eq!(format_time(600_000, Granularity::Seconds), "10:00");
    }

    #[test]
    fn minutes_are_not_wrapped() {
        assert_eq!(format_time(125 * 60_000, Granularity::Seconds), "125:00");
    }
}
