//! Display helpers shared by hosts.

use std::fmt;

use serde::{Deserialize, Serialize};

const MS_PER_MINUTE: u64 = 60 * 1000;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// `HH:MM` for a number of seconds; hours are not wrapped at 24.
pub fn format_energy(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours:02}:{minutes:02}")
}

/// Coarse remaining-time label: only the largest non-zero unit is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum RemainingLabel {
    Expired,
    Days(u64),
    Hours(u64),
    Minutes(u64),
}

impl RemainingLabel {
    pub fn from_ms(remaining_ms: u64) -> Self {
        if remaining_ms == 0 {
            return RemainingLabel::Expired;
        }
        let days = remaining_ms / MS_PER_DAY;
        let hours = (remaining_ms % MS_PER_DAY) / MS_PER_HOUR;
        let minutes = (remaining_ms % MS_PER_HOUR) / MS_PER_MINUTE;
        if days > 0 {
            RemainingLabel::Days(days)
        } else if hours > 0 {
            RemainingLabel::Hours(hours)
        } else {
            RemainingLabel::Minutes(minutes)
        }
    }
}

impl fmt::Display for RemainingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemainingLabel::Expired => write!(f, "expired"),
            RemainingLabel::Days(n) => write!(f, "{n}d"),
            RemainingLabel::Hours(n) => write!(f, "{n}h"),
            RemainingLabel::Minutes(n) => write!(f, "{n}m"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_format() {
        assert_eq!(format_energy(0), "00:00");
        assert_eq!(format_energy(25_200), "07:00");
        assert_eq!(format_energy(28_799), "07:59");
        assert_eq!(format_energy(100 * 3600), "100:00");
    }

    #[test]
    fn remaining_labels() {
        assert_eq!(RemainingLabel::from_ms(0), RemainingLabel::Expired);
        assert_eq!(RemainingLabel::from_ms(59_999), RemainingLabel::Minutes(0));
        assert_eq!(RemainingLabel::from_ms(5 * MS_PER_MINUTE), RemainingLabel::Minutes(5));
        assert_eq!(RemainingLabel::from_ms(3 * MS_PER_HOUR + 1), RemainingLabel::Hours(3));
        assert_eq!(RemainingLabel::from_ms(2 * MS_PER_DAY + MS_PER_HOUR), RemainingLabel::Days(2));
        assert_eq!(RemainingLabel::Days(2).to_string(), "2d");
        assert_eq!(RemainingLabel::Expired.to_string(), "expired");
    }

    #[test]
    fn label_json_shape() {
        let json = serde_json::to_value(RemainingLabel::Hours(4)).unwrap();
        assert_eq!(json, serde_json::json!({"unit": "hours", "value": 4}));
        let json = serde_json::to_value(RemainingLabel::Expired).unwrap();
        assert_eq!(json, serde_json::json!({"unit": "expired"}));
    }
}
