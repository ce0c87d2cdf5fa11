//! User-tunable simulation parameters.
//!
//! These live in the key-value store next to the simulation state (see
//! [`crate::storage::persist`]); the TOML app config in [`crate::config`] only
//! covers host concerns such as the tick cadence.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_MONTHLY_EXPENSE: f64 = 3000.0;
pub const DEFAULT_WORK_HOURS: f64 = 8.0;
pub const DEFAULT_RESET_TIME: ResetTime = ResetTime { hour: 9, minute: 0 };

/// Upper bound for the daily work window length.
pub const MAX_WORK_HOURS: f64 = 24.0;

/// Time of day at which the daily work window opens.
///
/// Serialized as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResetTime {
    hour: u8,
    minute: u8,
}

impl ResetTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidResetTime {
                input: format!("{hour}:{minute}"),
            });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for ResetTime {
    fn default() -> Self {
        DEFAULT_RESET_TIME
    }
}

impl fmt::Display for ResetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ResetTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidResetTime { input: s.to_string() };
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ResetTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResetTime> for String {
    fn from(value: ResetTime) -> Self {
        value.to_string()
    }
}

/// The parameter set driving decay and the work window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub monthly_expense: f64,
    pub work_hours: f64,
    pub reset_time: ResetTime,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            monthly_expense: DEFAULT_MONTHLY_EXPENSE,
            work_hours: DEFAULT_WORK_HOURS,
            reset_time: DEFAULT_RESET_TIME,
        }
    }
}

/// A partial parameter edit. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterUpdate {
    #[serde(default)]
    pub monthly_expense: Option<f64>,
    #[serde(default)]
    pub work_hours: Option<f64>,
    #[serde(default)]
    pub reset_time: Option<ResetTime>,
    #[serde(default)]
    pub balance: Option<f64>,
}

impl ParameterUpdate {
    /// Build an update from raw form input.
    pub fn from_raw(
        monthly_expense: Option<&str>,
        work_hours: Option<&str>,
        reset_time: Option<&str>,
        balance: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let update = Self {
            monthly_expense: monthly_expense.map(|v| parse_number("monthlyExpense", v)).transpose()?,
            work_hours: work_hours.map(|v| parse_number("workHours", v)).transpose()?,
            reset_time: reset_time.map(str::parse).transpose()?,
            balance: balance.map(|v| parse_number("balance", v)).transpose()?,
        };
        update.validate()?;
        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        self.monthly_expense.is_none()
            && self.work_hours.is_none()
            && self.reset_time.is_none()
            && self.balance.is_none()
    }

    /// Check every present field; the update is applied all-or-nothing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(v) = self.monthly_expense {
            non_negative("monthlyExpense", v)?;
        }
        if let Some(v) = self.work_hours {
            non_negative("workHours", v)?;
            if v > MAX_WORK_HOURS {
                return Err(ValidationError::invalid_value(
                    "workHours",
                    format!("must not exceed {MAX_WORK_HOURS} hours"),
                ));
            }
        }
        if let Some(v) = self.balance {
            non_negative("balance", v)?;
        }
        Ok(())
    }
}

fn parse_number(field: &str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::invalid_value(field, format!("'{raw}' is not a number")))
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::invalid_value(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ValidationError::invalid_value(field, "must not be negative"));
    }
    Ok(())
}
