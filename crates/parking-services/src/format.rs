//! Timestamp presentation in the lot's local time

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_core::config::ParkingConfig;
use parking_core::{AppError, AppResult};

/// Formats UTC instants for receipts and listings
#[derive(Debug, Clone)]
pub struct TimeFormatter {
    tz: Tz,
    pattern: String,
}

impl TimeFormatter {
    /// Create a formatter, rejecting patterns chrono cannot render
    pub fn new(tz: Tz, pattern: impl Into<String>) -> AppResult<Self> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(AppError::Config(format!(
                "Invalid display datetime format: {}",
                pattern
            )));
        }

        Ok(Self { tz, pattern })
    }

    pub fn from_config(config: &ParkingConfig) -> AppResult<Self> {
        Self::new(config.timezone()?, config.display_datetime_format.clone())
    }

    /// Display timezone
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.tz).format(&self.pattern).to_string()
    }
}

impl Default for TimeFormatter {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            pattern: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_formats_in_display_timezone() {
        let formatter = TimeFormatter::new(chrono_tz::America::Bogota, "%Y-%m-%d %H:%M").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 2, 30, 0).unwrap();
        assert_eq!(formatter.format(at), "2025-02-28 21:30");
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        assert!(matches!(
            TimeFormatter::new(Tz::UTC, "%Y-%"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_unknown_timezone() {
        let config = ParkingConfig {
            display_timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(TimeFormatter::from_config(&config).is_err());
    }
}
