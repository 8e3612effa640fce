//! Daily wall-clock triggers.

use std::fmt;

use chrono::{DateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Days searched for the next valid local time before giving up.
const MAX_LOOKAHEAD_DAYS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("hour out of range: {0}")]
    Hour(u32),
    #[error("minute out of range: {0}")]
    Minute(u32),
}

/// Fires every day at `hour:minute` local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TriggerParts", into = "TriggerParts")]
pub struct DailyTrigger {
    hour: u32,
    minute: u32,
}

#[derive(Serialize, Deserialize)]
struct TriggerParts {
    hour: u32,
    minute: u32,
}

impl DailyTrigger {
    pub fn new(hour: u32, minute: u32) -> Result<Self, TriggerError> {
        if hour > 23 {
            return Err(TriggerError::Hour(hour));
        }
        if minute > 59 {
            return Err(TriggerError::Minute(minute));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// The first instant strictly after `after` at which this trigger fires,
    /// in `after`'s time zone.
    ///
    /// Days on which `hour:minute` does not exist locally are skipped; where
    /// it is ambiguous the earlier instant is used.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        let mut date = after.date_naive();
        for _ in 0..=MAX_LOOKAHEAD_DAYS {
            if let Some(candidate) = tz.from_local_datetime(&date.and_time(time)).earliest() {
                if candidate > *after {
                    return Some(candidate);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }
}

impl TryFrom<TriggerParts> for DailyTrigger {
    type Error = TriggerError;

    fn try_from(parts: TriggerParts) -> Result<Self, Self::Error> {
        DailyTrigger::new(parts.hour, parts.minute)
    }
}

impl From<DailyTrigger> for TriggerParts {
    fn from(trigger: DailyTrigger) -> Self {
        TriggerParts {
            hour: trigger.hour,
            minute: trigger.minute,
        }
    }
}

impl fmt::Display for DailyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(DailyTrigger::new(24, 0), Err(TriggerError::Hour(24)));
        assert_eq!(DailyTrigger::new(0, 60), Err(TriggerError::Minute(60)));
        assert!(DailyTrigger::new(23, 59).is_ok());
        assert!(DailyTrigger::new(0, 0).is_ok());
    }

    #[test]
    fn test_next_after_later_today() {
        let trigger = DailyTrigger::new(9, 30).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let next = trigger.next_after(&now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_next_after_rolls_to_tomorrow() {
        let trigger = DailyTrigger::new(9, 30).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap();
        let next = trigger.next_after(&now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_next_after_is_strict() {
        let trigger = DailyTrigger::new(9, 30).unwrap();
        let exactly = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let next = trigger.next_after(&exactly).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_next_after_uses_local_wall_clock() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let trigger = DailyTrigger::new(7, 0).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 1, 6, 59, 0).unwrap();
        let next = trigger.next_after(&now).unwrap();
        assert_eq!(next, tz.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap());
        assert_eq!(next.with_timezone(&Utc).format("%H:%M").to_string(), "23:00");
    }

    #[test]
    fn test_display_and_serde() {
        let trigger = DailyTrigger::new(7, 5).unwrap();
        assert_eq!(trigger.to_string(), "07:05");
        let json = serde_json::to_string(&trigger).unwrap();
        assert_eq!(json, r#"{"hour":7,"minute":5}"#);
        assert!(serde_json::from_str::<DailyTrigger>(r#"{"hour":25,"minute":0}"#).is_err());
    }
}
