//! Weekend, after-hours and holiday classification of pickup times.
//!
//! Pickups are evaluated in the local civil time of the service area.
//! Floating holidays are computed with weekday arithmetic for the pickup's
//! year, never from a hardcoded date table.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{HolidayRule, TemporalPolicy, WeekendAfterHours};
use crate::error::{FareError, Result};

/// Temporal surcharge flags for a pickup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TemporalFlags {
    /// Saturday or Sunday.
    pub is_weekend: bool,
    /// Outside business hours.
    pub is_after_hours: bool,
    /// On a calendar holiday.
    pub is_holiday: bool,
    /// Name of the matched holiday.
    pub holiday_name: Option<String>,
}

/// Evaluates [`TemporalPolicy`] against pickup times.
#[derive(Debug, Clone)]
pub struct TemporalRules {
    policy: TemporalPolicy,
}

impl TemporalRules {
    /// Create an evaluator for `policy`.
    #[must_use]
    pub const fn new(policy: TemporalPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &TemporalPolicy {
        &self.policy
    }

    /// Classify a local pickup time. Total over every valid timestamp.
    #[must_use]
    pub fn classify(&self, pickup: NaiveDateTime) -> TemporalFlags {
        let is_weekend = matches!(pickup.weekday(), Weekday::Sat | Weekday::Sun);

        let hour = pickup.hour();
        let outside_hours = hour < self.policy.business_day_start_hour
            || hour >= self.policy.evening_threshold_hour;
        let is_after_hours = match self.policy.weekend_after_hours {
            WeekendAfterHours::Stack => outside_hours,
            WeekendAfterHours::WeekendExempt => outside_hours && !is_weekend,
        };

        let holiday_name = self.holiday_on(pickup.date()).map(ToString::to_string);

        TemporalFlags {
            is_weekend,
            is_after_hours,
            is_holiday: holiday_name.is_some(),
            holiday_name,
        }
    }

    /// Name of the first holiday rule matching `date`.
    #[must_use]
    pub fn holiday_on(&self, date: NaiveDate) -> Option<&str> {
        self.policy
            .holidays
            .iter()
            .find(|rule| rule.date_in(date.year()) == Some(date))
            .map(HolidayRule::name)
    }
}

impl HolidayRule {
    /// The date this holiday falls on in `year`, if it occurs that year.
    #[must_use]
    pub fn date_in(&self, year: i32) -> Option<NaiveDate> {
        match self {
            Self::Fixed { month, day, .. } => NaiveDate::from_ymd_opt(year, *month, *day),
            Self::NthWeekday {
                month, weekday, nth, ..
            } => NaiveDate::from_weekday_of_month_opt(year, *month, *weekday, *nth),
            Self::LastWeekday { month, weekday, .. } => {
                last_weekday_of_month(year, *month, *weekday)
            }
        }
    }
}

/// The last `weekday` of `month` in `year`.
#[must_use]
pub fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }?;
    let last = first_of_next.pred_opt()?;

    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    last.checked_sub_days(chrono::Days::new(u64::from(back)))
}

/// Convert a UTC instant to local civil time in `tz`.
#[must_use]
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    tz.from_utc_datetime(&instant.naive_utc()).naive_local()
}

/// Parse a pickup time into local civil time.
///
/// Accepts an RFC 3339 instant (converted into `tz`) or a naive local
/// `YYYY-MM-DDTHH:MM[:SS]`, which is taken as already local.
///
/// # Errors
///
/// Returns [`FareError::InvalidInput`] if the string matches neither form.
pub fn parse_pickup_time(input: &str, tz: Tz) -> Result<NaiveDateTime> {
    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(to_local(instant.with_timezone(&Utc), tz));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| {
            FareError::InvalidInput(format!(
                "pickup time '{input}' is not RFC 3339 or YYYY-MM-DDTHH:MM[:SS]"
            ))
        })
}
