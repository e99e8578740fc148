//! # Holiday Calendar
//!
//! Matches a calendar date against a tenant's holiday list.
//!
//! ## Matching Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  single     date == "YYYY-MM-DD"                                        │
//! │                                                                         │
//! │  recurring                                                              │
//! │   ├── yearly   month + day_of_month   → "every 25 December"            │
//! │   │            day_of_week only       → EVERY such weekday, any month  │
//! │   ├── monthly  day_of_month           → "every 1st"                    │
//! │   └── weekly   day_of_week            → "every Sunday"                 │
//! │                                                                         │
//! │  First holiday in list order wins.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Known Quirk: yearly + day_of_week
//! A yearly holiday with only `day_of_week` set matches every date with that
//! weekday, all year round. It was probably meant to express things like
//! "4th Thursday of November", but stored data relies on the current
//! behavior, so it is kept as is and pinned by a test.
//!
//! Malformed entries (missing fields, bad dates) simply never match.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Single date or recurring pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum HolidayType {
    Single,
    Recurring,
}

/// Recurrence period of a recurring holiday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Yearly,
    Monthly,
    Weekly,
}

/// Recurrence definition.
///
/// `day_of_week`: 0 = Sunday … 6 = Saturday. `month`: 1 = January … 12.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub pattern: RecurrencePattern,
    #[serde(default)]
    pub day_of_month: Option<u32>,
    #[serde(default)]
    pub day_of_week: Option<u32>,
    #[serde(default)]
    pub month: Option<u32>,
}

/// A calendar rule that may force the business closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub holiday_type: HolidayType,
    /// For single holidays: `YYYY-MM-DD` (longer ISO strings are truncated).
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub recurring: Option<Recurrence>,
    #[serde(default)]
    pub is_business_closed: bool,
}

impl Holiday {
    /// A one-off holiday on `date`.
    pub fn single(id: impl Into<String>, name: impl Into<String>, date: NaiveDate, closed: bool) -> Self {
        Holiday {
            id: id.into(),
            name: name.into(),
            holiday_type: HolidayType::Single,
            date: Some(date.format("%Y-%m-%d").to_string()),
            recurring: None,
            is_business_closed: closed,
        }
    }

    /// A recurring holiday.
    pub fn recurring(
        id: impl Into<String>,
        name: impl Into<String>,
        recurrence: Recurrence,
        closed: bool,
    ) -> Self {
        Holiday {
            id: id.into(),
            name: name.into(),
            holiday_type: HolidayType::Recurring,
            date: None,
            recurring: Some(recurrence),
            is_business_closed: closed,
        }
    }

    /// Parses the single-date field, if present and well formed.
    pub fn single_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_day)
    }

    /// True if this holiday falls on `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        match self.holiday_type {
            HolidayType::Single => self.single_date() == Some(date),
            HolidayType::Recurring => self
                .recurring
                .as_ref()
                .is_some_and(|r| recurrence_covers(r, date)),
        }
    }
}

/// Parses `YYYY-MM-DD`, ignoring anything after the first ten characters.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn recurrence_covers(recurrence: &Recurrence, date: NaiveDate) -> bool {
    let weekday = date.weekday().num_days_from_sunday();

    match recurrence.pattern {
        RecurrencePattern::Yearly => match (recurrence.month, recurrence.day_of_month) {
            (Some(month), Some(day)) => date.month() == month && date.day() == day,
            _ => recurrence.day_of_week == Some(weekday),
        },
        RecurrencePattern::Monthly => recurrence.day_of_month == Some(date.day()),
        RecurrencePattern::Weekly => recurrence.day_of_week == Some(weekday),
    }
}

/// Returns the first holiday in `holidays` that covers `date`.
pub fn get_holiday_for_date(date: NaiveDate, holidays: &[Holiday]) -> Option<&Holiday> {
    holidays.iter().find(|h| h.covers(date))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn yearly(month: Option<u32>, day_of_month: Option<u32>, day_of_week: Option<u32>) -> Recurrence {
        Recurrence {
            pattern: RecurrencePattern::Yearly,
            day_of_month,
            day_of_week,
            month,
        }
    }

    #[test]
    fn test_single_date_match() {
        let christmas = Holiday::single("xmas-25", "Christmas", day(2025, 12, 25), true);
        assert!(christmas.covers(day(2025, 12, 25)));
        assert!(!christmas.covers(day(2024, 12, 25)));
        assert!(!christmas.covers(day(2025, 12, 26)));
    }

    #[test]
    fn test_single_date_accepts_iso_timestamp() {
        let mut stocktake = Holiday::single("st", "Stocktake", day(2025, 3, 1), true);
        stocktake.date = Some("2025-03-01T00:00:00.000Z".to_string());
        assert!(stocktake.covers(day(2025, 3, 1)));

        stocktake.date = Some("03/01/2025".to_string());
        assert!(!stocktake.covers(day(2025, 3, 1)));

        stocktake.date = None;
        assert!(!stocktake.covers(day(2025, 3, 1)));
    }

    #[test]
    fn test_yearly_month_and_day() {
        let new_year = Holiday::recurring("ny", "New Year", yearly(Some(1), Some(1), None), true);
        assert!(new_year.covers(day(2026, 1, 1)));
        assert!(new_year.covers(day(2031, 1, 1)));
        assert!(!new_year.covers(day(2026, 2, 1)));
    }

    #[test]
    fn test_yearly_day_of_week_matches_every_such_weekday() {
        // Intended as a once-a-year Thursday; actually every Thursday.
        let thanksgiving =
            Holiday::recurring("tg", "Thanksgiving", yearly(Some(11), None, Some(4)), true);

        assert!(thanksgiving.covers(day(2025, 11, 27)));
        assert!(thanksgiving.covers(day(2025, 11, 6)));
        assert!(thanksgiving.covers(day(2025, 3, 13)));
        assert!(!thanksgiving.covers(day(2025, 11, 28)));
    }

    #[test]
    fn test_yearly_without_fields_never_matches() {
        let broken = Holiday::recurring("x", "Broken", yearly(Some(5), None, None), true);
        assert!(!broken.covers(day(2025, 5, 1)));
    }

    #[test]
    fn test_monthly_and_weekly() {
        let inventory = Holiday::recurring(
            "inv",
            "Inventory day",
            Recurrence {
                pattern: RecurrencePattern::Monthly,
                day_of_month: Some(15),
                day_of_week: None,
                month: None,
            },
            true,
        );
        assert!(inventory.covers(day(2025, 2, 15)));
        assert!(!inventory.covers(day(2025, 2, 16)));

        let sundays = Holiday::recurring(
            "sun",
            "Sunday rest",
            Recurrence {
                pattern: RecurrencePattern::Weekly,
                day_of_month: None,
                day_of_week: Some(0),
                month: None,
            },
            true,
        );
        assert!(sundays.covers(day(2025, 6, 1)));
        assert!(!sundays.covers(day(2025, 6, 2)));
    }

    #[test]
    fn test_first_match_in_list_order() {
        let holidays = vec![
            Holiday::single("a", "Open House", day(2025, 7, 4), false),
            Holiday::single("b", "Independence Day", day(2025, 7, 4), true),
        ];
        let found = get_holiday_for_date(day(2025, 7, 4), &holidays).unwrap();
        assert_eq!(found.id, "a");
        assert!(get_holiday_for_date(day(2025, 7, 5), &holidays).is_none());
    }

    #[test]
    fn test_deserialize_from_settings_json() {
        let json = r#"{
            "id": "h1",
            "name": "Labour Day",
            "type": "recurring",
            "recurring": {"pattern": "yearly", "month": 5, "dayOfMonth": 1},
            "isBusinessClosed": true
        }"#;
        let holiday: Holiday = serde_json::from_str(json).unwrap();
        assert_eq!(holiday.holiday_type, HolidayType::Recurring);
        assert!(holiday.covers(day(2027, 5, 1)));
    }
}
