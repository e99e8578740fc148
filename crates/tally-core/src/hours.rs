//! # Business-Hours Evaluator
//!
//! Decides whether a tenant is open at a given wall-clock time and, when it
//! is not, when it opens next.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Holiday covering the date with is_business_closed?                  │
//! │        └── yes → CLOSED "Closed for {name}"                             │
//! │                                                                         │
//! │  2. Special hours entry for this exact date?                            │
//! │        ├── disabled        → CLOSED "{note}"                            │
//! │        ├── open/close set  → time-range check                           │
//! │        └── no times        → OPEN                                       │
//! │                                                                         │
//! │  3. Weekly schedule configured?                                         │
//! │        ├── day missing / disabled → CLOSED "Closed on {Day}"            │
//! │        ├── time-range check                                             │
//! │        └── inside a break         → CLOSED "Closed for break"           │
//! │                                                                         │
//! │  4. Nothing configured → OPEN                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Time Windows
//! Times are `HH:MM` wall-clock strings. `close < open` describes an
//! overnight window (22:00–02:00). `open == close` is open around the clock.
//! A time that does not parse makes the affected window open; schedule
//! mistakes must never lock the till.
//!
//! All functions here work on naive local time. The `*_at` variants take a
//! UTC instant and convert through the schedule's IANA timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::holiday::{get_holiday_for_date, parse_day, Holiday};

/// Upper bound on days scanned by [`get_next_open_time`].
pub const MAX_LOOKAHEAD_DAYS: usize = 365;

const MINUTES_PER_DAY: u16 = 24 * 60;

// =============================================================================
// Time of Day
// =============================================================================

/// Minutes since local midnight, `00:00` through `24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Parses `HH:MM`. `24:00` is accepted as end of day.
    pub fn parse(raw: &str) -> Option<Self> {
        let (h, m) = raw.trim().split_once(':')?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return None;
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hours: u16 = h.parse().ok()?;
        let minutes: u16 = m.parse().ok()?;
        if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
            return None;
        }
        Some(TimeOfDay(hours * 60 + minutes))
    }

    /// The time-of-day part of `at`, truncated to the minute.
    pub fn of(at: NaiveDateTime) -> Self {
        TimeOfDay((at.hour() * 60 + at.minute()) as u16)
    }

    pub const fn minutes(&self) -> u16 {
        self.0
    }

    /// This time on `date`. `24:00` lands on the following midnight.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        if self.0 >= MINUTES_PER_DAY {
            return (date + Duration::days(1)).and_time(NaiveTime::MIN);
        }
        let time = NaiveTime::from_hms_opt(u32::from(self.0 / 60), u32::from(self.0 % 60), 0)
            .unwrap_or(NaiveTime::MIN);
        date.and_time(time)
    }
}

// =============================================================================
// Schedule Types
// =============================================================================

/// A closed interval inside an open day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BreakWindow {
    pub start: String,
    pub end: String,
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub enabled: bool,
    pub open_time: String,
    pub close_time: String,
    #[serde(default)]
    pub breaks: Vec<BreakWindow>,
}

impl DaySchedule {
    /// An enabled day without breaks.
    pub fn open(open_time: &str, close_time: &str) -> Self {
        DaySchedule {
            enabled: true,
            open_time: open_time.to_string(),
            close_time: close_time.to_string(),
            breaks: Vec::new(),
        }
    }

    /// A disabled day.
    pub fn closed() -> Self {
        DaySchedule {
            enabled: false,
            open_time: "00:00".to_string(),
            close_time: "00:00".to_string(),
            breaks: Vec::new(),
        }
    }

    /// Adds a break window.
    pub fn with_break(mut self, start: &str, end: &str) -> Self {
        self.breaks.push(BreakWindow {
            start: start.to_string(),
            end: end.to_string(),
        });
        self
    }
}

/// The seven-day template, keyed `monday` … `sunday`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub struct WeeklySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DaySchedule>,
}

impl WeeklySchedule {
    pub fn get(&self, day: Weekday) -> Option<&DaySchedule> {
        match day {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    /// Returns a copy with `day` set to `schedule`.
    pub fn with_day(mut self, day: Weekday, schedule: DaySchedule) -> Self {
        let slot = match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = Some(schedule);
        self
    }

    /// Iterates configured days in Monday-first order.
    pub fn days(&self) -> impl Iterator<Item = (Weekday, &DaySchedule)> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .filter_map(move |d| self.get(d).map(|s| (d, s)))
    }

    /// True if no weekday is configured at all.
    pub fn is_empty(&self) -> bool {
        self.days().next().is_none()
    }
}

/// A date-specific override of the weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SpecialHours {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub enabled: bool,
    #[serde(default)]
    pub open_time: Option<String>,
    #[serde(default)]
    pub close_time: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A tenant's opening-hours configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    /// IANA zone name, e.g. `America/Chicago`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub schedule: WeeklySchedule,
    #[serde(default)]
    pub special_hours: Vec<SpecialHours>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for BusinessHours {
    fn default() -> Self {
        BusinessHours {
            timezone: default_timezone(),
            schedule: WeeklySchedule::default(),
            special_hours: Vec::new(),
        }
    }
}

impl BusinessHours {
    /// The configured timezone, or UTC if the name is unknown.
    pub fn tz(&self) -> Tz {
        self.timezone.parse::<Tz>().unwrap_or(Tz::UTC)
    }

    /// Converts a UTC instant to local wall-clock time.
    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz()).naive_local()
    }

    /// Converts local wall-clock time to a UTC instant.
    ///
    /// Ambiguous times (clocks going back) resolve to the earlier instant.
    /// Times skipped by a DST jump resolve to the first valid time after the
    /// gap.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let tz = self.tz();
        let mut candidate = local;
        for _ in 0..4 {
            if let Some(at) = tz.from_local_datetime(&candidate).earliest() {
                return at.with_timezone(&Utc);
            }
            candidate += Duration::minutes(30);
        }
        Utc.from_utc_datetime(&local)
    }

    fn special_for(&self, date: NaiveDate) -> Option<&SpecialHours> {
        self.special_hours
            .iter()
            .find(|s| parse_day(&s.date) == Some(date))
    }
}

// =============================================================================
// Result
// =============================================================================

/// Which part of the configuration decided an [`OpenStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum OpenBasis {
    /// Nothing configured; open by default.
    Unconfigured,
    Holiday,
    SpecialHours,
    Schedule,
}

/// Whether the business is open, and if not, why and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OpenStatus {
    pub is_open: bool,
    pub reason: Option<String>,
    /// Local wall-clock time of the next opening, when it is known cheaply.
    #[ts(as = "Option<String>")]
    pub next_open: Option<NaiveDateTime>,
    pub basis: OpenBasis,
}

impl OpenStatus {
    fn open(basis: OpenBasis) -> Self {
        OpenStatus {
            is_open: true,
            reason: None,
            next_open: None,
            basis,
        }
    }

    fn closed(basis: OpenBasis, reason: impl Into<String>, next_open: Option<NaiveDateTime>) -> Self {
        OpenStatus {
            is_open: false,
            reason: Some(reason.into()),
            next_open,
            basis,
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

enum Window {
    Open,
    Closed { next_open: NaiveDateTime },
}

/// Checks `at` against an `open`–`close` window on its own date.
fn check_window(at: NaiveDateTime, open: TimeOfDay, close: TimeOfDay) -> Window {
    let now = TimeOfDay::of(at);
    let today = at.date();

    if open == close {
        return Window::Open;
    }

    if close > open {
        if now >= open && now < close {
            return Window::Open;
        }
        let next_open = if now < open {
            open.on(today)
        } else {
            open.on(today + Duration::days(1))
        };
        return Window::Closed { next_open };
    }

    // Overnight: open from `open` until midnight, and from midnight until `close`.
    if now >= open || now < close {
        Window::Open
    } else {
        Window::Closed {
            next_open: open.on(today),
        }
    }
}

fn window_status(at: NaiveDateTime, open: &str, close: &str, basis: OpenBasis) -> OpenStatus {
    let (Some(open), Some(close)) = (TimeOfDay::parse(open), TimeOfDay::parse(close)) else {
        return OpenStatus::open(basis);
    };
    match check_window(at, open, close) {
        Window::Open => OpenStatus::open(basis),
        Window::Closed { next_open } => {
            OpenStatus::closed(basis, "Outside business hours", Some(next_open))
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Determines whether the business is open at local time `at`.
pub fn is_business_open(
    at: NaiveDateTime,
    business_hours: Option<&BusinessHours>,
    holidays: &[Holiday],
) -> OpenStatus {
    let today = at.date();

    if let Some(holiday) = get_holiday_for_date(today, holidays) {
        if holiday.is_business_closed {
            return OpenStatus::closed(
                OpenBasis::Holiday,
                format!("Closed for {}", holiday.name),
                None,
            );
        }
    }

    let Some(hours) = business_hours else {
        return OpenStatus::open(OpenBasis::Unconfigured);
    };

    if let Some(special) = hours.special_for(today) {
        if !special.enabled {
            let reason = special
                .note
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Closed today".to_string());
            return OpenStatus::closed(OpenBasis::SpecialHours, reason, None);
        }
        return match (&special.open_time, &special.close_time) {
            (Some(open), Some(close)) => window_status(at, open, close, OpenBasis::SpecialHours),
            _ => OpenStatus::open(OpenBasis::SpecialHours),
        };
    }

    if hours.schedule.is_empty() {
        return OpenStatus::open(OpenBasis::Unconfigured);
    }

    let weekday = today.weekday();
    let day = match hours.schedule.get(weekday) {
        Some(day) if day.enabled => day,
        _ => {
            return OpenStatus::closed(
                OpenBasis::Schedule,
                format!("Closed on {}", weekday_name(weekday)),
                None,
            )
        }
    };

    let status = window_status(at, &day.open_time, &day.close_time, OpenBasis::Schedule);
    if !status.is_open {
        return status;
    }

    let now = TimeOfDay::of(at);
    for window in &day.breaks {
        let (Some(start), Some(end)) = (TimeOfDay::parse(&window.start), TimeOfDay::parse(&window.end))
        else {
            continue;
        };
        if now >= start && now < end {
            return OpenStatus::closed(OpenBasis::Schedule, "Closed for break", Some(end.on(today)));
        }
    }

    status
}

/// Finds the next local time at or after `from` when the business is open.
///
/// Returns `from` itself when already open, otherwise the first explicit
/// `next_open` the evaluator reports while stepping forward one day at a time
/// (from midnight). Gives up after [`MAX_LOOKAHEAD_DAYS`] days, which is what
/// happens when every weekday is disabled.
pub fn get_next_open_time(
    from: NaiveDateTime,
    business_hours: Option<&BusinessHours>,
    holidays: &[Holiday],
) -> Option<NaiveDateTime> {
    let mut cursor = from;

    for _ in 0..MAX_LOOKAHEAD_DAYS {
        let status = is_business_open(cursor, business_hours, holidays);
        if status.is_open {
            return Some(cursor);
        }
        if let Some(next_open) = status.next_open {
            return Some(next_open);
        }
        cursor = (cursor.date() + Duration::days(1)).and_time(NaiveTime::MIN);
    }

    None
}

/// [`is_business_open`] for a UTC instant, evaluated in the schedule's timezone.
///
/// `next_open` in the result stays in local wall-clock time.
pub fn is_business_open_at(
    instant: DateTime<Utc>,
    business_hours: Option<&BusinessHours>,
    holidays: &[Holiday],
) -> OpenStatus {
    let local = match business_hours {
        Some(hours) => hours.local_time(instant),
        None => instant.naive_utc(),
    };
    is_business_open(local, business_hours, holidays)
}

/// [`get_next_open_time`] for a UTC instant; the answer is a UTC instant too.
pub fn next_open_at(
    instant: DateTime<Utc>,
    business_hours: Option<&BusinessHours>,
    holidays: &[Holiday],
) -> Option<DateTime<Utc>> {
    match business_hours {
        Some(hours) => {
            let local = hours.local_time(instant);
            get_next_open_time(local, Some(hours), holidays).map(|at| hours.to_utc(at))
        }
        None => get_next_open_time(instant.naive_utc(), None, holidays)
            .map(|at| Utc.from_utc_datetime(&at)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
