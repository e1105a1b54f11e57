use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const SLOT_STEP_MINUTES: i64 = 30;
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Opening window used when a location has no hours on record or no location was requested.
pub const DEFAULT_OPEN: &str = "09:00";
pub const DEFAULT_CLOSE: &str = "19:00";

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub closed: bool,
}

impl DayHours {
    pub fn open(open: &str, close: &str) -> Self {
        Self {
            open: Some(open.to_string()),
            close: Some(close.to_string()),
            closed: false,
        }
    }

    pub fn closed() -> Self {
        Self {
            open: None,
            close: None,
            closed: true,
        }
    }

    fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        if self.closed {
            return None;
        }
        let open = parse_time(self.open.as_deref()?).ok()?;
        let close = parse_time(self.close.as_deref()?).ok()?;
        (open < close).then_some((open, close))
    }
}

/// Weekly hours keyed by weekday name (`"monday"`, or the short `"mon"`).
/// A weekday with no entry is closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatingHours(pub BTreeMap<String, DayHours>);

impl OperatingHours {
    /// Mon–Fri 09:00–19:00, Sat 09:00–17:00, Sun closed.
    pub fn standard_week() -> Self {
        let mut days = BTreeMap::new();
        for (day, _) in &WEEKDAYS[..5] {
            days.insert(day.to_string(), DayHours::open("09:00", "19:00"));
        }
        days.insert("saturday".to_string(), DayHours::open("09:00", "17:00"));
        days.insert("sunday".to_string(), DayHours::closed());
        Self(days)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (day, hours) in &self.0 {
            parse_weekday(day)?;
            if hours.closed {
                continue;
            }
            let open = hours
                .open
                .as_deref()
                .ok_or_else(|| format!("{day}: open time is required unless closed"))?;
            let close = hours
                .close
                .as_deref()
                .ok_or_else(|| format!("{day}: close time is required unless closed"))?;
            let (open, close) = (parse_time(open)?, parse_time(close)?);
            if open >= close {
                return Err(format!("{day}: open must be before close"));
            }
        }
        Ok(())
    }

    /// The open window for a weekday, or `None` when closed or not listed.
    pub fn window(&self, weekday: Weekday) -> Option<(NaiveTime, NaiveTime)> {
        self.0
            .iter()
            .find(|(day, _)| parse_weekday(day).map(|d| d == weekday).unwrap_or(false))
            .and_then(|(_, hours)| hours.window())
    }

    /// Candidate start times for `date`; empty when the day is closed.
    pub fn grid_for(&self, date: NaiveDate, duration_minutes: i64) -> Vec<String> {
        self.window(date.weekday())
            .map(|(open, close)| slot_grid(open, close, duration_minutes))
            .unwrap_or_default()
    }
}

/// Start times from `open` on a 30-minute step for which the whole appointment
/// still ends by `close`.
pub fn slot_grid(open: NaiveTime, close: NaiveTime, duration_minutes: i64) -> Vec<String> {
    let step = Duration::minutes(SLOT_STEP_MINUTES);
    let length = Duration::minutes(duration_minutes.max(1));
    let mut slots = Vec::new();
    let mut start = open;

    loop {
        let (end, wrapped) = start.overflowing_add_signed(length);
        if wrapped != 0 || end > close {
            break;
        }
        slots.push(start.format("%H:%M").to_string());

        let (next, wrapped) = start.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        start = next;
    }

    slots
}

/// The default grid used when no location hours apply.
pub fn default_grid(duration_minutes: i64) -> Vec<String> {
    match (parse_time(DEFAULT_OPEN), parse_time(DEFAULT_CLOSE)) {
        (Ok(open), Ok(close)) => slot_grid(open, close, duration_minutes),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySchedule {
    pub available_slots: Vec<String>,
    pub booked_slots: Vec<String>,
}

impl DaySchedule {
    /// Removes booked start times from the grid. Booked times are normalised to
    /// `HH:MM`, sorted and deduplicated.
    pub fn new(grid: Vec<String>, booked: impl IntoIterator<Item = String>) -> Self {
        let mut booked_slots: Vec<String> = booked
            .into_iter()
            .map(|t| t.chars().take(5).collect())
            .collect();
        booked_slots.sort();
        booked_slots.dedup();

        let available_slots = grid
            .into_iter()
            .filter(|slot| booked_slots.binary_search(slot).is_err())
            .collect();

        Self {
            available_slots,
            booked_slots,
        }
    }
}

pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    let lower = s.to_lowercase();
    WEEKDAYS
        .iter()
        .find(|(day, _)| *day == lower || (lower.len() == 3 && day.starts_with(&lower)))
        .map(|(_, weekday)| *weekday)
        .ok_or_else(|| format!("invalid weekday: {s}"))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(format!("invalid time format: {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| format!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| format!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| format!("time out of range: {s}"))
}
