use chrono::{DateTime, Datelike, Local, TimeZone};

/// What the home screen clock shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSnapshot {
    /// 24-hour `HH:MM`.
    pub time: String,
    /// e.g. `Monday, March 3`.
    pub date: String,
    pub weekday: String,
}

impl ClockSnapshot {
    pub fn at<Tz>(now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let weekday = now.format("%A").to_string();
        Self {
            time: now.format("%H:%M").to_string(),
            date: format!("{weekday}, {} {}", now.format("%B"), now.day()),
            weekday,
        }
    }

    pub fn now() -> Self {
        Self::at(&Local::now())
    }
}
