//! Display formatting for extracted timestamps.
//!
//! Pure string formatting: a [`DateFormat`] pattern for the date portion plus
//! an `HH:MM` or `HH:MM:SS` time portion, joined by a single space.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The enumerated date patterns offered by the settings surface.
///
/// Serde names match the original setting values (`yyyy-MM-dd` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    /// `2024-03-05`
    #[serde(rename = "yyyy-MM-dd")]
    YearMonthDay,
    /// `05/03/2024`
    #[serde(rename = "dd/MM/yyyy")]
    DayMonthYearSlash,
    /// `03/05/2024`
    #[serde(rename = "MM/dd/yyyy")]
    MonthDayYearSlash,
    /// `05.03.2024`
    #[serde(rename = "dd.MM.yyyy")]
    DayMonthYearDot,
}

impl DateFormat {
    fn date_pattern(&self) -> &'static str {
        match self {
            DateFormat::YearMonthDay => "%Y-%m-%d",
            DateFormat::DayMonthYearSlash => "%d/%m/%Y",
            DateFormat::MonthDayYearSlash => "%m/%d/%Y",
            DateFormat::DayMonthYearDot => "%d.%m.%Y",
        }
    }
}

/// Render the stamp text for an instant: formatted date, one space, then
/// `HH:MM` (or `HH:MM:SS` when `show_seconds` is set).
pub fn format_timestamp(instant: NaiveDateTime, format: DateFormat, show_seconds: bool) -> String {
    let time_pattern = if show_seconds { "%H:%M:%S" } else { "%H:%M" };
    format!(
        "{} {}",
        instant.format(format.date_pattern()),
        instant.format(time_pattern)
    )
}
