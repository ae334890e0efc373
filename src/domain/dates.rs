use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const WEEKDAY_LETTERS: [char; 7] = ['S', 'M', 'T', 'W', 'T', 'F', 'S'];

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT).ok()
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DateStripEntry {
    pub key: String,
    pub day_letter: char,
    pub day_of_month: u32,
    pub is_today: bool,
    pub is_active: bool,
}

pub fn date_strip(
    today: NaiveDate,
    active: NaiveDate,
    days_before: u32,
    days_after: u32,
) -> Vec<DateStripEntry> {
    (-i64::from(days_before)..=i64::from(days_after))
        .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
        .map(|date| DateStripEntry {
            key: date_key(date),
            day_letter: WEEKDAY_LETTERS[weekday_index(date) as usize],
            day_of_month: date.day(),
            is_today: date == today,
            is_active: date == active,
        })
        .collect()
}

/// `"13:05"` -> `"01:05 PM"`. Returns `None` for anything that is not `HH:MM`.
pub fn format_display_time(time: &str) -> Option<String> {
    let (hour, minute) = time.split_once(':')?;
    let hour = hour.parse::<u8>().ok()?;
    if hour > 23 || minute.len() != 2 || minute.parse::<u8>().ok()? > 59 {
        return None;
    }
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        other => other,
    };
    Some(format!("{display_hour:02}:{minute} {suffix}"))
}

pub fn routine_days_label(days: &[u8]) -> String {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.len() == 7 {
        return "Everyday".to_string();
    }
    if sorted == [1, 2, 3, 4, 5] {
        return "Workdays".to_string();
    }
    days.iter()
        .filter_map(|day| WEEKDAY_LETTERS.get(*day as usize))
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
