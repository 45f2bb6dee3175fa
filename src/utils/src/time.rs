use chrono::format::StrftimeItems;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// Beyond chrono's representable years; keeps the millisecond count in range.
const MAX_DAYS: f64 = 1e9;

/// start_date builds the simulation start from a `[day, month, year, hour,
/// minute, microsecond]` vector. The time of day is optional.
pub fn start_date(values: &[i32]) -> Option<NaiveDateTime> {
    if values.len() < 3 {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(values[2], values[1] as u32, values[0] as u32)?;
    let hour = values.get(3).copied().unwrap_or(0);
    let minute = values.get(4).copied().unwrap_or(0);
    let micros = values.get(5).copied().unwrap_or(0);

    let secs = micros / 1_000_000;
    let micros = micros % 1_000_000;
    date.and_hms_micro_opt(hour as u32, minute as u32, secs as u32, micros as u32)
}

/// date_parts splits a timestamp into `[day, month, year, hour, minute, second, 0]`.
pub fn date_parts(dt: NaiveDateTime) -> [i32; 7] {
    [
        dt.day() as i32,
        dt.month() as i32,
        dt.year(),
        dt.hour() as i32,
        dt.minute() as i32,
        dt.second() as i32,
        0,
    ]
}

/// from_date_parts is the inverse of `date_parts`.
pub fn from_date_parts(parts: &[i32]) -> Option<NaiveDateTime> {
    if parts.len() < 6 {
        return start_date(parts);
    }
    let date = NaiveDate::from_ymd_opt(parts[2], parts[1] as u32, parts[0] as u32)?;
    date.and_hms_opt(parts[3] as u32, parts[4] as u32, parts[5] as u32)
}

/// add_days offsets `start` by a fractional number of days, rounded to the
/// millisecond. Offsets that are not finite or leave chrono's range give None.
pub fn add_days(start: NaiveDateTime, days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days.abs() > MAX_DAYS {
        return None;
    }
    let millis = (days * 86_400_000.0).round() as i64;
    start.checked_add_signed(Duration::milliseconds(millis))
}

pub fn time_format(dt: NaiveDateTime) -> String {
    let fmt = StrftimeItems::new("%Y-%m-%d %H:%M:%S");
    format!("{}", dt.format_with_items(fmt))
}
