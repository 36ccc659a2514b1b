use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// `HH:MM:SS`, 24h; the hour may be written with one digit.
static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9])$").expect("valid clock regex")
});

/// Parse a wall-clock time, `None` if it does not match `HH:MM:SS`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let caps = CLOCK_RE.captures(value)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    NaiveTime::from_hms_opt(field(1)?, field(2)?, field(3)?)
}

/// `[00:00 of date, 00:00 of the next day)`
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    let end = date
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);
    (start, end)
}

/// Whole minutes from `from` to `to`, floored; 0 if `to` is not after `from`.
pub fn minutes_after(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_seconds().max(0).div_euclid(60)
}

/// Every date in `[from, to]`.
pub fn dates_inclusive(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}
