use chrono::NaiveDate;

/// Parses a provider date key.
///
/// Accepts ISO `YYYY-MM-DD` and the `M/D/YY` form the statistics provider
/// emits in its timelines (two-digit years are 20xx). Returns `None` for
/// anything else, including out-of-range calendar dates.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(key, "%Y-%m-%d") {
        return Some(d);
    }

    let mut parts = key.split('/');
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let year = match year.len() {
        2 => 2000 + year.parse::<i32>().ok()?,
        4 => year.parse::<i32>().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}
