//! weekly schedule windows for the `schedule` attribute
//!
//! supports formats:
//! - day and time window: "MON-FRI 08:00-17:00", "monday-friday 9AM-5PM"
//! - days only: "SAT-SUN", "wed"
//! - time only: "08:00-17:00"
//! - wrapping ranges: "FRI-MON", "22:00-06:00"
//! - optional zone suffix: "MON-FRI 08:00-17:00[+02:00]", "...[UTC]"
//!
//! both bounds of a time range are inclusive at minute resolution.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};

/// a time range in minutes from midnight, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// start time in minutes from midnight (0-1439)
    pub start: u16,
    /// end time in minutes from midnight (0-1439)
    pub end: u16,
}

impl TimeRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// check if a time (in minutes from midnight) is within this range
    /// handles overnight ranges automatically
    pub fn contains(&self, minutes: u16) -> bool {
        if self.start <= self.end {
            // normal range: 09:00-17:00
            minutes >= self.start && minutes <= self.end
        } else {
            // overnight range: 22:00-06:00
            minutes >= self.start || minutes <= self.end
        }
    }
}

/// an inclusive weekday range, possibly wrapping over the weekend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: Weekday,
    pub end: Weekday,
}

impl DayRange {
    pub fn new(start: Weekday, end: Weekday) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, day: Weekday) -> bool {
        let start = self.start.num_days_from_monday();
        let end = self.end.num_days_from_monday();
        let day = day.num_days_from_monday();
        if start <= end {
            day >= start && day <= end
        } else {
            day >= start || day <= end
        }
    }
}

/// a weekly recurring window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// `None` means every day
    pub days: Option<DayRange>,
    /// `None` means the whole day
    pub times: Option<TimeRange>,
    /// zone pinned by the expression; otherwise the evaluation offset is used
    pub offset: Option<FixedOffset>,
}

impl Schedule {
    /// parse a schedule expression
    pub fn parse(s: &str) -> Result<Self, String> {
        let (body, offset) = split_zone(s.trim())?;
        let tokens: Vec<&str> = body.split_whitespace().collect();

        let (days, times) = match tokens.as_slice() {
            [single] if single.contains(':') || is_clock_token(single) => {
                (None, Some(parse_time_range(single)?))
            }
            [single] => (Some(parse_day_range(single)?), None),
            [days, times] => (Some(parse_day_range(days)?), Some(parse_time_range(times)?)),
            [] => return Err("empty schedule".to_string()),
            _ => {
                return Err(format!(
                    "expected `DAY-DAY HH:MM-HH:MM`, got `{}`",
                    body.trim()
                ))
            }
        };

        Ok(Self {
            days,
            times,
            offset,
        })
    }

    /// check whether `now` falls inside this window
    pub fn matches(&self, now: &DateTime<FixedOffset>) -> bool {
        let local = match self.offset {
            Some(offset) => now.with_timezone(&offset),
            None => *now,
        };

        let day_ok = self
            .days
            .map(|d| d.contains(local.weekday()))
            .unwrap_or(true);
        let minutes = (local.hour() * 60 + local.minute()) as u16;
        let time_ok = self.times.map(|t| t.contains(minutes)).unwrap_or(true);

        day_ok && time_ok
    }
}

fn is_clock_token(s: &str) -> bool {
    s.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false)
}

/// strip a trailing `[zone]` suffix
fn split_zone(s: &str) -> Result<(&str, Option<FixedOffset>), String> {
    match s.strip_suffix(']') {
        Some(rest) => {
            let open = rest
                .rfind('[')
                .ok_or_else(|| "unbalanced `]` in schedule".to_string())?;
            let zone = &rest[open + 1..];
            let offset =
                parse_offset(zone).ok_or_else(|| format!("invalid utc offset `{}`", zone))?;
            Ok((&rest[..open], Some(offset)))
        }
        None => Ok((s, None)),
    }
}

/// parse a utc offset: "UTC", "Z", "+02:00", "-0530", "+2"
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else if rest.len() == 4 {
        (rest.get(..2)?.parse::<i32>().ok()?, rest.get(2..)?.parse::<i32>().ok()?)
    } else {
        (rest.parse::<i32>().ok()?, 0)
    };

    if !(0..=23).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// parse a time string into minutes from midnight
/// supports: "09:00", "9:00", "9:00AM", "9AM", "17:00", "5:00PM", "5PM"
pub fn parse_time(s: &str) -> Option<u16> {
    let s = s.trim().to_uppercase();

    // check for AM/PM suffix
    let (time_part, is_pm, is_am) = if s.ends_with("AM") {
        (s.trim_end_matches("AM").trim(), false, true)
    } else if s.ends_with("PM") {
        (s.trim_end_matches("PM").trim(), true, false)
    } else {
        (s.as_str(), false, false)
    };

    let (hour, minute) = match time_part.split_once(':') {
        Some((h, m)) => (h.parse::<u16>().ok()?, m.parse::<u16>().ok()?),
        // bare hour only makes sense with AM/PM
        None if is_am || is_pm => (time_part.parse::<u16>().ok()?, 0),
        None => return None,
    };

    if minute >= 60 {
        return None;
    }

    let hour_24 = match (is_am, is_pm) {
        (_, true) if hour == 12 => 12,
        (_, true) => hour + 12,
        (true, _) if hour == 12 => 0,
        _ => hour,
    };

    if hour_24 >= 24 || ((is_am || is_pm) && hour > 12) {
        return None;
    }

    Some(hour_24 * 60 + minute)
}

/// parse a time range string like "08:00-17:00" or "9AM-5PM"
pub fn parse_time_range(s: &str) -> Result<TimeRange, String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("invalid time range `{}`: expected `HH:MM-HH:MM`", s))?;
    let start = parse_time(start).ok_or_else(|| format!("invalid time `{}`", start))?;
    let end = parse_time(end).ok_or_else(|| format!("invalid time `{}`", end))?;
    Ok(TimeRange::new(start, end))
}

/// parse a day range like "MON-FRI", "monday-friday" or a single "wed"
pub fn parse_day_range(s: &str) -> Result<DayRange, String> {
    let day = |d: &str| parse_weekday(d).ok_or_else(|| format!("invalid day `{}`", d));
    match s.split_once('-') {
        Some((start, end)) => Ok(DayRange::new(day(start)?, day(end)?)),
        None => {
            let d = day(s)?;
            Ok(DayRange::new(d, d))
        }
    }
}

/// parse a weekday from string
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
