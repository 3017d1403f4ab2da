//! Date input and display helpers for the command line.

use chrono::{Datelike, Duration, Months, NaiveDate};

/// Parse a human-readable date relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday".."sunday" (this week's occurrence), "next friday"
/// - "end of week" / "eow", "end of month" / "eom"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD" and "DD/MM/YYYY"
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        "end of week" | "eow" => return Some(start_end_of_this_week(today).1),
        "end of month" | "eom" => {
            let first = today.with_day(1)?;
            return first.checked_add_months(Months::new(1))?.pred_opt();
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let split = rest.char_indices().last().map_or(0, |(i, _)| i);
        let (num, unit) = rest.split_at(split);
        if let Ok(n) = num.trim().parse::<i64>() {
            match unit {
                "d" => return today.checked_add_signed(Duration::try_days(n)?),
                "w" => return today.checked_add_signed(Duration::try_weeks(n)?),
                "m" => return today.checked_add_months(Months::new(u32::try_from(n).ok()?)),
                _ => {}
            }
        }
    }

    let (next, day_name) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix("this ").unwrap_or(&s)),
    };
    if let Some(target) = weekday_index(day_name) {
        let current = today.weekday().num_days_from_monday() as i64;
        let ahead = (target + 7 - current) % 7;
        let ahead = if next { ahead + 7 } else { ahead };
        return today.checked_add_signed(Duration::days(ahead));
    }

    parse_exchange_date(&s)
}

fn weekday_index(name: &str) -> Option<i64> {
    const NAMES: [(&str, &str); 7] = [
        ("monday", "mon"),
        ("tuesday", "tue"),
        ("wednesday", "wed"),
        ("thursday", "thu"),
        ("friday", "fri"),
        ("saturday", "sat"),
        ("sunday", "sun"),
    ];
    NAMES
        .iter()
        .position(|(long, short)| name == *long || name == *short)
        .map(|i| i as i64)
}

/// Parse a stored or imported date: `YYYY-MM-DD`, then `DD/MM/YYYY`.
pub fn parse_exchange_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Monday and Sunday of the ISO week containing `today`.
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Format an end date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_relative(date: Option<NaiveDate>, today: NaiveDate) -> String {
    match date {
        None => "-".into(),
        Some(d) => match (d - today).num_days() {
            0 => "today".into(),
            1 => "tomorrow".into(),
            n if n > 1 => format!("in {n}d"),
            n => format!("{}d late", -n),
        },
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into())
}

/// Truncate a string to a maximum width, adding an ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
