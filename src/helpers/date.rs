//! Date helper functions

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Month and weekday names of one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateNames {
    pub months: Vec<String>,
    pub months_short: Vec<String>,
    /// Sunday first
    pub weekdays: Vec<String>,
    pub weekdays_short: Vec<String>,
}

impl DateNames {
    /// English names
    pub fn english() -> Self {
        Self {
            months: owned(&[
                "January",
                "February",
                "March",
                "April",
                "May",
                "June",
                "July",
                "August",
                "September",
                "October",
                "November",
                "December",
            ]),
            months_short: owned(&[
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ]),
            weekdays: owned(&[
                "Sunday",
                "Monday",
                "Tuesday",
                "Wednesday",
                "Thursday",
                "Friday",
                "Saturday",
            ]),
            weekdays_short: owned(&["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]),
        }
    }

    /// Whether every list has the expected length
    pub fn is_complete(&self) -> bool {
        self.months.len() == 12
            && self.months_short.len() == 12
            && self.weekdays.len() == 7
            && self.weekdays_short.len() == 7
    }
}

impl Default for DateNames {
    fn default() -> Self {
        Self::english()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Chrono(&'static str),
    Month,
    MonthShort,
    Weekday,
    WeekdayShort,
    Literal(String),
}

/// Moment.js tokens, longest first within each family
const TOKENS: &[(&str, Token)] = &[
    ("YYYY", Token::Chrono("%Y")),
    ("YY", Token::Chrono("%y")),
    ("MMMM", Token::Month),
    ("MMM", Token::MonthShort),
    ("MM", Token::Chrono("%m")),
    ("M", Token::Chrono("%-m")),
    ("DDDD", Token::Chrono("%j")),
    ("DD", Token::Chrono("%d")),
    ("D", Token::Chrono("%-d")),
    ("dddd", Token::Weekday),
    ("ddd", Token::WeekdayShort),
    ("HH", Token::Chrono("%H")),
    ("hh", Token::Chrono("%I")),
    ("mm", Token::Chrono("%M")),
    ("SSS", Token::Chrono("%3f")),
    ("ss", Token::Chrono("%S")),
    ("ZZ", Token::Chrono("%z")),
];

/// Format a date using a Moment.js-compatible format string and English names
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY-MM-DD") // -> "2024-01-15"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format_date_localized(date, format, &DateNames::english())
}

/// Format a date, taking month and weekday names from `names`
///
/// Text inside `[brackets]` is copied literally.
pub fn format_date_localized<Tz: TimeZone>(
    date: &DateTime<Tz>,
    format: &str,
    names: &DateNames,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let month = date.month0() as usize;
    let weekday = date.weekday().num_days_from_sunday() as usize;

    tokenize(format)
        .into_iter()
        .map(|token| match token {
            Token::Chrono(spec) => date.format(spec).to_string(),
            Token::Month => pick(&names.months, month),
            Token::MonthShort => pick(&names.months_short, month),
            Token::Weekday => pick(&names.weekdays, weekday),
            Token::WeekdayShort => pick(&names.weekdays_short, weekday),
            Token::Literal(text) => text,
        })
        .collect()
}

/// Format a UTC timestamp in the given IANA timezone (empty or unknown = UTC)
pub fn format_in_timezone(
    date: &DateTime<Utc>,
    format: &str,
    names: &DateNames,
    timezone: &str,
) -> String {
    match parse_timezone(timezone) {
        Some(tz) => format_date_localized(&date.with_timezone(&tz), format, names),
        None => format_date_localized(date, format, names),
    }
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Option<chrono_tz::Tz> {
    if name.is_empty() {
        return None;
    }
    name.parse::<chrono_tz::Tz>().ok()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Owned copies of a name list
pub(crate) fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn pick(names: &[String], index: usize) -> String {
    names.get(index).cloned().unwrap_or_default()
}

fn tokenize(format: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = format;

    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                literal.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }

        for (pattern, token) in TOKENS {
            if let Some(tail) = rest.strip_prefix(pattern) {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(token.clone());
                rest = tail;
                continue 'outer;
            }
        }

        literal.push(c);
        rest = &rest[c.len_utf8()..];
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}
