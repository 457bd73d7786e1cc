use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static REGEX_TITLE: Lazy<Regex> = Lazy::new(|| front_matter_key("title"));
static REGEX_SOURCE: Lazy<Regex> = Lazy::new(|| front_matter_key("source"));
static REGEX_URL: Lazy<Regex> = Lazy::new(|| front_matter_key("url"));
static REGEX_CREATED: Lazy<Regex> = Lazy::new(|| front_matter_key("created"));
static REGEX_UPDATED: Lazy<Regex> = Lazy::new(|| front_matter_key("updated"));
static REGEX_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(?P<value>.+?)[ \t]*\r?$").unwrap());

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

fn front_matter_key(key: &str) -> Regex {
    Regex::new(&format!(r"(?m)^{}:[ \t]*(?P<value>.*?)[ \t]*\r?$", key)).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Created,
    Updated,
}

impl DateField {
    fn regex(self) -> &'static Regex {
        match self {
            DateField::Created => &REGEX_CREATED,
            DateField::Updated => &REGEX_UPDATED,
        }
    }
}

/// Split front matter and body from markdown content.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    if content.starts_with("---") {
        if let Some(end_idx) = content[3..].find("\n---") {
            let front = &content[3..end_idx + 3];
            let body_start = (end_idx + 3 + 4).min(content.len());
            return (Some(front), &content[body_start..]);
        }
    }
    (None, content)
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn front_matter_value(content: &str, re: &Regex) -> Option<String> {
    let (front, _) = split_front_matter(content);
    let caps = re.captures(front?)?;
    let value = unquote(caps.name("value")?.as_str());
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Title from the front matter, falling back to the first level-1 heading.
pub fn extract_title(content: &str) -> Option<String> {
    if let Some(title) = front_matter_value(content, &REGEX_TITLE) {
        return Some(title);
    }
    let (_, body) = split_front_matter(content);
    REGEX_HEADING
        .captures(body)
        .and_then(|caps| caps.name("value"))
        .map(|m| m.as_str().to_string())
}

/// Web page the note was clipped from (`source:` or `url:`).
pub fn extract_url(content: &str) -> Option<String> {
    front_matter_value(content, &REGEX_SOURCE).or_else(|| front_matter_value(content, &REGEX_URL))
}

pub fn extract_date(field: DateField, content: &str) -> Option<DateTime<Utc>> {
    front_matter_value(content, field.regex()).and_then(|v| parse_date(&v))
}

/// Parse a front-matter date. Values without an offset are taken as UTC.
/// Sub-second precision is dropped to match the Evernote database.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })?;
    parsed.with_nanosecond(0)
}
