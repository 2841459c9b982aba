//! Conference agenda
//!
//! The agenda is a static list of events grouped by day. Each event carries a
//! free-form time range such as `"09:00 AM - 10:30 AM"` or `"14:00 - 15:30"`.
//! This module parses those ranges and answers two questions relative to a
//! point in time in the conference timezone: which events are running now,
//! and which events start next.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

const BUNDLED_AGENDA: &str = include_str!("../data/agenda.json");

/// Agenda errors
#[derive(Debug, Error)]
pub enum AgendaError {
    /// The agenda file could not be read
    #[error("Failed to read agenda: {0}")]
    Io(#[from] std::io::Error),

    /// The agenda JSON is malformed
    #[error("Failed to parse agenda: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for agenda operations
pub type Result<T> = std::result::Result<T, AgendaError>;

// =============================================================================
// Timezone
// =============================================================================

/// Conference timezone
///
/// A standard UTC offset with optional EU summer time, which adds one hour
/// from 01:00 UTC on the last Sunday of March until 01:00 UTC on the last
/// Sunday of October.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceTimezone {
    /// Offset from UTC outside summer time, in minutes
    pub standard_offset_minutes: i32,
    /// Whether EU summer time applies
    #[serde(default)]
    pub eu_summer_time: bool,
}

impl Default for ConferenceTimezone {
    fn default() -> Self {
        Self::athens()
    }
}

impl ConferenceTimezone {
    /// Europe/Athens (EET/EEST)
    pub fn athens() -> Self {
        Self { standard_offset_minutes: 120, eu_summer_time: true }
    }

    /// A fixed offset without summer time
    pub fn fixed(offset_minutes: i32) -> Self {
        Self { standard_offset_minutes: offset_minutes, eu_summer_time: false }
    }

    /// Offset from UTC at the given instant, in minutes
    pub fn offset_minutes_at(&self, at: DateTime<Utc>) -> i32 {
        if self.eu_summer_time && is_eu_summer_time(at.naive_utc()) {
            self.standard_offset_minutes + 60
        } else {
            self.standard_offset_minutes
        }
    }

    /// Local wall-clock time at the given instant
    pub fn to_local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.naive_utc() + chrono::Duration::minutes(i64::from(self.offset_minutes_at(at)))
    }
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    // March and October both have 31 days
    let last = NaiveDate::from_ymd_opt(year, month, 31)?;
    last.checked_sub_days(Days::new(u64::from(last.weekday().num_days_from_sunday())))
}

fn is_eu_summer_time(utc: NaiveDateTime) -> bool {
    let bounds = || -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = last_sunday(utc.year(), 3)?.and_hms_opt(1, 0, 0)?;
        let end = last_sunday(utc.year(), 10)?.and_hms_opt(1, 0, 0)?;
        Some((start, end))
    };
    matches!(bounds(), Some((start, end)) if utc >= start && utc < end)
}

// =============================================================================
// Time ranges
// =============================================================================

/// Parsed event time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start time
    pub start: NaiveTime,
    /// End time; earlier than `start` when the event runs past midnight
    pub end: NaiveTime,
}

impl TimeRange {
    /// Parse `"HH:MM AM/PM - HH:MM AM/PM"` or `"HH:MM - HH:MM"`
    ///
    /// Each side may carry its own meridiem. Returns `None` for anything else,
    /// e.g. `"Free Evening"`.
    pub fn parse(text: &str) -> Option<Self> {
        static TIME_RANGE_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = TIME_RANGE_REGEX.get_or_init(|| {
            Regex::new(
                r"(?i)^\s*(\d{1,2}):(\d{2})\s*([AP]M)?\s*[-\u{2013}]\s*(\d{1,2}):(\d{2})\s*([AP]M)?\s*$",
            )
            .unwrap()
        });

        let caps = re.captures(text)?;
        let start = clock_time(&caps[1], &caps[2], caps.get(3).map(|m| m.as_str()))?;
        let end = clock_time(&caps[4], &caps[5], caps.get(6).map(|m| m.as_str()))?;
        Some(Self { start, end })
    }

    /// Whether the range ends on the following day
    pub fn is_overnight(&self) -> bool {
        self.end < self.start
    }

    /// Whether `time` falls in the part of the range on the start day
    fn contains_on_start_day(&self, time: NaiveTime) -> bool {
        time >= self.start && (self.is_overnight() || time < self.end)
    }

    /// Whether `time` falls in the part of the range after midnight
    fn contains_on_next_day(&self, time: NaiveTime) -> bool {
        self.is_overnight() && time < self.end
    }
}

fn clock_time(hours: &str, minutes: &str, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;

    let hours = match meridiem.map(str::to_ascii_uppercase).as_deref() {
        Some("AM") if (1..=12).contains(&hours) => hours % 12,
        Some("PM") if (1..=12).contains(&hours) => hours % 12 + 12,
        Some(_) => return None,
        None => hours,
    };

    NaiveTime::from_hms_opt(hours, minutes, 0)
}

// =============================================================================
// Events
// =============================================================================

/// Event category, as labelled in the agenda
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Attendee registration
    Registration,
    /// Opening ceremony
    OpeningCeremony,
    /// Keynote or invited speech
    Speech,
    /// Coffee or lunch break
    Break,
    /// Quiz
    Quiz,
    /// Registration for workshops
    WorkshopRegistration,
    /// Workshop session
    Workshop,
    /// Paper presentations
    PaperPresentation,
    /// Company talk
    CompanyTalk,
    /// Panel discussion
    Panel,
    /// Hackathon
    Hackathon,
    /// Other ceremonies
    Ceremony,
    /// Job interviews
    Interviews,
    /// Anything else, with its original label
    Other(String),
}

impl EventKind {
    /// Agenda label
    pub fn label(&self) -> &str {
        match self {
            EventKind::Registration => "Registration",
            EventKind::OpeningCeremony => "Opening Ceremony",
            EventKind::Speech => "Speech",
            EventKind::Break => "Break",
            EventKind::Quiz => "Quiz",
            EventKind::WorkshopRegistration => "Workshop Registration",
            EventKind::Workshop => "Workshop",
            EventKind::PaperPresentation => "Paper Presentation",
            EventKind::CompanyTalk => "Company Talk",
            EventKind::Panel => "Panel",
            EventKind::Hackathon => "Hackathon",
            EventKind::Ceremony => "Ceremony",
            EventKind::Interviews => "Συνεντύξεις",
            EventKind::Other(label) => label,
        }
    }

    /// Accent color used for the event card
    pub fn color(&self) -> &'static str {
        match self {
            EventKind::Registration => "#4CAF50",
            EventKind::OpeningCeremony => "#2196F3",
            EventKind::Speech => "#FF9800",
            EventKind::Break => "#9C27B0",
            EventKind::Quiz => "#F44336",
            EventKind::WorkshopRegistration => "#795548",
            EventKind::Workshop => "#3F51B5",
            EventKind::PaperPresentation => "#009688",
            EventKind::CompanyTalk => "#00BCD4",
            EventKind::Panel => "#CDDC39",
            EventKind::Hackathon => "#E91E63",
            EventKind::Ceremony => "#673AB7",
            EventKind::Interviews => "#607D8B",
            EventKind::Other(_) => "#9E9E9E",
        }
    }
}

impl From<String> for EventKind {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Registration" => EventKind::Registration,
            "Opening Ceremony" => EventKind::OpeningCeremony,
            "Speech" => EventKind::Speech,
            "Break" => EventKind::Break,
            "Quiz" => EventKind::Quiz,
            "Workshop Registration" => EventKind::WorkshopRegistration,
            "Workshop" => EventKind::Workshop,
            "Paper Presentation" => EventKind::PaperPresentation,
            "Company Talk" => EventKind::CompanyTalk,
            "Panel" => EventKind::Panel,
            "Hackathon" => EventKind::Hackathon,
            "Ceremony" => EventKind::Ceremony,
            "Συνεντύξεις" | "Interviews" => EventKind::Interviews,
            _ => EventKind::Other(label),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.label().to_string()
    }
}

/// One agenda entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaEvent {
    /// Day id
    pub day: String,
    /// Time range as written in the agenda
    pub time: String,
    /// Title
    pub name: String,
    /// Venue
    #[serde(default)]
    pub place: String,
    /// Room within the venue
    #[serde(default)]
    pub room: String,
    /// Category
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl AgendaEvent {
    /// Parsed time range, `None` when the text is not a range
    pub fn time_range(&self) -> Option<TimeRange> {
        TimeRange::parse(&self.time)
    }

    /// `"place - room"`, omitting empty parts
    pub fn location(&self) -> String {
        match (self.place.is_empty(), self.room.is_empty()) {
            (false, false) => format!("{} - {}", self.place, self.room),
            (false, true) => self.place.clone(),
            (true, false) => self.room.clone(),
            (true, true) => String::new(),
        }
    }
}

/// A conference day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaDay {
    /// Id referenced by events
    pub id: String,
    /// Display label
    pub label: String,
    /// Calendar date in the conference timezone
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

// =============================================================================
// Agenda
// =============================================================================

/// Full conference agenda
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agenda {
    /// Conference timezone
    #[serde(default)]
    pub timezone: ConferenceTimezone,
    /// Declared days
    #[serde(default)]
    pub days: Vec<AgendaDay>,
    /// All events
    pub events: Vec<AgendaEvent>,
}

impl Agenda {
    /// The agenda shipped with the app
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_AGENDA)
    }

    /// Parse an agenda from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load an agenda from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let agenda = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), events = agenda.events.len(), "loaded agenda");
        Ok(agenda)
    }

    /// Replace the timezone
    pub fn with_timezone(mut self, timezone: ConferenceTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Days that have events, in order of first appearance
    ///
    /// Declared metadata is used when present; otherwise the id doubles as
    /// the label.
    pub fn days(&self) -> Vec<AgendaDay> {
        let mut days: Vec<AgendaDay> = Vec::new();
        for event in &self.events {
            if days.iter().any(|d| d.id == event.day) {
                continue;
            }
            let day = self.days.iter().find(|d| d.id == event.day).cloned().unwrap_or_else(|| {
                AgendaDay { id: event.day.clone(), label: event.day.clone(), date: None }
            });
            days.push(day);
        }
        days
    }

    /// Events of one day, in agenda order
    pub fn events_for_day(&self, day: &str) -> Vec<&AgendaEvent> {
        self.events.iter().filter(|e| e.day == day).collect()
    }

    /// Id of the day scheduled on a date
    pub fn day_for_date(&self, date: NaiveDate) -> Option<&str> {
        self.days.iter().find(|d| d.date == Some(date)).map(|d| d.id.as_str())
    }

    /// Events running at an instant
    ///
    /// Ranges include their start and exclude their end. Overnight events
    /// from the previous day are included after midnight.
    pub fn now(&self, at: DateTime<Utc>) -> Vec<&AgendaEvent> {
        let local = self.timezone.to_local(at);
        let time = local.time();
        let today = self.day_for_date(local.date());
        let yesterday = local.date().pred_opt().and_then(|d| self.day_for_date(d));

        self.events
            .iter()
            .filter(|event| {
                let Some(range) = event.time_range() else {
                    return false;
                };
                (today == Some(event.day.as_str()) && range.contains_on_start_day(time))
                    || (yesterday == Some(event.day.as_str()) && range.contains_on_next_day(time))
            })
            .collect()
    }

    /// Events of the current day that start next
    ///
    /// All events sharing the earliest start strictly after the current
    /// local time are returned. Empty when nothing else starts today.
    pub fn next(&self, at: DateTime<Utc>) -> Vec<&AgendaEvent> {
        let local = self.timezone.to_local(at);
        match self.day_for_date(local.date()) {
            Some(day) => self.next_on(day, local.time()),
            None => Vec::new(),
        }
    }

    /// Events of `day` running at a local time
    pub fn now_on(&self, day: &str, time: NaiveTime) -> Vec<&AgendaEvent> {
        self.events_for_day(day)
            .into_iter()
            .filter(|e| e.time_range().is_some_and(|r| r.contains_on_start_day(time)))
            .collect()
    }

    /// Events of `day` starting next after a local time
    pub fn next_on(&self, day: &str, time: NaiveTime) -> Vec<&AgendaEvent> {
        let upcoming: Vec<(NaiveTime, &AgendaEvent)> = self
            .events_for_day(day)
            .into_iter()
            .filter_map(|e| e.time_range().map(|r| (r.start, e)))
            .filter(|(start, _)| *start > time)
            .collect();

        let Some(earliest) = upcoming.iter().map(|(start, _)| *start).min() else {
            return Vec::new();
        };

        upcoming.into_iter().filter(|(start, _)| *start == earliest).map(|(_, e)| e).collect()
    }
}
