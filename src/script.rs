use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error_codes::{CodedError, SCRIPT_UNREADABLE};

pub const SENDER_MARKER: char = '>';
pub const RECEIVER_MARKER: char = '<';
const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    pub fn marker(self) -> char {
        match self {
            Role::Sender => SENDER_MARKER,
            Role::Receiver => RECEIVER_MARKER,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sender,
    Receiver,
    Unrecognized,
}

impl Direction {
    pub fn role(self) -> Option<Role> {
        match self {
            Direction::Sender => Some(Role::Sender),
            Direction::Receiver => Some(Role::Receiver),
            Direction::Unrecognized => None,
        }
    }
}

/// How timestamps are attributed while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseMode {
    /// Inline `(HH:MM)` overrides set the time for their line and every line
    /// after it until the next override.
    #[default]
    Carry,
    /// Every message gets the fallback time; annotations are left in the text.
    StampNow,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Carry => "carry",
            ParseMode::StampNow => "stamp-now",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub raw: String,
    pub direction: Direction,
    pub body: String,
}

impl ScriptLine {
    /// Returns `None` for lines that are empty after trimming.
    pub fn classify(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        let first = chars.next()?;

        let (direction, body) = match first {
            SENDER_MARKER => (Direction::Sender, chars.as_str().trim()),
            RECEIVER_MARKER => (Direction::Receiver, chars.as_str().trim()),
            _ => (Direction::Unrecognized, trimmed),
        };

        Some(Self {
            raw: raw.to_owned(),
            direction,
            body: body.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOverride {
    pub hours: u32,
    pub minutes: u32,
    /// Byte offset in the body where the token (including any backslash) starts.
    pub token_start: usize,
}

impl TimeOverride {
    pub fn time_of_day(&self) -> NaiveTime {
        // Range-checked during extraction.
        NaiveTime::from_hms_opt(self.hours, self.minutes, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Calendar date and UTC offset come from `now`.
    pub fn resolve(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let naive = now.date_naive().and_time(self.time_of_day());
        naive
            .and_local_timezone(*now.offset())
            .single()
            .unwrap_or(now)
    }

    pub fn strip_from(&self, body: &str) -> String {
        body.get(..self.token_start)
            .unwrap_or(body)
            .trim()
            .to_owned()
    }
}

pub fn extract_time_override(body: &str) -> Option<TimeOverride> {
    static OVERRIDE_RE: OnceLock<Regex> = OnceLock::new();
    let re = OVERRIDE_RE.get_or_init(|| {
        Regex::new(r"\\?\(([0-9]+):([0-9]+)\)$").expect("time override regex should compile")
    });

    let capture = re.captures(body)?;
    let token = capture.get(0)?;
    let hours = capture.get(1)?.as_str().parse::<u32>().ok()?;
    let minutes = capture.get(2)?.as_str().parse::<u32>().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    Some(TimeOverride {
        hours,
        minutes,
        token_start: token.start(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub role: Role,
    pub timestamp: DateTime<FixedOffset>,
}

pub fn parse_conversation(raw: &str, now: DateTime<FixedOffset>) -> Vec<Message> {
    parse_conversation_with_mode(raw, now, ParseMode::Carry)
}

pub fn parse_conversation_with_mode(
    raw: &str,
    now: DateTime<FixedOffset>,
    mode: ParseMode,
) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut current_time = now;
    let mut dropped = 0_usize;
    let mut overrides = 0_usize;

    // `lines()` already strips a trailing '\r' from CRLF endings.
    for line in raw.lines() {
        let Some(script_line) = ScriptLine::classify(line) else {
            continue;
        };
        let Some(role) = script_line.direction.role() else {
            dropped += 1;
            continue;
        };

        let mut text = script_line.body;
        if mode == ParseMode::Carry {
            if let Some(time_override) = extract_time_override(&text) {
                current_time = time_override.resolve(now);
                text = time_override.strip_from(&text);
                overrides += 1;
            }
        }

        messages.push(Message {
            text,
            role,
            timestamp: current_time,
        });
    }

    tracing::debug!(
        messages = messages.len(),
        dropped,
        overrides,
        mode = mode.as_str(),
        "parsed conversation script"
    );
    messages
}

/// Reads a script file. Missing files and non-UTF-8 content are input errors.
/// A leading byte-order mark is dropped.
pub fn read_script(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|error| {
        CodedError::input(
            SCRIPT_UNREADABLE,
            format!("failed to read script {}: {error}", path.display()),
        )
    })?;
    let text = String::from_utf8(bytes).map_err(|_| {
        CodedError::input(
            SCRIPT_UNREADABLE,
            format!("script {} is not valid UTF-8", path.display()),
        )
    })?;
    match text.strip_prefix(BYTE_ORDER_MARK) {
        Some(rest) => Ok(rest.to_owned()),
        None => Ok(text),
    }
}
