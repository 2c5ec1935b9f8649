use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const END_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const EXPORT_FILE_PREFIX: &str = "StreamingHistory";
const EXPORT_FILE_EXTENSION: &str = "json";
const PODCAST_PART_PREFIX: &str = "StreamingHistory_podcast";

/// One entry of a streaming history export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayEvent {
    pub artist_name: String,
    pub track_name: String,
    pub end_time: EndTime,
    pub ms_played: u64,
}

impl PlayEvent {
    pub fn played_on(&self) -> NaiveDate {
        self.end_time.date()
    }
}

/// Minute-resolution timestamp of the moment a play ended, e.g. `2023-01-01 10:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndTime(NaiveDateTime);

impl EndTime {
    pub fn parse(value: &str) -> std::result::Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(value.trim(), END_TIME_FORMAT).map(Self)
    }

    pub fn date(self) -> NaiveDate {
        self.0.date()
    }
}

impl fmt::Display for EndTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(END_TIME_FORMAT))
    }
}

impl Serialize for EndTime {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EndTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|err| {
            serde::de::Error::custom(format!("invalid endTime {raw:?} ({err})"))
        })
    }
}

/// Parses a whole export. Either every entry is valid or nothing is returned.
pub fn parse_history(raw: &str, origin: &str) -> Result<Vec<PlayEvent>> {
    serde_json::from_str(raw).map_err(|err| Error::data_format(origin, err))
}

pub fn read_history_file(path: &Path) -> Result<Vec<PlayEvent>> {
    let origin = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|err| Error::source_unavailable(&origin, err))?;
    let events = parse_history(&raw, &origin)?;
    tracing::debug!(path = %origin, events = events.len(), "Read history file");
    Ok(events)
}

/// Reads every `StreamingHistory*.json` part in `dir`, in export order.
pub fn read_history_dir(dir: &Path) -> Result<Vec<PlayEvent>> {
    let parts = export_parts(dir)?;
    if parts.is_empty() {
        return Err(Error::source_unavailable(
            dir.display().to_string(),
            "no StreamingHistory*.json files found",
        ));
    }
    let mut events = Vec::new();
    for part in parts {
        events.extend(read_history_file(&part)?);
    }
    Ok(events)
}

fn export_parts(dir: &Path) -> Result<Vec<PathBuf>> {
    let origin = dir.display().to_string();
    let listing = std::fs::read_dir(dir).map_err(|err| Error::source_unavailable(&origin, err))?;
    let mut parts = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|err| Error::source_unavailable(&origin, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if is_podcast_part(&path) {
            tracing::warn!(path = %path.display(), "Skipping podcast history part");
            continue;
        }
        let Some(part_number) = export_part_number(&path) else {
            tracing::trace!(path = %path.display(), "Skipping non-export file");
            continue;
        };
        parts.push((part_number, path));
    }
    parts.sort();
    Ok(parts.into_iter().map(|(_, path)| path).collect())
}

/// Podcast parts hold `podcastName`/`episodeName` entries, not plays.
fn is_podcast_part(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.starts_with(PODCAST_PART_PREFIX))
}

/// `StreamingHistory3.json` → 3, `StreamingHistory_music_12.json` → 12,
/// `StreamingHistory.json` → 0. Anything else is not an export part.
fn export_part_number(path: &Path) -> Option<u64> {
    if path.extension()?.to_str()? != EXPORT_FILE_EXTENSION {
        return None;
    }
    let suffix = path.file_stem()?.to_str()?.strip_prefix(EXPORT_FILE_PREFIX)?;
    let digit_count = suffix
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .count();
    let digits = &suffix[suffix.len() - digit_count..];
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}
