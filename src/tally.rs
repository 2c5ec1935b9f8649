//! Ordered per-entity accumulation shared by the global and per-day views.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::history::{EndTime, PlayEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    #[serde(rename = "artistName")]
    Artist,
    #[serde(rename = "trackName")]
    Track,
}

impl EntityKind {
    pub fn key_for(self, event: &PlayEvent) -> EntityKey {
        match self {
            Self::Artist => EntityKey::artist(&event.artist_name),
            Self::Track => EntityKey::track(&event.track_name, &event.artist_name),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Artist => "artists",
            Self::Track => "tracks",
        }
    }
}

/// Identity of an artist, or of a track together with its artist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub name: String,
    pub artist: Option<String>,
}

impl EntityKey {
    pub fn artist(name: &str) -> Self {
        Self {
            name: name.to_string(),
            artist: None,
        }
    }

    pub fn track(title: &str, artist: &str) -> Self {
        Self {
            name: title.to_string(),
            artist: Some(artist.to_string()),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artist {
            Some(artist) => write!(f, "{}_{}", self.name, artist),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyEntry {
    pub replays: u32,
    pub last_end_time: EndTime,
    pub ms_played: u64,
}

/// Ranking field for [`Tally::top_n`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    ListenTime,
    Replays,
}

impl RankBy {
    fn value(self, entry: &TallyEntry) -> u64 {
        match self {
            Self::ListenTime => entry.ms_played,
            Self::Replays => u64::from(entry.replays),
        }
    }
}

/// Insertion-ordered tally. Iteration order is first-seen order, which is
/// also the tie-break order of [`Tally::top_n`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: IndexMap<EntityKey, TallyEntry>,
}

impl Tally {
    pub fn record(&mut self, key: EntityKey, event: &PlayEvent) {
        let entry = self.entries.entry(key).or_insert(TallyEntry {
            replays: 0,
            last_end_time: event.end_time,
            ms_played: 0,
        });
        entry.replays = entry.replays.saturating_add(1);
        entry.last_end_time = event.end_time;
        entry.ms_played = entry.ms_played.saturating_add(event.ms_played);
    }

    pub fn get(&self, key: &EntityKey) -> Option<&TallyEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &TallyEntry)> {
        self.entries.iter()
    }

    /// The `n` highest entries by `rank_by`, descending. Equal values keep
    /// first-seen order.
    pub fn top_n(&self, n: usize, rank_by: RankBy) -> Vec<(&EntityKey, &TallyEntry)> {
        let mut ranked: Vec<_> = self.entries.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| rank_by.value(b).cmp(&rank_by.value(a)));
        ranked.truncate(n);
        ranked
    }
}

/// One tally per entity kind, fed by the same events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityTallies {
    pub artists: Tally,
    pub tracks: Tally,
}

impl EntityTallies {
    pub fn record(&mut self, event: &PlayEvent) {
        self.artists.record(EntityKind::Artist.key_for(event), event);
        self.tracks.record(EntityKind::Track.key_for(event), event);
    }

    pub fn tally(&self, kind: EntityKind) -> &Tally {
        match kind {
            EntityKind::Artist => &self.artists,
            EntityKind::Track => &self.tracks,
        }
    }
}

/// Serialized form of one tally entry. Labels of distinct tracks can
/// coincide, so the track and artist names travel separately.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TallyRow<'a> {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    track_name: Option<&'a str>,
    artist_name: &'a str,
    replays: u32,
    last_end_time: EndTime,
    ms_played: u64,
}

impl Serialize for Tally {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            let (track_name, artist_name) = match &key.artist {
                Some(artist) => (Some(key.name.as_str()), artist.as_str()),
                None => (None, key.name.as_str()),
            };
            seq.serialize_element(&TallyRow {
                name: key.to_string(),
                track_name,
                artist_name,
                replays: entry.replays,
                last_end_time: entry.last_end_time,
                ms_played: entry.ms_played,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(artist: &str, track: &str, end_time: &str, ms_played: u64) -> PlayEvent {
        PlayEvent {
            artist_name: artist.to_string(),
            track_name: track.to_string(),
            end_time: EndTime::parse(end_time).unwrap(),
            ms_played,
        }
    }

    fn tallies(events: &[PlayEvent]) -> EntityTallies {
        let mut tallies = EntityTallies::default();
        for event in events {
            tallies.record(event);
        }
        tallies
    }

    #[test]
    fn track_keys_include_artist() {
        let events = [
            play("A", "Intro", "2023-01-01 10:00", 30000),
            play("B", "Intro", "2023-01-01 10:05", 40000),
        ];
        let tally = tallies(&events).tracks;
        assert_eq!(tally.len(), 2);
        assert_eq!(tally.get(&EntityKey::track("Intro", "A")).unwrap().ms_played, 30000);
        assert_eq!(tally.get(&EntityKey::track("Intro", "B")).unwrap().ms_played, 40000);
    }

    #[test]
    fn underscores_in_names_do_not_collide() {
        let events = [
            play("b", "a_", "2023-01-01 10:00", 30000),
            play("_b", "a", "2023-01-01 10:05", 30000),
        ];
        let tally = tallies(&events).tracks;
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn record_tracks_latest_end_time() {
        let events = [
            play("A", "T", "2023-01-01 10:00", 30000),
            play("A", "T", "2023-01-03 09:30", 25000),
        ];
        let tally = tallies(&events).tracks;
        let entry = tally.get(&EntityKey::track("T", "A")).unwrap();
        assert_eq!(entry.replays, 2);
        assert_eq!(entry.ms_played, 55000);
        assert_eq!(entry.last_end_time.to_string(), "2023-01-03 09:30");
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let events = [
            play("First", "T", "2023-01-01 10:00", 30000),
            play("Big", "T", "2023-01-01 10:01", 90000),
            play("Second", "T", "2023-01-01 10:02", 30000),
        ];
        let tally = tallies(&events).artists;
        let names: Vec<_> = tally
            .top_n(5, RankBy::ListenTime)
            .into_iter()
            .map(|(key, _)| key.name.as_str())
            .collect();
        assert_eq!(names, ["Big", "First", "Second"]);

        let by_replays: Vec<_> = tally
            .top_n(2, RankBy::Replays)
            .into_iter()
            .map(|(key, _)| key.name.as_str())
            .collect();
        assert_eq!(by_replays, ["First", "Big"]);
    }

    #[test]
    fn serializes_rows_in_first_seen_order() {
        let events = [
            play("A", "T", "2023-01-01 10:00", 30000),
            play("B", "U", "2023-01-01 10:05", 25000),
        ];
        let value = serde_json::to_value(tallies(&events)).unwrap();
        assert_eq!(
            value["tracks"],
            serde_json::json!([
                {"name": "T_A", "trackName": "T", "artistName": "A", "replays": 1, "lastEndTime": "2023-01-01 10:00", "msPlayed": 30000},
                {"name": "U_B", "trackName": "U", "artistName": "B", "replays": 1, "lastEndTime": "2023-01-01 10:05", "msPlayed": 25000}
            ])
        );
        assert_eq!(
            value["artists"][0],
            serde_json::json!({"name": "A", "artistName": "A", "replays": 1, "lastEndTime": "2023-01-01 10:00", "msPlayed": 30000})
        );
    }

    #[test]
    fn colliding_labels_serialize_as_separate_rows() {
        let events = [
            play("b", "a_", "2023-01-01 10:00", 30000),
            play("_b", "a", "2023-01-01 10:05", 40000),
        ];
        let value = serde_json::to_value(tallies(&events).tracks).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], rows[1]["name"]);
        assert_eq!(rows[0]["trackName"], "a_");
        assert_eq!(rows[1]["artistName"], "_b");
        assert_eq!(rows[1]["msPlayed"], 40000);
    }
}
