use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::history::{EndTime, PlayEvent};
use crate::tally::{EntityKey, EntityKind, EntityTallies, RankBy, Tally};

/// Plays at or below this many milliseconds are skips and never counted.
pub const MIN_LISTEN_MS: u64 = 20_000;
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSettings {
    pub min_ms_played: u64,
    pub top_n: usize,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            min_ms_played: MIN_LISTEN_MS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRank {
    pub name: String,
    pub ms_played: u64,
}

impl Serialize for ArtistRank {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.name, self.ms_played).serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRank {
    pub name: String,
    pub track_name: String,
    pub artist_name: String,
    pub replays: u32,
    pub last_end_time: EndTime,
    pub ms_played: u64,
}

impl Serialize for TrackRank {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (
            &self.name,
            (self.replays, self.last_end_time, self.ms_played),
        )
            .serialize(serializer)
    }
}

/// Artist and track tallies of a single calendar date.
pub type DayBucket = EntityTallies;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    #[serde(skip)]
    pub key: EntityKey,
    pub name: String,
    pub ms_played: u64,
    #[serde(rename = "type")]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopForDay {
    pub artists: BTreeMap<NaiveDate, Vec<DayEntry>>,
    pub tracks: BTreeMap<NaiveDate, Vec<DayEntry>>,
}

impl TopForDay {
    pub fn days(&self, kind: EntityKind) -> &BTreeMap<NaiveDate, Vec<DayEntry>> {
        match kind {
            EntityKind::Artist => &self.artists,
            EntityKind::Track => &self.tracks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub artists: Tally,
    pub tracks: Tally,
}

/// Everything the renderers read. Built in one go by [`Aggregator::ingest`]
/// and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub top_artists: Vec<ArtistRank>,
    pub top_tracks: Vec<TrackRank>,
    pub total_playtime_top_artist: u64,
    pub total_playtime_top_track: u64,
    pub top_for_day: TopForDay,
    pub daily_totals: Vec<DailyTotals>,
    #[serde(skip)]
    pub artist_totals: Tally,
    #[serde(skip)]
    pub track_totals: Tally,
}

impl AggregateResult {
    /// Headline value that bar widths and sphere scales are divided by.
    pub fn headline(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Artist => self.total_playtime_top_artist,
            EntityKind::Track => self.total_playtime_top_track,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    settings: AggregateSettings,
}

impl Aggregator {
    pub fn new(settings: AggregateSettings) -> Self {
        Self { settings }
    }

    pub fn ingest(&self, events: &[PlayEvent]) -> AggregateResult {
        let min_ms_played = self.settings.min_ms_played;
        let top_n = self.settings.top_n;

        let mut totals = EntityTallies::default();
        for event in qualifying_plays(events, min_ms_played) {
            totals.record(event);
        }
        let EntityTallies {
            artists: artist_totals,
            tracks: track_totals,
        } = totals;

        let top_artists: Vec<_> = artist_totals
            .top_n(top_n, RankBy::ListenTime)
            .into_iter()
            .map(|(key, entry)| ArtistRank {
                name: key.to_string(),
                ms_played: entry.ms_played,
            })
            .collect();
        let top_tracks: Vec<_> = track_totals
            .top_n(top_n, RankBy::Replays)
            .into_iter()
            .map(|(key, entry)| TrackRank {
                name: key.to_string(),
                track_name: key.name.clone(),
                artist_name: key.artist.clone().unwrap_or_default(),
                replays: entry.replays,
                last_end_time: entry.last_end_time,
                ms_played: entry.ms_played,
            })
            .collect();

        let buckets = bucket_by_day(events, min_ms_played);
        let top_for_day = top_n_per_day(&buckets, top_n);
        let daily_totals = buckets
            .into_iter()
            .map(|(date, bucket)| DailyTotals {
                date,
                artists: bucket.artists,
                tracks: bucket.tracks,
            })
            .collect::<Vec<_>>();

        let total_playtime_top_artist = top_artists.first().map_or(0, |top| top.ms_played);
        let total_playtime_top_track = top_tracks.first().map_or(0, |top| top.ms_played);

        tracing::debug!(
            events = events.len(),
            artists = artist_totals.len(),
            tracks = track_totals.len(),
            days = daily_totals.len(),
            "Aggregated listening history"
        );

        AggregateResult {
            top_artists,
            top_tracks,
            total_playtime_top_artist,
            total_playtime_top_track,
            top_for_day,
            daily_totals,
            artist_totals,
            track_totals,
        }
    }
}

pub fn qualifying_plays(
    events: &[PlayEvent],
    min_ms_played: u64,
) -> impl Iterator<Item = &PlayEvent> {
    events
        .iter()
        .filter(move |event| event.ms_played > min_ms_played)
}

/// Per-date artist and track tallies over the qualifying plays.
pub fn bucket_by_day(events: &[PlayEvent], min_ms_played: u64) -> BTreeMap<NaiveDate, DayBucket> {
    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for event in qualifying_plays(events, min_ms_played) {
        buckets.entry(event.played_on()).or_default().record(event);
    }
    buckets
}

/// Ranks each day's tallies by listening time, for tracks as well as artists.
pub fn top_n_per_day(buckets: &BTreeMap<NaiveDate, DayBucket>, n: usize) -> TopForDay {
    let mut top = TopForDay::default();
    for (date, bucket) in buckets {
        top.artists
            .insert(*date, day_entries(bucket, EntityKind::Artist, n));
        top.tracks
            .insert(*date, day_entries(bucket, EntityKind::Track, n));
    }
    top
}

fn day_entries(bucket: &DayBucket, kind: EntityKind, n: usize) -> Vec<DayEntry> {
    bucket
        .tally(kind)
        .top_n(n, RankBy::ListenTime)
        .into_iter()
        .map(|(key, entry)| DayEntry {
            key: key.clone(),
            name: key.to_string(),
            ms_played: entry.ms_played,
            kind,
        })
        .collect()
}
