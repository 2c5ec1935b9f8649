//! Data models behind the two visualizations: the day-by-day race chart and
//! the sphere scene. Nothing here draws; renderers read these values.

use std::collections::btree_map;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::aggregate::{AggregateResult, ArtistRank, DayEntry};
use crate::tally::{EntityKey, EntityKind};

pub const DEFAULT_CHART_BARS: usize = 10;

const MS_PER_MINUTE: u64 = 60_000;
const SPHERE_START_X: f64 = -0.5;
const SPHERE_SPACING: f64 = 0.25;
const SPHERE_Y: f64 = 0.2;
const LABEL_OFFSET_Y: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub name: String,
    pub cumulative_ms: u64,
    pub minutes: u64,
    pub width_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub date: NaiveDate,
    pub bars: Vec<Bar>,
}

/// Replays per-day top lists in date order, growing one cumulative total per
/// entity. Each call to `next` consumes one day.
pub struct RaceChart<'a> {
    days: btree_map::Iter<'a, NaiveDate, Vec<DayEntry>>,
    cumulative: IndexMap<EntityKey, u64>,
    bars: usize,
    scale: u64,
}

impl<'a> RaceChart<'a> {
    pub fn new(result: &'a AggregateResult, kind: EntityKind, bars: usize) -> Self {
        Self {
            days: result.top_for_day.days(kind).iter(),
            cumulative: IndexMap::new(),
            bars,
            scale: result.headline(kind),
        }
    }

    /// Current top bars; after the last frame these are the final standings.
    pub fn standings(&self) -> Vec<Bar> {
        let mut ranked: Vec<_> = self.cumulative.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| b.cmp(a));
        ranked
            .into_iter()
            .take(self.bars)
            .map(|(key, &cumulative_ms)| Bar {
                name: key.to_string(),
                cumulative_ms,
                minutes: cumulative_ms / MS_PER_MINUTE,
                width_fraction: fraction(cumulative_ms, self.scale),
            })
            .collect()
    }
}

impl Iterator for RaceChart<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let (date, entries) = self.days.next()?;
        for entry in entries {
            let total = self.cumulative.entry(entry.key.clone()).or_insert(0);
            *total = total.saturating_add(entry.ms_played);
        }
        Some(Frame {
            date: *date,
            bars: self.standings(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sphere {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub label_y: f64,
}

/// Lays the top artists out left to right, each sized by its share of the
/// listed artists' combined listening time.
pub fn sphere_layout(top_artists: &[ArtistRank]) -> Vec<Sphere> {
    let total: u64 = top_artists.iter().map(|artist| artist.ms_played).sum();
    top_artists
        .iter()
        .enumerate()
        .map(|(idx, artist)| Sphere {
            label: artist.name.clone(),
            x: SPHERE_START_X + SPHERE_SPACING * idx as f64,
            y: SPHERE_Y,
            scale: fraction(artist.ms_played, total),
            label_y: SPHERE_Y + LABEL_OFFSET_Y,
        })
        .collect()
}

fn fraction(value: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    value as f64 / total as f64
}
