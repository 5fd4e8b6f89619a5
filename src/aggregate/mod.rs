//! Side-effect-free projections over a snapshot of situations.
//!
//! Every function here takes `&[Situation]`, decodes the readings it needs
//! and returns a fresh result. Malformed readings are logged and skipped;
//! none of these functions fail.

use tracing::debug;

use crate::decoder::decode;
use crate::models::{RawReading, Situation};

mod activity;
mod comparison;
mod series;
mod snapshot;

pub use activity::{aggregate, HourClock};
pub use comparison::compare;
pub use series::extract;
pub use snapshot::latest_by_kind;

// ---

/// Inclusive time bounds, in seconds since the epoch. `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl Window {
    // ---
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }
}

/// `true` when no room filter is set or `room` is one of `rooms`.
/// An empty list counts as no filter.
pub(crate) fn room_selected(rooms: Option<&[String]>, room: &str) -> bool {
    match rooms {
        Some(rooms) if !rooms.is_empty() => rooms.iter().any(|r| r == room),
        _ => true,
    }
}

/// Decoded readings of every situation, in store order, paired with their
/// owning situation.
pub(crate) fn readings(
    situations: &[Situation],
) -> impl Iterator<Item = (&Situation, RawReading)> + '_ {
    // ---
    situations.iter().flat_map(|situation| {
        situation
            .details()
            .iter()
            .filter_map(move |raw| match decode(raw) {
                Ok(reading) => Some((situation, reading)),
                Err(e) => {
                    debug!(situation = %situation.id, error = %e, "Skipping malformed reading");
                    None
                }
            })
    })
}

/// Distinct sensor kind names, in first-seen order.
pub fn sensor_kinds(situations: &[Situation]) -> Vec<String> {
    // ---
    let mut kinds: Vec<String> = Vec::new();
    for (_, reading) in readings(situations) {
        if !kinds.iter().any(|k| k == reading.kind.as_str()) {
            kinds.push(reading.kind.as_str().to_string());
        }
    }
    kinds
}

/// Distinct rooms, in first-seen order.
pub fn rooms(situations: &[Situation]) -> Vec<String> {
    // ---
    let mut rooms: Vec<String> = Vec::new();
    for (_, reading) in readings(situations) {
        if !rooms.contains(&reading.room) {
            rooms.push(reading.room);
        }
    }
    rooms
}

/// Number of situations currently labeled anomalous.
pub fn count_anomalies(situations: &[Situation]) -> usize {
    situations
        .iter()
        .filter(|s| s.label().is_anomalous())
        .count()
}
