//! Time-series extraction for one sensor kind.

use crate::models::{Situation, TimeSeriesPoint};

use super::{readings, room_selected, Window};

// ---

/// Project the readings of `kind_name` into points sorted by timestamp.
///
/// `is_anomalous` is the owning situation's label, not a per-reading flag.
/// Equal timestamps keep their store order.
pub fn extract(
    situations: &[Situation],
    kind_name: &str,
    window: Window,
    rooms: Option<&[String]>,
) -> Vec<TimeSeriesPoint> {
    // ---
    let mut points: Vec<TimeSeriesPoint> = readings(situations)
        .filter(|(_, r)| r.kind.as_str() == kind_name)
        .filter(|(_, r)| window.contains(r.timestamp))
        .filter(|(_, r)| room_selected(rooms, &r.room))
        .map(|(situation, r)| TimeSeriesPoint {
            timestamp: r.timestamp,
            value: r.value(),
            datetime: r.datetime,
            room: r.room,
            is_anomalous: situation.label().is_anomalous(),
        })
        .collect();

    // Vec::sort_by_key is stable.
    points.sort_by_key(|p| p.timestamp);
    points
}
