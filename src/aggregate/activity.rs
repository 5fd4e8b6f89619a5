//! Room/hour-of-day activity heatmap.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Local, Timelike};
use tracing::debug;

use crate::models::{ActivityBucket, Situation};

use super::{readings, room_selected, rooms as observed_rooms, Window};

// ---

const HOURS: usize = 24;

/// Wall clock used to turn a reading timestamp into an hour bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HourClock {
    /// Local time of the host running the service.
    #[default]
    Local,
    /// A fixed UTC offset, for deployments that serve a single known timezone.
    Fixed(FixedOffset),
}

impl HourClock {
    /// Hour of day (0..=23), or `None` for a timestamp chrono cannot represent.
    pub fn hour_of(self, timestamp: i64) -> Option<u8> {
        // ---
        let utc = DateTime::from_timestamp(timestamp, 0)?;
        let hour = match self {
            HourClock::Local => utc.with_timezone(&Local).hour(),
            HourClock::Fixed(offset) => utc.with_timezone(&offset).hour(),
        };
        u8::try_from(hour).ok()
    }
}

#[derive(Clone, Copy, Default)]
struct Counts {
    activity: u32,
    anomalies: u32,
}

/// Count readings per room and hour of day.
///
/// Output is dense: 24 buckets per room, room-major, hours ascending. Rooms
/// are the explicit `rooms` list (deduplicated, in given order) or, when it is
/// absent or empty, every room observed in `situations`. Every reading counts
/// regardless of kind; readings of anomalous situations also count as
/// anomalies.
pub fn aggregate(
    situations: &[Situation],
    window: Window,
    rooms: Option<&[String]>,
    clock: HourClock,
) -> Vec<ActivityBucket> {
    // ---
    let room_list: Vec<String> = match rooms {
        Some(rooms) if !rooms.is_empty() => {
            let mut unique: Vec<String> = Vec::with_capacity(rooms.len());
            for room in rooms {
                if !unique.contains(room) {
                    unique.push(room.clone());
                }
            }
            unique
        }
        _ => observed_rooms(situations),
    };

    let index: HashMap<&str, usize> = room_list
        .iter()
        .enumerate()
        .map(|(i, room)| (room.as_str(), i))
        .collect();
    let mut grid = vec![[Counts::default(); HOURS]; room_list.len()];

    for (situation, reading) in readings(situations) {
        if !window.contains(reading.timestamp) || !room_selected(rooms, &reading.room) {
            continue;
        }
        let Some(&row) = index.get(reading.room.as_str()) else {
            continue;
        };
        let Some(hour) = clock.hour_of(reading.timestamp) else {
            debug!(timestamp = reading.timestamp, "Skipping reading with unrepresentable timestamp");
            continue;
        };

        let cell = &mut grid[row][usize::from(hour)];
        cell.activity += 1;
        if situation.label().is_anomalous() {
            cell.anomalies += 1;
        }
    }

    room_list
        .iter()
        .zip(grid)
        .flat_map(|(room, hours)| {
            hours.into_iter().enumerate().map(move |(hour, counts)| ActivityBucket {
                room: room.clone(),
                hour: hour as u8,
                activity_count: counts.activity,
                anomaly_count: counts.anomalies,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use super::super::fixtures::*;
    use super::*;
    use crate::models::Label;

    fn utc() -> HourClock {
        HourClock::Fixed(FixedOffset::east_opt(0).unwrap())
    }

    fn bucket<'a>(buckets: &'a [ActivityBucket], room: &str, hour: u8) -> &'a ActivityBucket {
        buckets
            .iter()
            .find(|b| b.room == room && b.hour == hour)
            .unwrap()
    }

    #[test]
    fn test_kitchen_pair_scenario() {
        // ---
        let buckets = aggregate(&kitchen_pair(), Window::default(), None, utc());

        assert_eq!(buckets.len(), 24);
        // t=100 and t=200 both fall in 00:00 UTC.
        let midnight = bucket(&buckets, "kitchen", 0);
        assert_eq!(midnight.activity_count, 2);
        assert_eq!(midnight.anomaly_count, 1);
        assert!(buckets
            .iter()
            .filter(|b| b.hour != 0)
            .all(|b| b.activity_count == 0 && b.anomaly_count == 0));
    }

    #[test]
    fn test_separate_hours() {
        // ---
        let situations = vec![
            situation(1, Label::Normal, vec![humidity(3_600, "kitchen", 8614)]),
            situation(2, Label::Anomalous, vec![humidity(7_200 + 59, "kitchen", 5390)]),
        ];
        let buckets = aggregate(&situations, Window::default(), None, utc());

        assert_eq!(bucket(&buckets, "kitchen", 1).activity_count, 1);
        assert_eq!(bucket(&buckets, "kitchen", 1).anomaly_count, 0);
        assert_eq!(bucket(&buckets, "kitchen", 2).activity_count, 1);
        assert_eq!(bucket(&buckets, "kitchen", 2).anomaly_count, 1);
        let empty = buckets.iter().filter(|b| b.activity_count == 0).count();
        assert_eq!(empty, 22);
    }

    #[test]
    fn test_fixed_offset_shifts_hour() {
        // ---
        let clock = HourClock::Fixed(FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(clock.hour_of(18 * 3600), Some(13));
        assert_eq!(utc().hour_of(i64::MAX), None);
    }

    #[test]
    fn test_dense_output_for_explicit_rooms() {
        // ---
        let rooms = vec![
            "kitchen".to_string(),
            "garage".to_string(),
            "kitchen".to_string(),
        ];
        let buckets = aggregate(&kitchen_pair(), Window::default(), Some(rooms.as_slice()), utc());

        assert_eq!(buckets.len(), 48);
        assert_eq!(buckets[0].room, "kitchen");
        assert_eq!(buckets[24].room, "garage");
        assert!(buckets.iter().filter(|b| b.room == "garage").all(|b| b.activity_count == 0));
        let hours: Vec<u8> = buckets[..24].iter().map(|b| b.hour).collect();
        assert_eq!(hours, (0..24).collect::<Vec<u8>>());
    }

    #[test]
    fn test_counts_every_kind_and_respects_filters() {
        // ---
        let situations = vec![situation(
            1,
            Label::Anomalous,
            vec![
                humidity(10, "kitchen", 1),
                reading(20, "kitchen", "OccupancySensing", 1),
                reading(30, "hall", "OnOff", 1),
                humidity(99_999, "kitchen", 1),
            ],
        )];
        let only_kitchen = vec!["kitchen".to_string()];

        let buckets = aggregate(
            &situations,
            Window::new(None, Some(50)),
            Some(only_kitchen.as_slice()),
            utc(),
        );
        assert_eq!(buckets.len(), 24);
        assert_eq!(bucket(&buckets, "kitchen", 0).activity_count, 2);

        let all = aggregate(&situations, Window::default(), None, utc());
        assert_eq!(all.len(), 48);
        assert!(all.iter().all(|b| b.anomaly_count <= b.activity_count));
    }

    #[test]
    fn test_observed_rooms_include_out_of_window_readings() {
        // ---
        let situations = vec![situation(1, Label::Normal, vec![humidity(10, "attic", 1)])];
        let buckets = aggregate(&situations, Window::new(Some(1_000), None), None, utc());

        assert_eq!(buckets.len(), 24);
        assert!(buckets.iter().all(|b| b.activity_count == 0));
    }

    #[test]
    fn test_malformed_reading_is_ignored() {
        // ---
        let mut situations = kitchen_pair();
        situations[0].record.situation.details.push("][".to_string());

        let buckets = aggregate(&situations, Window::default(), None, utc());
        assert_eq!(buckets.len(), 24);
        assert_eq!(bucket(&buckets, "kitchen", 0).activity_count, 2);
        assert!(aggregate(&[], Window::default(), None, utc()).is_empty());
    }

    #[test]
    fn test_idempotent() {
        // ---
        let situations = kitchen_pair();
        let rooms = vec!["kitchen".to_string(), "hall".to_string()];
        assert_eq!(
            aggregate(&situations, Window::default(), None, utc()),
            aggregate(&situations, Window::default(), None, utc())
        );
        let window = Window::new(Some(0), Some(150));
        assert_eq!(
            aggregate(&situations, window, Some(rooms.as_slice()), utc()),
            aggregate(&situations, window, Some(rooms.as_slice()), utc())
        );
    }
}
