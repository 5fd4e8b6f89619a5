//! Normal vs anomalous statistics per sensor kind.

use std::collections::HashMap;

use crate::models::{ComparisonRow, Situation};

use super::{readings, Window};

// ---

#[derive(Default)]
struct Accumulator {
    normal_sum: f64,
    normal_count: u32,
    anomalous_sum: f64,
    anomalous_count: u32,
}

fn mean(sum: f64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

/// Average reading value per kind, split by situation label.
///
/// One row per kind observed in the time window, in first-seen order.
/// An average is 0 when its sample count is 0.
pub fn compare(situations: &[Situation], window: Window) -> Vec<ComparisonRow> {
    // ---
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, Accumulator> = HashMap::new();

    for (situation, reading) in readings(situations) {
        if !window.contains(reading.timestamp) {
            continue;
        }

        let name = reading.kind.as_str();
        if !totals.contains_key(name) {
            order.push(name.to_string());
        }
        let acc = totals.entry(name.to_string()).or_default();

        if situation.label().is_anomalous() {
            acc.anomalous_sum += reading.value();
            acc.anomalous_count += 1;
        } else {
            acc.normal_sum += reading.value();
            acc.normal_count += 1;
        }
    }

    order
        .into_iter()
        .map(|kind_name| {
            let acc = totals.remove(&kind_name).unwrap_or_default();
            ComparisonRow {
                kind_name,
                normal_average: mean(acc.normal_sum, acc.normal_count),
                anomalous_average: mean(acc.anomalous_sum, acc.anomalous_count),
                normal_sample_count: acc.normal_count,
                anomalous_sample_count: acc.anomalous_count,
            }
        })
        .collect()
}
