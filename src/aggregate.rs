//! Running accumulators for one job cycle and the statistics derived from them

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// What one inventory item contributes to an [`Accumulator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Observation<'a> {
    pub size_bytes: u64,
    /// Feeds the latest-timestamp statistic.
    pub modified: Option<DateTime<Utc>>,
    /// Feeds the average-age statistic.
    pub last_event: Option<DateTime<Utc>>,
    pub category: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryTally {
    pub count: u64,
    pub latest: Option<DateTime<Utc>>,
}

/// Mutable aggregate state, created fresh for every cycle.
#[derive(Debug, Clone)]
pub struct Accumulator {
    now: DateTime<Utc>,
    pub total_count: u64,
    pub total_size: u64,
    pub max_timestamp: Option<DateTime<Utc>>,
    pub sample_values: Vec<f64>,
    categories: BTreeMap<&'static str, CategoryTally>,
}

impl Accumulator {
    /// `now` anchors every age computation of this cycle.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            total_count: 0,
            total_size: 0,
            max_timestamp: None,
            sample_values: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Tracks per-category tallies for exactly the given categories.
    pub fn with_categories(now: DateTime<Utc>, categories: &[&'static str]) -> Self {
        let mut acc = Self::new(now);
        acc.categories = categories
            .iter()
            .map(|c| (*c, CategoryTally::default()))
            .collect();
        acc
    }

    pub fn absorb(&mut self, obs: &Observation<'_>) {
        self.total_count += 1;
        self.total_size = self.total_size.saturating_add(obs.size_bytes);

        if let Some(modified) = obs.modified {
            self.max_timestamp = self.max_timestamp.max(Some(modified));
        }

        // Negative ages (clock skew) are kept on purpose.
        if let Some(event) = obs.last_event {
            let age_secs = (self.now - event).num_milliseconds() as f64 / 1000.0;
            self.sample_values.push(age_secs / SECONDS_PER_DAY);
        }

        if let Some(tally) = obs.category.and_then(|c| self.categories.get_mut(c)) {
            tally.count += 1;
            if let Some(modified) = obs.modified {
                tally.latest = tally.latest.max(Some(modified));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn finalize(&self) -> Summary {
        Summary {
            total_count: self.total_count,
            total_size: self.total_size,
            latest: self.max_timestamp,
            average_age_days: mean(&self.sample_values),
            categories: self.categories.clone(),
        }
    }
}

/// Statistics derived from a completed [`Accumulator`].
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_count: u64,
    pub total_size: u64,
    pub latest: Option<DateTime<Utc>>,
    pub average_age_days: f64,
    pub categories: BTreeMap<&'static str, CategoryTally>,
}

impl Summary {
    /// Epoch seconds of the newest timestamp, 0 when nothing was observed.
    pub fn latest_epoch_seconds(&self) -> f64 {
        epoch_seconds(self.latest)
    }

    pub fn latest_display(&self) -> String {
        display_timestamp(self.latest)
    }

    pub fn category(&self, name: &str) -> CategoryTally {
        self.categories.get(name).copied().unwrap_or_default()
    }
}

/// `used / (used + available) * 100`, 0 when both are zero.
pub fn usage_percent(used: u64, available: u64) -> f64 {
    let full = used as f64 + available as f64;
    if full > 0.0 {
        used as f64 * 100.0 / full
    } else {
        0.0
    }
}

pub fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn epoch_seconds(ts: Option<DateTime<Utc>>) -> f64 {
    ts.map(|t| t.timestamp_millis() as f64 / 1000.0).unwrap_or(0.0)
}

pub fn display_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
