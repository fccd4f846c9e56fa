//! Process-wide table of labelled gauges.
//!
//! Identity is `(name, labels)`; a write replaces whatever was stored under
//! the same identity. Series are never expired, so a label set that stops
//! being reported keeps its last value until the process restarts.
//!
//! Every metric name maps to one [`GaugeVec`] registered in a
//! [`prometheus::Registry`]; exposition goes through `gather()`.

use crate::types::Labels;
use log::warn;
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct MetricObservation {
    pub name: String,
    pub labels: Labels,
    pub value: f64,
}

#[derive(Default)]
pub struct MetricRegistry {
    registry: Registry,
    gauges: RwLock<HashMap<String, GaugeVec>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a gauge family with its help text and label names.
    ///
    /// Families first seen through [`MetricRegistry::set`] are declared on
    /// the fly, with the metric name as help and the written label names.
    pub fn describe(&self, name: &str, help: &str, label_names: &[&str]) {
        self.family(name, help, label_names);
    }

    pub fn set(&self, name: &str, labels: Labels, value: f64) {
        let label_names: Vec<&str> = labels.keys().map(String::as_str).collect();
        let Some(family) = self.family(name, name, &label_names) else {
            return;
        };
        let values: HashMap<&str, &str> = labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        match family.get_metric_with(&values) {
            Ok(gauge) => gauge.set(value),
            Err(e) => warn!("Dropping write to {} {:?}: {}", name, labels, e),
        }
    }

    pub fn set_unlabelled(&self, name: &str, value: f64) {
        self.set(name, Labels::new(), value);
    }

    pub fn get(&self, name: &str, labels: &Labels) -> Option<f64> {
        self.get_all()
            .find(|obs| obs.name == name && &obs.labels == labels)
            .map(|obs| obs.value)
    }

    /// Metric families as collected by the underlying registry.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Snapshot of every observation, ordered by name then labels.
    pub fn get_all(&self) -> impl Iterator<Item = MetricObservation> {
        let snapshot: Vec<MetricObservation> = self
            .gather()
            .iter()
            .flat_map(|family| {
                family.get_metric().iter().map(move |metric| MetricObservation {
                    name: family.get_name().to_string(),
                    labels: metric
                        .get_label()
                        .iter()
                        .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                        .collect(),
                    value: metric.get_gauge().get_value(),
                })
            })
            .collect();
        snapshot.into_iter()
    }

    fn family(&self, name: &str, help: &str, label_names: &[&str]) -> Option<GaugeVec> {
        if let Some(family) = read_lock(&self.gauges).get(name) {
            return Some(family.clone());
        }

        let mut gauges = write_lock(&self.gauges);
        if let Some(family) = gauges.get(name) {
            return Some(family.clone());
        }
        let created = GaugeVec::new(Opts::new(name, help), label_names).and_then(|family| {
            self.registry.register(Box::new(family.clone()))?;
            Ok(family)
        });
        match created {
            Ok(family) => {
                gauges.insert(name.to_string(), family.clone());
                Some(family)
            }
            Err(e) => {
                warn!("Cannot register gauge {}: {}", name, e);
                None
            }
        }
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    // Writers only insert fully built families.
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
