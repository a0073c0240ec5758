//! Proximity ranking and fixed-shape record formatting

use crate::config::{DuplicateLabelPolicy, FusionConfig};
use crate::processing::fusion::FusedObject;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Value written for an unfilled slot
pub const PLACEHOLDER_VALUE: &str = "NA";
/// Key prefix of unfilled slots
pub const PLACEHOLDER_PREFIX: &str = "NA_";

/// Value of one record slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordValue {
    /// Distance in meters, two decimals
    Meters(f64),
    NotAvailable,
}

impl Serialize for RecordValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordValue::Meters(m) => serializer.serialize_f64(*m),
            RecordValue::NotAvailable => serializer.serialize_str(PLACEHOLDER_VALUE),
        }
    }
}

/// Ordered label → distance mapping, nearest object first.
///
/// Serializes as a JSON object whose key order matches the ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    entries: Vec<(String, RecordValue)>,
}

impl RankedRecord {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<RecordValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> &[(String, RecordValue)] {
        &self.entries
    }

    /// Number of slots holding a real object
    pub fn filled(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, v)| matches!(v, RecordValue::Meters(_)))
            .count()
    }

    /// Single-line JSON rendering used by every sink
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }
}

impl Serialize for RankedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Millimeters to meters, rounded to two decimals
pub fn mm_to_meters(mm: u32) -> f64 {
    (mm as f64 / 10.0).round() / 100.0
}

/// Ranks fused objects by distance into a record of exactly `top_k` slots
#[derive(Debug, Clone)]
pub struct DataOrganizer {
    top_k: usize,
    duplicate_labels: DuplicateLabelPolicy,
}

impl DataOrganizer {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            top_k: config.top_k,
            duplicate_labels: config.duplicate_labels,
        }
    }

    pub fn with_top_k(top_k: usize, duplicate_labels: DuplicateLabelPolicy) -> Self {
        Self { top_k, duplicate_labels }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Build the ranked record for one frame
    pub fn organize(&self, fused: &[FusedObject]) -> RankedRecord {
        let mut valid: Vec<(&str, u32)> = fused
            .iter()
            .filter_map(|obj| obj.distance_mm.map(|d| (obj.label.as_str(), d)))
            .collect();
        // Stable: equal distances keep detection order
        valid.sort_by_key(|&(_, d)| d);

        let mut record = RankedRecord {
            entries: Vec::with_capacity(self.top_k),
        };

        for &(label, distance_mm) in valid.iter().take(self.top_k) {
            let value = RecordValue::Meters(mm_to_meters(distance_mm));
            match self.duplicate_labels {
                DuplicateLabelPolicy::Disambiguate => {
                    let key = unique_key(&record, &valid, label);
                    record.entries.push((key, value));
                }
                DuplicateLabelPolicy::Overwrite => {
                    match record.entries.iter_mut().find(|(k, _)| k == label) {
                        Some(slot) => slot.1 = value,
                        None => record.entries.push((label.to_string(), value)),
                    }
                }
            }
        }

        self.pad(&mut record, &valid);
        record
    }

    fn pad(&self, record: &mut RankedRecord, valid: &[(&str, u32)]) {
        let mut index = record.len();
        while record.len() < self.top_k {
            let mut key = format!("{}{}", PLACEHOLDER_PREFIX, index);
            while record.contains_key(&key) || valid.iter().any(|(l, _)| *l == key) {
                index += 1;
                key = format!("{}{}", PLACEHOLDER_PREFIX, index);
            }
            record.entries.push((key, RecordValue::NotAvailable));
            index += 1;
        }
    }
}

/// `label`, or `label_2`, `label_3`, ... when already taken
fn unique_key(record: &RankedRecord, valid: &[(&str, u32)], label: &str) -> String {
    if !record.contains_key(label) {
        return label.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", label, n);
        if !record.contains_key(&candidate) && !valid.iter().any(|(l, _)| *l == candidate) {
            return candidate;
        }
        n += 1;
    }
}
