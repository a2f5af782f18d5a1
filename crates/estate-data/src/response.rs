//! Packaging of view output as `{ "<label>": [ {..}, .. ] }` envelopes.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Number, Value};

use estate_core::error::Result;

use crate::aggregator::AggregationResult;
use crate::pivot::WideTable;

/// One output record; field order is insertion order.
pub type JsonRecord = Map<String, Value>;

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// A labelled sequence of homogeneous records.
///
/// Serializes as a single-entry JSON object; the sequence is `[]`, never
/// `null`, when there is no data.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    label: String,
    records: Vec<JsonRecord>,
}

impl Envelope {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn records(&self) -> &[JsonRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<JsonRecord> {
        self.records
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            self.label.clone(),
            Value::Array(self.records.iter().cloned().map(Value::Object).collect()),
        );
        Value::Object(map)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.label, &self.records)?;
        map.end()
    }
}

// ── ResponseShaper ────────────────────────────────────────────────────────────

/// Stateless builder for envelopes and their records.
pub struct ResponseShaper;

impl ResponseShaper {
    /// Wrap `records` under `label`; `None` and empty both give `[]`.
    pub fn shape(label: &str, records: Option<Vec<JsonRecord>>) -> Envelope {
        Envelope {
            label: label.to_string(),
            records: records.unwrap_or_default(),
        }
    }

    /// One record per group: the key fields written by `write_key`, then one
    /// field per measure under its label.
    pub fn aggregation_records<K>(
        result: &AggregationResult<K>,
        write_key: impl Fn(&K, &mut JsonRecord),
    ) -> Vec<JsonRecord> {
        result
            .rows
            .iter()
            .map(|row| {
                let mut record = JsonRecord::new();
                write_key(&row.key, &mut record);
                for (measure, value) in result.measures.iter().zip(&row.values) {
                    record.insert(measure.label.clone(), optional_number(*value));
                }
                record
            })
            .collect()
    }

    /// One record per wide row: the key column first, then every category.
    pub fn wide_records(table: &WideTable) -> Vec<JsonRecord> {
        table
            .rows
            .iter()
            .map(|row| {
                let mut record = JsonRecord::new();
                record.insert(table.key_column.clone(), Value::String(row.key.clone()));
                for (category, value) in table.categories.iter().zip(&row.values) {
                    record.insert(category.clone(), optional_number(*value));
                }
                record
            })
            .collect()
    }
}

/// JSON number for `value`, written as an integer when it is a whole number.
///
/// Non-finite values become `null`.
pub fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INT {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

/// [`json_number`] with `None` mapped to `null`.
pub fn optional_number(value: Option<f64>) -> Value {
    value.map_or(Value::Null, json_number)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
