//! Grouped statistics over a read-only [`Table`].
//!
//! Every entry point walks the table once, groups rows into a `BTreeMap`
//! keyed by the caller's key function (so output is sorted by key) and
//! never touches the source records.

use std::collections::BTreeMap;

use estate_core::buckets::{BucketAssigner, BucketKey, Granularity};
use estate_core::models::{NumericField, Record, Table};
use tracing::debug;

// ── Statistic ─────────────────────────────────────────────────────────────────

/// A statistic that can be computed over a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Sum,
    Mean,
    Max,
    Min,
    Count,
}

impl Statistic {
    /// Canonical order used when no explicit list is requested.
    pub const ALL: [Statistic; 5] = [
        Statistic::Sum,
        Statistic::Mean,
        Statistic::Max,
        Statistic::Min,
        Statistic::Count,
    ];

    /// Output column label.
    pub fn label(self) -> &'static str {
        match self {
            Statistic::Sum => "합계",
            Statistic::Mean => "평균",
            Statistic::Max => "최대",
            Statistic::Min => "최소",
            Statistic::Count => "거래건수",
        }
    }

    /// Resolve a Korean label or an English name (`sum`, `mean`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(stat) = Self::ALL.into_iter().find(|s| s.label() == name) {
            return Some(stat);
        }
        match name.to_ascii_lowercase().as_str() {
            "sum" => Some(Statistic::Sum),
            "mean" | "avg" => Some(Statistic::Mean),
            "max" => Some(Statistic::Max),
            "min" => Some(Statistic::Min),
            "count" => Some(Statistic::Count),
            _ => None,
        }
    }
}

/// Ordered, duplicate-free list of requested statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatSet(Vec<Statistic>);

impl Default for StatSet {
    fn default() -> Self {
        Self::all()
    }
}

impl StatSet {
    pub fn all() -> Self {
        Self(Statistic::ALL.to_vec())
    }

    /// Keep the recognised names in request order; unknown names are dropped.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut stats = Vec::new();
        for name in names {
            match Statistic::from_name(name.as_ref()) {
                Some(stat) if !stats.contains(&stat) => stats.push(stat),
                Some(_) => {}
                None => debug!("ignoring unknown statistic {:?}", name.as_ref()),
            }
        }
        Self(stats)
    }

    /// `None` means every statistic.
    pub fn from_request(names: Option<&[String]>) -> Self {
        names.map_or_else(Self::all, Self::from_names)
    }

    pub fn iter(&self) -> impl Iterator<Item = Statistic> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Measure / results ─────────────────────────────────────────────────────────

/// One output column: a statistic over a field under a display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub label: String,
    pub field: NumericField,
    pub stat: Statistic,
}

impl Measure {
    pub fn new(label: impl Into<String>, field: NumericField, stat: Statistic) -> Self {
        Self {
            label: label.into(),
            field,
            stat,
        }
    }
}

/// One group of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow<K> {
    pub key: K,
    /// One value per measure, aligned with [`AggregationResult::measures`].
    /// `None` only for a mean, max or min with no contributing value.
    pub values: Vec<Option<f64>>,
}

/// Groups sorted ascending by key, plus the measures that were computed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult<K> {
    pub measures: Vec<Measure>,
    pub rows: Vec<AggregatedRow<K>>,
}

impl<K> AggregationResult<K> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first measure computing `stat`.
    pub fn measure_index(&self, stat: Statistic) -> Option<usize> {
        self.measures.iter().position(|m| m.stat == stat)
    }

    /// Value of `stat` for the group at `row`, if that statistic was requested.
    pub fn value(&self, row: usize, stat: Statistic) -> Option<f64> {
        let idx = self.measure_index(stat)?;
        self.rows.get(row)?.values[idx]
    }

    /// Sum of measure `idx` across every group.
    pub fn column_total(&self, idx: usize) -> f64 {
        self.rows
            .iter()
            .filter_map(|row| row.values.get(idx).copied().flatten())
            .sum()
    }
}

// ── Accumulator ───────────────────────────────────────────────────────────────

/// Running sum, count and extremes of one field within one group.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    sum: f64,
    count: u64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn finish(&self, stat: Statistic) -> Option<f64> {
        match stat {
            Statistic::Sum => Some(self.sum),
            Statistic::Count => Some(self.count as f64),
            Statistic::Mean => (self.count > 0).then(|| self.sum / self.count as f64),
            Statistic::Max => self.max,
            Statistic::Min => self.min,
        }
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper that groups records and computes statistics.
pub struct Aggregator;

impl Aggregator {
    /// Group by `key_fn` and compute `stats` over `field`.
    ///
    /// Rows whose key or field value is missing are excluded, so every
    /// emitted group has at least one value.
    pub fn aggregate<K: Ord>(
        table: &Table,
        key_fn: impl Fn(&Record) -> Option<K>,
        field: NumericField,
        stats: &StatSet,
    ) -> AggregationResult<K> {
        let measures: Vec<Measure> = stats
            .iter()
            .map(|stat| Measure::new(stat.label(), field, stat))
            .collect();
        Self::aggregate_filtered(table, key_fn, &measures, |r| field.get(r).is_some())
    }

    /// Bucket every record by date at `granularity`, then [`aggregate`](Self::aggregate).
    pub fn aggregate_buckets(
        table: &Table,
        granularity: Granularity,
        field: NumericField,
        stats: &StatSet,
    ) -> AggregationResult<BucketKey> {
        Self::aggregate(
            table,
            |r| BucketAssigner::assign(r.transaction_date, granularity),
            field,
            stats,
        )
    }

    /// Compute several measures, possibly over different fields, in one
    /// grouped pass so they stay consistent per group.
    ///
    /// Only a missing key excludes a row; a missing field value just does
    /// not contribute to the measures over that field.
    pub fn aggregate_measures<K: Ord>(
        table: &Table,
        key_fn: impl Fn(&Record) -> Option<K>,
        measures: &[Measure],
    ) -> AggregationResult<K> {
        Self::aggregate_filtered(table, key_fn, measures, |_| true)
    }

    /// [`aggregate_measures`](Self::aggregate_measures) restricted to rows
    /// that carry a value in `field`.
    ///
    /// A group whose rows all lack `field` is dropped instead of being
    /// emitted with a zero count and no mean.
    pub fn aggregate_measures_present<K: Ord>(
        table: &Table,
        key_fn: impl Fn(&Record) -> Option<K>,
        measures: &[Measure],
        field: NumericField,
    ) -> AggregationResult<K> {
        Self::aggregate_filtered(table, key_fn, measures, |r| field.get(r).is_some())
    }

    /// Number of rows per key (rows with a missing key are skipped).
    pub fn group_sizes<K: Ord>(table: &Table, key_fn: impl Fn(&Record) -> Option<K>) -> Vec<(K, u64)> {
        let mut map: BTreeMap<K, u64> = BTreeMap::new();
        for record in table {
            if let Some(key) = key_fn(record) {
                *map.entry(key).or_default() += 1;
            }
        }
        map.into_iter().collect()
    }

    /// Sum of `field` per floor, ordered by floor number.
    pub fn floor_totals(table: &Table, field: NumericField) -> AggregationResult<i32> {
        let measures = [Measure::new(field.column_name(), field, Statistic::Sum)];
        Self::aggregate_filtered(table, |r| r.floor, &measures, |r| field.get(r).is_some())
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Generic aggregation driver.
    fn aggregate_filtered<K: Ord>(
        table: &Table,
        key_fn: impl Fn(&Record) -> Option<K>,
        measures: &[Measure],
        include: impl Fn(&Record) -> bool,
    ) -> AggregationResult<K> {
        // BTreeMap keeps groups sorted by key.
        let mut groups: BTreeMap<K, Vec<Accumulator>> = BTreeMap::new();
        let mut skipped = 0usize;

        for record in table {
            let Some(key) = key_fn(record).filter(|_| include(record)) else {
                skipped += 1;
                continue;
            };
            let accs = groups
                .entry(key)
                .or_insert_with(|| vec![Accumulator::default(); measures.len()]);
            for (acc, measure) in accs.iter_mut().zip(measures) {
                if let Some(value) = measure.field.get(record) {
                    acc.add(value);
                }
            }
        }

        debug!(
            groups = groups.len(),
            skipped,
            rows = table.len(),
            "aggregated table"
        );

        let rows = groups
            .into_iter()
            .map(|(key, accs)| AggregatedRow {
                key,
                values: accs
                    .iter()
                    .zip(measures)
                    .map(|(acc, m)| acc.finish(m.stat))
                    .collect(),
            })
            .collect();

        AggregationResult {
            measures: measures.to_vec(),
            rows,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
