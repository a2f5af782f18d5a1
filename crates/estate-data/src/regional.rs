//! Statistics over the pre-aggregated regional tables.
//!
//! Both tables are optional inputs. A table that could not be loaded is
//! empty, and every operation over it yields an empty envelope.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::pivot::{Pivoter, WideTable};
use crate::reader::{load_area_table, load_volume_table};
use crate::response::{json_number, Envelope, JsonRecord, ResponseShaper};

/// Region column of the volume export.
pub const VOLUME_REGION_HEADER: &str = "광역지방자치단체";
/// Region column of the area export.
pub const AREA_REGION_HEADER: &str = "행정구역별(1)";
/// District column of the area export.
pub const AREA_DISTRICT_HEADER: &str = "행정구역별(2)";
/// Output name of the district column.
pub const DISTRICT_LABEL: &str = "시군구";
/// Marker of the per-region subtotal rows in the area export.
pub const SUBTOTAL_MARKER: &str = "소계";
/// Region value of the national total row.
pub const NATIONAL_TOTAL: &str = "전국";
/// Metric name given to every area column.
pub const AREA_METRIC: &str = "면적";

const AREA_SUFFIX: &str = "_면적";

pub const MONTHLY_VOLUME_LABEL: &str = "시도별 월간 거래량";
pub const MONTHLY_AREA_LABEL: &str = "시도별 월간 거래 면적";
pub const MONTHLY_VOLUME_AREA_LABEL: &str = "시도별 월간 거래량 면적";
pub const YEARLY_TOTAL_LABEL: &str = "시도별 연간 합계";

/// The regional volume and area tables, both keyed by `시도`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionalStats {
    pub volume: WideTable,
    pub area: WideTable,
}

impl RegionalStats {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load both tables; any failure is logged and leaves that table empty.
    pub fn load(volume_path: &Path, area_path: &Path) -> Self {
        Self {
            volume: load_optional(volume_path, load_volume_table),
            area: load_optional(area_path, load_area_table),
        }
    }

    /// Monthly volume per region, one column per month.
    pub fn sido_monthly_volume(&self, sidos: Option<&[String]>) -> Envelope {
        let table = self.volume.filter_keys(sidos);
        ResponseShaper::shape(MONTHLY_VOLUME_LABEL, Some(ResponseShaper::wide_records(&table)))
    }

    /// Monthly area per region; only the area columns are kept.
    pub fn sido_monthly_area(&self, sidos: Option<&[String]>) -> Envelope {
        let table = self
            .area
            .filter_keys(sidos)
            .select_categories(|c| c.ends_with(AREA_SUFFIX));
        ResponseShaper::shape(MONTHLY_AREA_LABEL, Some(ResponseShaper::wide_records(&table)))
    }

    /// Volume and area side by side per `(시도, 월)`, outer-joined.
    ///
    /// `start_month`/`end_month` bound the month name inclusively by plain
    /// string comparison. Absent cells become 0 and the area is rounded.
    /// Empty when either table has no row left after the region filter.
    pub fn monthly_volume_and_area(
        &self,
        sidos: Option<&[String]>,
        start_month: Option<&str>,
        end_month: Option<&str>,
    ) -> Envelope {
        let volume = self.volume.filter_keys(sidos);
        let area = self
            .area
            .filter_keys(sidos)
            .select_categories(|c| c.ends_with(AREA_SUFFIX));
        if volume.is_empty() || area.is_empty() {
            return ResponseShaper::shape(MONTHLY_VOLUME_AREA_LABEL, None);
        }

        let mut joined: BTreeMap<(String, String), (Option<f64>, Option<f64>)> = BTreeMap::new();
        for row in Pivoter::melt(&volume) {
            joined.entry((row.key, row.category)).or_default().0 = row.value;
        }
        for row in Pivoter::melt(&area) {
            let month = row.category.trim_end_matches(AREA_SUFFIX).to_string();
            joined.entry((row.key, month)).or_default().1 = row.value;
        }

        let in_range = |month: &str| {
            start_month.map_or(true, |start| month >= start)
                && end_month.map_or(true, |end| month <= end)
        };

        let records: Vec<JsonRecord> = joined
            .into_iter()
            .filter(|((_, month), _)| in_range(month))
            .map(|((sido, month), (count, area))| {
                let mut record = JsonRecord::new();
                record.insert("시도".into(), Value::String(sido));
                record.insert("월".into(), Value::String(month));
                record.insert("거래호수".into(), json_number(count.unwrap_or(0.0).trunc()));
                record.insert(
                    "거래면적(천㎡)".into(),
                    json_number(area.unwrap_or(0.0).round_ties_even()),
                );
                record
            })
            .collect();

        debug!(rows = records.len(), "joined regional volume and area");
        ResponseShaper::shape(MONTHLY_VOLUME_AREA_LABEL, Some(records))
    }

    /// Yearly totals per region: every volume cell and every area cell summed.
    ///
    /// Empty when either table is empty.
    pub fn total_volume_vs_area(&self) -> Envelope {
        if self.volume.is_empty() || self.area.is_empty() {
            return ResponseShaper::shape(YEARLY_TOTAL_LABEL, None);
        }

        let mut totals: BTreeMap<String, (f64, f64)> = BTreeMap::new();

        for row in &self.volume.rows {
            let sum: f64 = row.values.iter().flatten().sum();
            totals.entry(row.key.clone()).or_default().0 += sum;
        }

        let area = self.area.select_categories(|c| c.ends_with(AREA_SUFFIX));
        for row in &area.rows {
            let sum: f64 = row.values.iter().flatten().sum();
            totals.entry(row.key.clone()).or_default().1 += sum;
        }

        let records = totals
            .into_iter()
            .map(|(sido, (count, area))| {
                let mut record = JsonRecord::new();
                record.insert("시도".into(), Value::String(sido));
                record.insert("연간_총거래호수".into(), json_number(count));
                record.insert("연간_총거래면적(천㎡)".into(), json_number(area.round_ties_even()));
                record
            })
            .collect();

        ResponseShaper::shape(YEARLY_TOTAL_LABEL, Some(records))
    }
}

fn load_optional(
    path: &Path,
    load: impl Fn(&Path) -> estate_core::Result<WideTable>,
) -> WideTable {
    if !path.exists() {
        warn!("Regional file not found, its views will be empty: {}", path.display());
        return WideTable::default();
    }
    match load(path) {
        Ok(table) => table,
        Err(e) => {
            warn!("Failed to load regional file {}: {}", path.display(), e);
            WideTable::default()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
