//! Named views over the transaction table.
//!
//! Each function takes the read-only [`Table`] and returns the envelope
//! the front end consumes under its fixed Korean label.

use estate_core::buckets::{BucketAssigner, BucketKey, Granularity, MonthFormat, WeekKey};
use estate_core::dates::format_date;
use estate_core::models::{CategoryField, NumericField, Record, Table, REGION_COLUMN};
use serde_json::Value;

use crate::aggregator::{Aggregator, Measure, StatSet, Statistic};
use crate::pivot::Pivoter;
use crate::response::{json_number, optional_number, Envelope, JsonRecord, ResponseShaper};

pub const FLOOR_LABEL: &str = "층별";
pub const FLOOR_BAND_LABEL: &str = "층별 구간";
pub const DAILY_LABEL: &str = "일간";
pub const WEEKLY_LABEL: &str = "주간";
pub const MONTHLY_LABEL: &str = "월간";
pub const YEARLY_LABEL: &str = "년간";
pub const REGION_VOLUME_LABEL: &str = "아파트 거래량";
pub const REGION_AREA_LABEL: &str = "아파트 거래 면적";
pub const MONTHLY_REGION_VOLUME_LABEL: &str = "월별 아파트 거래량";
pub const MONTHLY_REGION_AREA_LABEL: &str = "월별 아파트 거래 면적";
pub const MONTHLY_REGION_VOLUME_AREA_LABEL: &str = "월별 아파트 거래 거래량 면적";
pub const DAY_STAT_LABEL: &str = "일별 통계";
pub const WEEK_STAT_LABEL: &str = "주별 통계";
pub const MONTH_STAT_LABEL: &str = "월별 통계";
pub const YEAR_STAT_LABEL: &str = "년도별 통계";

const GROUP_COLUMN: &str = "구분";
const DAY_COLUMN: &str = "거래일";
const MONTH_COLUMN: &str = "년월";
const WEEK_NUMBER_COLUMN: &str = "주차";
const WEEK_START_COLUMN: &str = "주시작일";
const YEAR_COLUMN: &str = "년";
const YEAR_STAT_COLUMN: &str = "년도";
const MEAN_PRICE_COLUMN: &str = "평균거래가";
const VOLUME_COLUMN: &str = "거래량";
const MEAN_AREA_COLUMN: &str = "평균면적";

// ── Floor ─────────────────────────────────────────────────────────────────────

/// Floor range used by the banded floor view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FloorBand {
    Low,
    Mid,
    High,
    Top,
}

impl FloorBand {
    pub const ALL: [FloorBand; 4] = [FloorBand::Low, FloorBand::Mid, FloorBand::High, FloorBand::Top];

    pub fn label(self) -> &'static str {
        match self {
            FloorBand::Low => "1층~5층",
            FloorBand::Mid => "6층~10층",
            FloorBand::High => "11층~15층",
            FloorBand::Top => "16층 이상",
        }
    }

    /// Band of `floor`. Anything outside 1..=15, basements and unknown
    /// floors included, lands in [`FloorBand::Top`].
    pub fn of(floor: Option<i32>) -> Self {
        match floor {
            Some(1..=5) => FloorBand::Low,
            Some(6..=10) => FloorBand::Mid,
            Some(11..=15) => FloorBand::High,
            _ => FloorBand::Top,
        }
    }
}

/// Total amount per floor, floors in numeric order.
pub fn floor_view(table: &Table) -> Envelope {
    let result = Aggregator::floor_totals(table, NumericField::Amount);
    let records = ResponseShaper::aggregation_records(&result, |floor, record| {
        record.insert(GROUP_COLUMN.into(), Value::from(*floor));
    });
    ResponseShaper::shape(FLOOR_LABEL, Some(records))
}

/// Row count per floor band; every band is listed, even when empty.
pub fn floor_band_view(table: &Table) -> Envelope {
    let mut counts = [0u64; FloorBand::ALL.len()];
    for record in table {
        counts[FloorBand::of(record.floor) as usize] += 1;
    }
    let records = FloorBand::ALL
        .into_iter()
        .zip(counts)
        .map(|(band, count)| {
            let mut record = JsonRecord::new();
            record.insert(GROUP_COLUMN.into(), Value::from(band.label()));
            record.insert(Statistic::Count.label().into(), Value::from(count));
            record
        })
        .collect();
    ResponseShaper::shape(FLOOR_BAND_LABEL, Some(records))
}

// ── Period views ──────────────────────────────────────────────────────────────

pub fn daily_view(table: &Table) -> Envelope {
    price_and_volume(table, Granularity::Day, DAILY_LABEL, |key, record| {
        record.insert(DAY_COLUMN.into(), Value::String(key.to_string()));
    })
}

pub fn weekly_view(table: &Table) -> Envelope {
    price_and_volume(table, Granularity::Week, WEEKLY_LABEL, write_week_key)
}

pub fn monthly_view(table: &Table) -> Envelope {
    price_and_volume(
        table,
        Granularity::Month(MonthFormat::Dashed),
        MONTHLY_LABEL,
        |key, record| {
            record.insert(MONTH_COLUMN.into(), Value::String(key.to_string()));
        },
    )
}

/// Yearly view; the year is written as a string.
pub fn yearly_view(table: &Table) -> Envelope {
    price_and_volume(table, Granularity::Year, YEARLY_LABEL, |key, record| {
        record.insert(YEAR_COLUMN.into(), Value::String(key.to_string()));
    })
}

/// Mean amount and amount count per date bucket.
fn price_and_volume(
    table: &Table,
    granularity: Granularity,
    label: &str,
    write_key: impl Fn(&BucketKey, &mut JsonRecord),
) -> Envelope {
    let measures = [
        Measure::new(MEAN_PRICE_COLUMN, NumericField::Amount, Statistic::Mean),
        Measure::new(VOLUME_COLUMN, NumericField::Amount, Statistic::Count),
    ];
    let result = Aggregator::aggregate_measures_present(
        table,
        |r| BucketAssigner::assign(r.transaction_date, granularity),
        &measures,
        NumericField::Amount,
    );
    let records = ResponseShaper::aggregation_records(&result, write_key);
    ResponseShaper::shape(label, Some(records))
}

fn write_week_key(key: &BucketKey, record: &mut JsonRecord) {
    if let BucketKey::Week(WeekKey {
        month_label,
        week_number,
        week_start,
    }) = key
    {
        record.insert(MONTH_COLUMN.into(), Value::String(month_label.clone()));
        record.insert(WEEK_NUMBER_COLUMN.into(), Value::from(*week_number));
        record.insert(WEEK_START_COLUMN.into(), Value::String(format_date(*week_start)));
    }
}

// ── Region views ──────────────────────────────────────────────────────────────

fn region_of(record: &Record) -> Option<String> {
    CategoryField::Region.get(record).map(str::to_string)
}

fn month_of(record: &Record) -> Option<String> {
    BucketAssigner::assign(record.transaction_date, Granularity::Month(MonthFormat::Dashed))
        .map(|key| key.to_string())
}

fn month_and_region(record: &Record) -> Option<(String, String)> {
    Some((month_of(record)?, region_of(record)?))
}

/// Row count per region.
pub fn region_volume_view(table: &Table) -> Envelope {
    let records = Aggregator::group_sizes(table, region_of)
        .into_iter()
        .map(|(region, count)| {
            let mut record = JsonRecord::new();
            record.insert(REGION_COLUMN.into(), Value::String(region));
            record.insert(VOLUME_COLUMN.into(), Value::from(count));
            record
        })
        .collect();
    ResponseShaper::shape(REGION_VOLUME_LABEL, Some(records))
}

/// Mean exclusive area per region.
pub fn region_area_view(table: &Table) -> Envelope {
    let measures = [Measure::new(
        NumericField::Area.column_name(),
        NumericField::Area,
        Statistic::Mean,
    )];
    let result =
        Aggregator::aggregate_measures_present(table, region_of, &measures, NumericField::Area);
    let records = ResponseShaper::aggregation_records(&result, |region, record| {
        record.insert(REGION_COLUMN.into(), Value::String(region.clone()));
    });
    ResponseShaper::shape(REGION_AREA_LABEL, Some(records))
}

/// Month × region row counts, one column per region.
pub fn monthly_region_volume_view(table: &Table) -> Envelope {
    let long = Aggregator::group_sizes(table, month_and_region)
        .into_iter()
        .map(|((month, region), count)| (month, region, count as f64));
    let wide = Pivoter::pivot(long, MONTH_COLUMN);
    ResponseShaper::shape(
        MONTHLY_REGION_VOLUME_LABEL,
        Some(ResponseShaper::wide_records(&wide)),
    )
}

/// Month × region mean area, one column per region.
pub fn monthly_region_area_view(table: &Table) -> Envelope {
    let measures = [Measure::new(MEAN_AREA_COLUMN, NumericField::Area, Statistic::Mean)];
    let result = Aggregator::aggregate_measures(table, month_and_region, &measures);
    let long = result
        .rows
        .into_iter()
        .map(|row| (row.key.0, row.key.1, row.values[0].unwrap_or(0.0)));
    let wide = Pivoter::pivot(long, MONTH_COLUMN);
    ResponseShaper::shape(
        MONTHLY_REGION_AREA_LABEL,
        Some(ResponseShaper::wide_records(&wide)),
    )
}

/// Count and mean area per `(month, region)` from one grouped pass.
pub fn monthly_region_volume_area_view(table: &Table) -> Envelope {
    let measures = [
        Measure::new(VOLUME_COLUMN, NumericField::Amount, Statistic::Count),
        Measure::new(MEAN_AREA_COLUMN, NumericField::Area, Statistic::Mean),
    ];
    let result = Aggregator::aggregate_measures(table, month_and_region, &measures);
    let records = result
        .rows
        .iter()
        .map(|row| {
            let mut record = JsonRecord::new();
            record.insert(MONTH_COLUMN.into(), Value::String(row.key.0.clone()));
            record.insert(REGION_COLUMN.into(), Value::String(row.key.1.clone()));
            record.insert(VOLUME_COLUMN.into(), optional_number(row.values[0]));
            record.insert(MEAN_AREA_COLUMN.into(), optional_number(row.values[1]));
            record
        })
        .collect();
    ResponseShaper::shape(MONTHLY_REGION_VOLUME_AREA_LABEL, Some(records))
}

// ── Statistic views ───────────────────────────────────────────────────────────

pub fn day_stat(table: &Table, stats: &StatSet) -> Envelope {
    stat_view(table, Granularity::Day, stats, DAY_STAT_LABEL, |key, record| {
        record.insert(DAY_COLUMN.into(), Value::String(key.to_string()));
    })
}

pub fn week_stat(table: &Table, stats: &StatSet) -> Envelope {
    stat_view(table, Granularity::Week, stats, WEEK_STAT_LABEL, write_week_key)
}

pub fn month_stat(table: &Table, stats: &StatSet) -> Envelope {
    stat_view(
        table,
        Granularity::Month(MonthFormat::Dotted),
        stats,
        MONTH_STAT_LABEL,
        |key, record| {
            record.insert(MONTH_COLUMN.into(), Value::String(key.to_string()));
        },
    )
}

/// Year statistics; the year is written as an integer.
pub fn year_stat(table: &Table, stats: &StatSet) -> Envelope {
    stat_view(table, Granularity::Year, stats, YEAR_STAT_LABEL, |key, record| {
        if let BucketKey::Year(year) = key {
            record.insert(YEAR_STAT_COLUMN.into(), json_number(f64::from(*year)));
        }
    })
}

fn stat_view(
    table: &Table,
    granularity: Granularity,
    stats: &StatSet,
    label: &str,
    write_key: impl Fn(&BucketKey, &mut JsonRecord),
) -> Envelope {
    let result = Aggregator::aggregate_buckets(table, granularity, NumericField::Amount, stats);
    ResponseShaper::shape(
        label,
        Some(ResponseShaper::aggregation_records(&result, write_key)),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
