use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::DateNormalizer;
use crate::numeric::NumericCoercer;

// ── Input schema ──────────────────────────────────────────────────────────────

/// Header name of the transaction-date column.
pub const DATE_COLUMN: &str = "거래일";
/// Header name of the thousands-separated amount column.
pub const AMOUNT_COLUMN: &str = "거래금액";
/// Header name of the floor column.
pub const FLOOR_COLUMN: &str = "층";
/// Header name of the exclusive-area column.
pub const AREA_COLUMN: &str = "전용면적";
/// Header name of the administrative-district column.
pub const DISTRICT_COLUMN: &str = "법정동";
/// Output name of the region field derived from the district.
pub const REGION_COLUMN: &str = "시도";

/// Value type carried by a [`Column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Number,
    Integer,
    Text,
}

/// One named, typed column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }
}

/// Header names that every deals file must provide, in load order.
pub const REQUIRED_COLUMNS: &[&str] = &[
    DATE_COLUMN,
    AMOUNT_COLUMN,
    FLOOR_COLUMN,
    AREA_COLUMN,
    DISTRICT_COLUMN,
];

/// The fixed column set of a deals [`Table`], in insertion order.
pub fn deal_schema() -> Vec<Column> {
    vec![
        Column::new(DATE_COLUMN, ColumnType::Date),
        Column::new(AMOUNT_COLUMN, ColumnType::Number),
        Column::new(FLOOR_COLUMN, ColumnType::Integer),
        Column::new(AREA_COLUMN, ColumnType::Number),
        Column::new(DISTRICT_COLUMN, ColumnType::Text),
        Column::new(REGION_COLUMN, ColumnType::Text),
    ]
}

// ── Record ────────────────────────────────────────────────────────────────────

/// Verbatim cell text of one input row, kept for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCells {
    pub date: String,
    pub amount: String,
    pub floor: String,
    pub area: String,
    pub district: String,
}

/// One real-estate transaction.
///
/// Cleaned fields are `None` when the raw cell could not be parsed; the
/// raw text is never modified after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Canonical transaction date.
    pub transaction_date: Option<NaiveDate>,
    /// Transaction amount (source unit, usually 10,000 KRW).
    pub amount: Option<f64>,
    /// Floor number.
    pub floor: Option<i32>,
    /// Exclusive area in square metres.
    pub area: Option<f64>,
    /// Administrative district exactly as read.
    pub district: String,
    /// Region label, a 1:1 copy of `district`.
    pub region: String,
    /// Original cell text.
    pub raw: RawCells,
}

impl Record {
    /// Build a record from raw cells, running every cleaning step.
    pub fn from_raw(raw: RawCells) -> Self {
        let district = raw.district.trim().to_string();
        Self {
            transaction_date: DateNormalizer::normalize(&raw.date),
            amount: NumericCoercer::coerce(raw.amount.as_str()),
            floor: NumericCoercer::coerce_integer(raw.floor.as_str()),
            area: NumericCoercer::coerce(raw.area.as_str()),
            region: district.clone(),
            district,
            raw,
        }
    }
}

// ── Field selectors ───────────────────────────────────────────────────────────

/// Numeric fields a statistic can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    Amount,
    Area,
    Floor,
}

impl NumericField {
    pub fn get(self, record: &Record) -> Option<f64> {
        match self {
            NumericField::Amount => record.amount,
            NumericField::Area => record.area,
            NumericField::Floor => record.floor.map(f64::from),
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            NumericField::Amount => AMOUNT_COLUMN,
            NumericField::Area => AREA_COLUMN,
            NumericField::Floor => FLOOR_COLUMN,
        }
    }
}

/// Text fields usable as a grouping category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    Region,
    District,
}

impl CategoryField {
    /// Category value of `record`; empty text counts as missing.
    pub fn get(self, record: &Record) -> Option<&str> {
        let value = match self {
            CategoryField::Region => record.region.as_str(),
            CategoryField::District => record.district.as_str(),
        };
        (!value.is_empty()).then_some(value)
    }

    pub fn column_name(self) -> &'static str {
        match self {
            CategoryField::Region => REGION_COLUMN,
            CategoryField::District => DISTRICT_COLUMN,
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Ordered, read-only collection of records sharing the deals schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    records: Vec<Record>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Table {
    /// Wrap `records` in load order.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            columns: deal_schema(),
            records,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New table holding the records that satisfy `predicate`, order kept.
    pub fn filter(&self, predicate: impl Fn(&Record) -> bool) -> Table {
        Table::new(
            self.records
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
        )
    }

    /// Append the records of `other`, keeping both load orders.
    pub fn concat(mut self, other: Table) -> Table {
        self.records.extend(other.records);
        self
    }

    /// Sum of `field` over every record where it is present.
    pub fn sum(&self, field: NumericField) -> f64 {
        self.records.iter().filter_map(|r| field.get(r)).sum()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Table::new(iter.into_iter().collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
