//! CSV discovery and loading.
//!
//! Reads the transaction table into a [`Table`] and the two optional
//! pre-aggregated regional tables into [`WideTable`]s. Cells are decoded
//! lossily so stray encoding artifacts end up as unparseable values rather
//! than aborting the load.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder};
use estate_core::error::{EstateError, Result};
use estate_core::models::{
    RawCells, Record, Table, AMOUNT_COLUMN, AREA_COLUMN, DATE_COLUMN, DISTRICT_COLUMN,
    FLOOR_COLUMN, REGION_COLUMN, REQUIRED_COLUMNS,
};
use estate_core::numeric::NumericCoercer;
use tracing::{debug, warn};

use crate::pivot::{WideRow, WideTable};
use crate::regional::{
    AREA_DISTRICT_HEADER, AREA_METRIC, AREA_REGION_HEADER, DISTRICT_LABEL, NATIONAL_TOTAL,
    SUBTOTAL_MARKER, VOLUME_REGION_HEADER,
};

// ── LoadReport ────────────────────────────────────────────────────────────────

/// What happened while loading the transaction table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files_read: usize,
    pub rows_read: usize,
    /// Rows the CSV reader could not split into fields.
    pub malformed_rows: usize,
    pub missing_dates: usize,
    pub missing_amounts: usize,
    pub missing_floors: usize,
    pub missing_areas: usize,
}

impl LoadReport {
    fn tally(&mut self, record: &Record) {
        self.rows_read += 1;
        self.missing_dates += usize::from(record.transaction_date.is_none());
        self.missing_amounts += usize::from(record.amount.is_none());
        self.missing_floors += usize::from(record.floor.is_none());
        self.missing_areas += usize::from(record.area.is_none());
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `data_path`, sorted by path.
pub fn find_csv_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load the transaction table from a CSV file, or from every CSV file under
/// a directory (concatenated in path order).
///
/// Fails when the path is missing, a directory holds no CSV files, a file
/// cannot be read, or a required header is absent.
pub fn load_deals(path: &Path) -> Result<(Table, LoadReport)> {
    if !path.exists() {
        return Err(EstateError::DataPathNotFound(path.to_path_buf()));
    }

    let files = if path.is_dir() {
        let files = find_csv_files(path);
        if files.is_empty() {
            return Err(EstateError::NoDataFiles(path.to_path_buf()));
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut report = LoadReport::default();
    let mut records: Vec<Record> = Vec::new();

    for file in &files {
        records.extend(read_deals_file(file, &mut report)?);
        report.files_read += 1;
    }

    debug!(
        files = report.files_read,
        rows = report.rows_read,
        malformed = report.malformed_rows,
        missing_dates = report.missing_dates,
        missing_amounts = report.missing_amounts,
        "loaded transaction table"
    );

    Ok((Table::new(records), report))
}

/// Load the regional monthly volume table.
///
/// The region column (`광역지방자치단체`, or an already renamed `시도`)
/// becomes the key; every other column is a month column. The national
/// total row is dropped.
pub fn load_volume_table(path: &Path) -> Result<WideTable> {
    let mut rows = read_all_rows(path, true)?;
    let headers = rows.remove(0);

    let region_idx = headers
        .iter()
        .position(|h| h == VOLUME_REGION_HEADER || h == REGION_COLUMN)
        .ok_or_else(|| EstateError::MissingColumn {
            column: VOLUME_REGION_HEADER.to_string(),
            path: path.to_path_buf(),
        })?;

    let value_indices: Vec<usize> = (0..headers.len()).filter(|&i| i != region_idx).collect();
    let mut table = WideTable::new(
        REGION_COLUMN,
        value_indices.iter().map(|&i| headers[i].clone()).collect(),
    );

    for row in rows {
        let region = cell(&row, region_idx).trim().to_string();
        if region.is_empty() || region == NATIONAL_TOTAL {
            continue;
        }
        table.rows.push(WideRow {
            key: region,
            values: value_indices
                .iter()
                .map(|&i| NumericCoercer::coerce(cell(&row, i)))
                .collect(),
        });
    }

    debug!(
        regions = table.len(),
        months = table.categories.len(),
        "loaded regional volume table"
    );
    Ok(table)
}

/// Load the regional monthly area table, whose header spans two rows.
///
/// Header cells are combined as `<first>` when both rows agree, otherwise
/// `<first>_<metric>` where metric is `면적` for any area column. Only the
/// per-region subtotal rows are kept, and the national row is dropped.
pub fn load_area_table(path: &Path) -> Result<WideTable> {
    let mut rows = read_all_rows(path, false)?;
    if rows.len() < 2 {
        return Err(EstateError::MissingColumn {
            column: AREA_REGION_HEADER.to_string(),
            path: path.to_path_buf(),
        });
    }
    let second: Vec<String> = rows.remove(1);
    let first: Vec<String> = forward_fill(rows.remove(0));

    let names: Vec<String> = first
        .iter()
        .enumerate()
        .map(|(i, top)| {
            let sub = second.get(i).map(String::as_str).unwrap_or("");
            combine_header(top, sub)
        })
        .map(|name| {
            if name == AREA_REGION_HEADER {
                REGION_COLUMN.to_string()
            } else if name == AREA_DISTRICT_HEADER {
                DISTRICT_LABEL.to_string()
            } else {
                name
            }
        })
        .collect();

    let find = |column: &str| {
        names
            .iter()
            .position(|n| n == column)
            .ok_or_else(|| EstateError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })
    };
    let region_idx = find(REGION_COLUMN)?;
    let district_idx = find(DISTRICT_LABEL)?;

    let value_indices: Vec<usize> = (0..names.len())
        .filter(|&i| i != region_idx && i != district_idx)
        .collect();
    let mut table = WideTable::new(
        REGION_COLUMN,
        value_indices.iter().map(|&i| names[i].clone()).collect(),
    );

    // Exports leave the region blank on continuation rows.
    let mut current_region = String::new();
    for row in rows {
        let region = cell(&row, region_idx).trim();
        if !region.is_empty() {
            current_region = region.to_string();
        }
        let district = cell(&row, district_idx);
        if !district.contains(SUBTOTAL_MARKER) || current_region == NATIONAL_TOTAL {
            continue;
        }
        table.rows.push(WideRow {
            key: current_region.clone(),
            values: value_indices
                .iter()
                .map(|&i| NumericCoercer::coerce(cell(&row, i)))
                .collect(),
        });
    }

    debug!(
        regions = table.len(),
        columns = table.categories.len(),
        "loaded regional area table"
    );
    Ok(table)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Read one transaction CSV, mapping each row to a [`Record`].
fn read_deals_file(path: &Path, report: &mut LoadReport) -> Result<Vec<Record>> {
    let mut reader = open_csv(path, true)?;
    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(|source| csv_error(path, source))?
        .iter()
        .map(|h| clean_header(&String::from_utf8_lossy(h)))
        .collect();

    let index = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| EstateError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })
    };
    // Fail on the first absent column in schema order.
    for &column in REQUIRED_COLUMNS {
        index(column)?;
    }
    let date_idx = index(DATE_COLUMN)?;
    let amount_idx = index(AMOUNT_COLUMN)?;
    let floor_idx = index(FLOOR_COLUMN)?;
    let area_idx = index(AREA_COLUMN)?;
    let district_idx = index(DISTRICT_COLUMN)?;

    let mut records = Vec::new();
    let mut byte_record = ByteRecord::new();
    loop {
        match reader.read_byte_record(&mut byte_record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(csv_error(path, e));
            }
            Err(e) => {
                debug!("Skipping malformed row in {}: {}", path.display(), e);
                report.malformed_rows += 1;
                continue;
            }
        }
        let row = decode(&byte_record);
        let record = Record::from_raw(RawCells {
            date: cell(&row, date_idx).to_string(),
            amount: cell(&row, amount_idx).to_string(),
            floor: cell(&row, floor_idx).to_string(),
            area: cell(&row, area_idx).to_string(),
            district: cell(&row, district_idx).to_string(),
        });
        report.tally(&record);
        records.push(record);
    }

    debug!("File {}: {} rows", path.display(), records.len());
    Ok(records)
}

/// Every row of `path` decoded to strings. With `headers`, the header row
/// comes first (cleaned); the result is never empty in that case.
fn read_all_rows(path: &Path, headers: bool) -> Result<Vec<Vec<String>>> {
    let mut reader = open_csv(path, headers)?;
    let mut rows: Vec<Vec<String>> = Vec::new();

    if headers {
        let header_row = reader
            .byte_headers()
            .map_err(|source| csv_error(path, source))?
            .iter()
            .map(|h| clean_header(&String::from_utf8_lossy(h)))
            .collect();
        rows.push(header_row);
    }

    for result in reader.byte_records() {
        match result {
            Ok(record) => rows.push(decode(&record)),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(csv_error(path, e));
            }
            Err(e) => debug!("Skipping malformed row in {}: {}", path.display(), e),
        }
    }

    if !headers {
        if let Some(first) = rows.first_mut() {
            for cell in first.iter_mut() {
                *cell = clean_header(cell);
            }
        }
        if let Some(second) = rows.get_mut(1) {
            for cell in second.iter_mut() {
                *cell = clean_header(cell);
            }
        }
    }

    Ok(rows)
}

fn open_csv(path: &Path, has_headers: bool) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|source| EstateError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ReaderBuilder::new()
        .flexible(true)
        .has_headers(has_headers)
        .from_reader(file))
}

fn csv_error(path: &Path, source: csv::Error) -> EstateError {
    EstateError::CsvParse {
        path: path.to_path_buf(),
        source,
    }
}

fn decode(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Trim whitespace and any byte-order mark left on a header cell.
fn clean_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

/// Blank cells of a spanning header row repeat the cell to their left.
fn forward_fill(row: Vec<String>) -> Vec<String> {
    let mut last = String::new();
    row.into_iter()
        .map(|cell| {
            if !cell.is_empty() {
                last = cell;
            }
            last.clone()
        })
        .collect()
}

fn combine_header(top: &str, sub: &str) -> String {
    if sub.is_empty() || top == sub {
        top.to_string()
    } else if sub.contains(AREA_METRIC) {
        format!("{top}_{AREA_METRIC}")
    } else {
        format!("{top}_{sub}")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
