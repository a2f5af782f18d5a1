//! Dataset loading and view dispatch.
//!
//! [`load_dataset`] reads every input named by an [`AnalysisConfig`];
//! [`render`] turns a [`ViewKind`] plus request parameters into an envelope.

use std::time::Instant;

use chrono::{DateTime, Utc};
use estate_core::models::Table;
use estate_core::settings::AnalysisConfig;
use estate_core::Result;
use tracing::info;

use crate::aggregator::StatSet;
use crate::reader::{load_deals, LoadReport};
use crate::regional::{
    RegionalStats, MONTHLY_AREA_LABEL, MONTHLY_VOLUME_AREA_LABEL, MONTHLY_VOLUME_LABEL,
    YEARLY_TOTAL_LABEL,
};
use crate::response::Envelope;
use crate::views;

// ── Dataset ───────────────────────────────────────────────────────────────────

/// Everything loaded from the data directory, read-only once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub deals: Table,
    pub regional: RegionalStats,
    pub report: LoadReport,
    /// When the load finished.
    pub loaded_at: DateTime<Utc>,
    /// Wall-clock seconds spent loading.
    pub load_time_seconds: f64,
}

impl Dataset {
    /// Wrap an already built table with no regional statistics.
    pub fn from_table(deals: Table) -> Self {
        let report = LoadReport {
            rows_read: deals.len(),
            ..LoadReport::default()
        };
        Self {
            deals,
            regional: RegionalStats::empty(),
            report,
            loaded_at: Utc::now(),
            load_time_seconds: 0.0,
        }
    }
}

/// Load the transaction table (fatal on failure) and the optional regional
/// tables (logged and left empty on failure).
pub fn load_dataset(config: &AnalysisConfig) -> Result<Dataset> {
    let start = Instant::now();

    let (deals, report) = load_deals(&config.deals_path())?;
    let regional = RegionalStats::load(&config.volume_path(), &config.area_path());

    let load_time_seconds = start.elapsed().as_secs_f64();
    info!(
        rows = report.rows_read,
        files = report.files_read,
        missing_dates = report.missing_dates,
        regional_volume_rows = regional.volume.len(),
        regional_area_rows = regional.area.len(),
        "dataset loaded in {:.3}s",
        load_time_seconds
    );

    Ok(Dataset {
        deals,
        regional,
        report,
        loaded_at: Utc::now(),
        load_time_seconds,
    })
}

// ── ViewKind ──────────────────────────────────────────────────────────────────

/// Every view the system can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Floor,
    FloorBand,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    RegionVolume,
    RegionArea,
    MonthlyRegionVolume,
    MonthlyRegionArea,
    MonthlyRegionVolumeArea,
    DayStat,
    WeekStat,
    MonthStat,
    YearStat,
    SidoMonthlyVolume,
    SidoMonthlyArea,
    SidoMonthlyVolumeArea,
    SidoYearlyTotal,
}

impl ViewKind {
    pub const ALL: [ViewKind; 19] = [
        ViewKind::Floor,
        ViewKind::FloorBand,
        ViewKind::Daily,
        ViewKind::Weekly,
        ViewKind::Monthly,
        ViewKind::Yearly,
        ViewKind::RegionVolume,
        ViewKind::RegionArea,
        ViewKind::MonthlyRegionVolume,
        ViewKind::MonthlyRegionArea,
        ViewKind::MonthlyRegionVolumeArea,
        ViewKind::DayStat,
        ViewKind::WeekStat,
        ViewKind::MonthStat,
        ViewKind::YearStat,
        ViewKind::SidoMonthlyVolume,
        ViewKind::SidoMonthlyArea,
        ViewKind::SidoMonthlyVolumeArea,
        ViewKind::SidoYearlyTotal,
    ];

    /// Stable ASCII identifier.
    pub fn id(self) -> &'static str {
        match self {
            ViewKind::Floor => "floor",
            ViewKind::FloorBand => "floor-band",
            ViewKind::Daily => "daily",
            ViewKind::Weekly => "weekly",
            ViewKind::Monthly => "monthly",
            ViewKind::Yearly => "yearly",
            ViewKind::RegionVolume => "region-volume",
            ViewKind::RegionArea => "region-area",
            ViewKind::MonthlyRegionVolume => "monthly-region-volume",
            ViewKind::MonthlyRegionArea => "monthly-region-area",
            ViewKind::MonthlyRegionVolumeArea => "monthly-region-volume-area",
            ViewKind::DayStat => "day-stat",
            ViewKind::WeekStat => "week-stat",
            ViewKind::MonthStat => "month-stat",
            ViewKind::YearStat => "year-stat",
            ViewKind::SidoMonthlyVolume => "sido-monthly-volume",
            ViewKind::SidoMonthlyArea => "sido-monthly-area",
            ViewKind::SidoMonthlyVolumeArea => "sido-monthly-volume-area",
            ViewKind::SidoYearlyTotal => "sido-yearly-total",
        }
    }

    /// Envelope label, also the batch-mode file stem.
    pub fn label(self) -> &'static str {
        match self {
            ViewKind::Floor => views::FLOOR_LABEL,
            ViewKind::FloorBand => views::FLOOR_BAND_LABEL,
            ViewKind::Daily => views::DAILY_LABEL,
            ViewKind::Weekly => views::WEEKLY_LABEL,
            ViewKind::Monthly => views::MONTHLY_LABEL,
            ViewKind::Yearly => views::YEARLY_LABEL,
            ViewKind::RegionVolume => views::REGION_VOLUME_LABEL,
            ViewKind::RegionArea => views::REGION_AREA_LABEL,
            ViewKind::MonthlyRegionVolume => views::MONTHLY_REGION_VOLUME_LABEL,
            ViewKind::MonthlyRegionArea => views::MONTHLY_REGION_AREA_LABEL,
            ViewKind::MonthlyRegionVolumeArea => views::MONTHLY_REGION_VOLUME_AREA_LABEL,
            ViewKind::DayStat => views::DAY_STAT_LABEL,
            ViewKind::WeekStat => views::WEEK_STAT_LABEL,
            ViewKind::MonthStat => views::MONTH_STAT_LABEL,
            ViewKind::YearStat => views::YEAR_STAT_LABEL,
            ViewKind::SidoMonthlyVolume => MONTHLY_VOLUME_LABEL,
            ViewKind::SidoMonthlyArea => MONTHLY_AREA_LABEL,
            ViewKind::SidoMonthlyVolumeArea => MONTHLY_VOLUME_AREA_LABEL,
            ViewKind::SidoYearlyTotal => YEARLY_TOTAL_LABEL,
        }
    }

    /// Resolve an id, a label, or `<label>.json`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let stem = name.strip_suffix(".json").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|view| view.id() == stem || view.label() == stem)
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Request parameters consumed by the statistic and regional views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewParams {
    /// Requested statistic names; `None` means all five.
    pub stats: Option<Vec<String>>,
    /// Region filter; `None` keeps every region.
    pub sidos: Option<Vec<String>>,
    pub start_month: Option<String>,
    pub end_month: Option<String>,
}

/// Render `view` over `dataset`. Never fails: missing data is an empty
/// envelope.
pub fn render(view: ViewKind, dataset: &Dataset, params: &ViewParams) -> Envelope {
    let table = &dataset.deals;
    let regional = &dataset.regional;
    let stats = || StatSet::from_request(params.stats.as_deref());
    let sidos = params.sidos.as_deref();

    match view {
        ViewKind::Floor => views::floor_view(table),
        ViewKind::FloorBand => views::floor_band_view(table),
        ViewKind::Daily => views::daily_view(table),
        ViewKind::Weekly => views::weekly_view(table),
        ViewKind::Monthly => views::monthly_view(table),
        ViewKind::Yearly => views::yearly_view(table),
        ViewKind::RegionVolume => views::region_volume_view(table),
        ViewKind::RegionArea => views::region_area_view(table),
        ViewKind::MonthlyRegionVolume => views::monthly_region_volume_view(table),
        ViewKind::MonthlyRegionArea => views::monthly_region_area_view(table),
        ViewKind::MonthlyRegionVolumeArea => views::monthly_region_volume_area_view(table),
        ViewKind::DayStat => views::day_stat(table, &stats()),
        ViewKind::WeekStat => views::week_stat(table, &stats()),
        ViewKind::MonthStat => views::month_stat(table, &stats()),
        ViewKind::YearStat => views::year_stat(table, &stats()),
        ViewKind::SidoMonthlyVolume => regional.sido_monthly_volume(sidos),
        ViewKind::SidoMonthlyArea => regional.sido_monthly_area(sidos),
        ViewKind::SidoMonthlyVolumeArea => regional.monthly_volume_and_area(
            sidos,
            params.start_month.as_deref(),
            params.end_month.as_deref(),
        ),
        ViewKind::SidoYearlyTotal => regional.total_volume_vs_area(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
