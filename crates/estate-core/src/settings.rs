use clap::Parser;
use std::path::{Path, PathBuf};

use crate::error::{EstateError, Result};

/// Default file name of the transaction table.
pub const DEFAULT_DEALS_FILE: &str = "Apart Deal2020.csv";
/// Default file name of the regional monthly volume table.
pub const DEFAULT_VOLUME_FILE: &str = "2020년 광역 지자체별 아파트 거래량.csv";
/// Default file name of the regional monthly area table.
pub const DEFAULT_AREA_FILE: &str = "2020년 지자체 거래 호수 및 면적 통계자료.csv";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Aggregate apartment transaction records into JSON views
#[derive(Parser, Debug, Clone)]
#[command(
    name = "estate-analyzer",
    about = "Aggregate apartment transaction records into JSON views",
    version
)]
pub struct Settings {
    /// Directory holding the input CSV files (auto-discovered if not specified)
    #[arg(long, env = "ESTATE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Transaction file name (or sub-directory of CSV files) inside the data directory
    #[arg(long, default_value = DEFAULT_DEALS_FILE)]
    pub deals_file: String,

    /// Regional monthly volume file name
    #[arg(long, default_value = DEFAULT_VOLUME_FILE)]
    pub volume_file: String,

    /// Regional monthly area file name
    #[arg(long, default_value = DEFAULT_AREA_FILE)]
    pub area_file: String,

    /// Run mode
    #[arg(long, default_value = "batch", value_parser = ["batch", "serve"])]
    pub mode: String,

    /// View id or label to render in batch mode, or "all"
    #[arg(long, default_value = "all")]
    pub view: String,

    /// Comma-separated statistics for the *-stat views (합계,평균,최대,최소,거래건수)
    #[arg(long)]
    pub stats: Option<String>,

    /// Comma-separated region filter for the regional views
    #[arg(long)]
    pub sidos: Option<String>,

    /// First month column (inclusive) for the regional volume/area view
    #[arg(long)]
    pub start_month: Option<String>,

    /// Last month column (inclusive) for the regional volume/area view
    #[arg(long)]
    pub end_month: Option<String>,

    /// Directory the batch mode writes `<label>.json` files into
    #[arg(long, default_value = "py")]
    pub output_dir: PathBuf,

    /// Address the serve mode listens on
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub bind: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply derived overrides.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`load`](Self::load) with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// `--debug` overrides the log level.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Build the validated file configuration rooted at `data_dir`.
    pub fn analysis_config(&self, data_dir: PathBuf) -> Result<AnalysisConfig> {
        AnalysisConfig::new(data_dir)?
            .with_files(&self.deals_file, &self.volume_file, &self.area_file)
    }

    pub fn stat_names(&self) -> Option<Vec<String>> {
        self.stats.as_deref().map(parse_list)
    }

    pub fn sido_filter(&self) -> Option<Vec<String>> {
        self.sidos.as_deref().map(parse_list)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── AnalysisConfig ─────────────────────────────────────────────────────────────

/// Location of every input file, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    data_dir: PathBuf,
    deals_file: String,
    volume_file: String,
    area_file: String,
}

impl AnalysisConfig {
    /// Default file names rooted at `data_dir`, which must exist.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        if !data_dir.is_dir() {
            return Err(EstateError::Config(format!(
                "data directory does not exist: {}",
                data_dir.display()
            )));
        }
        Ok(Self {
            data_dir,
            deals_file: DEFAULT_DEALS_FILE.to_string(),
            volume_file: DEFAULT_VOLUME_FILE.to_string(),
            area_file: DEFAULT_AREA_FILE.to_string(),
        })
    }

    /// Replace the three file names; none may be empty.
    pub fn with_files(mut self, deals: &str, volume: &str, area: &str) -> Result<Self> {
        for (flag, value) in [("deals-file", deals), ("volume-file", volume), ("area-file", area)]
        {
            if value.trim().is_empty() {
                return Err(EstateError::Config(format!("--{flag} must not be empty")));
            }
        }
        self.deals_file = deals.to_string();
        self.volume_file = volume.to_string();
        self.area_file = area.to_string();
        Ok(self)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn deals_path(&self) -> PathBuf {
        self.data_dir.join(&self.deals_file)
    }

    pub fn volume_path(&self) -> PathBuf {
        self.data_dir.join(&self.volume_file)
    }

    pub fn area_path(&self) -> PathBuf {
        self.data_dir.join(&self.area_file)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::load_from_args(["estate-analyzer"]);

        assert!(settings.data_dir.is_none() || std::env::var_os("ESTATE_DATA_DIR").is_some());
        assert_eq!(settings.deals_file, DEFAULT_DEALS_FILE);
        assert_eq!(settings.mode, "batch");
        assert_eq!(settings.view, "all");
        assert!(settings.stats.is_none());
        assert_eq!(settings.output_dir, PathBuf::from("py"));
        assert_eq!(settings.bind, "127.0.0.1:5000");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_debug_overrides_log_level() {
        let settings = Settings::load_from_args(["estate-analyzer", "--debug"]);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_settings_list_flags() {
        let settings = Settings::load_from_args([
            "estate-analyzer",
            "--stats",
            "합계, 평균,,",
            "--sidos",
            "서울특별시,부산광역시",
        ]);
        assert_eq!(
            settings.stat_names(),
            Some(vec!["합계".to_string(), "평균".to_string()])
        );
        assert_eq!(
            settings.sido_filter(),
            Some(vec!["서울특별시".to_string(), "부산광역시".to_string()])
        );
    }

    #[test]
    fn test_settings_rejects_unknown_mode() {
        let result = Settings::try_parse_from(["estate-analyzer", "--mode", "daemon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_analysis_config_paths() {
        let tmp = TempDir::new().expect("tempdir");
        let config = AnalysisConfig::new(tmp.path()).expect("config");
        assert_eq!(config.deals_path(), tmp.path().join(DEFAULT_DEALS_FILE));
        assert_eq!(config.volume_path(), tmp.path().join(DEFAULT_VOLUME_FILE));
        assert_eq!(config.area_path(), tmp.path().join(DEFAULT_AREA_FILE));
    }

    #[test]
    fn test_analysis_config_missing_dir() {
        let err = AnalysisConfig::new("/nonexistent/path/for/estate").unwrap_err();
        assert!(matches!(err, EstateError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/path/for/estate"));
    }

    #[test]
    fn test_analysis_config_from_settings() {
        let tmp = TempDir::new().expect("tempdir");
        let settings =
            Settings::load_from_args(["estate-analyzer", "--deals-file", "deals.csv"]);
        let config = settings
            .analysis_config(tmp.path().to_path_buf())
            .expect("config");
        assert_eq!(config.deals_path(), tmp.path().join("deals.csv"));
    }

    #[test]
    fn test_analysis_config_rejects_empty_file_name() {
        let tmp = TempDir::new().expect("tempdir");
        let err = AnalysisConfig::new(tmp.path())
            .unwrap()
            .with_files(" ", "v.csv", "a.csv")
            .unwrap_err();
        assert!(err.to_string().contains("--deals-file"));
    }
}
