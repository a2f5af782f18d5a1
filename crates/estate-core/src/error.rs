use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced while loading or serving the dataset.
///
/// Per-cell parse failures are never represented here; they surface as
/// `None` values on the loaded records instead.
#[derive(Error, Debug)]
pub enum EstateError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A JSON document could not be produced.
    #[error("Failed to serialize JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// The expected data file or directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No CSV files were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// A column required by the input schema is absent from the header row.
    #[error("Required column '{column}' missing from {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the estate crates.
pub type Result<T> = std::result::Result<T, EstateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = EstateError::FileRead {
            path: PathBuf::from("/data/Apart Deal2020.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("Apart Deal2020.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = EstateError::MissingColumn {
            column: "법정동".to_string(),
            path: PathBuf::from("deals.csv"),
        };
        assert_eq!(
            err.to_string(),
            "Required column '법정동' missing from deals.csv"
        );
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = EstateError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = EstateError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No CSV files found in /empty/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = EstateError::Config("data directory does not exist".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: data directory does not exist"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EstateError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: EstateError = anyhow::anyhow!("bind failed").into();
        assert_eq!(err.to_string(), "bind failed");
    }
}
