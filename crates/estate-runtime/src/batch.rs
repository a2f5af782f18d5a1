//! Batch mode: render views and write each envelope to `<label>.json`.

use std::path::{Path, PathBuf};

use estate_core::Result;
use estate_data::analysis::{render, Dataset, ViewKind, ViewParams};
use estate_data::response::Envelope;

/// Resolve the `--view` selection: `all` or one view id/label.
pub fn select_views(selection: &str) -> Option<Vec<ViewKind>> {
    if selection.trim().eq_ignore_ascii_case("all") {
        return Some(ViewKind::ALL.to_vec());
    }
    ViewKind::from_name(selection).map(|view| vec![view])
}

/// Render every view in `views` and write it under `output_dir`.
///
/// Returns the written paths in view order.
pub fn run_batch(
    dataset: &Dataset,
    views: &[ViewKind],
    params: &ViewParams,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(views.len());
    for &view in views {
        let envelope = render(view, dataset, params);
        let path = write_envelope(&envelope, output_dir)?;
        tracing::info!(
            view = view.id(),
            records = envelope.records().len(),
            "wrote {}",
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}

/// Atomically write `envelope` as pretty JSON to `<dir>/<label>.json`.
pub fn write_envelope(envelope: &Envelope, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", envelope.label()));
    let json = envelope.to_pretty_json()?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &path)?;

    Ok(path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::models::{RawCells, Record, Table};
    use estate_data::response::ResponseShaper;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn sample_dataset() -> Dataset {
        let record = Record::from_raw(RawCells {
            date: "2020-03-04".into(),
            amount: "12,000".into(),
            floor: "4".into(),
            area: "59.9".into(),
            district: "서울특별시".into(),
        });
        Dataset::from_table(Table::new(vec![record]))
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_select_views() {
        assert_eq!(select_views("all").unwrap().len(), ViewKind::ALL.len());
        assert_eq!(select_views("ALL").unwrap().len(), ViewKind::ALL.len());
        assert_eq!(select_views("월간"), Some(vec![ViewKind::Monthly]));
        assert_eq!(select_views("year-stat"), Some(vec![ViewKind::YearStat]));
        assert!(select_views("nope").is_none());
    }

    #[test]
    fn test_write_envelope_named_by_label() {
        let dir = TempDir::new().unwrap();
        let env = ResponseShaper::shape("일간", None);

        let path = write_envelope(&env, dir.path()).unwrap();

        assert_eq!(path, dir.path().join("일간.json"));
        assert_eq!(read_json(&path), json!({ "일간": [] }));
        assert!(!dir.path().join("일간.json.tmp").exists());
    }

    #[test]
    fn test_run_batch_writes_every_selected_view() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("py");

        let written = run_batch(
            &sample_dataset(),
            &[ViewKind::Monthly, ViewKind::FloorBand],
            &ViewParams::default(),
            &out,
        )
        .unwrap();

        assert_eq!(written, vec![out.join("월간.json"), out.join("층별 구간.json")]);
        assert_eq!(
            read_json(&written[0]),
            json!({ "월간": [ { "년월": "2020-03", "평균거래가": 12000, "거래량": 1 } ] })
        );
    }

    #[test]
    fn test_run_batch_empty_regional_views() {
        let dir = TempDir::new().unwrap();
        let written = run_batch(
            &sample_dataset(),
            &[ViewKind::SidoYearlyTotal],
            &ViewParams::default(),
            dir.path(),
        )
        .unwrap();
        assert_eq!(read_json(&written[0]), json!({ "시도별 연간 합계": [] }));
    }
}
