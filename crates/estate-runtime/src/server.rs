//! HTTP boundary: one endpoint per view plus listing and reload.
//!
//! Routes:
//! - `GET /py/{name}` renders a view by `<label>.json`, label or id.
//! - `GET /api/views` lists every view.
//! - `POST /api/reload` forces a dataset reload.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use estate_core::settings::parse_list;
use estate_data::analysis::{render, Dataset, ViewKind, ViewParams};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::data_manager::DatasetCache;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<Mutex<DatasetCache>>,
}

impl AppState {
    pub fn new(cache: DatasetCache) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DatasetCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch the dataset on the blocking pool; a cold cache reads CSV files.
    async fn dataset(
        &self,
        force_reload: bool,
    ) -> Result<estate_core::Result<Arc<Dataset>>, tokio::task::JoinError> {
        let state = self.clone();
        tokio::task::spawn_blocking(move || state.lock().get(force_reload)).await
    }
}

/// Query string of `GET /py/{name}`; list values are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub stats: Option<String>,
    pub sidos: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ViewQuery {
    pub fn into_params(self) -> ViewParams {
        ViewParams {
            stats: self.stats.as_deref().map(parse_list),
            sidos: self.sidos.as_deref().map(parse_list),
            start_month: self.start.filter(|s| !s.trim().is_empty()),
            end_month: self.end.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ViewInfo {
    id: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct ReloadReport {
    rows: usize,
    loaded_at: String,
    error: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/py/{name}", get(view_handler))
        .route("/api/views", get(list_views))
        .route("/api/reload", post(reload))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(cache: DatasetCache, addr: &str) -> estate_core::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Serving views on http://{}", listener.local_addr()?);

    axum::serve(listener, router(AppState::new(cache)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn view_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Response {
    let Some(view) = ViewKind::from_name(&name) else {
        tracing::debug!(name = %name, "unknown view requested");
        return (StatusCode::NOT_FOUND, format!("Unknown view: {name}")).into_response();
    };

    let dataset = match state.dataset(false).await {
        Ok(Ok(dataset)) => dataset,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "dataset unavailable");
            return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let envelope = render(view, &dataset, &query.into_params());
    tracing::debug!(view = view.id(), records = envelope.records().len(), "rendered view");
    Json(envelope).into_response()
}

async fn list_views() -> Json<Vec<ViewInfo>> {
    Json(
        ViewKind::ALL
            .into_iter()
            .map(|view| ViewInfo {
                id: view.id(),
                label: view.label(),
            })
            .collect(),
    )
}

async fn reload(State(state): State<AppState>) -> Response {
    let result = tokio::task::spawn_blocking(move || -> estate_core::Result<_> {
        let mut cache = state.lock();
        let dataset = cache.get(true)?;
        let error = cache.last_error().map(str::to_string);
        Ok((dataset, error))
    })
    .await;

    match result {
        Ok(Ok((dataset, error))) => {
            tracing::info!(rows = dataset.deals.len(), "dataset reloaded");
            Json(ReloadReport {
                rows: dataset.deals.len(),
                loaded_at: dataset.loaded_at.to_rfc3339(),
                error,
            })
            .into_response()
        }
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::settings::{AnalysisConfig, DEFAULT_DEALS_FILE};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    const DEALS: &str = "거래일,거래금액,층,전용면적,법정동\n\
        2020-01-05,\"10,000\",3,59.9,서울특별시\n\
        2020-01-06,\"30,000\",12,84.9,부산광역시\n";

    fn make_state() -> (AppState, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join(DEFAULT_DEALS_FILE), DEALS).expect("write deals");
        let config = AnalysisConfig::new(dir.path()).expect("config");
        (AppState::new(DatasetCache::new(config)), dir)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    // ── /py/{name} ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_view_by_label_json() {
        let (state, _dir) = make_state();
        let response = view_handler(
            State(state),
            Path("년간.json".to_string()),
            Query(ViewQuery::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "년간": [ { "년": "2020", "평균거래가": 20000, "거래량": 2 } ] })
        );
    }

    #[tokio::test]
    async fn test_view_with_stats_query() {
        let (state, _dir) = make_state();
        let query = ViewQuery {
            stats: Some("합계,unknown".into()),
            ..ViewQuery::default()
        };
        let response = view_handler(State(state), Path("year-stat".into()), Query(query)).await;

        assert_eq!(
            body_json(response).await,
            json!({ "년도별 통계": [ { "년도": 2020, "합계": 40000 } ] })
        );
    }

    #[tokio::test]
    async fn test_view_after_invalidate_reloads() {
        let (state, _dir) = make_state();
        state.lock().invalidate();

        let response =
            view_handler(State(state.clone()), Path("daily".into()), Query(ViewQuery::default()))
                .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["일간"].as_array().map(Vec::len), Some(2));
        assert!(state.lock().cache_age().is_some());
    }

    #[tokio::test]
    async fn test_unknown_view_is_404() {
        let (state, _dir) = make_state();
        let response =
            view_handler(State(state), Path("없음.json".into()), Query(ViewQuery::default())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_regional_view_without_files_is_empty() {
        let (state, _dir) = make_state();
        let response = view_handler(
            State(state),
            Path("시도별 월간 거래량.json".into()),
            Query(ViewQuery::default()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "시도별 월간 거래량": [] }));
    }

    #[tokio::test]
    async fn test_missing_dataset_is_503() {
        let dir = TempDir::new().expect("temp dir");
        let config = AnalysisConfig::new(dir.path()).expect("config");
        let state = AppState::new(DatasetCache::new(config));

        let response =
            view_handler(State(state), Path("daily".into()), Query(ViewQuery::default())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // ── /api ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_list_views() {
        let Json(views) = list_views().await;
        assert_eq!(views.len(), ViewKind::ALL.len());
        assert_eq!(views[0].id, "floor");
        assert_eq!(views[0].label, "층별");
    }

    #[tokio::test]
    async fn test_reload_reports_rows() {
        let (state, _dir) = make_state();
        let response = reload(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["rows"], json!(2));
        assert_eq!(body["error"], Value::Null);
    }

    #[test]
    fn test_view_query_into_params() {
        let params = ViewQuery {
            stats: Some("평균, 최대".into()),
            sidos: Some("서울특별시".into()),
            start: Some("".into()),
            end: Some("3월".into()),
        }
        .into_params();

        assert_eq!(params.stats, Some(vec!["평균".to_string(), "최대".to_string()]));
        assert_eq!(params.sidos, Some(vec!["서울특별시".to_string()]));
        assert_eq!(params.start_month, None);
        assert_eq!(params.end_month, Some("3월".to_string()));
    }
}
