mod bootstrap;

use anyhow::{anyhow, Context, Result};
use estate_core::settings::Settings;
use estate_data::analysis::ViewParams;
use estate_runtime::{batch, server, DatasetCache};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Estate Analyzer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Mode: {}, View: {}", settings.mode, settings.view);

    let data_dir = bootstrap::resolve_data_dir(settings.data_dir.clone())?;
    let config = settings.analysis_config(data_dir)?;
    tracing::info!("Data directory: {}", config.data_dir().display());

    let mut cache = DatasetCache::new(config);
    let dataset = cache
        .get(false)
        .context("failed to load the transaction data")?;

    match settings.mode.as_str() {
        "serve" => {
            server::serve(cache, &settings.bind).await?;
        }
        "batch" => {
            let views = batch::select_views(&settings.view)
                .ok_or_else(|| anyhow!("Unknown view: {}", settings.view))?;
            let params = ViewParams {
                stats: settings.stat_names(),
                sidos: settings.sido_filter(),
                start_month: settings.start_month.clone(),
                end_month: settings.end_month.clone(),
            };

            let written = batch::run_batch(&dataset, &views, &params, &settings.output_dir)?;
            tracing::info!(
                "Wrote {} view(s) to {}",
                written.len(),
                settings.output_dir.display()
            );
        }
        unknown => {
            return Err(anyhow!("Unknown mode: {unknown}"));
        }
    }

    Ok(())
}
