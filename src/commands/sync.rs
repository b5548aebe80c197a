use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use crate::commands::AppContext;
use crate::services::drive::GoogleDriveClient;
use crate::services::gemini::GeminiExtractor;
use crate::services::sync::{SyncConfig, SyncService};

/// One-shot by default; `--every` turns the process into the scheduled-job
/// invocation path, re-running the same orchestration on an interval.
pub async fn run(ctx: &AppContext, every: Option<u64>) -> Result<()> {
    let service = build_service(ctx)?;

    match every {
        None => {
            let processed = service.run().await?;
            println!("Processed {processed} new file(s)");
        }
        Some(seconds) => {
            info!(seconds, "Running sync on an interval");
            let mut interval = tokio::time::interval(Duration::from_secs(seconds.max(1)));
            loop {
                interval.tick().await;
                match service.run().await {
                    Ok(processed) => info!(processed, "Scheduled sync finished"),
                    Err(err) => error!(error = %err, "Scheduled sync failed"),
                }
            }
        }
    }

    Ok(())
}

/// Credentials are checked here, before any folder is touched: a missing
/// key fails the whole sync attempt with no partial work.
fn build_service(ctx: &AppContext) -> Result<SyncService> {
    let config = &ctx.config;
    let api_key = config.require_gemini_key()?.to_string();
    let access_token = config.require_drive_token()?.to_string();

    let extractor = GeminiExtractor::new(api_key, config.gemini_model.clone(), config.http_timeout)?;
    let drive = GoogleDriveClient::new(access_token, config.http_timeout)?;

    Ok(SyncService::new(
        ctx.db.clone(),
        ctx.db.clone(),
        Arc::new(drive),
        Arc::new(extractor),
        SyncConfig {
            batch_size: config.batch_size,
            default_currency: config.default_currency.clone(),
        },
    ))
}
