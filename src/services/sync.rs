use std::sync::Arc;

use anyhow::Result;
use futures::future;
use tracing::{debug, info, warn};

use crate::models::{DriveFile, DriveFolder};
use crate::services::drive::DriveClient;
use crate::services::gemini::DocumentExtractor;
use crate::services::processor::build_invoice;
use crate::store::{FolderStore, InvoiceStore, StoreError};

const CANDIDATE_EXTENSIONS: [&str; 4] = [".pdf", ".jpg", ".jpeg", ".png"];
const FALLBACK_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub default_currency: String,
}

/// Scans every enabled folder in the registry and ingests each unseen
/// candidate file exactly once. Folders run sequentially; files within a
/// folder run in batches of `batch_size`, concurrent inside a batch and
/// strictly sequenced across batches. A failing folder or file is logged
/// and skipped, never fatal to the run.
pub struct SyncService {
    folders: Arc<dyn FolderStore>,
    invoices: Arc<dyn InvoiceStore>,
    drive: Arc<dyn DriveClient>,
    extractor: Arc<dyn DocumentExtractor>,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(
        folders: Arc<dyn FolderStore>,
        invoices: Arc<dyn InvoiceStore>,
        drive: Arc<dyn DriveClient>,
        extractor: Arc<dyn DocumentExtractor>,
        config: SyncConfig,
    ) -> Self {
        SyncService {
            folders,
            invoices,
            drive,
            extractor,
            config,
        }
    }

    /// Returns the number of newly persisted invoices. Fails only when the
    /// registry itself cannot be read; everything downstream is isolated
    /// per folder and per file.
    pub async fn run(&self) -> Result<usize> {
        let folders = self.folders.list_folders()?;
        let enabled: Vec<DriveFolder> = folders.into_iter().filter(|f| f.enabled).collect();
        if enabled.is_empty() {
            info!("No enabled folders, nothing to sync");
            return Ok(0);
        }

        info!(folders = enabled.len(), "Starting sync");
        let mut processed = 0;
        for folder in &enabled {
            match self.sync_folder(folder).await {
                Ok(count) => processed += count,
                Err(err) => {
                    warn!(
                        folder = %folder.name,
                        folder_id = %folder.folder_id,
                        error = %err,
                        "Folder sync failed"
                    );
                }
            }
        }
        info!(processed, "Sync finished");
        Ok(processed)
    }

    async fn sync_folder(&self, folder: &DriveFolder) -> Result<usize> {
        debug!(folder = %folder.name, folder_id = %folder.folder_id, "Scanning folder");
        let files = self.drive.list_files(&folder.folder_id).await?;
        let total = files.len();
        let candidates: Vec<DriveFile> = files.into_iter().filter(is_candidate).collect();
        debug!(
            folder = %folder.name,
            listed = total,
            candidates = candidates.len(),
            "Folder listing complete"
        );

        let mut processed = 0;
        for batch in candidates.chunks(self.config.batch_size.max(1)) {
            let results = future::join_all(batch.iter().map(|file| self.ingest_file(file))).await;
            for (file, result) in batch.iter().zip(results) {
                match result {
                    Ok(true) => processed += 1,
                    Ok(false) => {}
                    Err(err) => {
                        warn!(
                            file = %file.name,
                            file_id = %file.id,
                            error = %err,
                            "File ingestion failed"
                        );
                    }
                }
            }
        }
        Ok(processed)
    }

    /// Ok(true) when a new invoice was written, Ok(false) when the file was
    /// already represented. A failed file never enters the ledger, so the
    /// next run retries it.
    async fn ingest_file(&self, file: &DriveFile) -> Result<bool> {
        if self.invoices.is_source_file_processed(&file.id)? {
            return Ok(false);
        }

        info!(file = %file.name, file_id = %file.id, "Processing new file");
        let bytes = self.drive.download_file(&file.id).await?;
        let mime_type = file
            .mime_type
            .clone()
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
        let extraction = self.extractor.extract(&bytes, &mime_type).await?;
        let record = build_invoice(
            extraction,
            &file.name,
            Some(file.id.clone()),
            file.web_view_link.clone(),
            &self.config.default_currency,
        );

        match self.invoices.save_invoice(&record) {
            Ok(_) => Ok(true),
            // A concurrent run got there first; the file is represented, so
            // this is a skip rather than a failure.
            Err(StoreError::DuplicateSourceFile(_)) => {
                debug!(file_id = %file.id, "Source file already recorded, skipping");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Candidate filter: the listing's mime type when it is trustworthy, the
/// file extension when it is not.
fn is_candidate(file: &DriveFile) -> bool {
    if let Some(mime_type) = &file.mime_type {
        if mime_type.starts_with("image/") || mime_type == "application/pdf" {
            return true;
        }
    }
    let name = file.name.to_lowercase();
    CANDIDATE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
