use thiserror::Error;

use crate::models::{DriveFolder, Invoice, NewInvoice, PaymentStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("source file already ingested: {0}")]
    DuplicateSourceFile(String),
    #[error("invalid stored value: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Invoice persistence as the orchestrator sees it. Soft-deleted records are
/// excluded from every read path except `is_source_file_processed`, which
/// matches all statuses so a deleted invoice keeps its source file out of
/// future sync runs.
pub trait InvoiceStore: Send + Sync {
    fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError>;
    fn get_invoice(&self, id: &str) -> Result<Invoice, StoreError>;
    fn save_invoice(&self, invoice: &NewInvoice) -> Result<String, StoreError>;
    fn update_status(
        &self,
        id: &str,
        status: PaymentStatus,
        payment_date: Option<&str>,
    ) -> Result<(), StoreError>;
    fn delete_invoice(&self, id: &str) -> Result<(), StoreError>;
    fn is_source_file_processed(&self, source_file_id: &str) -> Result<bool, StoreError>;
}

/// The registry of watched Drive folders, consulted at the start of every
/// sync run.
pub trait FolderStore: Send + Sync {
    fn list_folders(&self) -> Result<Vec<DriveFolder>, StoreError>;
    fn save_folder(&self, name: &str, folder_id: &str) -> Result<String, StoreError>;
    fn set_folder_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError>;
    fn delete_folder(&self, id: &str) -> Result<(), StoreError>;
}
