use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::models::{BankAccount, DriveFolder, Invoice, NewInvoice, PaymentStatus};
use crate::store::{FolderStore, InvoiceStore, StoreError};
use crate::utils::now_rfc3339;

const INVOICE_COLUMNS: &str = "id, vendor_name, invoice_number, amount, currency, due_date, \
     issue_date, status, category, extracted_at, notes, file_name, bank_account, payment_date, \
     source_file_id, web_view_link";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        let mut conn = self.conn();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![
            (
                "001_create_invoices.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/001_create_invoices.sql"
                )),
            ),
            (
                "002_create_drive_folders.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/002_create_drive_folders.sql"
                )),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<String> = conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }
}

fn invoice_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
    let status_raw: String = row.get(7)?;
    let status = PaymentStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown payment status {status_raw}").into(),
        )
    })?;
    let bank_raw: Option<String> = row.get(12)?;
    let bank_account: Option<BankAccount> = match bank_raw {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                12,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?),
        None => None,
    };

    Ok(Invoice {
        id: row.get(0)?,
        vendor_name: row.get(1)?,
        invoice_number: row.get(2)?,
        amount: row.get(3)?,
        currency: row.get(4)?,
        due_date: row.get(5)?,
        issue_date: row.get(6)?,
        status,
        category: row.get(8)?,
        extracted_at: row.get(9)?,
        notes: row.get(10)?,
        file_name: row.get(11)?,
        bank_account,
        payment_date: row.get(13)?,
        source_file_id: row.get(14)?,
        web_view_link: row.get(15)?,
    })
}

impl InvoiceStore for Database {
    fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices
             WHERE status != 'DELETED'
             ORDER BY extracted_at DESC"
        ))?;
        let rows = stmt.query_map([], invoice_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn get_invoice(&self, id: &str) -> Result<Invoice, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1 AND status != 'DELETED'"
        ))?;
        stmt.query_row(params![id], invoice_from_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save_invoice(&self, invoice: &NewInvoice) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let bank_account = invoice
            .bank_account
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let result = self.conn().execute(
            &format!(
                "INSERT INTO invoices ({INVOICE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                id,
                invoice.vendor_name,
                invoice.invoice_number,
                invoice.amount,
                invoice.currency,
                invoice.due_date,
                invoice.issue_date,
                invoice.status.as_str(),
                invoice.category,
                invoice.extracted_at,
                invoice.notes,
                invoice.file_name,
                bank_account,
                Option::<String>::None,
                invoice.source_file_id,
                invoice.web_view_link,
            ],
        );

        match result {
            Ok(_) => Ok(id),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == rusqlite::ErrorCode::ConstraintViolation
                    && invoice.source_file_id.is_some() =>
            {
                Err(StoreError::DuplicateSourceFile(
                    invoice.source_file_id.clone().unwrap_or_default(),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_status(
        &self,
        id: &str,
        status: PaymentStatus,
        payment_date: Option<&str>,
    ) -> Result<(), StoreError> {
        let updated = self.conn().execute(
            "UPDATE invoices SET status = ?2, payment_date = ?3
             WHERE id = ?1 AND status != 'DELETED'",
            params![id, status.as_str(), payment_date],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_invoice(&self, id: &str) -> Result<(), StoreError> {
        let updated = self.conn().execute(
            "UPDATE invoices SET status = 'DELETED' WHERE id = ?1 AND status != 'DELETED'",
            params![id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn is_source_file_processed(&self, source_file_id: &str) -> Result<bool, StoreError> {
        // Deleted invoices still count: a removed record must not resurrect
        // its source file on the next sync.
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM invoices WHERE source_file_id = ?1)",
            params![source_file_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl FolderStore for Database {
    fn list_folders(&self) -> Result<Vec<DriveFolder>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, folder_id, enabled, created_at FROM drive_folders
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DriveFolder {
                id: row.get(0)?,
                name: row.get(1)?,
                folder_id: row.get(2)?,
                enabled: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn save_folder(&self, name: &str, folder_id: &str) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn().execute(
            "INSERT INTO drive_folders (id, name, folder_id, enabled, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![id, name, folder_id, now_rfc3339()],
        )?;
        Ok(id)
    }

    fn set_folder_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError> {
        let updated = self.conn().execute(
            "UPDATE drive_folders SET enabled = ?2 WHERE id = ?1",
            params![id, enabled],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_folder(&self, id: &str) -> Result<(), StoreError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM drive_folders WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_invoice(source_file_id: Option<&str>, extracted_at: &str) -> NewInvoice {
        NewInvoice {
            vendor_name: "Acme".to_string(),
            invoice_number: "INV-001".to_string(),
            amount: 5000.0,
            currency: "JPY".to_string(),
            due_date: "2024-08-01".to_string(),
            issue_date: "2024-07-01".to_string(),
            status: PaymentStatus::Pending,
            category: "Software".to_string(),
            extracted_at: extracted_at.to_string(),
            notes: None,
            file_name: "inv.pdf".to_string(),
            bank_account: Some(BankAccount {
                bank_name: Some("みずほ銀行".to_string()),
                branch_name: Some("渋谷支店".to_string()),
                account_type: Some("普通".to_string()),
                account_number: Some("1234567".to_string()),
                account_name: Some("カ)アクメ".to_string()),
            }),
            source_file_id: source_file_id.map(str::to_string),
            web_view_link: None,
        }
    }

    #[test]
    fn invoice_round_trips_including_bank_account() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .save_invoice(&sample_invoice(Some("d1"), "2024-07-01T10:00:00Z"))
            .unwrap();

        let invoice = db.get_invoice(&id).unwrap();
        assert_eq!(invoice.vendor_name, "Acme");
        assert_eq!(invoice.amount, 5000.0);
        assert_eq!(invoice.status, PaymentStatus::Pending);
        assert_eq!(invoice.source_file_id.as_deref(), Some("d1"));
        let bank = invoice.bank_account.unwrap();
        assert_eq!(bank.branch_name.as_deref(), Some("渋谷支店"));
    }

    #[test]
    fn listing_is_newest_first_and_skips_deleted() {
        let db = Database::open_in_memory().unwrap();
        let older = db
            .save_invoice(&sample_invoice(None, "2024-07-01T10:00:00Z"))
            .unwrap();
        let newer = db
            .save_invoice(&sample_invoice(None, "2024-07-02T10:00:00Z"))
            .unwrap();
        let deleted = db
            .save_invoice(&sample_invoice(None, "2024-07-03T10:00:00Z"))
            .unwrap();
        db.delete_invoice(&deleted).unwrap();

        let listed = db.list_invoices().unwrap();
        let ids: Vec<_> = listed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![newer.as_str(), older.as_str()]);
    }

    #[test]
    fn duplicate_source_file_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.save_invoice(&sample_invoice(Some("d1"), "2024-07-01T10:00:00Z"))
            .unwrap();

        let err = db
            .save_invoice(&sample_invoice(Some("d1"), "2024-07-02T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSourceFile(ref id) if id == "d1"));

        // Records without a source file never collide.
        db.save_invoice(&sample_invoice(None, "2024-07-03T10:00:00Z"))
            .unwrap();
        db.save_invoice(&sample_invoice(None, "2024-07-04T10:00:00Z"))
            .unwrap();
    }

    #[test]
    fn payment_toggle_sets_and_clears_payment_date() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .save_invoice(&sample_invoice(None, "2024-07-01T10:00:00Z"))
            .unwrap();

        db.update_status(&id, PaymentStatus::Paid, Some("2024-07-15"))
            .unwrap();
        let paid = db.get_invoice(&id).unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.payment_date.as_deref(), Some("2024-07-15"));

        db.update_status(&id, PaymentStatus::Pending, None).unwrap();
        let pending = db.get_invoice(&id).unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending);
        assert!(pending.payment_date.is_none());
    }

    #[test]
    fn soft_delete_is_terminal_and_distinguishable() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .save_invoice(&sample_invoice(Some("d1"), "2024-07-01T10:00:00Z"))
            .unwrap();

        db.delete_invoice(&id).unwrap();
        assert!(matches!(db.get_invoice(&id), Err(StoreError::NotFound(_))));
        assert!(matches!(db.delete_invoice(&id), Err(StoreError::NotFound(_))));
        assert!(matches!(
            db.update_status(&id, PaymentStatus::Paid, None),
            Err(StoreError::NotFound(_))
        ));

        // The ledger still sees the deleted record.
        assert!(db.is_source_file_processed("d1").unwrap());
    }

    #[test]
    fn missing_invoice_delete_reports_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.delete_invoice("no-such-id"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn migrations_are_idempotent_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seikyu.sqlite");
        {
            let db = Database::open(&path).unwrap();
            db.save_folder("Receipts", "drive-folder-1").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_folders().unwrap().len(), 1);
    }

    #[test]
    fn folder_registry_crud() {
        let db = Database::open_in_memory().unwrap();
        let id = db.save_folder("Receipts", "drive-folder-1").unwrap();

        let folders = db.list_folders().unwrap();
        assert_eq!(folders.len(), 1);
        assert!(folders[0].enabled);
        assert_eq!(folders[0].folder_id, "drive-folder-1");

        db.set_folder_enabled(&id, false).unwrap();
        assert!(!db.list_folders().unwrap()[0].enabled);

        db.delete_folder(&id).unwrap();
        assert!(db.list_folders().unwrap().is_empty());
        assert!(matches!(
            db.delete_folder(&id),
            Err(StoreError::NotFound(_))
        ));
    }
}
