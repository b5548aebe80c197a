use std::path::Path;

use anyhow::{anyhow, Result};

use crate::commands::AppContext;
use crate::models::{Invoice, PaymentStatus};
use crate::services::gemini::GeminiExtractor;
use crate::services::processor::process_upload;
use crate::store::{InvoiceStore, StoreError};
use crate::utils::today_ymd;

pub fn list(ctx: &AppContext, status: Option<String>) -> Result<()> {
    let filter = status
        .map(|raw| {
            PaymentStatus::parse(&raw.to_uppercase())
                .ok_or_else(|| anyhow!("unknown status: {raw}"))
        })
        .transpose()?;

    let invoices = ctx.db.list_invoices()?;
    let mut shown = 0;
    for invoice in &invoices {
        if let Some(wanted) = filter {
            if invoice.status != wanted {
                continue;
            }
        }
        print_row(invoice);
        shown += 1;
    }
    println!("{shown} invoice(s)");
    Ok(())
}

pub fn toggle(ctx: &AppContext, id: &str, payment_date: Option<String>) -> Result<()> {
    let before = ctx.db.get_invoice(id)?.status;
    let invoice = toggle_payment(&*ctx.db, id, payment_date)?;
    println!("{id}: {before} -> {}", invoice.status);
    Ok(())
}

pub fn mark_overdue(ctx: &AppContext) -> Result<()> {
    let flipped = mark_overdue_before(&*ctx.db, &today_ymd())?;
    println!("Marked {flipped} invoice(s) overdue");
    Ok(())
}

pub fn cancel(ctx: &AppContext, id: &str) -> Result<()> {
    cancel_invoice(&*ctx.db, id)?;
    println!("Cancelled {id}");
    Ok(())
}

pub fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.db.delete_invoice(id)?;
    println!("Deleted {id}");
    Ok(())
}

pub async fn upload(ctx: &AppContext, path: &Path) -> Result<()> {
    let api_key = ctx.config.require_gemini_key()?.to_string();
    let extractor = GeminiExtractor::new(
        api_key,
        ctx.config.gemini_model.clone(),
        ctx.config.http_timeout,
    )?;

    let bytes = tokio::fs::read(path).await?;
    let mime_type = mime_guess::from_path(path)
        .first_or(mime_guess::mime::APPLICATION_PDF)
        .to_string();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload");

    let invoice = process_upload(
        &*ctx.db,
        &extractor,
        &bytes,
        &mime_type,
        file_name,
        &ctx.config.default_currency,
    )
    .await?;

    println!("Recorded invoice {}", invoice.id);
    print_row(&invoice);
    Ok(())
}

/// The manual payment flip from the dashboard: anything unpaid goes to PAID
/// and records the payment date; PAID goes back to PENDING and clears it.
pub fn toggle_payment(
    store: &dyn InvoiceStore,
    id: &str,
    payment_date: Option<String>,
) -> Result<Invoice, StoreError> {
    let invoice = store.get_invoice(id)?;
    let (next, date) = match invoice.status {
        PaymentStatus::Paid => (PaymentStatus::Pending, None),
        _ => (
            PaymentStatus::Paid,
            Some(payment_date.unwrap_or_else(today_ymd)),
        ),
    };
    store.update_status(id, next, date.as_deref())?;
    store.get_invoice(id)
}

/// Due-date-driven transition: PENDING invoices whose due date is strictly
/// before `today` become OVERDUE.
pub fn mark_overdue_before(store: &dyn InvoiceStore, today: &str) -> Result<usize, StoreError> {
    let mut flipped = 0;
    for invoice in store.list_invoices()? {
        if invoice.status == PaymentStatus::Pending
            && !invoice.due_date.is_empty()
            && invoice.due_date.as_str() < today
        {
            store.update_status(&invoice.id, PaymentStatus::Overdue, None)?;
            flipped += 1;
        }
    }
    Ok(flipped)
}

pub fn cancel_invoice(store: &dyn InvoiceStore, id: &str) -> Result<()> {
    let invoice = store.get_invoice(id)?;
    match invoice.status {
        PaymentStatus::Pending | PaymentStatus::Overdue => {
            store.update_status(id, PaymentStatus::Cancelled, None)?;
            Ok(())
        }
        status => Err(anyhow!("cannot cancel a {status} invoice")),
    }
}

fn print_row(invoice: &Invoice) {
    println!(
        "{}  {:<10} {:>12.2} {}  due {}  {:<9} {}",
        invoice.id,
        invoice.status,
        invoice.amount,
        invoice.currency,
        invoice.due_date,
        invoice.category,
        invoice.vendor_name,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::NewInvoice;
    use crate::utils::now_rfc3339;

    fn seed(db: &Database, due_date: &str) -> String {
        db.save_invoice(&NewInvoice {
            vendor_name: "Acme".to_string(),
            invoice_number: String::new(),
            amount: 5000.0,
            currency: "JPY".to_string(),
            due_date: due_date.to_string(),
            issue_date: "2024-07-01".to_string(),
            status: PaymentStatus::Pending,
            category: "Other".to_string(),
            extracted_at: now_rfc3339(),
            notes: None,
            file_name: "inv.pdf".to_string(),
            bank_account: None,
            source_file_id: None,
            web_view_link: None,
        })
        .unwrap()
    }

    #[test]
    fn toggle_round_trips_payment_date() {
        let db = Database::open_in_memory().unwrap();
        let id = seed(&db, "2024-08-01");

        let paid = toggle_payment(&db, &id, Some("2024-07-15".to_string())).unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.payment_date.as_deref(), Some("2024-07-15"));

        let pending = toggle_payment(&db, &id, None).unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending);
        assert!(pending.payment_date.is_none());
    }

    #[test]
    fn toggle_defaults_payment_date_to_today() {
        let db = Database::open_in_memory().unwrap();
        let id = seed(&db, "2024-08-01");

        let paid = toggle_payment(&db, &id, None).unwrap();
        assert_eq!(paid.payment_date.as_deref(), Some(today_ymd().as_str()));
    }

    #[test]
    fn overdue_invoices_can_still_be_paid() {
        let db = Database::open_in_memory().unwrap();
        let id = seed(&db, "2024-01-01");
        assert_eq!(mark_overdue_before(&db, "2024-06-01").unwrap(), 1);
        assert_eq!(db.get_invoice(&id).unwrap().status, PaymentStatus::Overdue);

        let paid = toggle_payment(&db, &id, None).unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
    }

    #[test]
    fn mark_overdue_only_touches_past_due_pending() {
        let db = Database::open_in_memory().unwrap();
        let past_due = seed(&db, "2024-01-01");
        let future = seed(&db, "2099-01-01");
        let paid = seed(&db, "2024-01-01");
        toggle_payment(&db, &paid, None).unwrap();

        assert_eq!(mark_overdue_before(&db, "2024-06-01").unwrap(), 1);
        assert_eq!(
            db.get_invoice(&past_due).unwrap().status,
            PaymentStatus::Overdue
        );
        assert_eq!(db.get_invoice(&future).unwrap().status, PaymentStatus::Pending);
        assert_eq!(db.get_invoice(&paid).unwrap().status, PaymentStatus::Paid);
    }

    #[test]
    fn cancel_rejects_paid_invoices() {
        let db = Database::open_in_memory().unwrap();
        let id = seed(&db, "2024-08-01");

        toggle_payment(&db, &id, None).unwrap();
        assert!(cancel_invoice(&db, &id).is_err());

        toggle_payment(&db, &id, None).unwrap();
        cancel_invoice(&db, &id).unwrap();
        assert_eq!(
            db.get_invoice(&id).unwrap().status,
            PaymentStatus::Cancelled
        );
    }
}
