use anyhow::Result;

use crate::models::{Invoice, InvoiceExtraction, NewInvoice, PaymentStatus};
use crate::services::gemini::DocumentExtractor;
use crate::store::InvoiceStore;
use crate::utils::{normalize_date, now_rfc3339, today_ymd};

const DEFAULT_CATEGORY: &str = "Other";

/// Fills the gaps an extraction is allowed to leave: currency falls back to
/// the configured default, the issue date to today, the category to "Other".
pub fn build_invoice(
    extraction: InvoiceExtraction,
    file_name: &str,
    source_file_id: Option<String>,
    web_view_link: Option<String>,
    default_currency: &str,
) -> NewInvoice {
    NewInvoice {
        vendor_name: extraction.vendor_name,
        invoice_number: extraction.invoice_number.unwrap_or_default(),
        amount: extraction.total_amount,
        currency: extraction
            .currency
            .filter(|currency| !currency.trim().is_empty())
            .unwrap_or_else(|| default_currency.to_string()),
        due_date: normalize_date(Some(extraction.due_date)).unwrap_or_default(),
        issue_date: normalize_date(extraction.issue_date).unwrap_or_else(today_ymd),
        status: PaymentStatus::Pending,
        category: extraction
            .category
            .filter(|category| !category.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        extracted_at: now_rfc3339(),
        notes: extraction.notes,
        file_name: file_name.to_string(),
        bank_account: extraction.bank_account,
        source_file_id,
        web_view_link,
    }
}

/// Manual upload path: straight through extraction into the store, no Drive
/// identifier and therefore no dedup key.
pub async fn process_upload(
    invoices: &dyn InvoiceStore,
    extractor: &dyn DocumentExtractor,
    bytes: &[u8],
    mime_type: &str,
    file_name: &str,
    default_currency: &str,
) -> Result<Invoice> {
    let extraction = extractor.extract(bytes, mime_type).await?;
    let record = build_invoice(extraction, file_name, None, None, default_currency);
    let id = invoices.save_invoice(&record)?;
    Ok(invoices.get_invoice(&id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction() -> InvoiceExtraction {
        InvoiceExtraction {
            vendor_name: "Acme".to_string(),
            invoice_number: None,
            total_amount: 5000.0,
            currency: None,
            due_date: "2024/08/01".to_string(),
            issue_date: None,
            category: None,
            notes: None,
            bank_account: None,
        }
    }

    #[test]
    fn applies_defaults_for_optional_fields() {
        let invoice = build_invoice(extraction(), "inv.pdf", Some("d1".to_string()), None, "JPY");
        assert_eq!(invoice.currency, "JPY");
        assert_eq!(invoice.category, "Other");
        assert_eq!(invoice.invoice_number, "");
        assert_eq!(invoice.status, PaymentStatus::Pending);
        assert_eq!(invoice.due_date, "2024-08-01");
        assert_eq!(invoice.issue_date, today_ymd());
        assert_eq!(invoice.source_file_id.as_deref(), Some("d1"));
    }

    #[test]
    fn keeps_extracted_values_when_present() {
        let mut input = extraction();
        input.currency = Some("USD".to_string());
        input.category = Some("Software".to_string());
        input.issue_date = Some("2024-07-01".to_string());
        input.invoice_number = Some("INV-42".to_string());

        let invoice = build_invoice(input, "inv.pdf", None, None, "JPY");
        assert_eq!(invoice.currency, "USD");
        assert_eq!(invoice.category, "Software");
        assert_eq!(invoice.issue_date, "2024-07-01");
        assert_eq!(invoice.invoice_number, "INV-42");
        assert!(invoice.source_file_id.is_none());
    }
}
