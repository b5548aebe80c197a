use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
    Deleted,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Overdue => "OVERDUE",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Deleted => "DELETED",
        }
    }

    pub fn parse(value: &str) -> Option<PaymentStatus> {
        match value {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "OVERDUE" => Some(PaymentStatus::Overdue),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            "DELETED" => Some(PaymentStatus::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub bank_name: Option<String>,
    pub branch_name: Option<String>,
    pub account_type: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub vendor_name: String,
    pub invoice_number: String,
    pub amount: f64,
    pub currency: String,
    pub due_date: String,
    pub issue_date: String,
    pub status: PaymentStatus,
    pub category: String,
    pub extracted_at: String,
    pub notes: Option<String>,
    pub file_name: String,
    pub bank_account: Option<BankAccount>,
    pub payment_date: Option<String>,
    pub source_file_id: Option<String>,
    pub web_view_link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub vendor_name: String,
    pub invoice_number: String,
    pub amount: f64,
    pub currency: String,
    pub due_date: String,
    pub issue_date: String,
    pub status: PaymentStatus,
    pub category: String,
    pub extracted_at: String,
    pub notes: Option<String>,
    pub file_name: String,
    pub bank_account: Option<BankAccount>,
    pub source_file_id: Option<String>,
    pub web_view_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
    pub folder_id: String,
    pub enabled: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceExtraction {
    pub vendor_name: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub total_amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub due_date: String,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub bank_account: Option<BankAccount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Overdue,
            PaymentStatus::Cancelled,
            PaymentStatus::Deleted,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("paid"), None);
    }

    #[test]
    fn extraction_deserializes_camel_case_payload() {
        let raw = r#"{
            "vendorName": "Acme",
            "totalAmount": 5000,
            "dueDate": "2024-08-01",
            "bankAccount": {"bankName": "三菱UFJ", "accountNumber": "1234567"}
        }"#;
        let extraction: InvoiceExtraction = serde_json::from_str(raw).unwrap();
        assert_eq!(extraction.vendor_name, "Acme");
        assert_eq!(extraction.total_amount, 5000.0);
        assert!(extraction.invoice_number.is_none());
        let bank = extraction.bank_account.unwrap();
        assert_eq!(bank.bank_name.as_deref(), Some("三菱UFJ"));
        assert!(bank.branch_name.is_none());
    }
}
