use chrono::{NaiveDate, Utc};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn today_ymd() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Best-effort normalisation of extracted dates to YYYY-MM-DD. Unparseable
/// values pass through unchanged so the operator can still see what the
/// model returned.
pub fn normalize_date(value: Option<String>) -> Option<String> {
    let raw = value?.trim().to_string();
    if raw.is_empty() {
        return None;
    }

    let formats = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y", "%Y.%m.%d", "%Y年%m月%d日"];
    for fmt in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(&raw, fmt) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    Some(raw)
}
