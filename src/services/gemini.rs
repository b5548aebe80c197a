use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::InvoiceExtraction;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const EXTRACTION_PROMPT: &str = "Extract detailed invoice and bank transfer information \
(振込先情報) from this document. Especially focus on Japanese bank details like 銀行名, \
支店名, 口座番号, 口座名義.";

/// Turns a document's raw bytes into a structured invoice guess. Any failure
/// (transport, non-JSON reply, missing required fields) is a per-file
/// failure; callers must not treat it as fatal to a whole sync run.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<InvoiceExtraction>;
}

pub struct GeminiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiExtractor {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GeminiExtractor {
            http,
            api_key,
            model,
        })
    }

    async fn generate(&self, payload: &GenerateRequest) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini error {}: {}", status, body));
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("Empty extraction response"))?;
        Ok(text)
    }
}

#[async_trait]
impl DocumentExtractor for GeminiExtractor {
    async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<InvoiceExtraction> {
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: general_purpose::STANDARD.encode(bytes),
                        }),
                    },
                    Part {
                        text: Some(EXTRACTION_PROMPT.to_string()),
                        inline_data: None,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        let raw = self.generate(&payload).await?;
        parse_extraction(&raw)
    }
}

pub fn parse_extraction(raw: &str) -> Result<InvoiceExtraction> {
    let value =
        serde_json::from_str::<Value>(raw).map_err(|e| anyhow!("Invalid extraction JSON: {}", e))?;
    if !validation_schema().is_valid(&value) {
        return Err(anyhow!("Extraction is missing required invoice fields"));
    }
    serde_json::from_value(value).map_err(|e| anyhow!("Malformed extraction payload: {}", e))
}

/// Schema sent to the model so the reply is constrained JSON rather than
/// free text. The Gemini REST API uses its own uppercase type names.
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "vendorName": {"type": "STRING"},
            "invoiceNumber": {"type": "STRING"},
            "totalAmount": {"type": "NUMBER"},
            "currency": {"type": "STRING"},
            "dueDate": {"type": "STRING", "description": "YYYY-MM-DD format"},
            "issueDate": {"type": "STRING", "description": "YYYY-MM-DD format"},
            "category": {"type": "STRING", "description": "e.g., Software, Utility, Marketing, Rent"},
            "notes": {"type": "STRING"},
            "bankAccount": {
                "type": "OBJECT",
                "properties": {
                    "bankName": {"type": "STRING"},
                    "branchName": {"type": "STRING"},
                    "accountType": {"type": "STRING", "description": "e.g. 普通, 当座"},
                    "accountNumber": {"type": "STRING"},
                    "accountName": {"type": "STRING"}
                }
            }
        },
        "required": ["vendorName", "totalAmount", "dueDate"]
    })
}

fn validation_schema() -> JSONSchema {
    let schema = json!({
        "type": "object",
        "required": ["vendorName", "totalAmount", "dueDate"],
        "properties": {
            "vendorName": {"type": "string"},
            "invoiceNumber": {"type": ["string", "null"]},
            "totalAmount": {"type": "number"},
            "currency": {"type": ["string", "null"]},
            "dueDate": {"type": "string"},
            "issueDate": {"type": ["string", "null"]},
            "category": {"type": ["string", "null"]},
            "notes": {"type": ["string", "null"]},
            "bankAccount": {
                "type": ["object", "null"],
                "properties": {
                    "bankName": {"type": ["string", "null"]},
                    "branchName": {"type": ["string", "null"]},
                    "accountType": {"type": ["string", "null"]},
                    "accountNumber": {"type": ["string", "null"]},
                    "accountName": {"type": ["string", "null"]}
                }
            }
        }
    });

    JSONSchema::compile(&schema).expect("Invalid JSON schema")
}
