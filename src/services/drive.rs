use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::DriveFile;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const PAGE_SIZE: &str = "100";

/// Read-only view of a Drive folder: list its files, fetch a file's bytes.
#[async_trait]
pub trait DriveClient: Send + Sync {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>>;
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;
}

pub struct GoogleDriveClient {
    http: reqwest::Client,
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl GoogleDriveClient {
    pub fn new(access_token: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GoogleDriveClient { http, access_token })
    }
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let query = format!(
            "'{}' in parents and mimeType != 'application/vnd.google-apps.folder' and trashed = false",
            folder_id
        );

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{DRIVE_API_BASE}/files"))
                .bearer_auth(&self.access_token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "files(id, name, mimeType, webViewLink), nextPageToken"),
                    ("pageSize", PAGE_SIZE),
                    ("supportsAllDrives", "true"),
                    ("includeItemsFromAllDrives", "true"),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("Drive listing error {}: {}", status, body));
            }

            let page: FileList = response.json().await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{DRIVE_API_BASE}/files/{file_id}"))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Drive download error {}: {}", status, body));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
