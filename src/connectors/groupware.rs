//! Groupware connector used to store expense receipts.
//!
//! Receipts are uploaded into a document library (a SharePoint-style drive
//! reached through the Microsoft Graph API). The workflow only sees the
//! [`GroupwareConnector`] trait.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::GroupwareConfig;
use crate::error::{BackofficeError, BackofficeResult};

/// Capability contract of the document store.
pub trait GroupwareConnector: Send + Sync {
    /// Uploads `content` as `file_name` under `folder_path` (slash separated,
    /// created if missing) in `container_id`, returning the file's web URL.
    fn upload_file(
        &self,
        container_id: &str,
        folder_path: &str,
        file_name: &str,
        content: &[u8],
    ) -> BackofficeResult<String>;
}

/// Refuses every upload. Used when no document store is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGroupwareConnector;

impl GroupwareConnector for DisabledGroupwareConnector {
    fn upload_file(
        &self,
        _container_id: &str,
        _folder_path: &str,
        file_name: &str,
        _content: &[u8],
    ) -> BackofficeResult<String> {
        warn!(file_name = %file_name, "Upload refused, groupware is disabled");
        Err(BackofficeError::Groupware {
            message: "groupware uploads are disabled".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    web_url: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Uploads through the Graph drive API with client-credentials tokens.
pub struct GraphGroupwareConnector {
    client: Client,
    config: GroupwareConfig,
    base: Url,
    token: Mutex<Option<CachedToken>>,
}

impl GraphGroupwareConnector {
    /// Creates a connector for the configured tenant.
    pub fn new(config: GroupwareConfig) -> BackofficeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| groupware_error(format!("cannot build HTTP client: {}", e)))?;
        let base = Url::parse(config.graph_base_url.trim_end_matches('/'))
            .map_err(|e| groupware_error(format!("invalid graph base URL: {}", e)))?;
        Ok(Self {
            client,
            config,
            base,
            token: Mutex::new(None),
        })
    }

    fn access_token(&self) -> BackofficeResult<String> {
        let mut cached = self
            .token
            .lock()
            .map_err(|_| groupware_error("groupware token lock poisoned".to_string()))?;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > now) {
            return Ok(token.value.clone());
        }

        let response = self
            .client
            .post(self.config.resolved_token_url())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", "https://graph.microsoft.com/.default"),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .map_err(|e| groupware_error(format!("token request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(groupware_error(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .map_err(|e| groupware_error(format!("invalid token response: {}", e)))?;

        debug!("Groupware access token acquired");
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + TimeDelta::seconds(token.expires_in - 60),
        });
        Ok(token.access_token)
    }

    /// Builds `{base}/sites/{site}/drive/{tail...}` with each segment escaped.
    fn drive_url<S: AsRef<str>>(&self, container_id: &str, tail: &[S]) -> BackofficeResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| groupware_error("graph base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["sites", container_id, "drive"])
            .extend(tail.iter().map(AsRef::as_ref));
        Ok(url)
    }

    /// Makes sure every folder along `folder_path` exists.
    fn ensure_folder(
        &self,
        token: &str,
        container_id: &str,
        folder_path: &str,
    ) -> BackofficeResult<()> {
        let mut parent: Vec<&str> = Vec::new();
        for segment in split_path(folder_path) {
            let mut full = parent.clone();
            full.push(segment);
            let lookup = self.drive_url(container_id, &item_segments(&full, None))?;
            let response = self
                .client
                .get(lookup)
                .bearer_auth(token)
                .send()
                .map_err(|e| groupware_error(format!("folder lookup failed: {}", e)))?;

            match response.status() {
                status if status.is_success() => {}
                StatusCode::NOT_FOUND => {
                    let children = if parent.is_empty() {
                        self.drive_url(container_id, &["root", "children"])?
                    } else {
                        self.drive_url(container_id, &item_segments(&parent, Some("children")))?
                    };
                    let created = self
                        .client
                        .post(children)
                        .bearer_auth(token)
                        .json(&serde_json::json!({
                            "name": segment,
                            "folder": {},
                            "@microsoft.graph.conflictBehavior": "replace"
                        }))
                        .send()
                        .map_err(|e| groupware_error(format!("folder creation failed: {}", e)))?;
                    if !created.status().is_success() {
                        return Err(groupware_error(format!(
                            "folder creation returned {}",
                            created.status()
                        )));
                    }
                    debug!(folder = %segment, "Groupware folder created");
                }
                status => {
                    return Err(groupware_error(format!("folder lookup returned {}", status)));
                }
            }
            parent.push(segment);
        }
        Ok(())
    }
}

impl GroupwareConnector for GraphGroupwareConnector {
    fn upload_file(
        &self,
        container_id: &str,
        folder_path: &str,
        file_name: &str,
        content: &[u8],
    ) -> BackofficeResult<String> {
        let token = self.access_token()?;
        self.ensure_folder(&token, container_id, folder_path)?;

        let mut file_path = split_path(folder_path);
        file_path.push(file_name);
        let url = self.drive_url(container_id, &item_segments(&file_path, Some("content")))?;
        let response = self
            .client
            .put(url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content.to_vec())
            .send()
            .map_err(|e| groupware_error(format!("upload failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(groupware_error(format!(
                "upload returned {}",
                response.status()
            )));
        }

        let item: DriveItem = response
            .json()
            .map_err(|e| groupware_error(format!("invalid upload response: {}", e)))?;
        info!(file_name = %file_name, folder = %folder_path, "Receipt uploaded");
        Ok(item.web_url)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Path-addressed drive item segments: `root:/a/b` or `root:/a/b:/{action}`.
fn item_segments(path: &[&str], action: Option<&str>) -> Vec<String> {
    let mut segments = vec!["root:".to_string()];
    segments.extend(path.iter().map(|s| s.to_string()));
    if let Some(action) = action {
        if let Some(last) = segments.last_mut() {
            last.push(':');
        }
        segments.push(action.to_string());
    }
    segments
}

fn groupware_error(message: String) -> BackofficeError {
    BackofficeError::Groupware { message }
}
