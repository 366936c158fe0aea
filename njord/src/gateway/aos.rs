//! AirLink OS gateway client.
//!
//! Talks to the router's REST API:
//!
//! - `POST /api/v1/auth/tokens` with `{"login", "password"}` returns
//!   `data.access_token`
//! - `POST /api/v1/db/get` with `[{"fields": [...]}]` returns `{"data": [{...}]}`
//!
//! A `401` on a data request re-authenticates once and retries. Routers ship
//! self-signed certificates, so certificate verification is disabled.
//!
//! # File proxy
//!
//! When the base is a path to an existing file instead of a URL, every data
//! request is answered from that file (same `{"data": [{...}]}` shape). The
//! file is re-read on each request so a bench setup can edit it live.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::client::{GatewayClient, RadioScanner};
use super::error::SourceError;
use super::keys::{parse_gnss, parse_wifi, GNSS_FIELDS, WIFI_FIELDS};
use crate::catalog::{ApiCredentials, ScanObservation};
use crate::position::GatewayFix;

/// Default router address.
pub const DEFAULT_AOS_URL: &str = "https://192.168.1.1";

/// Default HTTP timeout for gateway requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const AUTH_ENDPOINT: &str = "/api/v1/auth/tokens";
const GET_ENDPOINT: &str = "/api/v1/db/get";
const API_MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Deserialize)]
struct TokenResponse {
    data: TokenData,
}

#[derive(Deserialize)]
struct TokenData {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct DataResponse {
    #[serde(default)]
    data: Vec<Value>,
}

enum Backend {
    Http {
        base_url: String,
        http: reqwest::Client,
        token: tokio::sync::Mutex<Option<String>>,
    },
    File(PathBuf),
}

/// Gateway client for Sierra Wireless AirLink OS routers.
///
/// Serves both the GNSS fix and WiFi scans, which come from the same API.
pub struct AosClient {
    backend: Backend,
    credentials: Mutex<ApiCredentials>,
}

impl AosClient {
    /// Create a client for `base`, an `http(s)://` URL or a proxy file path.
    pub fn new(
        base: &str,
        credentials: ApiCredentials,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let backend = if base.starts_with("https://") || base.starts_with("http://") {
            let http = reqwest::Client::builder()
                .timeout(timeout)
                .danger_accept_invalid_certs(true)
                .user_agent(concat!("njord/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| SourceError::HttpError(e.to_string()))?;
            Backend::Http {
                base_url: base.trim_end_matches('/').to_string(),
                http,
                token: tokio::sync::Mutex::new(None),
            }
        } else if Path::new(base).is_file() {
            info!(path = base, "Gateway client reading from proxy file");
            Backend::File(PathBuf::from(base))
        } else {
            return Err(SourceError::InvalidBaseUrl(base.to_string()));
        };

        Ok(Self {
            backend,
            credentials: Mutex::new(credentials),
        })
    }

    /// Whether responses come from a proxy file.
    pub fn is_file_proxy(&self) -> bool {
        matches!(self.backend, Backend::File(_))
    }

    /// Fetch the data object for the given field prefixes.
    pub async fn get_data(&self, fields: &[&str]) -> Result<Map<String, Value>, SourceError> {
        match &self.backend {
            Backend::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| SourceError::ProxyFile {
                        path: path.clone(),
                        source,
                    })?;
                first_data_object(&bytes)
            }
            Backend::Http {
                base_url,
                http,
                token,
            } => {
                let mut token = token.lock().await;
                if token.is_none() {
                    *token = Some(self.authenticate(http, base_url).await?);
                }

                let url = format!("{}{}", base_url, GET_ENDPOINT);
                let body = json!([{ "fields": fields }]).to_string();

                let mut retried = false;
                loop {
                    let response = http
                        .post(&url)
                        .header(CONTENT_TYPE, API_MEDIA_TYPE)
                        .header(ACCEPT, API_MEDIA_TYPE)
                        .bearer_auth(token.as_deref().unwrap_or_default())
                        .body(body.clone())
                        .send()
                        .await
                        .map_err(|e| SourceError::HttpError(e.to_string()))?;

                    if response.status() == StatusCode::UNAUTHORIZED && !retried {
                        debug!("Gateway token rejected, re-authenticating");
                        retried = true;
                        *token = Some(self.authenticate(http, base_url).await?);
                        continue;
                    }
                    if !response.status().is_success() {
                        if response.status() == StatusCode::UNAUTHORIZED {
                            *token = None;
                        }
                        return Err(SourceError::Status(response.status().as_u16()));
                    }

                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| SourceError::HttpError(e.to_string()))?;
                    return first_data_object(&bytes);
                }
            }
        }
    }

    async fn authenticate(
        &self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<String, SourceError> {
        let credentials = self
            .credentials
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let body = json!({
            "login": credentials.username,
            "password": credentials.password,
        })
        .to_string();

        let response = http
            .post(format!("{}{}", base_url, AUTH_ENDPOINT))
            .header(CONTENT_TYPE, API_MEDIA_TYPE)
            .header(ACCEPT, API_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| SourceError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::AuthFailed(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::HttpError(e.to_string()))?;
        let parsed: TokenResponse =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::JsonError(e.to_string()))?;

        let token = parsed
            .data
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::AuthFailed("no access token in response".to_string()))?;

        info!(user = %credentials.username, "Authenticated with gateway");
        Ok(token)
    }
}

/// Extract `data[0]` from a `{"data": [{...}]}` document.
fn first_data_object(bytes: &[u8]) -> Result<Map<String, Value>, SourceError> {
    let response: DataResponse =
        serde_json::from_slice(bytes).map_err(|e| SourceError::JsonError(e.to_string()))?;
    match response.data.into_iter().next() {
        Some(Value::Object(map)) if !map.is_empty() => Ok(map),
        _ => Err(SourceError::EmptyResponse),
    }
}

impl GatewayClient for AosClient {
    async fn read_fix(&self) -> Result<GatewayFix, SourceError> {
        let data = self.get_data(&[GNSS_FIELDS]).await?;
        let fix = parse_gnss(&data, Utc::now());
        debug!(
            lat = fix.latitude,
            lon = fix.longitude,
            hdop = fix.hdop,
            valid = fix.valid,
            "Gateway fix read"
        );
        Ok(fix)
    }

    fn update_credentials(&self, credentials: &ApiCredentials) {
        let mut current = self.credentials.lock().unwrap_or_else(|e| e.into_inner());
        if *current != *credentials {
            *current = credentials.clone();
            info!(user = %credentials.username, "Gateway credentials updated");

            // Drop the token unless a request holds it; a 401 re-authenticates anyway.
            if let Backend::Http { token, .. } = &self.backend {
                if let Ok(mut token) = token.try_lock() {
                    *token = None;
                }
            }
        }
    }
}

impl RadioScanner for AosClient {
    async fn scan(&self, ssids: &[String]) -> Result<Vec<ScanObservation>, SourceError> {
        if ssids.is_empty() {
            return Ok(Vec::new());
        }
        let data = self.get_data(&[WIFI_FIELDS]).await?;
        let observations = parse_wifi(&data, ssids);
        debug!(networks = ssids.len(), observations = observations.len(), "WiFi scan read");
        Ok(observations)
    }
}
