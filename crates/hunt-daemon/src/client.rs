//! Lidarr v1 HTTP client.
//!
//! Every call carries the `X-Api-Key` header and the configured timeout.
//! Failures are logged here with the request URL and handed back as
//! [`ApiError`]. Callers treat them as "no result" and only log what they
//! skipped because of it.

use async_trait::async_trait;
use hunt_proto::catalog::{Album, Artist, CommandAck, Page, QualityProfile, Track};
use hunt_proto::config::LidarrConfig;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use crate::api::{CatalogApi, Command};

const API_PREFIX: &str = "api/v1";

const USER_AGENT: &str = concat!("hunt-daemon/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} command was not acknowledged")]
    NotAcknowledged(&'static str),
}

pub struct LidarrClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LidarrClient {
    pub fn new(config: &LidarrConfig) -> anyhow::Result<Self> {
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| anyhow::anyhow!("API key contains characters not allowed in a header"))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", api_key);

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, endpoint)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(endpoint);
        let request = self.http_client.get(&url).query(query);
        self.execute(request, &url).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(endpoint);
        let request = self.http_client.post(&url).json(body);
        self.execute(request, &url).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, ApiError> {
        let result = fetch(request).await;
        if let Err(ref e) = result {
            error!("API request error to {}: {}", url, e);
        }
        result
    }

    pub async fn artists(&self) -> Result<Vec<Artist>, ApiError> {
        self.get("artist", &[]).await
    }

    pub async fn albums_for_artist(&self, artist_id: i64) -> Result<Vec<Album>, ApiError> {
        self.get("album", &[("artistId", artist_id.to_string())]).await
    }

    pub async fn tracks_for_album(&self, album_id: i64) -> Result<Vec<Track>, ApiError> {
        self.get("track", &[("albumId", album_id.to_string())]).await
    }

    pub async fn quality_profiles(&self) -> Result<Vec<QualityProfile>, ApiError> {
        self.get("qualityprofile", &[]).await
    }

    pub async fn cutoff_unmet(&self, page: i64, page_size: i64) -> Result<Page<Album>, ApiError> {
        self.get("wanted/cutoff", &cutoff_query(page, page_size)).await
    }

    pub async fn send_command(&self, command: &Command) -> Result<i64, ApiError> {
        let ack: CommandAck = self.post("command", &command.body()).await?;
        match ack.id {
            Some(id) => {
                debug!("{} acknowledged as command {}", command, id);
                Ok(id)
            }
            None => {
                error!("{} returned no command id", command);
                Err(ApiError::NotAcknowledged(command.name()))
            }
        }
    }
}

async fn fetch<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status(status));
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

fn cutoff_query(page: i64, page_size: i64) -> Vec<(&'static str, String)> {
    vec![
        ("pageSize", page_size.to_string()),
        ("page", page.to_string()),
        ("sortKey", "title".to_string()),
        ("sortDirection", "ascending".to_string()),
        ("includeArtist", "true".to_string()),
    ]
}

#[async_trait]
impl CatalogApi for LidarrClient {
    async fn artists(&self) -> Result<Vec<Artist>, ApiError> {
        self.artists().await
    }

    async fn albums_for_artist(&self, artist_id: i64) -> Result<Vec<Album>, ApiError> {
        self.albums_for_artist(artist_id).await
    }

    async fn tracks_for_album(&self, album_id: i64) -> Result<Vec<Track>, ApiError> {
        self.tracks_for_album(album_id).await
    }

    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>, ApiError> {
        self.quality_profiles().await
    }

    async fn cutoff_unmet(&self, page: i64, page_size: i64) -> Result<Page<Album>, ApiError> {
        self.cutoff_unmet(page, page_size).await
    }

    async fn send_command(&self, command: &Command) -> Result<i64, ApiError> {
        self.send_command(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, key: &str) -> LidarrConfig {
        LidarrConfig {
            api_url: url.to_string(),
            api_key: key.to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_url_building() {
        let client = LidarrClient::new(&config("http://lidarr:8686/", "abc")).unwrap();
        assert_eq!(client.base_url(), "http://lidarr:8686");
        assert_eq!(client.url("artist"), "http://lidarr:8686/api/v1/artist");
        assert_eq!(
            client.url("wanted/cutoff"),
            "http://lidarr:8686/api/v1/wanted/cutoff"
        );
    }

    #[test]
    fn test_rejects_unprintable_api_key() {
        assert!(LidarrClient::new(&config("http://lidarr:8686", "bad\nkey")).is_err());
    }

    #[test]
    fn test_cutoff_query() {
        let query = cutoff_query(2, 100);
        assert!(query.contains(&("page", "2".to_string())));
        assert!(query.contains(&("pageSize", "100".to_string())));
        assert!(query.iter().any(|(k, _)| *k == "sortKey"));
        assert!(query.iter().any(|(k, _)| *k == "sortDirection"));
    }

    #[test]
    fn test_user_agent_format() {
        assert!(USER_AGENT.starts_with("hunt-daemon/"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let mut cfg = config("http://127.0.0.1:9", "abc");
        cfg.timeout_secs = 2;
        let client = LidarrClient::new(&cfg).unwrap();
        let result = client.artists().await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }
}
