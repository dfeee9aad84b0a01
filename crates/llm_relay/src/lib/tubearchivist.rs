//! # TubeArchivist
//!
//! Read-only client for a self-hosted TubeArchivist instance: latest videos,
//! channel counts and the biggest channels.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use reqwest_retry_after::RetryAfterMiddleware;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TubeArchivistError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("Invalid API token")]
    InvalidToken,
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoPage {
    pub data: Vec<Video>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub title: String,
    pub channel: VideoChannel,
    pub published: String,
    pub player: VideoPlayer,
    pub stats: VideoStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoChannel {
    pub channel_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoPlayer {
    pub duration_str: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoStats {
    pub view_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelStats {
    pub doc_count: u64,
    pub active_true: u64,
    pub active_false: u64,
    pub subscribed_true: u64,
    pub subscribed_false: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Published")]
    pub published: String,
    #[serde(rename = "Duration")]
    pub duration: String,
    #[serde(rename = "Views")]
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    #[serde(rename = "Total Channels")]
    pub total: u64,
    #[serde(rename = "Active Channels")]
    pub active: u64,
    #[serde(rename = "Inactive Channels")]
    pub inactive: u64,
    #[serde(rename = "Subscribed Channels")]
    pub subscribed: u64,
    #[serde(rename = "Unsubscribed Channels")]
    pub unsubscribed: u64,
}

pub fn format_videos(page: &VideoPage) -> Vec<VideoSummary> {
    page.data
        .iter()
        .map(|video| VideoSummary {
            title: video.title.clone(),
            channel: video.channel.channel_name.clone(),
            published: video.published.clone(),
            duration: video.player.duration_str.clone(),
            views: video.stats.view_count,
        })
        .collect()
}

pub fn format_channels(stats: &ChannelStats) -> ChannelSummary {
    ChannelSummary {
        total: stats.doc_count,
        active: stats.active_true,
        inactive: stats.active_false,
        subscribed: stats.subscribed_true,
        unsubscribed: stats.subscribed_false,
    }
}

#[derive(Clone)]
pub struct TubeArchivistClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl TubeArchivistClient {
    pub const DEFAULT_BASE_URL: &str = "http://tubearchivist.lan";

    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self, TubeArchivistError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {token}"))
            .map_err(|_| TubeArchivistError::InvalidToken)?;
        headers.insert(AUTHORIZATION, auth);

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(inner)
            .with(RetryAfterMiddleware::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TubeArchivistError> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "API request failed"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::error!(status, %message, "API request failed");
            return Err(TubeArchivistError::Api { status, message });
        }

        Ok(resp.json().await?)
    }

    pub async fn get_latest_videos(&self, page_size: usize) -> Result<VideoPage, TubeArchivistError> {
        self.get_json(&format!("/api/video/?page_size={page_size}"))
            .await
    }

    pub async fn get_channel_stats(&self) -> Result<ChannelStats, TubeArchivistError> {
        self.get_json("/api/stats/channel/").await
    }

    /// The response shape is passed through untouched.
    pub async fn get_biggest_channels(
        &self,
        order: &str,
    ) -> Result<serde_json::Value, TubeArchivistError> {
        self.get_json(&format!("/api/stats/biggestchannels/?order={order}"))
            .await
    }
}
