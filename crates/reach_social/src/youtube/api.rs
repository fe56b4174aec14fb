//! YouTube Data API v3 channel statistics.

use super::DATA_API_BASE;
use crate::parse::{first_present, json_str, json_u64, parse_json};
use crate::{FetchStrategy, RawPayload, StrategyContext, StrategyOutcome, UpstreamRequest};
use async_trait::async_trait;
use reach_core::{CallType, CanonicalPlatformId, MetricsSnapshot, Platform, TopContent};
use reach_error::{PlatformError, PlatformErrorKind};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Uploads listed when extras are requested.
const UPLOADS_PAGE_SIZE: &str = "10";

/// `channels.list` (1 unit), plus `playlistItems.list` (1 unit) for extras.
///
/// Without an API key this strategy reports `NotFound` so the chain moves
/// on to the page scrape.
#[derive(Debug, Clone, Default)]
pub struct YouTubeDataApiStrategy {
    api_key: Option<String>,
}

impl YouTubeDataApiStrategy {
    /// Strategy using `api_key`.
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    async fn fetch_uploads(&self, key: &str, playlist: &str, ctx: &StrategyContext) -> Option<String> {
        let request = UpstreamRequest::get(format!("{}/playlistItems", DATA_API_BASE))
            .query("part", "snippet,contentDetails")
            .query("maxResults", UPLOADS_PAGE_SIZE)
            .query("playlistId", playlist)
            .query("key", key);

        match ctx
            .client()
            .call(Platform::YouTube, CallType::PlaylistItems, request)
            .await
            .into_response()
        {
            Ok(response) => Some(response.body),
            Err(outcome) => {
                warn!(?outcome, "Could not list uploads, continuing without them");
                None
            }
        }
    }
}

#[async_trait]
impl FetchStrategy for YouTubeDataApiStrategy {
    fn name(&self) -> &'static str {
        "data_api"
    }

    #[instrument(skip(self, ctx), fields(channel = %id.id()))]
    async fn fetch(&self, id: &CanonicalPlatformId, ctx: &StrategyContext) -> StrategyOutcome {
        let Some(key) = self.api_key.as_deref() else {
            debug!("No Data API key configured");
            return StrategyOutcome::NotFound;
        };

        let request = UpstreamRequest::get(format!("{}/channels", DATA_API_BASE))
            .query("part", "snippet,statistics,contentDetails")
            .query("id", id.id())
            .query("key", key);

        let response = match ctx
            .client()
            .call(Platform::YouTube, CallType::ChannelDetails, request)
            .await
            .into_response()
        {
            Ok(response) => response,
            Err(outcome) => return outcome,
        };

        let document = match parse_json(&response.body) {
            Ok(document) => document,
            Err(e) => {
                return StrategyOutcome::MalformedResponse {
                    detail: e.kind.to_string(),
                };
            }
        };

        let Some(channel) = document["items"].as_array().and_then(|items| items.first()) else {
            if document["items"].is_array() || document["pageInfo"].is_object() {
                return StrategyOutcome::NotFound;
            }
            return StrategyOutcome::MalformedResponse {
                detail: "channels response has no items".to_string(),
            };
        };

        let payload = RawPayload::new(response.body.clone());
        if !ctx.include_extras() {
            return StrategyOutcome::Success(payload);
        }

        let uploads = json_str(&channel["contentDetails"]["relatedPlaylists"]["uploads"]);
        if uploads.is_empty() {
            return StrategyOutcome::Success(payload);
        }

        match self.fetch_uploads(key, &uploads, ctx).await {
            Some(extras) => StrategyOutcome::Success(payload.with_extras(extras)),
            None => StrategyOutcome::Success(payload),
        }
    }

    fn parse(
        &self,
        _id: &CanonicalPlatformId,
        payload: &RawPayload,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let document = parse_json(&payload.primary)?;
        let channel = document["items"]
            .as_array()
            .and_then(|items| items.first())
            .ok_or_else(|| PlatformError::new(PlatformErrorKind::MissingField("items[0]".to_string())))?;

        let snippet = &channel["snippet"];
        let statistics = &channel["statistics"];
        if !statistics.is_object() {
            return Err(PlatformError::new(PlatformErrorKind::MissingField(
                "items[0].statistics".to_string(),
            )));
        }

        let thumbnails = &snippet["thumbnails"];
        let thumbnail = first_present(thumbnails, &["high", "medium", "default"]);

        let followers = if statistics["hiddenSubscriberCount"].as_bool().unwrap_or(false) {
            0
        } else {
            json_u64(&statistics["subscriberCount"])
        };

        let top_content = match &payload.extras {
            Some(extras) => uploads_from_playlist(&parse_json(extras)?),
            None => Vec::new(),
        };

        MetricsSnapshot::builder()
            .platform(Platform::YouTube)
            .display_name(json_str(&snippet["title"]))
            .bio(json_str(&snippet["description"]))
            .avatar_url(json_str(&thumbnail["url"]))
            .followers(followers)
            .views(json_u64(&statistics["viewCount"]))
            .content_count(json_u64(&statistics["videoCount"]))
            .top_content(top_content)
            .build()
            .map_err(|e| PlatformError::new(PlatformErrorKind::Parse(e.to_string())))
    }
}

fn uploads_from_playlist(document: &Value) -> Vec<TopContent> {
    document["items"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let snippet = &item["snippet"];
            let video_id = item["contentDetails"]["videoId"]
                .as_str()
                .or_else(|| snippet["resourceId"]["videoId"].as_str())?
                .to_string();

            TopContent::builder()
                .url(format!("https://www.youtube.com/watch?v={}", video_id))
                .id(video_id)
                .title(json_str(&snippet["title"]))
                .published_at(json_str(&snippet["publishedAt"]))
                .build()
                .ok()
        })
        .collect()
}
