//! Handle to channel ID resolution.

use super::DATA_API_BASE;
use crate::parse::{json_str, parse_json};
use crate::{PlatformResolver, ResolveOutcome, StrategyContext, UpstreamReply, UpstreamRequest};
use async_trait::async_trait;
use reach_core::{CallType, CanonicalPlatformId, NormalizedIdentifier, Platform};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

static CHANNEL_ID_IN_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:externalId|channelId)"\s*:\s*"(UC[A-Za-z0-9_-]{22})""#)
        .expect("Valid channel ID regex")
});

/// Resolves `@handle`s and legacy names to channel IDs.
#[derive(Debug, Clone, Default)]
pub struct YouTubeResolver {
    api_key: Option<String>,
}

/// One lookup step's result.
enum Lookup {
    Found(String),
    Empty,
    Stop(ResolveOutcome),
}

impl YouTubeResolver {
    /// Resolver using the Data API when a key is given.
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// `channels?forHandle=@handle` (1 unit).
    async fn lookup_handle(&self, key: &str, handle: &str, ctx: &StrategyContext) -> Lookup {
        let request = UpstreamRequest::get(format!("{}/channels", DATA_API_BASE))
            .query("part", "id")
            .query("forHandle", format!("@{}", handle))
            .query("key", key);
        let reply = ctx
            .client()
            .call(Platform::YouTube, CallType::ChannelLookup, request)
            .await;
        api_lookup(reply, |item| json_str(&item["id"]))
    }

    /// `search?type=channel&q=handle` (100 units).
    async fn search(&self, key: &str, handle: &str, ctx: &StrategyContext) -> Lookup {
        let request = UpstreamRequest::get(format!("{}/search", DATA_API_BASE))
            .query("part", "snippet")
            .query("type", "channel")
            .query("maxResults", "1")
            .query("q", handle)
            .query("key", key);
        let reply = ctx
            .client()
            .call(Platform::YouTube, CallType::Search, request)
            .await;
        api_lookup(reply, |item| {
            let id = json_str(&item["id"]["channelId"]);
            if id.is_empty() {
                json_str(&item["snippet"]["channelId"])
            } else {
                id
            }
        })
    }

    /// Public `youtube.com/@handle` page, for when no key is configured.
    async fn scrape(&self, handle: &str, ctx: &StrategyContext) -> ResolveOutcome {
        let request = UpstreamRequest::get(format!("https://www.youtube.com/@{}", handle))
            .header("Accept", "text/html,application/xhtml+xml");
        let reply = ctx
            .client()
            .call(Platform::YouTube, CallType::ProfilePage, request)
            .await;

        match reply {
            UpstreamReply::Ok(response) => match channel_id_from_page(&response.body) {
                Some(id) => ResolveOutcome::Resolved(CanonicalPlatformId::new(Platform::YouTube, id)),
                None => {
                    warn!("Channel page has no recognizable channel ID");
                    ResolveOutcome::TransientError("channel ID not found in page".to_string())
                }
            },
            other => stop_outcome(other),
        }
    }
}

#[async_trait]
impl PlatformResolver for YouTubeResolver {
    #[instrument(skip(self, ctx), fields(canonical = %id.canonical()))]
    async fn resolve(&self, id: &NormalizedIdentifier, ctx: &StrategyContext) -> ResolveOutcome {
        if id.already_resolved() {
            debug!("Input is already a channel ID");
            return ResolveOutcome::Resolved(CanonicalPlatformId::new(Platform::YouTube, id.canonical()));
        }

        let handle = id.canonical();
        let Some(key) = self.api_key.as_deref() else {
            return self.scrape(handle, ctx).await;
        };

        match self.lookup_handle(key, handle, ctx).await {
            Lookup::Found(channel) => {
                return ResolveOutcome::Resolved(CanonicalPlatformId::new(Platform::YouTube, channel));
            }
            Lookup::Stop(outcome) => return outcome,
            Lookup::Empty => debug!("No channel for handle, searching"),
        }

        match self.search(key, handle, ctx).await {
            Lookup::Found(channel) => {
                ResolveOutcome::Resolved(CanonicalPlatformId::new(Platform::YouTube, channel))
            }
            Lookup::Empty => ResolveOutcome::NotFound,
            Lookup::Stop(outcome) => outcome,
        }
    }
}

/// Interpret a Data API list response, taking the ID from its first item.
fn api_lookup(reply: UpstreamReply, id_of: impl Fn(&serde_json::Value) -> String) -> Lookup {
    let response = match reply {
        UpstreamReply::Ok(response) => response,
        UpstreamReply::NotFound => return Lookup::Empty,
        other => return Lookup::Stop(stop_outcome(other)),
    };

    let document = match parse_json(&response.body) {
        Ok(document) => document,
        Err(e) => return Lookup::Stop(ResolveOutcome::TransientError(e.kind.to_string())),
    };

    document["items"]
        .as_array()
        .and_then(|items| items.first())
        .map(id_of)
        .filter(|id| !id.is_empty())
        .map_or(Lookup::Empty, Lookup::Found)
}

fn stop_outcome(reply: UpstreamReply) -> ResolveOutcome {
    match reply {
        UpstreamReply::Ok(_) => ResolveOutcome::TransientError("unexpected response".to_string()),
        UpstreamReply::NotFound => ResolveOutcome::NotFound,
        UpstreamReply::Blocked(signal) => ResolveOutcome::Blocked {
            retry_after: signal.retry_after,
        },
        UpstreamReply::Failed(e) => ResolveOutcome::TransientError(e.kind.to_string()),
    }
}

/// Channel ID of a channel page, from the canonical link or page data.
pub(crate) fn channel_id_from_page(html: &str) -> Option<String> {
    let document = scraper::Html::parse_document(html);
    if let Ok(selector) = scraper::Selector::parse(r#"link[rel="canonical"]"#)
        && let Some(id) = document
            .select(&selector)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| href.rsplit_once("/channel/").map(|(_, id)| id.to_string()))
            .find(|id| id.starts_with("UC"))
    {
        return Some(id);
    }

    CHANNEL_ID_IN_PAGE
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}
