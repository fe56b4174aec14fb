//! YouTube channel page scrape.

use crate::parse::{meta_content, parse_abbreviated_count};
use crate::{FetchStrategy, RawPayload, StrategyContext, StrategyOutcome, UpstreamRequest};
use async_trait::async_trait;
use reach_core::{CallType, CanonicalPlatformId, MetricsSnapshot, Platform};
use reach_error::{PlatformError, PlatformErrorKind};
use regex::Regex;
use std::sync::LazyLock;
use tracing::instrument;

static SUBSCRIBERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d][\d.,]*\s*[KMB]?)\s+subscribers").expect("Valid subscriber regex")
});
static VIDEOS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d][\d.,]*\s*[KMB]?)\s+videos").expect("Valid video count regex")
});
static VIEWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d][\d,]*)\s+views").expect("Valid view count regex"));

const VERIFIED_BADGE: &str = "BADGE_STYLE_TYPE_VERIFIED";

/// Scrape of `https://www.youtube.com/channel/{id}`.
///
/// Counts on the page are rounded (`1.2M subscribers`), so this is the
/// less precise fallback. Uploads are not listed.
#[derive(Debug, Clone, Copy, Default)]
pub struct YouTubeHtmlStrategy;

#[async_trait]
impl FetchStrategy for YouTubeHtmlStrategy {
    fn name(&self) -> &'static str {
        "html"
    }

    #[instrument(skip(self, ctx), fields(channel = %id.id()))]
    async fn fetch(&self, id: &CanonicalPlatformId, ctx: &StrategyContext) -> StrategyOutcome {
        let request = UpstreamRequest::get(format!("https://www.youtube.com/channel/{}", id.id()))
            .header("Accept", "text/html,application/xhtml+xml");

        match ctx
            .client()
            .call(Platform::YouTube, CallType::ProfilePage, request)
            .await
            .into_response()
        {
            Ok(response) => StrategyOutcome::Success(RawPayload::new(response.body)),
            Err(outcome) => outcome,
        }
    }

    fn parse(
        &self,
        _id: &CanonicalPlatformId,
        payload: &RawPayload,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let html = &payload.primary;
        let document = scraper::Html::parse_document(html);

        let title = meta_content(&document, "og:title");
        let subscribers = first_count(&SUBSCRIBERS, html);
        if title.is_none() && subscribers.is_none() {
            return Err(PlatformError::new(PlatformErrorKind::MissingField(
                "og:title and subscriber count".to_string(),
            )));
        }

        MetricsSnapshot::builder()
            .platform(Platform::YouTube)
            .display_name(title.unwrap_or_default())
            .bio(meta_content(&document, "og:description").unwrap_or_default())
            .avatar_url(meta_content(&document, "og:image").unwrap_or_default())
            .verified(html.contains(VERIFIED_BADGE))
            .followers(subscribers.unwrap_or(0))
            .views(first_count(&VIEWS, html).unwrap_or(0))
            .content_count(first_count(&VIDEOS, html).unwrap_or(0))
            .build()
            .map_err(|e| PlatformError::new(PlatformErrorKind::Parse(e.to_string())))
    }
}

fn first_count(pattern: &Regex, html: &str) -> Option<u64> {
    pattern
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .find_map(|count| parse_abbreviated_count(count.as_str()))
}
