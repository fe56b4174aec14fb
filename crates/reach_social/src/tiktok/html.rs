//! TikTok public profile page.

use super::{MISSING_ACCOUNT_CODES, snapshot_from_user, top_content_from_items};
use crate::parse::{json_u64, parse_json, script_by_id};
use crate::{FetchStrategy, RawPayload, StrategyContext, StrategyOutcome, UpstreamRequest};
use async_trait::async_trait;
use reach_core::{CallType, CanonicalPlatformId, MetricsSnapshot, Platform};
use reach_error::{PlatformError, PlatformErrorKind};
use serde_json::Value;
use tracing::{debug, instrument};

const REHYDRATION_SCRIPT: &str = "__UNIVERSAL_DATA_FOR_REHYDRATION__";
const LEGACY_STATE_SCRIPT: &str = "SIGI_STATE";

/// Where the page keeps its state.
#[derive(Debug, Clone, PartialEq)]
enum PageState {
    /// Current layout: `__DEFAULT_SCOPE__["webapp.user-detail"]`
    Rehydration(Value),
    /// Older layout: `UserModule` plus `ItemModule`
    Legacy(Value),
}

impl PageState {
    fn extract(html: &str) -> Result<Self, PlatformError> {
        if let Some(text) = script_by_id(html, REHYDRATION_SCRIPT) {
            return Ok(PageState::Rehydration(parse_json(&text)?));
        }
        if let Some(text) = script_by_id(html, LEGACY_STATE_SCRIPT) {
            return Ok(PageState::Legacy(parse_json(&text)?));
        }
        Err(PlatformError::new(PlatformErrorKind::MissingField(format!(
            "script#{}",
            REHYDRATION_SCRIPT
        ))))
    }

    fn status_code(&self) -> u64 {
        match self {
            PageState::Rehydration(state) => {
                json_u64(&state["__DEFAULT_SCOPE__"]["webapp.user-detail"]["statusCode"])
            }
            PageState::Legacy(state) => json_u64(&state["UserPage"]["statusCode"]),
        }
    }

    /// `(user, stats)` for `username`.
    fn user_and_stats(&self, username: &str) -> (&Value, &Value) {
        match self {
            PageState::Rehydration(state) => {
                let info = &state["__DEFAULT_SCOPE__"]["webapp.user-detail"]["userInfo"];
                (&info["user"], &info["stats"])
            }
            PageState::Legacy(state) => {
                let module = &state["UserModule"];
                (&module["users"][username], &module["stats"][username])
            }
        }
    }

    fn items(&self) -> Option<&Value> {
        match self {
            PageState::Rehydration(state) => {
                let items = &state["__DEFAULT_SCOPE__"]["webapp.user-detail"]["itemList"];
                (!items.is_null()).then_some(items)
            }
            PageState::Legacy(state) => {
                let items = &state["ItemModule"];
                (!items.is_null()).then_some(items)
            }
        }
    }
}

/// Scrape of `https://www.tiktok.com/@{username}`.
///
/// Recent videos come from the same page, so extras cost no extra call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TikTokHtmlStrategy;

#[async_trait]
impl FetchStrategy for TikTokHtmlStrategy {
    fn name(&self) -> &'static str {
        "html"
    }

    #[instrument(skip(self, ctx), fields(username = %id.id()))]
    async fn fetch(&self, id: &CanonicalPlatformId, ctx: &StrategyContext) -> StrategyOutcome {
        let request = UpstreamRequest::get(format!("https://www.tiktok.com/@{}", id.id()))
            .header("Accept", "text/html,application/xhtml+xml");

        let response = match ctx
            .client()
            .call(Platform::TikTok, CallType::ProfilePage, request)
            .await
            .into_response()
        {
            Ok(response) => response,
            Err(outcome) => return outcome,
        };

        let state = match PageState::extract(&response.body) {
            Ok(state) => state,
            Err(e) => {
                return StrategyOutcome::MalformedResponse {
                    detail: e.kind.to_string(),
                };
            }
        };

        let status_code = state.status_code();
        if MISSING_ACCOUNT_CODES.contains(&status_code) {
            debug!(status_code, "Account missing");
            return StrategyOutcome::NotFound;
        }

        let payload = RawPayload::new(response.body.clone());
        match state.items() {
            Some(items) if ctx.include_extras() => {
                StrategyOutcome::Success(payload.with_extras(items.to_string()))
            }
            _ => StrategyOutcome::Success(payload),
        }
    }

    fn parse(
        &self,
        id: &CanonicalPlatformId,
        payload: &RawPayload,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let state = PageState::extract(&payload.primary)?;
        let (user, stats) = state.user_and_stats(id.id());

        let items = match &payload.extras {
            Some(extras) => top_content_from_items(&parse_json(extras)?, id.id()),
            None => Vec::new(),
        };

        snapshot_from_user(user, stats, items)
    }
}
