//! TikTok web app user-detail endpoint.

use super::{MISSING_ACCOUNT_CODES, snapshot_from_user};
use crate::parse::{json_u64, parse_json};
use crate::{FetchStrategy, RawPayload, StrategyContext, StrategyOutcome, UpstreamRequest};
use async_trait::async_trait;
use reach_core::{CallType, CanonicalPlatformId, MetricsSnapshot, Platform};
use reach_error::PlatformError;
use tracing::{debug, instrument};

const USER_DETAIL_URL: &str = "https://www.tiktok.com/api/user/detail/";

/// Structured profile lookup via the web app API.
///
/// The endpoint often answers 200 with an empty body when it wants a
/// signed request; that is reported as a malformed response so the chain
/// falls through to the page scrape.
#[derive(Debug, Clone, Copy, Default)]
pub struct TikTokApiStrategy;

#[async_trait]
impl FetchStrategy for TikTokApiStrategy {
    fn name(&self) -> &'static str {
        "api"
    }

    #[instrument(skip(self, ctx), fields(username = %id.id()))]
    async fn fetch(&self, id: &CanonicalPlatformId, ctx: &StrategyContext) -> StrategyOutcome {
        let request = UpstreamRequest::get(USER_DETAIL_URL)
            .query("uniqueId", id.id())
            .query("aid", "1988")
            .header("Accept", "application/json");

        let response = match ctx
            .client()
            .call(Platform::TikTok, CallType::ProfileDetail, request)
            .await
            .into_response()
        {
            Ok(response) => response,
            Err(outcome) => return outcome,
        };

        if response.body.trim().is_empty() {
            return StrategyOutcome::MalformedResponse {
                detail: "empty user-detail body".to_string(),
            };
        }

        let document = match parse_json(&response.body) {
            Ok(document) => document,
            Err(e) => {
                return StrategyOutcome::MalformedResponse {
                    detail: e.kind.to_string(),
                };
            }
        };

        let status_code = json_u64(&document["statusCode"]);
        if MISSING_ACCOUNT_CODES.contains(&status_code) {
            debug!(status_code, "Account missing");
            return StrategyOutcome::NotFound;
        }

        StrategyOutcome::Success(RawPayload::new(response.body))
    }

    fn parse(
        &self,
        _id: &CanonicalPlatformId,
        payload: &RawPayload,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let document = parse_json(&payload.primary)?;
        let info = &document["userInfo"];
        snapshot_from_user(&info["user"], &info["stats"], Vec::new())
    }
}
