//! TikTok integration.
//!
//! TikTok addresses profiles by username, so resolution is the identity.
//! Two strategies are available: the web app's JSON endpoint (`api`) and
//! the embedded state of the public profile page (`html`).

mod api;
mod html;

pub use api::TikTokApiStrategy;
pub use html::TikTokHtmlStrategy;

use reach_core::{MetricsSnapshot, Platform, TopContent};
use reach_error::{PlatformError, PlatformErrorKind};
use serde_json::Value;

use crate::parse::{first_present, json_str, json_u64};

/// TikTok `statusCode` values meaning the account does not exist or is unavailable.
pub(crate) const MISSING_ACCOUNT_CODES: &[u64] = &[10202, 10221, 10222];

/// Build a snapshot from TikTok's `user` and `stats` objects.
pub(crate) fn snapshot_from_user(
    user: &Value,
    stats: &Value,
    items: Vec<TopContent>,
) -> Result<MetricsSnapshot, PlatformError> {
    if !user.is_object() {
        return Err(PlatformError::new(PlatformErrorKind::MissingField(
            "userInfo.user".to_string(),
        )));
    }
    if !stats.is_object() {
        return Err(PlatformError::new(PlatformErrorKind::MissingField(
            "userInfo.stats".to_string(),
        )));
    }

    let avatar = first_present(user, &["avatarLarger", "avatarMedium", "avatarThumb"]);

    MetricsSnapshot::builder()
        .platform(Platform::TikTok)
        .display_name(json_str(&user["nickname"]))
        .bio(json_str(&user["signature"]))
        .avatar_url(json_str(avatar))
        .verified(user["verified"].as_bool().unwrap_or(false))
        .followers(json_u64(&stats["followerCount"]))
        .following(json_u64(&stats["followingCount"]))
        .likes(json_u64(first_present(stats, &["heartCount", "heart"])))
        .content_count(json_u64(&stats["videoCount"]))
        .top_content(items)
        .build()
        .map_err(|e| PlatformError::new(PlatformErrorKind::Parse(e.to_string())))
}

/// Parse a TikTok item list (array, or map of id to item).
pub(crate) fn top_content_from_items(items: &Value, username: &str) -> Vec<TopContent> {
    let iter: Box<dyn Iterator<Item = &Value> + '_> = match items {
        Value::Array(list) => Box::new(list.iter()),
        Value::Object(map) => Box::new(map.values()),
        _ => return Vec::new(),
    };

    let mut content: Vec<TopContent> = iter
        .filter_map(|item| {
            let id = json_str(&item["id"]);
            if id.is_empty() {
                return None;
            }
            let stats = &item["stats"];
            TopContent::builder()
                .url(format!("https://www.tiktok.com/@{}/video/{}", username, id))
                .id(id)
                .title(json_str(&item["desc"]))
                .views(json_u64(&stats["playCount"]))
                .likes(json_u64(&stats["diggCount"]))
                .comments(json_u64(&stats["commentCount"]))
                .published_at(json_u64(&item["createTime"]).to_string())
                .build()
                .ok()
        })
        .collect();

    content.sort_by_key(|item| std::cmp::Reverse(item.views()));
    content
}
