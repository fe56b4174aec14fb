//! Supported platforms and the upstream calls made against them.

use serde::{Deserialize, Serialize};

/// A social platform with a registered metrics integration.
///
/// # Examples
///
/// ```
/// use reach_core::Platform;
///
/// let platform: Platform = "YouTube".parse().unwrap();
/// assert_eq!(platform, Platform::YouTube);
/// assert_eq!(platform.to_string(), "youtube");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// TikTok creator profiles
    #[display("tiktok")]
    TikTok,
    /// YouTube channels
    #[display("youtube")]
    YouTube,
}

impl Platform {
    /// Lowercase name used in configuration keys and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiktok" | "tt" => Ok(Platform::TikTok),
            "youtube" | "yt" => Ok(Platform::YouTube),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// Kind of upstream call, used to look up its quota cost.
///
/// Names match the keys of the `costs.units` configuration table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    /// Structured profile lookup (TikTok user detail endpoint)
    #[display("profile_detail")]
    ProfileDetail,
    /// Public profile HTML page
    #[display("profile_page")]
    ProfilePage,
    /// Handle to channel ID lookup (YouTube `channels?forHandle=`)
    #[display("channel_lookup")]
    ChannelLookup,
    /// Free-text search (YouTube `search`)
    #[display("search")]
    Search,
    /// Channel statistics (YouTube `channels?id=`)
    #[display("channel_details")]
    ChannelDetails,
    /// Recent uploads listing (YouTube `playlistItems`)
    #[display("playlist_items")]
    PlaylistItems,
}

impl CallType {
    /// Configuration key for this call type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::ProfileDetail => "profile_detail",
            CallType::ProfilePage => "profile_page",
            CallType::ChannelLookup => "channel_lookup",
            CallType::Search => "search",
            CallType::ChannelDetails => "channel_details",
            CallType::PlaylistItems => "playlist_items",
        }
    }
}
