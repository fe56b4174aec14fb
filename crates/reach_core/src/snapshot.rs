//! Normalized metrics snapshot.

use crate::Platform;
use serde::{Deserialize, Serialize};

/// One recent item listed on a profile (video, short, upload).
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into), default)]
pub struct TopContent {
    /// Platform-assigned content ID
    #[serde(default)]
    id: String,
    /// Title or caption
    #[serde(default)]
    title: String,
    /// Public URL
    #[serde(default)]
    url: String,
    /// View count
    #[serde(default)]
    #[getter(copy)]
    views: u64,
    /// Like count
    #[serde(default)]
    #[getter(copy)]
    likes: u64,
    /// Comment count
    #[serde(default)]
    #[getter(copy)]
    comments: u64,
    /// Publication timestamp as reported upstream (RFC 3339 or epoch seconds)
    #[serde(default)]
    published_at: String,
}

impl TopContent {
    /// Creates a new top-content builder.
    pub fn builder() -> TopContentBuilder {
        TopContentBuilder::default()
    }
}

/// Platform metrics for one creator at one point in time.
///
/// Every numeric field is a non-negative integer and every text field is a
/// plain string; anything missing upstream is zero or empty, never absent.
///
/// # Examples
///
/// ```
/// use reach_core::{MetricsSnapshot, Platform};
///
/// let snapshot = MetricsSnapshot::builder()
///     .platform(Platform::TikTok)
///     .display_name("Creator One")
///     .followers(1_200u64)
///     .likes(48_000u64)
///     .build()
///     .unwrap();
///
/// assert_eq!(snapshot.followers(), 1_200);
/// assert_eq!(snapshot.views(), 0);
/// assert!(snapshot.bio().is_empty());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct MetricsSnapshot {
    /// Platform the metrics came from
    #[getter(copy)]
    platform: Platform,
    /// Display name (not the handle)
    #[builder(default)]
    #[serde(default)]
    display_name: String,
    /// Profile biography or channel description
    #[builder(default)]
    #[serde(default)]
    bio: String,
    /// Avatar image URL
    #[builder(default)]
    #[serde(default)]
    avatar_url: String,
    /// Platform verification badge
    #[builder(default)]
    #[serde(default)]
    #[getter(copy)]
    verified: bool,
    /// Followers or subscribers
    #[builder(default)]
    #[serde(default)]
    #[getter(copy)]
    followers: u64,
    /// Accounts followed (zero where the platform does not expose it)
    #[builder(default)]
    #[serde(default)]
    #[getter(copy)]
    following: u64,
    /// Total likes or hearts received
    #[builder(default)]
    #[serde(default)]
    #[getter(copy)]
    likes: u64,
    /// Total views across all content
    #[builder(default)]
    #[serde(default)]
    #[getter(copy)]
    views: u64,
    /// Number of videos or uploads
    #[builder(default)]
    #[serde(default)]
    #[getter(copy)]
    content_count: u64,
    /// Recent content, populated only when extras were requested
    #[builder(default)]
    #[serde(default)]
    top_content: Vec<TopContent>,
    /// Whether the fetch that produced this snapshot asked for recent content
    #[builder(default)]
    #[serde(default)]
    #[getter(copy)]
    extras_included: bool,
}

impl MetricsSnapshot {
    /// Creates a new snapshot builder.
    pub fn builder() -> MetricsSnapshotBuilder {
        MetricsSnapshotBuilder::default()
    }

    /// Structurally valid snapshot with every field zeroed.
    pub fn empty(platform: Platform) -> Self {
        Self {
            platform,
            display_name: String::new(),
            bio: String::new(),
            avatar_url: String::new(),
            verified: false,
            followers: 0,
            following: 0,
            likes: 0,
            views: 0,
            content_count: 0,
            top_content: Vec::new(),
            extras_included: false,
        }
    }

    /// Mark whether recent content was requested for this snapshot.
    ///
    /// A snapshot fetched without extras cannot stand in for one fetched
    /// with them, even when the content list would have been empty.
    pub fn with_extras_included(mut self, included: bool) -> Self {
        self.extras_included = included;
        self
    }

    /// Whether this snapshot can answer a request with the given extras flag.
    pub fn satisfies(&self, include_extras: bool) -> bool {
        !include_extras || self.extras_included
    }

    /// Whether every numeric field is zero and no content is listed.
    pub fn is_empty(&self) -> bool {
        self.followers == 0
            && self.following == 0
            && self.likes == 0
            && self.views == 0
            && self.content_count == 0
            && self.top_content.is_empty()
    }

    /// Engagement as a fraction.
    ///
    /// With top content available this is `(likes + comments) / views`
    /// over those items; otherwise total likes over total views, falling
    /// back to likes per follower. Zero when there is no denominator.
    pub fn engagement_rate(&self) -> f64 {
        let (interactions, views) = self
            .top_content
            .iter()
            .fold((0u64, 0u64), |(i, v), item| {
                (
                    i.saturating_add(item.likes).saturating_add(item.comments),
                    v.saturating_add(item.views),
                )
            });
        if views > 0 {
            return interactions as f64 / views as f64;
        }
        if self.views > 0 {
            return self.likes as f64 / self.views as f64;
        }
        if self.followers > 0 {
            return self.likes as f64 / self.followers as f64;
        }
        0.0
    }
}
