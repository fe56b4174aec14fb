//! YouTube integration.
//!
//! Channels are addressed by opaque `UC…` IDs, so handles are resolved
//! first. With a Data API key the resolver and the `data_api` strategy use
//! the official API (metered in quota units); without one both fall back to
//! public pages.

mod api;
mod html;
mod resolver;

pub use api::YouTubeDataApiStrategy;
pub use html::YouTubeHtmlStrategy;
pub use resolver::YouTubeResolver;

pub(crate) const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
