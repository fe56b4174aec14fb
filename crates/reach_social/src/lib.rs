//! TikTok and YouTube metrics integrations.
//!
//! This crate holds everything that talks to a platform: the HTTP
//! transport seam, the metered upstream client, per-platform resolvers,
//! and the fetch strategies with the chain that runs them.
//!
//! # Example
//!
//! ```
//! use reach_core::{CanonicalPlatformId, Platform};
//! use reach_rate_limit::{QuotaTracker, policies::BuiltinPolicy};
//! use reach_social::{
//!     ChainOutcome, PlatformRegistry, ScriptedReply, ScriptedTransport, StrategyContext,
//!     UpstreamClient,
//! };
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let body = r#"{"statusCode":0,"userInfo":{"user":{"nickname":"Creator One"},"stats":{"followerCount":1200,"heartCount":48000,"videoCount":31}}}"#;
//! let transport = ScriptedTransport::new().route("/api/user/detail", [ScriptedReply::ok(body)]);
//! let quota = QuotaTracker::new([(Platform::TikTok, BuiltinPolicy::TikTok)]);
//! let ctx = StrategyContext::new(UpstreamClient::new(Arc::new(transport), quota), false);
//!
//! let registry = PlatformRegistry::from_config(&Default::default());
//! let chain = registry.get(Platform::TikTok).unwrap().chain();
//! let outcome = chain.run(&CanonicalPlatformId::new(Platform::TikTok, "creatorone"), &ctx).await;
//!
//! let ChainOutcome::Succeeded { snapshot, strategy } = outcome else { panic!() };
//! assert_eq!(strategy, "api");
//! assert_eq!(snapshot.followers(), 1200);
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod parse;
mod registry;
mod resolver;
mod scripted;
mod strategy;
pub mod tiktok;
mod transport;
mod upstream;
mod user_agent;
pub mod youtube;

pub use registry::{PlatformIntegration, PlatformRegistry, strategy_by_name};
pub use resolver::{IdentityResolver, PlatformResolver, ResolveOutcome};
pub use scripted::{ScriptedReply, ScriptedTransport};
pub use strategy::{ChainOutcome, FetchChain, FetchStrategy, RawPayload, StrategyContext, StrategyOutcome};
pub use transport::{HttpTransport, ReqwestTransport, UpstreamRequest, UpstreamResponse};
pub use upstream::{UpstreamClient, UpstreamReply, referer_for};
pub use user_agent::{BROWSER_USER_AGENTS, UserAgentPool};
