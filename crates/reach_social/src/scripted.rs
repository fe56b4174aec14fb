//! In-process upstream for tests and offline runs.

use crate::{HttpTransport, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use reach_error::{PlatformError, PlatformErrorKind};
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Respond with this status, headers and body
    Respond(UpstreamResponse),
    /// Fail at the connection level
    Fail(PlatformErrorKind),
    /// Never answer
    Hang,
}

impl ScriptedReply {
    /// 200 with a body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Respond(UpstreamResponse::new(200, body))
    }

    /// Arbitrary status with a body.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Respond(UpstreamResponse::new(status, body))
    }

    /// Add a response header. No effect on non-`Respond` replies.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        if let Self::Respond(response) = &mut self {
            response.headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        self
    }
}

#[derive(Debug)]
struct Route {
    url_fragment: String,
    replies: VecDeque<ScriptedReply>,
}

#[derive(Debug, Default)]
struct Script {
    routes: Vec<Route>,
    requests: Vec<UpstreamRequest>,
}

/// Transport answering from a script instead of the network.
///
/// A request is matched against routes in the order they were added; the
/// first route whose fragment occurs in the request's base URL answers.
/// Replies on a route are consumed in order and the last one repeats.
/// Unmatched requests get a 404.
///
/// # Example
///
/// ```
/// use reach_social::{HttpTransport, ScriptedReply, ScriptedTransport, UpstreamRequest};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let transport = ScriptedTransport::new()
///     .route("/api/user/detail", [ScriptedReply::ok("{}")]);
///
/// let response = transport
///     .get(&UpstreamRequest::get("https://www.tiktok.com/api/user/detail/"))
///     .await
///     .unwrap();
/// assert_eq!(response.status, 200);
/// assert_eq!(transport.request_count(), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Empty script: every request gets a 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL contains `url_fragment`.
    pub fn route(
        self,
        url_fragment: impl Into<String>,
        replies: impl IntoIterator<Item = ScriptedReply>,
    ) -> Self {
        self.lock().routes.push(Route {
            url_fragment: url_fragment.into(),
            replies: replies.into_iter().collect(),
        });
        self
    }

    /// Delay every reply by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_reply(&self, request: &UpstreamRequest) -> ScriptedReply {
        let mut script = self.lock();
        script.requests.push(request.clone());

        let Some(route) = script
            .routes
            .iter_mut()
            .find(|route| request.url().contains(&route.url_fragment))
        else {
            return ScriptedReply::status(404, "");
        };

        if route.replies.len() > 1 {
            route.replies.pop_front().unwrap_or(ScriptedReply::Hang)
        } else {
            route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedReply::status(404, ""))
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, PlatformError> {
        let reply = self.next_reply(request);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            ScriptedReply::Respond(response) => Ok(response),
            ScriptedReply::Fail(kind) => Err(PlatformError::new(kind)),
            ScriptedReply::Hang => std::future::pending().await,
        }
    }
}
