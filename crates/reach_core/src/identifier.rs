//! Identifier normalization.
//!
//! A raw handle arrives in many shapes: `@CreatorOne`, `creatorone`,
//! `https://www.tiktok.com/@CreatorOne?lang=en`, or a YouTube channel URL.
//! [`normalize`] folds all of them into the canonical key used by the
//! rate limiter and the cache. Per-platform differences live in the
//! [`PlatformRules`] table, not in the control flow.

use crate::Platform;
use reach_error::{IdentifierError, IdentifierErrorKind, ReachResult};
use serde::{Deserialize, Serialize};

/// A handle folded into its canonical form.
///
/// # Examples
///
/// ```
/// use reach_core::{normalize, Platform};
///
/// let id = normalize(Platform::TikTok, "@CreatorOne").unwrap();
/// assert_eq!(id.canonical(), "creatorone");
/// assert_eq!(id.raw_input(), "@CreatorOne");
/// assert!(!id.already_resolved());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct NormalizedIdentifier {
    /// Platform the handle belongs to
    #[getter(copy)]
    platform: Platform,
    /// Input exactly as supplied by the caller
    raw_input: String,
    /// Canonical key (lowercase, prefix-stripped)
    canonical: String,
    /// Input was already the platform's opaque ID
    #[getter(copy)]
    already_resolved: bool,
}

/// Canonicalization rules for one platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformRules {
    /// Host-relative URL prefixes that precede the handle, lowercase,
    /// checked after the scheme and `www.`/`m.` are removed.
    pub url_prefixes: &'static [&'static str],
    /// Recognizes an input that is already the platform's opaque ID.
    /// Such IDs are case-sensitive and are kept verbatim.
    pub resolved_id: Option<fn(&str) -> bool>,
}

const TIKTOK_RULES: PlatformRules = PlatformRules {
    url_prefixes: &["tiktok.com/@", "tiktok.com/"],
    resolved_id: None,
};

const YOUTUBE_RULES: PlatformRules = PlatformRules {
    url_prefixes: &[
        "youtube.com/channel/",
        "youtube.com/user/",
        "youtube.com/c/",
        "youtube.com/@",
        "youtube.com/",
    ],
    resolved_id: Some(is_youtube_channel_id),
};

/// Rules table lookup for a platform.
pub fn rules_for(platform: Platform) -> &'static PlatformRules {
    match platform {
        Platform::TikTok => &TIKTOK_RULES,
        Platform::YouTube => &YOUTUBE_RULES,
    }
}

/// YouTube channel IDs are `UC` followed by 22 URL-safe base64 characters.
fn is_youtube_channel_id(candidate: &str) -> bool {
    candidate.len() == 24
        && candidate.starts_with("UC")
        && candidate[2..]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Remove the scheme, a `www.`/`m.` host prefix and a matching rule prefix,
/// then cut at the first path, query or fragment separator.
fn strip_url(input: &str, rules: &PlatformRules) -> Option<String> {
    let lower = input.to_ascii_lowercase();
    let mut offset = 0;
    for scheme in ["https://", "http://"] {
        if lower.starts_with(scheme) {
            offset = scheme.len();
            break;
        }
    }
    for host in ["www.", "m."] {
        if lower[offset..].starts_with(host) {
            offset += host.len();
            break;
        }
    }

    let prefix = rules
        .url_prefixes
        .iter()
        .find(|prefix| lower[offset..].starts_with(*prefix))?;
    let rest = &input[offset + prefix.len()..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Canonicalize a raw handle for a platform.
///
/// Deterministic and free of I/O. Fails only when nothing is left after
/// trimming whitespace, URL decoration and the leading `@`.
///
/// # Errors
///
/// Returns [`IdentifierErrorKind::Empty`] for blank input.
///
/// # Examples
///
/// ```
/// use reach_core::{normalize, Platform};
///
/// let id = normalize(Platform::YouTube, "https://www.youtube.com/@SomeChannel/videos").unwrap();
/// assert_eq!(id.canonical(), "somechannel");
///
/// let id = normalize(Platform::YouTube, "UCabcdefghijklmnopqrstuv").unwrap();
/// assert_eq!(id.canonical(), "UCabcdefghijklmnopqrstuv");
/// assert!(id.already_resolved());
///
/// assert!(normalize(Platform::TikTok, "   ").is_err());
/// ```
pub fn normalize(platform: Platform, raw_input: &str) -> ReachResult<NormalizedIdentifier> {
    let rules = rules_for(platform);
    let trimmed = raw_input.trim();

    // Strip `@` and URL decoration until neither applies, so the canonical
    // form normalizes to itself.
    let mut handle = trimmed.trim_start_matches('@').trim().to_string();
    while let Some(stripped) = strip_url(&handle, rules) {
        handle = stripped.trim_start_matches('@').trim().to_string();
    }
    let handle = handle.as_str();

    if handle.is_empty() {
        return Err(IdentifierError::new(IdentifierErrorKind::Empty).into());
    }

    let already_resolved = rules.resolved_id.is_some_and(|matches| matches(handle));
    let canonical = if already_resolved {
        handle.to_string()
    } else {
        handle.to_lowercase()
    };

    Ok(NormalizedIdentifier {
        platform,
        raw_input: raw_input.to_string(),
        canonical,
        already_resolved,
    })
}
