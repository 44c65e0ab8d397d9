//! Turns lines of an `arena` block into API requests.
//!
//! Recognized shapes, checked in order:
//! - `are.na/block/<id>` → `/v2/blocks/<id>`
//! - `are.na/<anything>/<slug>` → `/v2/channels/<slug>`. This covers
//!   `channel/` and `channels/` as well as user vanity paths.
//! - `random:personal` → a random image search over the configured user's blocks
//! - `random:anyone` is recognized but has no endpoint yet
//!
//! Anything else is [`RequestClass::Unknown`]. Classification never fails.

use regex::Regex;
use std::sync::LazyLock;

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:www\.)?are\.na/block/(?P<id>\d+)/?(?:[?#].*)?$").unwrap()
});

static CHANNEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:www\.)?are\.na/(?P<segment>[^/?#\s]+)/(?P<slug>[^/?#\s]+)/?(?:[?#].*)?$",
    )
    .unwrap()
});

pub const RANDOM_PERSONAL: &str = "random:personal";
pub const RANDOM_ANYONE: &str = "random:anyone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Block,
    Channel,
    RandomPersonal,
    RandomAnyone,
    Unknown,
}

/// A classified line, ready to hand to a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Line as written in the source block (trimmed)
    pub line: String,
    pub class: RequestClass,
    /// API path (with query) relative to the API base, `None` when unsupported
    pub endpoint: Option<String>,
}

impl ApiRequest {
    fn unknown(line: &str) -> Self {
        Self {
            line: line.to_string(),
            class: RequestClass::Unknown,
            endpoint: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// Classify one line. `user_slug` is used for `random:personal`.
pub fn classify_line(line: &str, user_slug: &str) -> ApiRequest {
    let line = line.trim();

    if let Some(caps) = BLOCK_RE.captures(line) {
        return ApiRequest {
            line: line.to_string(),
            class: RequestClass::Block,
            endpoint: Some(format!("/v2/blocks/{}", &caps["id"])),
        };
    }

    if let Some(caps) = CHANNEL_RE.captures(line) {
        // `block/` with a non-numeric id is a broken block link, not a channel
        if caps["segment"].eq_ignore_ascii_case("block") {
            return ApiRequest::unknown(line);
        }
        return ApiRequest {
            line: line.to_string(),
            class: RequestClass::Channel,
            endpoint: Some(format!("/v2/channels/{}", caps["slug"].to_lowercase())),
        };
    }

    if line.eq_ignore_ascii_case(RANDOM_PERSONAL) {
        let user_slug = user_slug.trim();
        let endpoint = (!user_slug.is_empty()).then(|| {
            format!(
                "/v2/users/{}/search?sort=random&subject=Block&filter[type]=image",
                user_slug.to_lowercase()
            )
        });
        return ApiRequest {
            line: line.to_string(),
            class: RequestClass::RandomPersonal,
            endpoint,
        };
    }

    if line.eq_ignore_ascii_case(RANDOM_ANYONE) {
        return ApiRequest {
            line: line.to_string(),
            class: RequestClass::RandomAnyone,
            endpoint: None,
        };
    }

    ApiRequest::unknown(line)
}
