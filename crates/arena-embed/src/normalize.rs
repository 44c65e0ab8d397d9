//! Map raw are.na JSON onto [`EmbeddableItem`]s.
//!
//! Blocks, channels and search results all come back in different shapes.
//! Each one is flattened into an ordered list of block-shaped objects,
//! capped at [`Settings::max_items`], and then mapped item by item.

use crate::{
    classify::RequestClass,
    config::Settings,
    error::ApiFailure,
    types::{EmbeddableItem, ItemClass},
};
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;

const WEB_BASE: &str = "https://www.are.na";

/// A field of the wrong type reads as missing instead of failing the item
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBlock {
    id: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    class: Option<String>,
    #[serde(deserialize_with = "lenient")]
    base_class: Option<String>,
    #[serde(deserialize_with = "lenient")]
    slug: Option<String>,
    #[serde(deserialize_with = "lenient")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient")]
    length: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    updated_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    user: Option<RawUser>,
    #[serde(deserialize_with = "lenient")]
    image: Option<RawImage>,
    #[serde(deserialize_with = "lenient")]
    source: Option<RawSource>,
    #[serde(deserialize_with = "lenient")]
    content_html: Option<String>,
    #[serde(deserialize_with = "lenient")]
    attachment: Option<RawAttachment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUser {
    #[serde(deserialize_with = "lenient")]
    username: Option<String>,
    #[serde(deserialize_with = "lenient")]
    slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImage {
    #[serde(deserialize_with = "lenient")]
    square: Option<RawImageVersion>,
    #[serde(deserialize_with = "lenient")]
    thumb: Option<RawImageVersion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImageVersion {
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSource {
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAttachment {
    #[serde(deserialize_with = "lenient")]
    extension: Option<String>,
}

/// Normalize one API response into the items to render, in display order.
///
/// Fails only when the response itself is not an object, so there is nothing
/// to map. Items inside channel contents or search results that aren't
/// objects are skipped.
pub fn normalize_response(
    class: RequestClass,
    response: &Value,
    settings: &Settings,
) -> Result<Vec<EmbeddableItem>, ApiFailure> {
    let mut raw: Vec<RawBlock> = Vec::new();

    match class {
        RequestClass::Block => raw.push(parse_response(response)?),
        RequestClass::Channel => {
            let channel = parse_response(response)?;
            if settings.enable_channel_block {
                raw.push(channel_title_block(channel));
            }
            raw.extend(list_field(response, "contents").filter_map(parse_raw));
        }
        RequestClass::RandomPersonal | RequestClass::RandomAnyone => {
            if !response.is_object() {
                return Err(unexpected(response));
            }
            raw.extend(list_field(response, "blocks").filter_map(parse_raw));
        }
        RequestClass::Unknown => {}
    }

    let cap = settings.max_items();
    if raw.len() > cap {
        tracing::debug!(total = raw.len(), cap, "dropping items past the cap");
        raw.truncate(cap);
    }

    Ok(raw.into_iter().map(to_item).collect())
}

fn unexpected(response: &Value) -> ApiFailure {
    tracing::warn!(kind = json_kind(response), "are.na response is not an object");
    ApiFailure::UnexpectedResponse
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn list_field<'a>(response: &'a Value, name: &str) -> impl Iterator<Item = &'a Value> {
    response
        .get(name)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn parse_response(response: &Value) -> Result<RawBlock, ApiFailure> {
    if !response.is_object() {
        return Err(unexpected(response));
    }
    RawBlock::deserialize(response).map_err(|e| {
        tracing::warn!(error = %e, "could not map are.na response");
        ApiFailure::UnexpectedResponse
    })
}

fn parse_raw(value: &Value) -> Option<RawBlock> {
    if !value.is_object() {
        tracing::warn!(kind = json_kind(value), "skipping are.na item that is not an object");
        return None;
    }
    match RawBlock::deserialize(value) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed are.na item");
            None
        }
    }
}

/// The channel's own metadata, presented as a `channel` class block
fn channel_title_block(channel: RawBlock) -> RawBlock {
    RawBlock {
        class: Some("channel".to_owned()),
        base_class: Some("channel".to_owned()),
        image: None,
        source: None,
        content_html: None,
        attachment: None,
        ..channel
    }
}

fn id_string(id: Option<&Value>) -> String {
    match id {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn to_item(raw: RawBlock) -> EmbeddableItem {
    let item_class = ItemClass::parse(raw.class.as_deref().unwrap_or_default());
    let is_channel = item_class == ItemClass::Channel;
    let base_class = raw.base_class.as_deref().unwrap_or_default().to_lowercase();

    // Channels are addressed by slug on the web
    let path_id = match (&raw.slug, is_channel) {
        (Some(slug), true) if !slug.is_empty() => slug.clone(),
        _ => id_string(raw.id.as_ref()),
    };

    let (owner_username, owner_profile_url) = match raw.user {
        Some(user) => {
            let profile = match user.slug.as_deref() {
                Some(slug) if !slug.is_empty() => format!("{WEB_BASE}/{slug}"),
                _ => String::new(),
            };
            (user.username.unwrap_or_default(), profile)
        }
        None => (String::new(), String::new()),
    };

    let (image_square_url, image_thumb_url) = match raw.image {
        Some(image) => (
            image.square.and_then(|v| v.url).unwrap_or_default(),
            image.thumb.and_then(|v| v.url).unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    EmbeddableItem {
        title: raw.title.unwrap_or_default(),
        canonical_url: format!("{WEB_BASE}/{base_class}/{path_id}"),
        visibility_status: raw.status.unwrap_or_default(),
        item_count: if is_channel { raw.length.unwrap_or(0) } else { 0 },
        last_updated: if is_channel {
            raw.updated_at.unwrap_or_default()
        } else {
            String::new()
        },
        owner_username,
        owner_profile_url,
        image_square_url,
        image_thumb_url,
        source_url: raw.source.and_then(|s| s.url).unwrap_or_default(),
        body_html: raw.content_html.unwrap_or_default(),
        attachment_extension: raw.attachment.and_then(|a| a.extension).unwrap_or_default(),
        item_class,
    }
}
