use std::fmt;

/// Layout family of an are.na object, from its lower-cased `class`.
///
/// Open set: classes we don't know are kept in [`ItemClass::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemClass {
    Image,
    Link,
    Text,
    Attachment,
    Channel,
    Media,
    Other(String),
}

impl ItemClass {
    pub fn parse(class: &str) -> Self {
        let class = class.trim().to_lowercase();
        match class.as_str() {
            "image" => Self::Image,
            "link" => Self::Link,
            "text" => Self::Text,
            "attachment" => Self::Attachment,
            "channel" => Self::Channel,
            "media" => Self::Media,
            _ => Self::Other(class),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Image => "image",
            Self::Link => "link",
            Self::Text => "text",
            Self::Attachment => "attachment",
            Self::Channel => "channel",
            Self::Media => "media",
            Self::Other(class) => class.as_str(),
        }
    }
}

impl Default for ItemClass {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for ItemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized view of one are.na object.
///
/// Every field is filled, with empty strings and zeros standing in for
/// missing data, so rendering only ever looks at `item_class`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddableItem {
    pub title: String,
    /// `https://www.are.na/{base_class}/{id}`
    pub canonical_url: String,
    pub item_class: ItemClass,
    /// public, closed or private
    pub visibility_status: String,
    /// Number of blocks, channels only
    pub item_count: u64,
    /// Last update timestamp, channels only
    pub last_updated: String,
    pub owner_username: String,
    pub owner_profile_url: String,
    pub image_square_url: String,
    pub image_thumb_url: String,
    pub source_url: String,
    /// Rendered HTML body, text blocks only
    pub body_html: String,
    /// File extension, attachments only
    pub attachment_extension: String,
}
