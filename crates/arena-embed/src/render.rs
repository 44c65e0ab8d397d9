//! Render [`EmbeddableItem`]s as HTML embeds
//!
//! Every embed shares one frame:
//!
//! ```text
//! div.arena--block
//!   a.arena--block--link          (covers the card, points at are.na)
//!   div.arena--block--inner       (layout specific content + Source button)
//!   div.arena--block--caption     (title, not for channels)
//! ```
//!
//! What goes inside the inner box is decided by an [`EmbedLayout`] picked
//! from the item's class. Unknown classes get [`NoLayout`], which leaves the
//! box empty.

use crate::{
    target::RenderTarget,
    types::{EmbeddableItem, ItemClass},
};
use chrono::{DateTime, Utc};
use url::Url;

/// Layout for one family of item classes
pub trait EmbedLayout {
    /// Write the content of the inner box
    fn inner(&self, item: &EmbeddableItem, now: DateTime<Utc>, html: &mut String);

    /// Whether the title caption goes under the box
    fn has_caption(&self) -> bool {
        true
    }
}

/// image, link and media blocks: the square thumbnail
pub struct ImageLayout;

impl EmbedLayout for ImageLayout {
    fn inner(&self, item: &EmbeddableItem, _now: DateTime<Utc>, html: &mut String) {
        html.push_str("<img src=\"");
        html.push_str(&html_escape(&item.image_square_url));
        html.push_str("\" alt=\"");
        html.push_str(&html_escape(&item.title));
        html.push_str("\" loading=\"lazy\" />");
    }
}

/// text blocks: are.na's rendered HTML, passed through
pub struct TextLayout;

impl EmbedLayout for TextLayout {
    fn inner(&self, item: &EmbeddableItem, _now: DateTime<Utc>, html: &mut String) {
        html.push_str("<div class=\"arena--block--text\">");
        html.push_str(&item.body_html);
        html.push_str("</div>");
    }
}

pub struct AttachmentLayout;

impl EmbedLayout for AttachmentLayout {
    fn inner(&self, item: &EmbeddableItem, _now: DateTime<Utc>, html: &mut String) {
        html.push_str("<div class=\"arena--block--attachment\">");
        html.push_str("<span class=\"arena--block--extension\">");
        html.push_str(&html_escape(&item.attachment_extension));
        html.push_str("</span>");
        html.push_str("</div>");
    }
}

/// channels: title, owner, size and last update, no caption
pub struct ChannelLayout;

impl EmbedLayout for ChannelLayout {
    fn inner(&self, item: &EmbeddableItem, now: DateTime<Utc>, html: &mut String) {
        html.push_str("<div class=\"arena--channel\">");

        html.push_str("<span class=\"arena--channel--title\">");
        html.push_str(&html_escape(&item.title));
        html.push_str("</span>");

        html.push_str("<span class=\"arena--channel--owner\">");
        html.push_str(&html_escape(&item.owner_username));
        html.push_str("</span>");

        html.push_str("<span class=\"arena--channel--count\">");
        html.push_str(&item.item_count.to_string());
        html.push_str(if item.item_count == 1 { " block" } else { " blocks" });
        html.push_str("</span>");

        let updated = format_relative_time(&item.last_updated, now);
        if !updated.is_empty() {
            html.push_str("<span class=\"arena--channel--updated\">updated ");
            html.push_str(&updated);
            html.push_str("</span>");
        }

        html.push_str("</div>");
    }

    fn has_caption(&self) -> bool {
        false
    }
}

/// Fallback for classes without a layout
pub struct NoLayout;

impl EmbedLayout for NoLayout {
    fn inner(&self, _item: &EmbeddableItem, _now: DateTime<Utc>, _html: &mut String) {}
}

pub fn layout_for(class: &ItemClass) -> &'static dyn EmbedLayout {
    match class {
        ItemClass::Image | ItemClass::Link | ItemClass::Media => &ImageLayout,
        ItemClass::Text => &TextLayout,
        ItemClass::Attachment => &AttachmentLayout,
        ItemClass::Channel => &ChannelLayout,
        ItemClass::Other(_) => &NoLayout,
    }
}

/// Render one item to an HTML string
pub fn render_embed(item: &EmbeddableItem, now: DateTime<Utc>) -> String {
    let layout = layout_for(&item.item_class);
    let class = html_escape(item.item_class.as_str());

    let mut html = String::new();
    html.push_str("<div class=\"arena--block\" data-class=\"");
    html.push_str(&class);
    html.push_str("\">");

    // Background link covers whole card
    html.push_str("<a class=\"arena--block--link\" href=\"");
    html.push_str(&html_escape(&item.canonical_url));
    html.push_str("\" target=\"_blank\" rel=\"noopener\" aria-label=\"Open on are.na\"></a>");

    html.push_str("<div class=\"arena--block--inner\" data-class=\"");
    html.push_str(&class);
    html.push_str("\">");
    layout.inner(item, now, &mut html);
    html.push_str("<a class=\"arena--block--button\" href=\"");
    html.push_str(&html_escape(&item.source_url));
    html.push_str("\" target=\"_blank\" rel=\"noopener\">Source</a>");
    html.push_str("</div>");

    if layout.has_caption() {
        let title = html_escape(&item.title);
        html.push_str("<div class=\"arena--block--caption\" title=\"");
        html.push_str(&title);
        html.push_str("\">");
        html.push_str(&title);
        html.push_str("</div>");
    }

    html.push_str("</div>");
    html
}

/// Render one item into the target
pub fn render_item(target: &RenderTarget, item: &EmbeddableItem, now: DateTime<Utc>) {
    target.append(render_embed(item, now));
}

/// Inline error placeholder for a line that couldn't be loaded
pub fn render_error(target: &RenderTarget, line: &str, message: &str) {
    let text = html_escape(line);
    let mut html = String::new();
    html.push_str("<div class=\"arena--error\">");
    // Only web URLs become links, anything else is shown as text
    match web_url(line) {
        Some(url) => {
            html.push_str("<a class=\"arena--error--link\" href=\"");
            html.push_str(&html_escape(url.as_str()));
            html.push_str("\">");
            html.push_str(&text);
            html.push_str("</a>");
        }
        None => {
            html.push_str("<span class=\"arena--error--link\">");
            html.push_str(&text);
            html.push_str("</span>");
        }
    }
    html.push_str("<span class=\"arena--error--message\">");
    html.push_str(&html_escape(message));
    html.push_str("</span>");
    html.push_str("</div>");
    target.append(html);
}

fn web_url(line: &str) -> Option<Url> {
    Url::parse(line.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// "3 days ago" style time since `timestamp` (RFC 3339).
///
/// Unparseable timestamps give an empty string.
pub fn format_relative_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(timestamp.trim()) else {
        return String::new();
    };
    let seconds = (now - then.with_timezone(&Utc)).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    let (count, unit) = match seconds {
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < 30 * DAY => (s / DAY, "day"),
        s if s < 365 * DAY => (s / (30 * DAY), "month"),
        s => (s / (365 * DAY), "year"),
    };
    format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0).unwrap()
    }

    fn item(class: ItemClass) -> EmbeddableItem {
        EmbeddableItem {
            title: "A \"quoted\" <title>".into(),
            canonical_url: "https://www.are.na/block/1".into(),
            item_class: class,
            image_square_url: "https://images.are.na/1/square.jpg".into(),
            source_url: "https://example.com/?a=1&b=2".into(),
            ..EmbeddableItem::default()
        }
    }

    #[test]
    fn test_image_embed() {
        let html = render_embed(&item(ItemClass::Image), now());
        insta::assert_snapshot!(html, @r#"<div class="arena--block" data-class="image"><a class="arena--block--link" href="https://www.are.na/block/1" target="_blank" rel="noopener" aria-label="Open on are.na"></a><div class="arena--block--inner" data-class="image"><img src="https://images.are.na/1/square.jpg" alt="A &quot;quoted&quot; &lt;title&gt;" loading="lazy" /><a class="arena--block--button" href="https://example.com/?a=1&amp;b=2" target="_blank" rel="noopener">Source</a></div><div class="arena--block--caption" title="A &quot;quoted&quot; &lt;title&gt;">A &quot;quoted&quot; &lt;title&gt;</div></div>"#);
    }

    #[test]
    fn test_link_and_media_use_image_layout() {
        for class in [ItemClass::Link, ItemClass::Media] {
            let html = render_embed(&item(class), now());
            assert!(html.contains("<img src=\"https://images.are.na/1/square.jpg\""));
            assert!(html.contains("arena--block--caption"));
        }
    }

    #[test]
    fn test_text_embed_passes_html_through() {
        let mut text = item(ItemClass::Text);
        text.body_html = "<p>hello <em>there</em></p>".into();
        let html = render_embed(&text, now());
        assert!(html.contains("<div class=\"arena--block--text\"><p>hello <em>there</em></p></div>"));
        assert!(html.contains("arena--block--caption"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_attachment_embed_shows_extension() {
        let mut attachment = item(ItemClass::Attachment);
        attachment.attachment_extension = "pdf".into();
        let html = render_embed(&attachment, now());
        assert!(html.contains("<span class=\"arena--block--extension\">pdf</span>"));
        assert!(html.contains("arena--block--caption"));
    }

    #[test]
    fn test_channel_embed() {
        let channel = EmbeddableItem {
            title: "Reference Shelf".into(),
            canonical_url: "https://www.are.na/channel/reference-shelf".into(),
            item_class: ItemClass::Channel,
            item_count: 12,
            last_updated: "2024-05-01T12:00:00.000Z".into(),
            owner_username: "Someone".into(),
            ..EmbeddableItem::default()
        };
        let html = render_embed(&channel, now());
        insta::assert_snapshot!(html, @r#"<div class="arena--block" data-class="channel"><a class="arena--block--link" href="https://www.are.na/channel/reference-shelf" target="_blank" rel="noopener" aria-label="Open on are.na"></a><div class="arena--block--inner" data-class="channel"><div class="arena--channel"><span class="arena--channel--title">Reference Shelf</span><span class="arena--channel--owner">Someone</span><span class="arena--channel--count">12 blocks</span><span class="arena--channel--updated">updated 3 days ago</span></div><a class="arena--block--button" href="" target="_blank" rel="noopener">Source</a></div></div>"#);
    }

    #[test]
    fn test_unknown_class_renders_empty_frame() {
        let html = render_embed(&item(ItemClass::Other("hologram".into())), now());
        assert!(html.contains(
            "<div class=\"arena--block--inner\" data-class=\"hologram\"><a class=\"arena--block--button\""
        ));
        assert!(html.contains("arena--block--caption"));
    }

    #[test]
    fn test_error_placeholder() {
        let target = RenderTarget::new();
        render_error(&target, "not-a-url", "Failed to load not-a-url on line 3");
        assert_eq!(
            target.children(),
            vec![
                "<div class=\"arena--error\"><span class=\"arena--error--link\">not-a-url</span><span class=\"arena--error--message\">Failed to load not-a-url on line 3</span></div>"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_error_placeholder_links_web_urls() {
        let target = RenderTarget::new();
        render_error(
            &target,
            "https://www.are.na/block/404",
            "Failed to load https://www.are.na/block/404: Not found (404), ",
        );
        let html = &target.children()[0];
        assert!(html.contains(
            "<a class=\"arena--error--link\" href=\"https://www.are.na/block/404\">https://www.are.na/block/404</a>"
        ));
    }

    #[test]
    fn test_error_placeholder_never_links_other_schemes() {
        let target = RenderTarget::new();
        for line in ["javascript:alert(1)", "JavaScript:alert(document.cookie)", "data:text/html,hi"] {
            render_error(&target, line, "Failed to load");
        }
        for html in target.children() {
            assert!(!html.contains("href"), "{html}");
            assert!(html.contains("<span class=\"arena--error--link\">"));
        }
    }

    #[test]
    fn test_relative_time() {
        let now = now();
        let cases = [
            ("2024-05-04T11:59:30Z", "just now"),
            ("2024-05-04T13:00:00Z", "just now"),
            ("2024-05-04T11:59:00Z", "1 minute ago"),
            ("2024-05-04T11:15:00Z", "45 minutes ago"),
            ("2024-05-04T09:00:00+00:00", "3 hours ago"),
            ("2024-05-03T12:00:00.000Z", "1 day ago"),
            ("2024-03-01T12:00:00Z", "2 months ago"),
            ("2021-05-01T12:00:00Z", "3 years ago"),
            ("yesterday", ""),
            ("", ""),
        ];
        for (timestamp, expected) in cases {
            assert_eq!(format_relative_time(timestamp, now), expected, "{timestamp}");
        }
    }
}
