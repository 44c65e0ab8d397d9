//! are.na embeds
//!
//! Renders blocks, channels and random picks from [are.na](https://www.are.na)
//! as HTML, from the body of an `arena` fenced code block:
//!
//! ```text
//! https://www.are.na/block/123456
//! https://www.are.na/some-user/some-channel
//! random:personal
//! ```
//!
//! Each line goes through the same pipeline:
//! [`classify_line`] → [`ArenaGateway::fetch`] → [`normalize_response`] → [`render_embed`].
//! [`EmbedProcessor`] runs all lines of a block concurrently and writes the
//! results, or inline errors, into a [`RenderTarget`].

pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod process;
pub mod render;
pub mod target;
pub mod templates;
pub mod types;

pub use classify::{ApiRequest, RequestClass, classify_line};
pub use config::{FileStore, Loader, Saver, Settings};
pub use error::{ApiFailure, ConfigError, ErrorKind, LineError};
pub use gateway::{ArenaGateway, HttpGateway};
pub use normalize::normalize_response;
pub use process::{EmbedProcessor, Notifier, TracingNotifier};
pub use render::{EmbedLayout, layout_for, render_embed, render_error, render_item};
pub use target::{RenderStatus, RenderTarget};
pub use templates::Template;
pub use types::{EmbeddableItem, ItemClass};
