//! Runs the classify → fetch → normalize → render pipeline over a whole `arena` block.

use crate::{
    classify::classify_line,
    config::Settings,
    error::LineError,
    gateway::ArenaGateway,
    normalize::normalize_response,
    render::{render_error, render_item},
    target::{RenderStatus, RenderTarget},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Transient, user-facing notifications from the host (toasts, notices, ...)
pub trait Notifier {
    fn notify(&self, title: &str, message: &str);
}

impl Notifier for () {
    fn notify(&self, _title: &str, _message: &str) {}
}

/// Reports notifications as `warn` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::warn!(title, "{message}");
    }
}

/// Renders `arena` code blocks into [`RenderTarget`]s.
///
/// Settings are a snapshot taken at construction; build a new processor to
/// pick up changes.
pub struct EmbedProcessor<G, N = TracingNotifier> {
    gateway: G,
    settings: Arc<Settings>,
    notifier: N,
    // Fixed clock for relative times, mostly for tests
    now: Option<DateTime<Utc>>,
}

impl<G: ArenaGateway> EmbedProcessor<G> {
    pub fn new(gateway: G, settings: Arc<Settings>) -> Self {
        Self {
            gateway,
            settings,
            notifier: TracingNotifier,
            now: None,
        }
    }
}

impl<G, N> EmbedProcessor<G, N> {
    pub fn with_notifier<M: Notifier>(self, notifier: M) -> EmbedProcessor<G, M> {
        EmbedProcessor {
            gateway: self.gateway,
            settings: self.settings,
            notifier,
            now: self.now,
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

impl<G: ArenaGateway, N: Notifier> EmbedProcessor<G, N> {
    /// Render every line of `source` into `target`.
    ///
    /// Lines run concurrently and their output may interleave. The final
    /// status is set once all of them are done: `Error` if any line failed,
    /// `Ready` otherwise.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn process(&self, source: &str, target: &RenderTarget) -> RenderStatus {
        target.begin();

        let lines = source_lines(source);
        tracing::debug!(lines = lines.len(), "processing arena block");

        let results = n0_future::join_all(
            lines
                .into_iter()
                .map(|(number, line)| self.process_line(number, line, target)),
        )
        .await;

        let status = if results.iter().any(Result::is_err) {
            RenderStatus::Error
        } else {
            RenderStatus::Ready
        };
        target.set_status(status);
        status
    }

    /// Errors are rendered inline and reported here; the result is for the caller's tally.
    async fn process_line(
        &self,
        number: usize,
        line: &str,
        target: &RenderTarget,
    ) -> Result<usize, LineError> {
        let result = self.load_line(number, line, target).await;
        match &result {
            Ok(count) => tracing::debug!(number, line, count, "rendered line"),
            Err(err) => {
                let message = err.to_string();
                tracing::debug!(number, line, kind = ?err.kind(), "line failed");
                render_error(target, err.line(), &message);
                self.notifier
                    .notify(&self.settings.notification_header, &message);
            }
        }
        result
    }

    async fn load_line(
        &self,
        number: usize,
        line: &str,
        target: &RenderTarget,
    ) -> Result<usize, LineError> {
        let request = classify_line(line, &self.settings.user_slug);
        let Some(endpoint) = request.endpoint.as_deref() else {
            return Err(LineError::MalformedInput {
                line: request.line,
                number,
            });
        };

        let response = self
            .gateway
            .fetch(endpoint, &self.settings.arena_access_token)
            .await
            .map_err(|source| LineError::Fetch {
                line: request.line.clone(),
                source,
            })?;

        let items =
            normalize_response(request.class, &response, &self.settings).map_err(|source| {
                LineError::Fetch {
                    line: request.line.clone(),
                    source,
                }
            })?;
        let now = self.now();
        for item in &items {
            render_item(target, item, now);
        }
        Ok(items.len())
    }
}

/// Non-blank lines with their 1-based position in the block
fn source_lines(source: &str) -> Vec<(usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiFailure;
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Gateway serving canned responses by endpoint
    #[derive(Default)]
    struct FakeGateway {
        responses: HashMap<String, Result<Value, ApiFailure>>,
        requests: RefCell<Vec<(String, String)>>,
    }

    impl FakeGateway {
        fn with(mut self, endpoint: &str, response: Result<Value, ApiFailure>) -> Self {
            self.responses.insert(endpoint.to_string(), response);
            self
        }
    }

    impl ArenaGateway for FakeGateway {
        async fn fetch(&self, endpoint: &str, token: &str) -> Result<Value, ApiFailure> {
            self.requests
                .borrow_mut()
                .push((endpoint.to_string(), token.to_string()));
            self.responses
                .get(endpoint)
                .cloned()
                .unwrap_or(Err(ApiFailure::Network))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(RefCell<Vec<(String, String)>>);

    impl Notifier for &RecordingNotifier {
        fn notify(&self, title: &str, message: &str) {
            self.0.borrow_mut().push((title.to_string(), message.to_string()));
        }
    }

    fn block(id: u64, class: &str) -> Value {
        json!({ "id": id, "title": format!("Block {id}"), "class": class, "base_class": "Block" })
    }

    fn settings() -> Arc<Settings> {
        Arc::new(Settings {
            arena_access_token: "token".into(),
            user_slug: "someone".into(),
            length_max: "2".into(),
            ..Settings::default()
        })
    }

    #[test]
    fn test_source_lines_skip_blanks_and_keep_numbers() {
        let lines = source_lines("\n  are.na/block/1  \n\n\t\nrandom:personal\n");
        assert_eq!(lines, vec![(2, "are.na/block/1"), (5, "random:personal")]);
    }

    #[tokio::test]
    async fn test_successful_block() {
        let gateway = FakeGateway::default().with("/v2/blocks/1", Ok(block(1, "Image")));
        let processor = EmbedProcessor::new(gateway, settings()).with_notifier(());
        let target = RenderTarget::new();

        let status = processor.process("https://www.are.na/block/1", &target).await;

        assert_eq!(status, RenderStatus::Ready);
        assert_eq!(target.status(), RenderStatus::Ready);
        assert_eq!(target.children().len(), 1);
        assert!(target.children()[0].contains("Block 1"));
        assert_eq!(
            processor.gateway.requests.borrow().as_slice(),
            [("/v2/blocks/1".to_string(), "token".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unknown_line_renders_error_with_line_number() {
        let notifier = RecordingNotifier::default();
        let gateway = FakeGateway::default().with("/v2/blocks/1", Ok(block(1, "Image")));
        let processor = EmbedProcessor::new(gateway, settings()).with_notifier(&notifier);
        let target = RenderTarget::new();

        let status = processor
            .process("are.na/block/1\n\nnot-a-url", &target)
            .await;

        assert_eq!(status, RenderStatus::Error);
        let children = target.children();
        assert_eq!(children.len(), 2);
        assert!(
            children
                .iter()
                .any(|c| c.contains("Failed to load not-a-url on line 3"))
        );
        assert_eq!(
            notifier.0.borrow().as_slice(),
            [(
                "Are.na".to_string(),
                "Failed to load not-a-url on line 3".to_string()
            )]
        );
        // the bad line never reaches the gateway
        assert_eq!(processor.gateway.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_api_error_is_rendered_inline() {
        let failure = ApiFailure::Api {
            status: 404,
            message: "Not found".into(),
            code: "404".into(),
            description: "no such block".into(),
        };
        let gateway = FakeGateway::default().with("/v2/blocks/404", Err(failure));
        let processor = EmbedProcessor::new(gateway, settings()).with_notifier(());
        let target = RenderTarget::new();

        let status = processor.process("are.na/block/404", &target).await;

        assert_eq!(status, RenderStatus::Error);
        let children = target.children();
        assert_eq!(children.len(), 1);
        assert!(children[0].contains("arena--error--message"));
        assert!(children[0].contains("Not found"));
        assert!(children[0].contains("no such block"));
    }

    #[tokio::test]
    async fn test_network_error_is_generic() {
        let processor = EmbedProcessor::new(FakeGateway::default(), settings()).with_notifier(());
        let target = RenderTarget::new();

        processor.process("are.na/channel/anything", &target).await;

        assert_eq!(target.status(), RenderStatus::Error);
        assert!(
            target.children()[0]
                .contains("Failed to load are.na/channel/anything: Network error.")
        );
    }

    #[tokio::test]
    async fn test_random_anyone_is_unsupported() {
        let processor = EmbedProcessor::new(FakeGateway::default(), settings()).with_notifier(());
        let target = RenderTarget::new();

        let status = processor.process("random:anyone", &target).await;

        assert_eq!(status, RenderStatus::Error);
        assert!(target.children()[0].contains("on line 1"));
        assert!(processor.gateway.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_cap_applies_per_line() {
        let search = json!({ "blocks": [block(1, "Image"), block(2, "Image"), block(3, "Image")] });
        let gateway = FakeGateway::default()
            .with(
                "/v2/users/someone/search?sort=random&subject=Block&filter[type]=image",
                Ok(search),
            )
            .with("/v2/blocks/9", Ok(block(9, "Text")));
        let processor = EmbedProcessor::new(gateway, settings()).with_notifier(());
        let target = RenderTarget::new();

        let status = processor
            .process("random:personal\nare.na/block/9", &target)
            .await;

        assert_eq!(status, RenderStatus::Ready);
        let children = target.children();
        assert_eq!(children.len(), 3);
        // order within a line is preserved
        let first = children.iter().position(|c| c.contains("Block 1")).unwrap();
        let second = children.iter().position(|c| c.contains("Block 2")).unwrap();
        assert!(first < second);
        assert!(!children.iter().any(|c| c.contains("Block 3")));
    }

    #[tokio::test]
    async fn test_empty_source_is_ready() {
        let processor = EmbedProcessor::new(FakeGateway::default(), settings()).with_notifier(());
        let target = RenderTarget::new();

        let status = processor.process("\n   \n", &target).await;

        assert_eq!(status, RenderStatus::Ready);
        assert!(target.children().is_empty());
        assert!(!target.is_loading());
    }

    #[tokio::test]
    async fn test_null_body_renders_error() {
        let gateway = FakeGateway::default().with("/v2/blocks/1", Ok(Value::Null));
        let processor = EmbedProcessor::new(gateway, settings()).with_notifier(());
        let target = RenderTarget::new();

        let status = processor.process("are.na/block/1", &target).await;

        assert_eq!(status, RenderStatus::Error);
        let children = target.children();
        assert_eq!(children.len(), 1);
        assert!(children[0].contains(
            "Failed to load are.na/block/1: Unexpected response from are.na."
        ));
    }

    #[tokio::test]
    async fn test_wrong_typed_fields_still_render() {
        let body = json!({
            "id": 1,
            "title": 42,
            "class": "Image",
            "base_class": "Block",
            "length": "five"
        });
        let gateway = FakeGateway::default().with("/v2/blocks/1", Ok(body));
        let processor = EmbedProcessor::new(gateway, settings()).with_notifier(());
        let target = RenderTarget::new();

        let status = processor.process("are.na/block/1", &target).await;

        assert_eq!(status, RenderStatus::Ready);
        let children = target.children();
        assert_eq!(children.len(), 1);
        assert!(children[0].contains("data-class=\"image\""));
        assert!(children[0].contains("href=\"https://www.are.na/block/1\""));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_line_warns_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let processor = EmbedProcessor::new(FakeGateway::default(), settings());
        let target = RenderTarget::new();
        processor.process("not-a-url", &target).await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<_> = output.lines().filter(|l| l.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "{output}");
        assert!(warnings[0].contains("Failed to load not-a-url on line 1"));
    }

    #[tokio::test]
    async fn test_detached_target_is_left_alone() {
        let gateway = FakeGateway::default().with("/v2/blocks/1", Ok(block(1, "Image")));
        let processor = EmbedProcessor::new(gateway, settings()).with_notifier(());
        let target = RenderTarget::new();
        target.detach();

        processor.process("are.na/block/1", &target).await;

        assert!(target.children().is_empty());
        assert_eq!(target.status(), RenderStatus::Busy);
    }
}
