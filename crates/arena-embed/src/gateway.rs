//! HTTP access to the are.na v2 API

use crate::error::ApiFailure;
use reqwest::StatusCode;
use serde_json::Value;
use std::future::Future;
use url::Url;

pub const API_BASE: &str = "https://api.are.na";

/// Fetches raw JSON for a classified endpoint.
///
/// Implementations make a single attempt; failures come back as [`ApiFailure`].
pub trait ArenaGateway {
    /// `endpoint` is an API path such as `/v2/blocks/123`.
    /// An empty `token` means an unauthenticated request.
    fn fetch(
        &self,
        endpoint: &str,
        token: &str,
    ) -> impl Future<Output = Result<Value, ApiFailure>>;
}

/// [`ArenaGateway`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
}

impl HttpGateway {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base: Url::parse(API_BASE).expect("API base URL is valid"),
        }
    }

    /// Point at a different API host (a mirror, or a local server in tests).
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base = base;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaGateway for HttpGateway {
    #[tracing::instrument(level = "debug", skip(self, token), fields(base = %self.base))]
    async fn fetch(&self, endpoint: &str, token: &str) -> Result<Value, ApiFailure> {
        let url = self.base.join(endpoint).map_err(|e| {
            tracing::warn!(error = %e, endpoint, "could not build request URL");
            ApiFailure::Network
        })?;

        // The header goes out even with an empty token
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token.trim()),
            )
            .send()
            .await
            .map_err(network_failure)?;

        let status = response.status();
        if status == StatusCode::OK {
            return response.json::<Value>().await.map_err(|err| {
                if err.is_decode() {
                    tracing::warn!(error = %err, "are.na returned a body that is not JSON");
                    ApiFailure::UnexpectedResponse
                } else {
                    network_failure(err)
                }
            });
        }

        let body = response.text().await.unwrap_or_default();
        let failure = api_failure(status, &body);
        tracing::debug!(status = status.as_u16(), %failure, "are.na returned an error");
        Err(failure)
    }
}

fn network_failure(err: reqwest::Error) -> ApiFailure {
    tracing::warn!(error = %err, "are.na request failed");
    ApiFailure::Network
}

/// Build an API failure from a non-200 response.
///
/// are.na error bodies look like `{"message": .., "code": .., "description": ..}`;
/// anything missing falls back to the HTTP status.
pub(crate) fn api_failure(status: StatusCode, body: &str) -> ApiFailure {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let field = |name: &str| match json.get(name) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    ApiFailure::Api {
        status: status.as_u16(),
        message: field("message")
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_owned()),
        code: field("code").unwrap_or_else(|| status.as_u16().to_string()),
        description: field("description").unwrap_or_default(),
    }
}
