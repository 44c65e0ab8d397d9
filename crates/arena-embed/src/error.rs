use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Failure from a single are.na API request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ApiFailure {
    /// The API answered with a non-200 status and (usually) a JSON error body
    #[error("{message} ({code}), {description}")]
    #[diagnostic(code(arena::gateway::api))]
    Api {
        status: u16,
        message: String,
        code: String,
        description: String,
    },

    /// The request never produced a response.
    /// Underlying transport errors are logged, not carried.
    #[error("Network error.")]
    #[diagnostic(
        code(arena::gateway::network),
        help("check your connection to api.are.na")
    )]
    Network,

    /// A 200 whose body isn't JSON, or isn't an object where one is expected
    #[error("Unexpected response from are.na.")]
    #[diagnostic(code(arena::gateway::unexpected_response))]
    UnexpectedResponse,
}

impl ApiFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiFailure::Api { .. } | ApiFailure::UnexpectedResponse => ErrorKind::Api,
            ApiFailure::Network => ErrorKind::Network,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    Api,
    Network,
}

/// Why one line of an `arena` block failed to render
#[derive(Debug, Error, Diagnostic)]
pub enum LineError {
    #[error("Failed to load {line} on line {number}")]
    #[diagnostic(
        code(arena::line::malformed_input),
        help("expected an are.na block or channel URL, or random:personal")
    )]
    MalformedInput { line: String, number: usize },

    #[error("Failed to load {line}: {source}")]
    #[diagnostic(code(arena::line::fetch))]
    Fetch {
        line: String,
        #[source]
        source: ApiFailure,
    },
}

impl LineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LineError::MalformedInput { .. } => ErrorKind::MalformedInput,
            LineError::Fetch { source, .. } => source.kind(),
        }
    }

    /// The source line that failed
    pub fn line(&self) -> &str {
        match self {
            LineError::MalformedInput { line, .. } | LineError::Fetch { line, .. } => line,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("io error: {0}")]
    #[diagnostic(code(arena::config::io))]
    Io(#[from] std::io::Error),

    #[error("invalid TOML settings: {0}")]
    #[diagnostic(code(arena::config::toml))]
    TomlDe(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    #[diagnostic(code(arena::config::toml))]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid JSON settings: {0}")]
    #[diagnostic(code(arena::config::json))]
    Json(#[from] serde_json::Error),

    #[error("unsupported settings file format: {}", path.display())]
    #[diagnostic(
        code(arena::config::format),
        help("use a .toml or .json settings file")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("unknown setting: {0}")]
    #[diagnostic(
        code(arena::config::unknown_key),
        help(
            "known settings: arena_access_token, notification_header, enable_channel_block, length_max, user_slug"
        )
    )]
    UnknownKey(String),

    #[error("invalid value for {key}: {value}")]
    #[diagnostic(code(arena::config::invalid_value))]
    InvalidValue { key: String, value: String },
}
