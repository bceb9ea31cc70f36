/// Errors from the HTTP fetch layer.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Network failures, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_redirect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Errors that stop a single source from being processed.
///
/// None of these abort a scrape run; the pipeline logs them and moves on to
/// the next source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Fetching {source_id} failed: {error}")]
    Fetch {
        source_id: String,
        #[source]
        error: FetchError,
    },

    /// The page no longer has the structure the configuration describes.
    #[error("Page layout of '{source_id}' no longer matches its configuration: {message}")]
    Format { source_id: String, message: String },

    #[error("Invalid configuration for '{source_id}': {message}")]
    Config { source_id: String, message: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("YAML parse error in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yml::Error,
    },

    #[error("Directory not found: {0}")]
    DirNotFound(String),
}

impl SourceError {
    pub fn format(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn config(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn fetch(source_id: impl Into<String>, error: FetchError) -> Self {
        Self::Fetch {
            source_id: source_id.into(),
            error,
        }
    }

    /// Upstream drift that needs a configuration update.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}
