use std::path::{Path, PathBuf};

/// Errors reading or writing the persisted record file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(
        "File not found: {}\nHint: run `autoshift scrape` first to generate it,\nor pass the correct file path with --file <PATH>.",
        .path.display()
    )]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unexpected shiftcodes file format in {}: {source}", .path.display())]
    Shape {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        let path = path.to_path_buf();
        match source.classify() {
            serde_json::error::Category::Data => Self::Shape { path, source },
            _ => Self::Json { path, source },
        }
    }
}

/// Errors writing the record file to the remote repository.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not serialize the record file: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(
        "GitHub upload failed: auth/permission error (HTTP {status}): {message}\n\
         - If using a fine-grained PAT: grant 'Contents: Read and write' and include this repository.\n\
         - If using a classic PAT: ensure the 'repo' scope is enabled.\n\
         - For org repos: make sure SSO/approval is completed for the token."
    )]
    Permission { status: u16, message: String },

    #[error("GitHub API error (HTTP {status}) during {operation}: {message}")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },
}
