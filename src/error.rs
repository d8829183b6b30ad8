//! Error types shared across the client, the paginator and the downloader.
//!
//! Every pipeline operation returns one of these through a `Result`. Nothing
//! in the library panics or exits; only the CLI layer decides whether an
//! error terminates the process.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single HTTP round trip.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("connection error requesting {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request url {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else {
            ApiError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Status code reported by the server, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A paginated fetch aborted part-way.
///
/// The items gathered before the failing page are handed back so the caller
/// can decide whether they are usable; they are never reported as success.
#[derive(Debug, Error)]
#[error("page request at offset {offset} failed after {} items: {source}", .collected.len())]
pub struct PaginationError<T> {
    pub collected: Vec<T>,
    pub offset: usize,
    #[source]
    pub source: ApiError,
}

/// Failure while downloading the assets of one track.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Http(#[from] ApiError),

    #[error("unsupported content type {content_type:?} for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("no content type returned for {url}")]
    MissingContentType { url: String },

    #[error("filesystem error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker for track {track_id} stopped: {reason}")]
    Worker { track_id: String, reason: String },
}

impl DownloadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed line {line} in {}", .path.display())]
    Parse { path: PathBuf, line: usize },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}
