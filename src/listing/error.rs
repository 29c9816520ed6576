//! Error types for the listing layer: single-attempt failures, the definitive
//! fetch failure, and listing-target configuration errors.

use std::fmt;
use thiserror::Error;

/// Network-level failure class of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Other => "request failed",
        })
    }
}

/// One attempt could not produce a response (connection, timeout, body read).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, e.to_string())
    }
}

/// Why a single fetch attempt failed. Every variant is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("malformed listing body: {reason}")]
    Malformed { reason: String },
}

/// Definitive failure after the retry budget is spent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Max retries exceeded ({attempts} attempts) fetching {url}: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

/// Listing target could not be built from the given subreddit or base URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("Invalid subreddit name '{name}': {reason}")]
    InvalidSubreddit { name: String, reason: String },

    #[error("Invalid base URL: {input}: {reason}")]
    InvalidBaseUrl { input: String, reason: String },
}
