//! Errors raised by chat model transports.
//!
//! ```rust
//! use wprovider::{ProviderError, ProviderErrorKind};
//!
//! let throttled = ProviderError::from_status(429, "slow down");
//! assert_eq!(throttled.kind, ProviderErrorKind::RateLimited);
//! assert!(throttled.retryable);
//!
//! let unsupported = ProviderError::unsupported("no structured output");
//! assert!(!unsupported.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    InvalidRequest,
    Unsupported,
    Authentication,
    RateLimited,
    Timeout,
    Transport,
    StreamAborted,
    Unavailable,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unsupported, message, false)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn stream_aborted(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::StreamAborted, message, false)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Classifies a non-2xx HTTP status reported by a transport.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let error = match status {
            401 | 403 => Self::authentication(message),
            408 => Self::timeout(message),
            429 => Self::rate_limited(message),
            400..=499 => Self::invalid_request(message),
            500..=599 => Self::unavailable(message),
            _ => Self::other(message),
        };

        error.with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} (status {}): {}", self.kind, status, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}
