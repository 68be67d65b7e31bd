// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for group lookups and peer fetches.

use std::fmt::{self, Display};

use recoverable::{Recovery, RecoveryInfo};

/// Boxed error produced by loaders and passed through as the cause of [`ErrorKind::Source`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error from a group lookup, a peer fetch or group setup.
///
/// The [`kind`](Error::kind) tells what failed. The underlying cause, such as the loader's own
/// error or the transport failure, is available through [`std::error::Error::source`] and is
/// included in the display output.
///
/// # Examples
///
/// ```
/// use shoal::{Error, ErrorKind};
///
/// let error = Error::peer_protocol("server returned: 404 Not Found");
/// assert_eq!(error.kind(), ErrorKind::PeerProtocol);
/// assert!(error.to_string().contains("404 Not Found"));
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

/// Classifies an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An empty key was supplied.
    InvalidKey,
    /// The group's loader failed; its error is the cause.
    Source,
    /// A peer could not be reached or its response could not be read.
    PeerTransport,
    /// A peer answered with a non-success status.
    PeerProtocol,
    /// A peer request named a namespace with no registered group.
    UnknownNamespace,
    /// A group or its peers were configured incorrectly.
    Misconfiguration,
}

impl ErrorKind {
    /// Returns a stable, human-readable description of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidKey => "key is required",
            Self::Source => "loading from source failed",
            Self::PeerTransport => "peer could not be reached",
            Self::PeerProtocol => "peer rejected the request",
            Self::UnknownNamespace => "no such group",
            Self::Misconfiguration => "group is misconfigured",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Returns what kind of failure this is.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the description and its causes on one line, such as
    /// `"loading from source failed: Tom not exist"`.
    ///
    /// Unlike the display output, the reason never includes a captured backtrace, which makes it
    /// suitable for sending to remote callers.
    #[must_use]
    pub fn reason(&self) -> String {
        single_line(&self.to_string())
    }

    /// Creates an error for a peer that could not be reached or whose response was unreadable.
    pub fn peer_transport(cause: impl Into<BoxError>) -> Self {
        Self::caused_by(ErrorKind::PeerTransport, cause)
    }

    /// Creates an error for a peer that answered with a non-success status.
    pub fn peer_protocol(cause: impl Into<BoxError>) -> Self {
        Self::caused_by(ErrorKind::PeerProtocol, cause)
    }

    /// Creates an error for a request naming a namespace with no registered group.
    pub fn unknown_namespace(namespace: &str) -> Self {
        Self::caused_by(ErrorKind::UnknownNamespace, format!("no such group: {namespace}"))
    }

    pub(crate) fn invalid_key() -> Self {
        Self::new(ErrorKind::InvalidKey)
    }

    pub(crate) fn source_failed(cause: BoxError) -> Self {
        Self::caused_by(ErrorKind::Source, cause)
    }

    pub(crate) fn misconfigured(reason: impl Into<BoxError>) -> Self {
        Self::caused_by(ErrorKind::Misconfiguration, reason)
    }
}

impl Recovery for Error {
    fn recovery(&self) -> RecoveryInfo {
        match self.kind {
            ErrorKind::PeerTransport => RecoveryInfo::retry(),
            ErrorKind::PeerProtocol => RecoveryInfo::unavailable(),
            ErrorKind::Source => RecoveryInfo::unknown(),
            ErrorKind::InvalidKey | ErrorKind::UnknownNamespace | ErrorKind::Misconfiguration => RecoveryInfo::never(),
        }
    }
}

/// Joins the message lines preceding the first blank line, which separates them from a
/// backtrace.
fn single_line(display: &str) -> String {
    display
        .lines()
        .take_while(|line| !line.trim().is_empty())
        .map(|line| line.strip_prefix("caused by:").map_or(line, str::trim_start))
        .collect::<Vec<_>>()
        .join(": ")
}

/// A specialized [`Result`] type for group operations.
pub type Result<T> = std::result::Result<T, Error>;
