//! Error types and the [`Error`] trait.
//!
//! Transport errors implement the [`Error`] trait, which extends
//! [`std::error::Error`] with retry semantics. [`BoxedError`] provides
//! type-erased handling of them while preserving retryability.
//!
//! [`FetchError`] is what a request through a [`Fetch`](crate::Fetch)
//! instance fails with. Callers branch on [`FetchError::kind`] to tell
//! HTTP-status failures apart from transport and decoding failures.

use std::{convert::Infallible, fmt};

use http::{StatusCode, header::InvalidHeaderValue};
use snafu::{AsErrorSource, Snafu};

use crate::{hooks::HookStage, platform::MaybeSendSync, response::FetchResponse};

/// Errors raised by collaborators such as the transport.
pub trait Error: std::error::Error + AsErrorSource + MaybeSendSync + 'static {
    /// If true, this indicates that a failed request may succeed if retried.
    fn is_retryable(&self) -> bool;
}

impl Error for Infallible {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// A boxed error that can be used without type parameters.
#[derive(Debug, Snafu)]
#[snafu(transparent)]
pub struct BoxedError {
    source: Box<dyn Error>,
}

impl BoxedError {
    /// Create a new boxed error from a generic `Error`.
    pub fn from_err<E: Error + 'static>(err: E) -> Self {
        Self {
            source: Box::new(err),
        }
    }
}

impl Error for BoxedError {
    fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// The error type returned by user-supplied hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The broad category of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server answered with a non-2xx status.
    InvalidStatus,
    /// The response could not be consumed: body read or decode failure, or a
    /// failing after-response hook.
    ResponseError,
    /// The request never produced a response: transport failure, abort or an
    /// unusable URL.
    RequestError,
    /// The options could not be turned into a request: body serialization,
    /// invalid header values, or a failing before-request hook.
    OptionsError,
}

impl ErrorKind {
    /// Returns the kebab-case name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidStatus => "invalid-status",
            Self::ResponseError => "response-error",
            Self::RequestError => "request-error",
            Self::OptionsError => "options-error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when making a request.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError {
    /// The response status was not a success status.
    #[snafu(display("HTTP {}", status.canonical_reason().unwrap_or("Error")))]
    InvalidStatus {
        /// The status code of the response.
        status: StatusCode,
        /// The partially consumed response.
        response: Box<FetchResponse>,
    },
    /// The response body could not be read from the transport.
    #[snafu(display("Failed to read response body"))]
    BodyRead {
        /// The underlying transport error.
        source: BoxedError,
        /// The response, without a body.
        response: Box<FetchResponse>,
    },
    /// The response body could not be decoded as JSON.
    #[snafu(display("Failed to decode response body as JSON"))]
    Decode {
        /// The underlying error.
        source: serde_json::Error,
        /// The response, carrying the raw body.
        response: Box<FetchResponse>,
    },
    /// A hook failed.
    #[snafu(display("{stage} hook failed"))]
    Hook {
        /// The stage the failing hook was registered for.
        stage: HookStage,
        /// The error returned by the hook.
        source: HookError,
        /// The response being processed, for response-time stages.
        response: Option<Box<FetchResponse>>,
    },
    /// The transport failed to produce a response.
    #[snafu(display("Failed to make HTTP request"))]
    Request {
        /// The underlying transport error.
        source: BoxedError,
    },
    /// The request was aborted through its signal.
    #[snafu(display("The request was aborted"))]
    Aborted,
    /// The composed URL could not be parsed.
    #[snafu(display("Invalid request URL: {url}"))]
    InvalidUrl {
        /// The URL after composition.
        url: String,
        /// The underlying parse error.
        source: url::ParseError,
    },
    /// The normalized URL is not a valid request target.
    #[snafu(display("Request URL is not a valid URI: {url}"))]
    InvalidUri {
        /// The URL after normalization.
        url: String,
        /// The underlying parse error.
        source: http::uri::InvalidUri,
    },
    /// The JSON body could not be serialized.
    #[snafu(display("Failed to serialize JSON body"))]
    SerializeJson {
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The form body could not be serialized.
    #[snafu(display("Failed to serialize form body"))]
    SerializeForm {
        /// The underlying error.
        source: serde_html_form::ser::Error,
    },
    /// A header value could not be constructed.
    #[snafu(display("Provided header value was invalid"))]
    BadHeader {
        /// The underlying error.
        source: InvalidHeaderValue,
    },
}

impl FetchError {
    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStatus { .. } => ErrorKind::InvalidStatus,
            Self::BodyRead { .. } | Self::Decode { .. } => ErrorKind::ResponseError,
            Self::Hook { stage, .. } => match stage {
                HookStage::BeforeRequest => ErrorKind::OptionsError,
                HookStage::RequestError => ErrorKind::RequestError,
                HookStage::AfterResponse | HookStage::ResponseError => ErrorKind::ResponseError,
            },
            Self::Request { .. }
            | Self::Aborted
            | Self::InvalidUrl { .. }
            | Self::InvalidUri { .. } => ErrorKind::RequestError,
            Self::SerializeJson { .. }
            | Self::SerializeForm { .. }
            | Self::BadHeader { .. } => ErrorKind::OptionsError,
        }
    }

    /// Returns the (partial) response attached to this error, if there is one.
    #[must_use]
    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            Self::InvalidStatus { response, .. }
            | Self::BodyRead { response, .. }
            | Self::Decode { response, .. } => Some(response),
            Self::Hook { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// Returns the HTTP status of the attached response, if there is one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|response| response.status)
    }
}

impl Error for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidStatus { status, .. } => status.is_server_error(),
            Self::Request { source } | Self::BodyRead { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
