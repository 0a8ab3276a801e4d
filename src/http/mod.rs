//! HTTP transport abstractions.
//!
//! This module defines traits that decouple the library from any specific HTTP
//! implementation. Users provide their own [`HttpClient`] (e.g. backed by
//! `reqwest`, `hyper`, or a WASM-compatible client) and every
//! [`Fetch`](crate::Fetch) instance sends its requests through it.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(all(not(target_arch = "wasm32"), feature = "http-client-reqwest-0_13"))]
mod reqwest_0_13;

use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};

use crate::{
    options::{Credentials, DEFAULT_FOLLOW, Redirect},
    platform::{MaybeSend, MaybeSendSync},
};

/// Transport-level options carried in the extensions of every request.
///
/// Transports apply what they support; the rest is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// What to do when a redirect is received.
    pub redirect: Redirect,
    /// The maximum number of redirects to follow.
    pub follow: u32,
    /// Cross-origin credentials mode.
    pub credentials: Credentials,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            redirect: Redirect::default(),
            follow: DEFAULT_FOLLOW,
            credentials: Credentials::default(),
        }
    }
}

impl TransportOptions {
    /// Returns `true` if the redirect policy differs from following up to
    /// [`DEFAULT_FOLLOW`](crate::DEFAULT_FOLLOW) redirects.
    #[must_use]
    pub fn customizes_redirects(&self) -> bool {
        self.redirect != Redirect::Follow || self.follow != DEFAULT_FOLLOW
    }
}

/// Defines the common interface for HTTP requests.
pub trait HttpClient: MaybeSendSync {
    /// The error type returned by the client for a failed request.
    type Error: crate::Error;

    /// The associated response type returned by this HTTP client.
    type Response: HttpResponse;

    /// Executes an HTTP request and returns an owned response.
    ///
    /// # Arguments
    ///
    /// * `request`: The `http::Request` to be executed. The body is provided as
    ///   `bytes::Bytes`, and a [`TransportOptions`] is present in its extensions.
    ///
    /// # Returns
    ///
    /// A `Future` that resolves to a `Result` containing the `Self::Response` on success,
    /// or `Self::Error` on failure.
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + MaybeSend;
}

/// Defines the common interface for HTTP responses.
pub trait HttpResponse: MaybeSendSync {
    /// The error type when getting the response body.
    type Error: crate::Error;

    /// Returns the HTTP status code of the response.
    fn status(&self) -> StatusCode;

    /// Returns the response's HTTP headers.
    fn headers(&self) -> HeaderMap;

    /// Returns the URL the response was ultimately served from, if the
    /// transport followed redirects and knows it.
    fn final_url(&self) -> Option<String> {
        None
    }

    /// Consumes the response and asynchronously returns its body as `bytes::Bytes`.
    ///
    /// # Returns
    ///
    /// A `Future` that resolves to a `Result` containing the response body on success,
    /// or an error if reading the body fails.
    fn body(self) -> impl Future<Output = Result<Bytes, Self::Error>> + MaybeSend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customized_redirects() {
        assert!(!TransportOptions::default().customizes_redirects());

        let credentials_only = TransportOptions {
            credentials: Credentials::Include,
            ..TransportOptions::default()
        };
        assert!(!credentials_only.customizes_redirects());

        let manual = TransportOptions {
            redirect: Redirect::Manual,
            ..TransportOptions::default()
        };
        assert!(manual.customizes_redirects());

        let limited = TransportOptions {
            follow: 2,
            ..TransportOptions::default()
        };
        assert!(limited.customizes_redirects());
    }
}
