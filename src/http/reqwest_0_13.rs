use super::{HttpClient, HttpResponse, TransportOptions};

use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};

impl HttpClient for reqwest::Client {
    /// The response type is `reqwest::Response`.
    type Response = reqwest::Response;
    /// The error type is `reqwest::Error`.
    type Error = reqwest::Error;

    /// Executes an `http::Request` using the `reqwest::Client`.
    ///
    /// Redirects are handled by the policy the `reqwest::Client` was built
    /// with. A per-request redirect policy in [`TransportOptions`] is not
    /// applied, and a warning is logged when one is set.
    async fn execute(&self, request: Request<Bytes>) -> Result<Self::Response, Self::Error> {
        let (parts, body) = request.into_parts();
        if let Some(options) = parts.extensions.get::<TransportOptions>()
            && options.customizes_redirects()
        {
            tracing::warn!(
                redirect = ?options.redirect,
                follow = options.follow,
                "ignoring per-request redirect policy; reqwest applies its client-level policy"
            );
        }

        let mut builder = self
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        reqwest::Client::execute(self, builder.build()?).await
    }
}

impl HttpResponse for reqwest::Response {
    type Error = reqwest::Error;

    /// Returns the HTTP status code of the `reqwest::Response`.
    fn status(&self) -> StatusCode {
        self.status()
    }

    /// Returns the `reqwest::Response`'s headers.
    fn headers(&self) -> HeaderMap {
        self.headers().clone()
    }

    /// Returns the URL after any redirects `reqwest` followed.
    fn final_url(&self) -> Option<String> {
        Some(self.url().to_string())
    }

    /// Consumes the `reqwest::Response` and asynchronously returns its body as `bytes::Bytes`.
    async fn body(self) -> Result<Bytes, Self::Error> {
        self.bytes().await
    }
}

impl crate::Error for reqwest::Error {
    fn is_retryable(&self) -> bool {
        self.is_connect() || self.is_timeout()
    }
}
