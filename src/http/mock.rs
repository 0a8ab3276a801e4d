//! An in-memory transport that replays scripted responses.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use snafu::Snafu;
use tokio::sync::Notify;

use super::{HttpClient, HttpResponse};

#[derive(Debug, Snafu)]
#[snafu(display("mock transport error: {message}"))]
pub(crate) struct MockError {
    pub message: String,
}

impl crate::Error for MockError {
    fn is_retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub final_url: Option<String>,
    pub body_error: bool,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            final_url: None,
            body_error: false,
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn json(self, body: &str) -> Self {
        self.header("content-type", "application/json")
            .body(body.to_owned())
    }

    pub fn final_url(mut self, url: &str) -> Self {
        self.final_url = Some(url.to_owned());
        self
    }

    pub fn failing_body(mut self) -> Self {
        self.body_error = true;
        self
    }
}

impl HttpResponse for MockResponse {
    type Error = MockError;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn final_url(&self) -> Option<String> {
        self.final_url.clone()
    }

    async fn body(self) -> Result<Bytes, Self::Error> {
        if self.body_error {
            return Err(MockError {
                message: "body stream broke".to_owned(),
            });
        }
        Ok(self.body)
    }
}

/// Replays scripted outcomes in order and records every request it receives.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockClient {
    outcomes: Arc<Mutex<VecDeque<Result<MockResponse, String>>>>,
    requests: Arc<Mutex<Vec<Request<Bytes>>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: MockResponse) -> Self {
        self.outcomes.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(message.to_owned()));
        self
    }

    pub fn requests(&self) -> std::sync::MutexGuard<'_, Vec<Request<Bytes>>> {
        self.requests.lock().unwrap()
    }
}

impl HttpClient for MockClient {
    type Error = MockError;
    type Response = MockResponse;

    async fn execute(&self, request: Request<Bytes>) -> Result<Self::Response, Self::Error> {
        self.requests.lock().unwrap().push(request);
        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(MockError { message }),
            None => Err(MockError {
                message: "no scripted response".to_owned(),
            }),
        }
    }
}

/// A transport whose requests never complete.
///
/// `started` is notified once a request has reached the transport.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingClient {
    pub started: Arc<Notify>,
}

impl HttpClient for PendingClient {
    type Error = MockError;
    type Response = MockResponse;

    async fn execute(&self, _request: Request<Bytes>) -> Result<Self::Response, Self::Error> {
        self.started.notify_one();
        std::future::pending().await
    }
}
