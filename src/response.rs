//! Consuming transport responses into [`FetchResponse`] records.

use bytes::Bytes;
use http::{
    HeaderMap, StatusCode,
    header::{CONTENT_TYPE, SET_COOKIE},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::{
    error::{BoxedError, FetchError},
    hooks::{HookStage, Hooks},
    http::HttpResponse,
    options::{ResolvedOptions, ResponseType},
};

/// Statuses whose responses never carry a body.
const NULL_BODY_STATUSES: [u16; 4] = [101, 204, 205, 304];

/// Returns `true` if responses with this status never carry a body.
#[must_use]
pub fn is_null_body(status: StatusCode) -> bool {
    NULL_BODY_STATUSES.contains(&status.as_u16())
}

/// A decoded response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    /// No body, either by status or because it was not read.
    #[default]
    Null,
    /// A text body.
    Text(String),
    /// A parsed JSON body.
    Json(Value),
    /// Bytes tagged with their content type.
    Blob {
        /// The `Content-Type` of the response, if any.
        content_type: Option<String>,
        /// The body.
        data: Bytes,
    },
    /// Bytes, as requested with `buffer` or `array-buffer`.
    Buffer(Bytes),
    /// Bytes as received, without interpretation.
    Raw(Bytes),
}

impl ResponseBody {
    /// Returns `true` for [`ResponseBody::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the parsed JSON value, for JSON bodies.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text, for text bodies.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the raw bytes of byte-valued bodies.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Blob { data, .. } | Self::Buffer(data) | Self::Raw(data) => Some(data),
            _ => None,
        }
    }
}

/// The result of a request.
///
/// Returned to the caller on success, and attached to a [`FetchError`] on
/// failure.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// `true` if the status is in the 2xx range.
    pub ok: bool,
    /// The URL the response was served from.
    pub url: String,
    /// The response status.
    pub status: StatusCode,
    /// The canonical reason phrase of the status.
    pub status_text: String,
    /// The response headers.
    pub headers: HeaderMap,
    /// `true` if the transport followed at least one redirect.
    pub redirected: bool,
    /// The decoded body.
    pub body: ResponseBody,
    /// The options the request was sent with.
    pub options: ResolvedOptions,
}

impl FetchResponse {
    /// Deserializes the body.
    ///
    /// JSON bodies are converted directly; text and byte bodies are parsed as
    /// JSON first.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            ResponseBody::Json(value) => T::deserialize(value),
            ResponseBody::Text(text) => serde_json::from_str(text),
            ResponseBody::Blob { data, .. }
            | ResponseBody::Buffer(data)
            | ResponseBody::Raw(data) => serde_json::from_slice(data),
            ResponseBody::Null => T::deserialize(&Value::Null),
        }
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// Decodes `data` according to `response_type`.
fn decode_body(
    status: StatusCode,
    headers: &HeaderMap,
    response_type: ResponseType,
    data: Bytes,
) -> Result<ResponseBody, serde_json::Error> {
    if is_null_body(status) {
        return Ok(ResponseBody::Null);
    }

    let body = match response_type {
        ResponseType::Text => ResponseBody::Text(String::from_utf8_lossy(&data).into_owned()),
        ResponseType::Json => ResponseBody::Json(serde_json::from_slice(&data)?),
        ResponseType::Blob => ResponseBody::Blob {
            content_type: content_type(headers).map(str::to_owned),
            data,
        },
        ResponseType::Buffer | ResponseType::ArrayBuffer => ResponseBody::Buffer(data),
        ResponseType::Stream => ResponseBody::Raw(data),
        ResponseType::Auto => {
            let Some(mime) = content_type(headers) else {
                return Ok(ResponseBody::Raw(data));
            };
            let essence = mime.split(';').next().unwrap_or_default().trim();
            let (main_type, sub_type) = essence.split_once('/').unwrap_or((essence, ""));

            if main_type.eq_ignore_ascii_case("text") {
                decode_body(status, headers, ResponseType::Text, data)?
            } else if main_type.eq_ignore_ascii_case("application") {
                if sub_type.eq_ignore_ascii_case("json") {
                    decode_body(status, headers, ResponseType::Json, data)?
                } else {
                    decode_body(status, headers, ResponseType::Blob, data)?
                }
            } else {
                ResponseBody::Raw(data)
            }
        }
    };
    Ok(body)
}

fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Turns a transport response into the value the request resolves with.
///
/// Cookies are captured first. A non-2xx status becomes an
/// [`FetchError::InvalidStatus`]; successful responses go through the
/// after-response hooks. Any failure is offered to the response-error hooks,
/// the first of which to succeed supplies the result.
pub(crate) async fn consume_response<R: HttpResponse>(
    response: R,
    options: ResolvedOptions,
    request_url: &str,
    hooks: &Hooks,
) -> Result<FetchResponse, FetchError> {
    let status = response.status();
    let headers = response.headers();
    let url = response
        .final_url()
        .unwrap_or_else(|| request_url.to_owned());
    let redirected = !same_url(&url, request_url);
    let ok = status.is_success();

    tracing::debug!(%status, %url, "received response");

    if let Some(cookies) = &options.cookies
        && headers.contains_key(SET_COOKIE)
    {
        match Url::parse(&url) {
            Ok(cookie_url) => {
                for value in &headers.get_all(SET_COOKIE) {
                    match value.to_str() {
                        Ok(set_cookie) => cookies.store_set_cookie(set_cookie, &cookie_url),
                        Err(_) => tracing::warn!(%url, "ignoring non-text set-cookie header"),
                    }
                }
            }
            Err(error) => tracing::warn!(%url, %error, "cannot store cookies for response url"),
        }
    }

    let response_type = if ok {
        options.response_type
    } else {
        ResponseType::Auto
    };

    let mut result = FetchResponse {
        ok,
        url,
        status,
        status_text: status.canonical_reason().unwrap_or_default().to_owned(),
        headers,
        redirected,
        body: ResponseBody::Null,
        options,
    };

    let error = match response.body().await {
        Err(source) => FetchError::BodyRead {
            source: BoxedError::from_err(source),
            response: Box::new(result.clone()),
        },
        Ok(data) => match decode_body(status, &result.headers, response_type, data.clone()) {
            Err(source) => {
                result.body = ResponseBody::Raw(data);
                FetchError::Decode {
                    source,
                    response: Box::new(result.clone()),
                }
            }
            Ok(body) => {
                result.body = body;
                if ok {
                    match hooks.run_after_response(result.clone()).await {
                        Ok(finished) => return Ok(finished),
                        Err(source) => FetchError::Hook {
                            stage: HookStage::AfterResponse,
                            source,
                            response: Some(Box::new(result.clone())),
                        },
                    }
                } else {
                    FetchError::InvalidStatus {
                        status,
                        response: Box::new(result.clone()),
                    }
                }
            }
        },
    };

    match hooks.run_response_error(&result, &error).await {
        Some(recovered) => Ok(recovered),
        None => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde_json::json;

    use super::*;

    fn headers_with_type(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_null_body_statuses() {
        for status in [101, 204, 205, 304] {
            let status = StatusCode::from_u16(status).unwrap();
            for response_type in [ResponseType::Json, ResponseType::Text, ResponseType::Auto] {
                let body = decode_body(
                    status,
                    &HeaderMap::new(),
                    response_type,
                    Bytes::from_static(b"not json"),
                )
                .unwrap();
                assert!(body.is_null());
            }
        }
    }

    #[test]
    fn test_declared_types() {
        let data = Bytes::from_static(br#"{"a":1}"#);
        let headers = headers_with_type("application/json");

        let json = decode_body(StatusCode::OK, &headers, ResponseType::Json, data.clone()).unwrap();
        assert_eq!(json.as_json(), Some(&json!({"a": 1})));

        let text = decode_body(StatusCode::OK, &headers, ResponseType::Text, data.clone()).unwrap();
        assert_eq!(text.as_text(), Some(r#"{"a":1}"#));

        let blob = decode_body(StatusCode::OK, &headers, ResponseType::Blob, data.clone()).unwrap();
        assert_eq!(
            blob,
            ResponseBody::Blob {
                content_type: Some("application/json".to_owned()),
                data: data.clone(),
            }
        );

        let buffer =
            decode_body(StatusCode::OK, &headers, ResponseType::ArrayBuffer, data.clone()).unwrap();
        assert_eq!(buffer, ResponseBody::Buffer(data.clone()));

        let stream =
            decode_body(StatusCode::OK, &headers, ResponseType::Stream, data.clone()).unwrap();
        assert_eq!(stream, ResponseBody::Raw(data));
    }

    #[test]
    fn test_auto_detection() {
        let data = Bytes::from_static(b"[1]");
        let decode = |content_type| {
            decode_body(
                StatusCode::OK,
                &headers_with_type(content_type),
                ResponseType::Auto,
                data.clone(),
            )
            .unwrap()
        };

        assert_eq!(decode("text/plain; charset=utf-8").as_text(), Some("[1]"));
        assert_eq!(decode("Application/JSON").as_json(), Some(&json!([1])));
        assert!(matches!(
            decode("application/octet-stream"),
            ResponseBody::Blob { .. }
        ));
        assert!(matches!(decode("image/png"), ResponseBody::Raw(_)));

        let untyped = decode_body(
            StatusCode::OK,
            &HeaderMap::new(),
            ResponseType::Auto,
            data.clone(),
        )
        .unwrap();
        assert_eq!(untyped, ResponseBody::Raw(data));
    }

    #[test]
    fn test_invalid_json_fails() {
        let result = decode_body(
            StatusCode::OK,
            &HeaderMap::new(),
            ResponseType::Json,
            Bytes::from_static(b"<html>"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_same_url_normalizes() {
        assert!(same_url("http://a.test", "http://a.test/"));
        assert!(!same_url("http://a.test/x", "http://a.test/y"));
    }
}
