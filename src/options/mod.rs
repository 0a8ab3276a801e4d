//! Request options at their three stages.
//!
//! [`DefaultOptions`] configure an instance and are resolved once into the
//! immutable [`Defaults`]. [`RequestOptions`] are supplied per call and merged
//! on top of the defaults into [`ResolvedOptions`], which is what the
//! before-request hooks see and what the transport request is built from.

mod merge;
mod params;

use std::sync::Arc;

use bon::Builder;
use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::Deserialize;

use crate::{cookie::CookieStore, hooks::Hooks, multipart::Multipart, signal::AbortSignal};

pub(crate) use merge::{merge_options, merge_props};
pub use params::{Form, ParamSet, Params, Query, SearchParams};

/// How the response body is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    /// Lossy UTF-8 text.
    Text,
    /// JSON.
    #[default]
    Json,
    /// Bytes tagged with the response content type.
    Blob,
    /// Bytes.
    Buffer,
    /// Bytes.
    ArrayBuffer,
    /// The body as received.
    Stream,
    /// Chosen from the `Content-Type` of the response.
    Auto,
}

/// What the transport does when it receives a redirect.
///
/// This is a request to the transport. The `reqwest` transport follows the
/// redirect policy its client was built with and ignores this value, logging
/// a warning when it is not [`Redirect::Follow`] with the default limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Redirect {
    /// Follow redirects, up to the follow limit.
    #[default]
    Follow,
    /// Fail on a redirect.
    Error,
    /// Return the redirect response itself.
    Manual,
}

/// Whether credentials are sent with cross-origin requests.
///
/// Only meaningful for browser transports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials to the same origin only.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// Options supplied for a single request.
///
/// Any field left unset falls back to the instance [`Defaults`].
#[derive(Debug, Clone, Default, Builder)]
pub struct RequestOptions {
    /// The HTTP method.
    pub method: Option<Method>,
    /// Request headers. Header names set here win over default headers.
    pub headers: Option<HeaderMap>,
    /// A raw body, used when none of `json`, `form` or `data` is set.
    #[builder(into)]
    pub body: Option<Bytes>,
    /// Aborts the transport call when triggered.
    pub signal: Option<AbortSignal>,
    /// Cross-origin credentials mode.
    pub credentials: Option<Credentials>,
    /// Redirect policy.
    pub redirect: Option<Redirect>,
    /// The maximum number of redirects to follow.
    pub follow: Option<u32>,
    /// Query parameters applied to the URL.
    #[builder(into)]
    pub query: Option<Query>,
    /// A JSON body.
    #[builder(into)]
    pub json: Option<serde_json::Value>,
    /// A URL-encoded form body.
    #[builder(into)]
    pub form: Option<Form>,
    /// A multipart body.
    pub data: Option<Multipart>,
    /// The cookie store to read cookies from and store cookies into.
    pub cookies: Option<Arc<dyn CookieStore>>,
    /// How to decode the response body.
    pub response_type: Option<ResponseType>,
}

impl RequestOptions {
    /// Returns these options with the method replaced.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }
}

/// Options used to configure a [`Fetch`](crate::Fetch) instance.
#[derive(Debug, Clone, Default, Builder)]
pub struct DefaultOptions {
    /// The URL relative request URLs are joined onto.
    #[builder(into)]
    pub base_url: Option<String>,
    /// The HTTP method.
    pub method: Option<Method>,
    /// Default headers.
    pub headers: Option<HeaderMap>,
    /// A default raw body.
    #[builder(into)]
    pub body: Option<Bytes>,
    /// A signal shared by every request of the instance.
    pub signal: Option<AbortSignal>,
    /// Cross-origin credentials mode.
    pub credentials: Option<Credentials>,
    /// Redirect policy.
    pub redirect: Option<Redirect>,
    /// The maximum number of redirects to follow.
    pub follow: Option<u32>,
    /// Default query parameters.
    #[builder(into)]
    pub query: Option<Query>,
    /// A default JSON body.
    #[builder(into)]
    pub json: Option<serde_json::Value>,
    /// A default form body.
    #[builder(into)]
    pub form: Option<Form>,
    /// A default multipart body.
    pub data: Option<Multipart>,
    /// A cookie store shared by every request of the instance.
    pub cookies: Option<Arc<dyn CookieStore>>,
    /// How to decode response bodies.
    pub response_type: Option<ResponseType>,
    /// Hooks run around every request.
    #[builder(default)]
    pub hooks: Hooks,
}

/// The resolved configuration of a [`Fetch`](crate::Fetch) instance.
///
/// Created once per instance and never mutated; deriving an instance with
/// [`Fetch::extend`](crate::Fetch::extend) resolves a new, independent set.
#[derive(Debug, Clone)]
pub struct Defaults {
    /// The base URL, if any.
    pub base_url: Option<String>,
    /// The default method (`GET` unless configured).
    pub method: Method,
    /// Default headers.
    pub headers: Option<HeaderMap>,
    /// Default raw body.
    pub body: Option<Bytes>,
    /// Default signal.
    pub signal: Option<AbortSignal>,
    /// Cross-origin credentials mode (`same-origin` unless configured).
    pub credentials: Credentials,
    /// Redirect policy (`follow` unless configured).
    pub redirect: Redirect,
    /// Redirect limit (10 unless configured).
    pub follow: u32,
    /// Default query parameters.
    pub query: Option<Query>,
    /// Default JSON body.
    pub json: Option<serde_json::Value>,
    /// Default form body.
    pub form: Option<Form>,
    /// Default multipart body.
    pub data: Option<Multipart>,
    /// Default cookie store.
    pub cookies: Option<Arc<dyn CookieStore>>,
    /// How to decode response bodies (`json` unless configured).
    pub response_type: ResponseType,
    /// Hooks, parent hooks first.
    pub hooks: Hooks,
}

/// The redirect limit when none is configured.
pub const DEFAULT_FOLLOW: u32 = 10;

impl Default for Defaults {
    fn default() -> Self {
        Self {
            base_url: None,
            method: Method::GET,
            headers: None,
            body: None,
            signal: None,
            credentials: Credentials::default(),
            redirect: Redirect::default(),
            follow: DEFAULT_FOLLOW,
            query: None,
            json: None,
            form: None,
            data: None,
            cookies: None,
            response_type: ResponseType::default(),
            hooks: Hooks::default(),
        }
    }
}

impl Defaults {
    /// Resolves `next` on top of `parent` (or the built-in defaults).
    ///
    /// Fields set in `next` override the parent. Headers, query, form, data
    /// and JSON keep the parent's entries that `next` does not replace, and
    /// the parent's hooks run before those of `next`.
    #[must_use]
    pub fn resolve(parent: Option<&Defaults>, next: DefaultOptions) -> Defaults {
        let builtin = Defaults::default();
        let base = parent.unwrap_or(&builtin);

        let props = merge_props(
            merge::MergeProps {
                headers: next.headers,
                query: next.query,
                form: next.form,
                data: next.data,
                json: next.json,
            },
            base,
        );

        Defaults {
            base_url: next.base_url.or_else(|| base.base_url.clone()),
            method: next.method.unwrap_or_else(|| base.method.clone()),
            headers: props.headers.or_else(|| base.headers.clone()),
            body: next.body.or_else(|| base.body.clone()),
            signal: next.signal.or_else(|| base.signal.clone()),
            credentials: next.credentials.unwrap_or(base.credentials),
            redirect: next.redirect.unwrap_or(base.redirect),
            follow: next.follow.unwrap_or(base.follow),
            query: props.query.or_else(|| base.query.clone()),
            json: props.json.or_else(|| base.json.clone()),
            form: props.form.or_else(|| base.form.clone()),
            data: props.data.or_else(|| base.data.clone()),
            cookies: next.cookies.or_else(|| base.cookies.clone()),
            response_type: next.response_type.unwrap_or(base.response_type),
            hooks: base.hooks.clone().chain(next.hooks),
        }
    }
}

/// The per-request options after merging with the instance defaults.
///
/// This is what before-request hooks receive and return, and what is echoed
/// back on every [`FetchResponse`](crate::FetchResponse).
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// The call-site URL, before the query and base URL are applied.
    pub url: String,
    /// The HTTP method.
    pub method: Method,
    /// The merged headers.
    pub headers: HeaderMap,
    /// The encoded body. Always `None` unless the method is `POST`, `PUT` or `PATCH`.
    pub body: Option<Bytes>,
    /// The abort signal, if any.
    pub signal: Option<AbortSignal>,
    /// Cross-origin credentials mode.
    pub credentials: Credentials,
    /// Redirect policy.
    pub redirect: Redirect,
    /// Redirect limit.
    pub follow: u32,
    /// The merged query parameters.
    pub query: Option<Query>,
    /// The cookie store, if any.
    pub cookies: Option<Arc<dyn CookieStore>>,
    /// How the response body is decoded.
    pub response_type: ResponseType,
}
