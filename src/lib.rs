//! A typed convenience layer over an HTTP client.
//!
//! A [`Fetch`] instance binds an [`HttpClient`](http::HttpClient) to a set of
//! resolved [`Defaults`]. Each request merges its [`RequestOptions`] on top of
//! those defaults, encodes a JSON, form or multipart body, attaches cookies,
//! and runs the instance [`Hooks`] around the transport call.

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod client;
pub mod config;
pub mod cookie;
mod endpoint_url;
mod error;
mod hooks;
pub mod http;
pub mod multipart;
mod options;
pub mod platform;
pub mod prelude;
mod response;
mod signal;

pub use client::Fetch;
pub use endpoint_url::{merge_params, merge_url};
pub use error::{BoxedError, Error, ErrorKind, FetchError, HookError};
pub use hooks::{
    AfterResponseHook, BeforeRequestHook, HookStage, Hooks, RequestErrorHook, ResponseErrorHook,
};
pub use options::{
    Credentials, DEFAULT_FOLLOW, DefaultOptions, Defaults, Form, ParamSet, Params, Query, Redirect,
    RequestOptions, ResolvedOptions, ResponseType, SearchParams,
};
pub use response::{FetchResponse, ResponseBody, is_null_body};
pub use signal::{AbortController, AbortSignal};

pub use bytes::Bytes;
