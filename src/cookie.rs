//! Cookie storage shared across requests.
//!
//! A [`CookieStore`] attached to the options of a request is asked for the
//! `Cookie` header before the request is sent, and is handed every
//! `Set-Cookie` header of the response.

use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

use url::Url;

use crate::platform::MaybeSendSync;

/// Actions for a cookie store providing session support.
pub trait CookieStore: MaybeSendSync + fmt::Debug {
    /// Returns the value of the `Cookie` header to send to `url`, if any
    /// cookies apply.
    fn cookie_header(&self, url: &Url) -> Option<String>;

    /// Stores a cookie from a `Set-Cookie` header value received from `url`.
    fn store_set_cookie(&self, set_cookie: &str, url: &Url);
}

/// A cookie store backed by the `cookie_store` crate.
///
/// Cookies are matched by domain, path, expiry and the `Secure` attribute.
#[derive(Debug, Default)]
pub struct Jar(RwLock<cookie_store::CookieStore>);

impl Jar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cookie, as if it had been received from `url`.
    ///
    /// ```
    /// use fetchwise::cookie::{CookieStore as _, Jar};
    ///
    /// let url = "https://yolo.local/".parse().unwrap();
    /// let jar = Jar::new();
    /// jar.add_cookie_str("foo=bar; Domain=yolo.local", &url);
    /// assert_eq!(jar.cookie_header(&url).as_deref(), Some("foo=bar"));
    /// ```
    pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
        self.store_set_cookie(cookie, url);
    }

    /// Returns the number of unexpired cookies in the jar.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_unexpired()
            .count()
    }

    /// Returns `true` if the jar holds no unexpired cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for Jar {
    fn cookie_header(&self, url: &Url) -> Option<String> {
        let store = self.0.read().unwrap_or_else(PoisonError::into_inner);
        let header = store
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        (!header.is_empty()).then_some(header)
    }

    fn store_set_cookie(&self, set_cookie: &str, url: &Url) {
        let mut store = self.0.write().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = store.parse(set_cookie, url) {
            tracing::warn!(%url, %error, "ignoring unusable set-cookie header");
        }
    }
}
