//! The [`Fetch`] instance handle.

use std::sync::Arc;

use http::{HeaderValue, Method, Uri, header::COOKIE};
use snafu::prelude::*;
use url::Url;

use crate::{
    endpoint_url::{merge_params, merge_url},
    error::{BoxedError, FetchError, InvalidUriSnafu, InvalidUrlSnafu, SerializeFormSnafu},
    hooks::HookStage,
    http::{HttpClient, TransportOptions},
    options::{DefaultOptions, Defaults, Query, RequestOptions, ResolvedOptions, merge_options},
    response::{FetchResponse, consume_response},
};

/// A request function bound to a transport and a set of resolved defaults.
///
/// Every request made through an instance merges its [`RequestOptions`] on
/// top of the instance [`Defaults`], which are never mutated. Use
/// [`Fetch::extend`] to derive an instance with additional defaults.
///
/// ```no_run
/// # use fetchwise::{FetchError, http::HttpClient};
/// # async fn demo<C: HttpClient>(client: C) -> Result<(), FetchError> {
/// use fetchwise::{DefaultOptions, Fetch, RequestOptions};
///
/// let api = Fetch::with_options(
///     client,
///     DefaultOptions::builder().base_url("https://api.example.com").build(),
/// );
/// let response = api.get("/v1/items", RequestOptions::default()).await?;
/// println!("{:?}", response.body);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Fetch<C> {
    client: Arc<C>,
    defaults: Arc<Defaults>,
}

impl<C> Clone for Fetch<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

impl<C: HttpClient> Fetch<C> {
    /// Creates an instance with the built-in defaults.
    pub fn new(client: C) -> Self {
        Self::with_options(client, DefaultOptions::default())
    }

    /// Creates an instance with `options` resolved on top of the built-in
    /// defaults.
    pub fn with_options(client: C, options: DefaultOptions) -> Self {
        Self {
            client: Arc::new(client),
            defaults: Arc::new(Defaults::resolve(None, options)),
        }
    }

    /// Returns the resolved defaults of this instance.
    #[must_use]
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Derives an instance sharing this transport, with `options` resolved on
    /// top of these defaults.
    ///
    /// The parent's hooks run before those in `options`. This instance is
    /// left unchanged.
    #[must_use]
    pub fn extend(&self, options: DefaultOptions) -> Self {
        Self {
            client: self.client.clone(),
            defaults: Arc::new(Defaults::resolve(Some(&self.defaults), options)),
        }
    }

    /// Sends a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be encoded, the transport
    /// fails, or the response fails and no response-error hook recovers it.
    /// Use [`FetchError::kind`] to tell these apart.
    pub async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        let options = merge_options(&self.defaults, options, url)?;

        let query = options
            .query
            .as_ref()
            .map(Query::to_query_string)
            .transpose()
            .context(SerializeFormSnafu)?
            .unwrap_or_default();
        let whole_url = merge_url(
            self.defaults.base_url.as_deref().unwrap_or_default(),
            &merge_params(&options.url, &query, true),
        );

        tracing::debug!(method = %options.method, url = %whole_url, "dispatching request");

        let sent = match Url::parse(&whole_url).context(InvalidUrlSnafu {
            url: whole_url.as_str(),
        }) {
            Ok(url) => self
                .send(&url, &options)
                .await
                .map(|response| (response, url)),
            Err(error) => Err(error),
        };

        match sent {
            Ok((response, url)) => {
                consume_response(response, options, url.as_str(), &self.defaults.hooks).await
            }
            Err(error) => {
                tracing::debug!(url = %whole_url, %error, "request failed");
                if let Err(source) = self
                    .defaults
                    .hooks
                    .run_request_error(&options, &error)
                    .await
                {
                    return Err(FetchError::Hook {
                        stage: HookStage::RequestError,
                        source,
                        response: None,
                    });
                }
                Err(error)
            }
        }
    }

    async fn send(
        &self,
        url: &Url,
        options: &ResolvedOptions,
    ) -> Result<C::Response, FetchError> {
        let uri: Uri = url.as_str().parse().context(InvalidUriSnafu {
            url: url.as_str(),
        })?;

        let mut headers = options.headers.clone();
        if let Some(cookies) = &options.cookies
            && let Some(cookie) = cookies.cookie_header(url)
        {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(error) => {
                    tracing::warn!(%url, %error, "not sending unusable cookie header");
                }
            }
        }

        let (mut parts, ()) = http::Request::new(()).into_parts();
        parts.method = options.method.clone();
        parts.uri = uri;
        parts.headers = headers;
        parts.extensions.insert(TransportOptions {
            redirect: options.redirect,
            follow: options.follow,
            credentials: options.credentials,
        });
        let body = options.body.clone().unwrap_or_default();
        let request = http::Request::from_parts(parts, body);

        let response = match &options.signal {
            None => self.client.execute(request).await,
            Some(signal) => {
                if signal.is_aborted() {
                    return Err(FetchError::Aborted);
                }
                tokio::select! {
                    response = self.client.execute(request) => response,
                    () = signal.aborted() => return Err(FetchError::Aborted),
                }
            }
        };

        response.map_err(|source| FetchError::Request {
            source: BoxedError::from_err(source),
        })
    }

    /// Sends a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Fetch::request`].
    pub async fn get(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.request(url, options.with_method(Method::GET)).await
    }

    /// Sends a `POST` request.
    ///
    /// # Errors
    ///
    /// See [`Fetch::request`].
    pub async fn post(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.request(url, options.with_method(Method::POST)).await
    }

    /// Sends a `PUT` request.
    ///
    /// # Errors
    ///
    /// See [`Fetch::request`].
    pub async fn put(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.request(url, options.with_method(Method::PUT)).await
    }

    /// Sends a `PATCH` request.
    ///
    /// # Errors
    ///
    /// See [`Fetch::request`].
    pub async fn patch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.request(url, options.with_method(Method::PATCH)).await
    }

    /// Sends a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`Fetch::request`].
    pub async fn delete(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.request(url, options.with_method(Method::DELETE)).await
    }

    /// Sends a `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`Fetch::request`].
    pub async fn head(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.request(url, options.with_method(Method::HEAD)).await
    }

    /// Sends an `OPTIONS` request.
    ///
    /// # Errors
    ///
    /// See [`Fetch::request`].
    pub async fn options(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.request(url, options.with_method(Method::OPTIONS)).await
    }
}
