//! Extension points around the request lifecycle.
//!
//! There are four stages, each an ordered list of hooks run in registration
//! order:
//!
//! - **before-request**: `ResolvedOptions -> ResolvedOptions`, synchronous,
//!   each hook's output feeding the next.
//! - **after-response**: `FetchResponse -> FetchResponse`, asynchronous,
//!   each hook awaited before the next starts.
//! - **request-error**: side effects only when the transport fails. A hook
//!   returning [`ControlFlow::Break`] skips the remaining hooks; the error is
//!   returned to the caller regardless.
//! - **response-error**: recovery from a failed response. The first hook that
//!   succeeds supplies the value the request resolves with.
//!
//! When an instance is derived with [`Fetch::extend`](crate::Fetch::extend),
//! the parent's hooks run before the child's.

use std::{fmt, ops::ControlFlow, sync::Arc};

use crate::{
    error::{FetchError, HookError},
    options::ResolvedOptions,
    platform::{BoxFuture, MaybeSend},
    response::FetchResponse,
};

/// A before-request hook.
pub type BeforeRequestHook =
    Arc<dyn Fn(ResolvedOptions) -> Result<ResolvedOptions, HookError> + Send + Sync>;

/// An after-response hook.
pub type AfterResponseHook = Arc<
    dyn Fn(FetchResponse) -> BoxFuture<'static, Result<FetchResponse, HookError>> + Send + Sync,
>;

/// A request-error hook.
pub type RequestErrorHook = Arc<
    dyn for<'a> Fn(
            &'a ResolvedOptions,
            &'a FetchError,
        ) -> BoxFuture<'a, Result<ControlFlow<()>, HookError>>
        + Send
        + Sync,
>;

/// A response-error hook.
pub type ResponseErrorHook = Arc<
    dyn for<'a> Fn(
            &'a FetchResponse,
            &'a FetchError,
        ) -> BoxFuture<'a, Result<FetchResponse, HookError>>
        + Send
        + Sync,
>;

/// One of the four hook stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    /// Runs on the resolved options before the request is sent.
    BeforeRequest,
    /// Runs on a successful response.
    AfterResponse,
    /// Runs when the transport fails.
    RequestError,
    /// Runs when the response fails.
    ResponseError,
}

impl HookStage {
    /// Returns the kebab-case name of the stage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeRequest => "before-request",
            Self::AfterResponse => "after-response",
            Self::RequestError => "request-error",
            Self::ResponseError => "response-error",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The hooks of an instance, per stage, in run order.
#[derive(Clone, Default)]
pub struct Hooks {
    before_request: Vec<BeforeRequestHook>,
    after_response: Vec<AfterResponseHook>,
    request_error: Vec<RequestErrorHook>,
    response_error: Vec<ResponseErrorHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_request", &self.before_request.len())
            .field("after_response", &self.after_response.len())
            .field("request_error", &self.request_error.len())
            .field("response_error", &self.response_error.len())
            .finish()
    }
}

impl Hooks {
    /// Creates an empty set of hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a before-request hook.
    #[must_use]
    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(ResolvedOptions) -> Result<ResolvedOptions, HookError> + Send + Sync + 'static,
    {
        self.before_request.push(Arc::new(hook));
        self
    }

    /// Adds an after-response hook.
    #[must_use]
    pub fn after_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(FetchResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FetchResponse, HookError>> + MaybeSend + 'static,
    {
        self.after_response.push(Arc::new(
            move |response| -> BoxFuture<'static, Result<FetchResponse, HookError>> {
                Box::pin(hook(response))
            },
        ));
        self
    }

    /// Adds a request-error hook.
    ///
    /// ```
    /// use std::ops::ControlFlow;
    ///
    /// use fetchwise::Hooks;
    ///
    /// let hooks = Hooks::new().request_error(|options, error| {
    ///     let url = options.url.clone();
    ///     let message = error.to_string();
    ///     Box::pin(async move {
    ///         eprintln!("{url}: {message}");
    ///         Ok(ControlFlow::Continue(()))
    ///     })
    /// });
    /// assert_eq!(hooks.len(fetchwise::HookStage::RequestError), 1);
    /// ```
    #[must_use]
    pub fn request_error<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(
                &'a ResolvedOptions,
                &'a FetchError,
            ) -> BoxFuture<'a, Result<ControlFlow<()>, HookError>>
            + Send
            + Sync
            + 'static,
    {
        self.request_error.push(Arc::new(hook));
        self
    }

    /// Adds a response-error hook.
    #[must_use]
    pub fn response_error<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(
                &'a FetchResponse,
                &'a FetchError,
            ) -> BoxFuture<'a, Result<FetchResponse, HookError>>
            + Send
            + Sync
            + 'static,
    {
        self.response_error.push(Arc::new(hook));
        self
    }

    /// Returns these hooks followed by the hooks of `next`, per stage.
    #[must_use]
    pub fn chain(mut self, next: Hooks) -> Self {
        self.before_request.extend(next.before_request);
        self.after_response.extend(next.after_response);
        self.request_error.extend(next.request_error);
        self.response_error.extend(next.response_error);
        self
    }

    /// Returns the number of hooks registered for `stage`.
    #[must_use]
    pub fn len(&self, stage: HookStage) -> usize {
        match stage {
            HookStage::BeforeRequest => self.before_request.len(),
            HookStage::AfterResponse => self.after_response.len(),
            HookStage::RequestError => self.request_error.len(),
            HookStage::ResponseError => self.response_error.len(),
        }
    }

    /// Returns `true` if no hooks are registered for any stage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before_request.is_empty()
            && self.after_response.is_empty()
            && self.request_error.is_empty()
            && self.response_error.is_empty()
    }

    pub(crate) fn run_before_request(
        &self,
        options: ResolvedOptions,
    ) -> Result<ResolvedOptions, FetchError> {
        self.before_request
            .iter()
            .enumerate()
            .try_fold(options, |options, (index, hook)| {
                tracing::trace!(stage = %HookStage::BeforeRequest, index, "running hook");
                hook(options).map_err(|source| FetchError::Hook {
                    stage: HookStage::BeforeRequest,
                    source,
                    response: None,
                })
            })
    }

    pub(crate) async fn run_after_response(
        &self,
        response: FetchResponse,
    ) -> Result<FetchResponse, HookError> {
        let mut response = response;
        for (index, hook) in self.after_response.iter().enumerate() {
            tracing::trace!(stage = %HookStage::AfterResponse, index, "running hook");
            response = hook(response).await?;
        }
        Ok(response)
    }

    pub(crate) async fn run_request_error(
        &self,
        options: &ResolvedOptions,
        error: &FetchError,
    ) -> Result<(), HookError> {
        for (index, hook) in self.request_error.iter().enumerate() {
            tracing::trace!(stage = %HookStage::RequestError, index, "running hook");
            if hook(options, error).await?.is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Returns the value of the first hook that succeeds.
    pub(crate) async fn run_response_error(
        &self,
        response: &FetchResponse,
        error: &FetchError,
    ) -> Option<FetchResponse> {
        for (index, hook) in self.response_error.iter().enumerate() {
            tracing::trace!(stage = %HookStage::ResponseError, index, "running hook");
            match hook(response, error).await {
                Ok(recovered) => return Some(recovered),
                Err(declined) => {
                    tracing::debug!(index, error = %declined, "response-error hook declined");
                }
            }
        }
        None
    }
}
