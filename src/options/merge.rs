use bytes::Bytes;
use http::{
    HeaderMap, HeaderValue, Method,
    header::CONTENT_TYPE,
};
use serde_json::Value;
use snafu::prelude::*;

use crate::{
    error::{BadHeaderSnafu, FetchError, SerializeFormSnafu, SerializeJsonSnafu},
    multipart::Multipart,
    options::{Defaults, Form, ParamSet as _, Query, RequestOptions, ResolvedOptions},
};

/// The option fields that merge with their defaults instead of replacing them.
#[derive(Debug, Default)]
pub(crate) struct MergeProps {
    pub headers: Option<HeaderMap>,
    pub query: Option<Query>,
    pub form: Option<Form>,
    pub data: Option<Multipart>,
    pub json: Option<Value>,
}

/// Merges each supplied field with the corresponding default.
///
/// Fields that are not supplied stay `None`; the caller falls back to the
/// default value itself.
pub(crate) fn merge_props(props: MergeProps, defaults: &Defaults) -> MergeProps {
    MergeProps {
        headers: props
            .headers
            .map(|headers| merge_headers(headers, defaults.headers.as_ref())),
        query: props
            .query
            .map(|query| merge_query(query, defaults.query.as_ref())),
        form: props
            .form
            .map(|form| merge_form(form, defaults.form.as_ref())),
        data: props
            .data
            .map(|data| merge_data(data, defaults.data.as_ref())),
        json: props
            .json
            .map(|json| merge_json(json, defaults.json.as_ref())),
    }
}

fn merge_headers(mut headers: HeaderMap, defaults: Option<&HeaderMap>) -> HeaderMap {
    let Some(defaults) = defaults else {
        return headers;
    };
    for name in defaults.keys() {
        if headers.contains_key(name) {
            continue;
        }
        for value in defaults.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

fn merge_query(query: Query, defaults: Option<&Query>) -> Query {
    match (query, defaults) {
        (Query::Map(call), Some(Query::Map(defaults))) => Query::Map(defaults.overlay(&call)),
        (Query::Search(mut call), Some(Query::Map(defaults))) => {
            call.fill_missing(defaults);
            Query::Search(call)
        }
        (query, _) => query,
    }
}

fn merge_form(form: Form, defaults: Option<&Form>) -> Form {
    match (form, defaults) {
        (Form::Map(call), Some(Form::Map(defaults))) => Form::Map(defaults.overlay(&call)),
        (Form::Search(mut call), Some(Form::Map(defaults))) => {
            call.fill_missing(defaults);
            Form::Search(call)
        }
        (form, _) => form,
    }
}

fn merge_data(mut data: Multipart, defaults: Option<&Multipart>) -> Multipart {
    if let Some(defaults) = defaults {
        data.fill_missing(defaults);
    }
    data
}

fn merge_json(json: Value, defaults: Option<&Value>) -> Value {
    match (json, defaults) {
        (Value::Object(call), Some(Value::Object(defaults))) => {
            let mut merged = defaults.clone();
            merged.extend(call);
            Value::Object(merged)
        }
        (Value::Array(call), Some(Value::Array(defaults))) => {
            let mut merged = defaults.clone();
            merged.extend(call);
            Value::Array(merged)
        }
        (json, _) => json,
    }
}

fn allows_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Merges per-call options onto the instance defaults and encodes the body.
///
/// The before-request hooks of `defaults` run last, in registration order.
pub(crate) fn merge_options(
    defaults: &Defaults,
    options: RequestOptions,
    url: &str,
) -> Result<ResolvedOptions, FetchError> {
    let props = merge_props(
        MergeProps {
            headers: options.headers,
            query: options.query,
            form: options.form,
            data: options.data,
            json: options.json,
        },
        defaults,
    );

    let method = options.method.unwrap_or_else(|| defaults.method.clone());
    let mut headers = props
        .headers
        .or_else(|| defaults.headers.clone())
        .unwrap_or_default();
    let json = props
        .json
        .or_else(|| defaults.json.clone())
        .filter(|json| !json.is_null());
    let form = props.form.or_else(|| defaults.form.clone());
    let data = props.data.or_else(|| defaults.data.clone());

    let body = if allows_body(&method) {
        encode_body(
            &mut headers,
            json,
            form,
            data,
            options.body.or_else(|| defaults.body.clone()),
        )?
    } else {
        None
    };

    let resolved = ResolvedOptions {
        url: url.to_owned(),
        method,
        headers,
        body,
        signal: options.signal.or_else(|| defaults.signal.clone()),
        credentials: options.credentials.unwrap_or(defaults.credentials),
        redirect: options.redirect.unwrap_or(defaults.redirect),
        follow: options.follow.unwrap_or(defaults.follow),
        query: props.query.or_else(|| defaults.query.clone()),
        cookies: options.cookies.or_else(|| defaults.cookies.clone()),
        response_type: options.response_type.unwrap_or(defaults.response_type),
    };

    defaults.hooks.run_before_request(resolved)
}

fn encode_body(
    headers: &mut HeaderMap,
    json: Option<Value>,
    form: Option<Form>,
    data: Option<Multipart>,
    raw: Option<Bytes>,
) -> Result<Option<Bytes>, FetchError> {
    if let Some(json) = json {
        let body = serde_json::to_vec(&json).context(SerializeJsonSnafu)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(Some(body.into()))
    } else if let Some(form) = form {
        let body = form.encode().context(SerializeFormSnafu)?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        Ok(Some(body.into()))
    } else if let Some(data) = data {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&data.content_type()).context(BadHeaderSnafu)?,
        );
        Ok(Some(data.encode()))
    } else {
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use http::header::{ACCEPT, AUTHORIZATION};
    use serde_json::json;

    use super::*;
    use crate::{
        hooks::Hooks,
        options::{DefaultOptions, Params, SearchParams},
    };

    fn header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|&(k, v)| {
                (
                    http::HeaderName::from_static(k),
                    HeaderValue::from_static(v),
                )
            })
            .collect()
    }

    fn defaults(options: DefaultOptions) -> Defaults {
        Defaults::resolve(None, options)
    }

    #[test]
    fn test_call_headers_overlay_defaults() {
        let defaults = defaults(
            DefaultOptions::builder()
                .headers(header_map(&[("a", "1"), ("b", "2")]))
                .build(),
        );
        let options = RequestOptions::builder()
            .headers(header_map(&[("b", "x"), ("c", "3")]))
            .build();

        let resolved = merge_options(&defaults, options, "/x").unwrap();
        assert_eq!(resolved.headers, header_map(&[("a", "1"), ("b", "x"), ("c", "3")]));
    }

    #[test]
    fn test_call_header_names_win_with_all_values() {
        let mut defaults_headers = HeaderMap::new();
        defaults_headers.append(ACCEPT, HeaderValue::from_static("text/html"));
        defaults_headers.append(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        let defaults = defaults(DefaultOptions::builder().headers(defaults_headers).build());

        let accept = http::HeaderName::from_bytes(b"Accept").unwrap();
        let mut call_headers = HeaderMap::new();
        call_headers.append(accept.clone(), HeaderValue::from_static("application/json"));
        call_headers.append(accept, HeaderValue::from_static("text/plain"));
        let resolved = merge_options(
            &defaults,
            RequestOptions::builder().headers(call_headers).build(),
            "/x",
        )
        .unwrap();

        assert_eq!(resolved.headers.get_all(ACCEPT).iter().count(), 2);
        assert_eq!(resolved.headers[AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn test_json_body_for_post() {
        let defaults = defaults(DefaultOptions::builder().json(json!({"a": 1})).build());
        let options = RequestOptions::builder()
            .method(Method::POST)
            .json(json!({"b": 2}))
            .form(Params::new().with("ignored", "yes"))
            .build();

        let resolved = merge_options(&defaults, options, "/x").unwrap();
        let body: Value = serde_json::from_slice(resolved.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"a": 1, "b": 2}));
        assert_eq!(resolved.headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_json_arrays_concatenate() {
        let defaults = defaults(DefaultOptions::builder().json(json!([1, 2])).build());
        let options = RequestOptions::builder()
            .method(Method::PUT)
            .json(json!([3]))
            .build();

        let resolved = merge_options(&defaults, options, "/x").unwrap();
        assert_eq!(resolved.body.unwrap().as_ref(), b"[1,2,3]");
    }

    #[test]
    fn test_mismatched_json_shapes_do_not_merge() {
        let defaults = defaults(DefaultOptions::builder().json(json!({"a": 1})).build());
        let options = RequestOptions::builder()
            .method(Method::PATCH)
            .json(json!([1]))
            .build();

        let resolved = merge_options(&defaults, options, "/x").unwrap();
        assert_eq!(resolved.body.unwrap().as_ref(), b"[1]");
    }

    #[test]
    fn test_form_body() {
        let defaults = defaults(
            DefaultOptions::builder()
                .form(Params::new().with("client", "cli").with("page", "1"))
                .build(),
        );
        let options = RequestOptions::builder()
            .method(Method::POST)
            .form(Params::new().with("page", "2"))
            .build();

        let resolved = merge_options(&defaults, options, "/x").unwrap();
        assert_eq!(resolved.body.unwrap().as_ref(), b"client=cli&page=2");
        assert_eq!(
            resolved.headers[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_raw_form_passes_through() {
        let defaults = defaults(
            DefaultOptions::builder()
                .form(Params::new().with("client", "cli"))
                .build(),
        );
        let options = RequestOptions::builder()
            .method(Method::POST)
            .form("a=1&a=2")
            .build();

        let resolved = merge_options(&defaults, options, "/x").unwrap();
        assert_eq!(resolved.body.unwrap().as_ref(), b"a=1&a=2");
    }

    #[test]
    fn test_multipart_body() {
        let data = Multipart::with_boundary("bnd").text("field", "value");
        let options = RequestOptions::builder()
            .method(Method::POST)
            .data(data.clone())
            .build();

        let resolved = merge_options(&Defaults::default(), options, "/x").unwrap();
        assert_eq!(
            resolved.headers[CONTENT_TYPE],
            "multipart/form-data; boundary=bnd"
        );
        assert_eq!(resolved.body.unwrap(), data.encode());
    }

    #[test]
    fn test_body_dropped_for_bodyless_methods() {
        for method in [Method::GET, Method::HEAD, Method::DELETE, Method::OPTIONS] {
            let options = RequestOptions::builder()
                .method(method.clone())
                .json(json!({"a": 1}))
                .form(Params::new().with("a", "1"))
                .data(Multipart::new().text("a", "1"))
                .body(Bytes::from_static(b"raw"))
                .build();

            let resolved = merge_options(&Defaults::default(), options, "/x").unwrap();
            assert!(resolved.body.is_none(), "{method} should not carry a body");
            assert!(!resolved.headers.contains_key(CONTENT_TYPE));
        }
    }

    #[test]
    fn test_raw_body_kept_without_encoders() {
        let options = RequestOptions::builder()
            .method(Method::POST)
            .body(Bytes::from_static(b"raw"))
            .build();

        let resolved = merge_options(&Defaults::default(), options, "/x").unwrap();
        assert_eq!(resolved.body.unwrap().as_ref(), b"raw");
    }

    #[test]
    fn test_query_merge_rules() {
        let defaults = defaults(
            DefaultOptions::builder()
                .query(Params::new().with("lang", "en").with("page", "1"))
                .build(),
        );

        let map = merge_options(
            &defaults,
            RequestOptions::builder()
                .query(Params::new().with("page", "2"))
                .build(),
            "/x",
        )
        .unwrap();
        assert_eq!(
            map.query.unwrap().to_query_string().unwrap(),
            "lang=en&page=2"
        );

        let search = merge_options(
            &defaults,
            RequestOptions::builder()
                .query(SearchParams::parse("page=3&page=4"))
                .build(),
            "/x",
        )
        .unwrap();
        assert_eq!(
            search.query.unwrap().to_query_string().unwrap(),
            "page=3&page=4&lang=en"
        );
    }

    #[test]
    fn test_defaults_are_not_mutated() {
        let defaults = defaults(
            DefaultOptions::builder()
                .headers(header_map(&[("a", "1")]))
                .query(Params::new().with("q", "1"))
                .build(),
        );
        let _ = merge_options(
            &defaults,
            RequestOptions::builder()
                .headers(header_map(&[("b", "2")]))
                .query(Params::new().with("r", "2"))
                .build(),
            "/x",
        )
        .unwrap();

        assert_eq!(defaults.headers, Some(header_map(&[("a", "1")])));
        assert_eq!(defaults.query, Some(Query::Map(Params::new().with("q", "1"))));
    }

    #[test]
    fn test_before_request_hooks_run_in_order() {
        let hooks = Hooks::new()
            .before_request(|mut options| {
                options.url.push_str("/first");
                Ok(options)
            })
            .before_request(|mut options| {
                options.url.push_str("/second");
                Ok(options)
            });
        let defaults = defaults(DefaultOptions::builder().hooks(hooks).build());

        let resolved = merge_options(&defaults, RequestOptions::default(), "/x").unwrap();
        assert_eq!(resolved.url, "/x/first/second");
    }

    #[test]
    fn test_before_request_hook_failure_is_returned() {
        let hooks = Hooks::new().before_request(|_| Err("denied".into()));
        let defaults = defaults(DefaultOptions::builder().hooks(hooks).build());

        let err = merge_options(&defaults, RequestOptions::default(), "/x").unwrap_err();
        assert!(matches!(
            err,
            FetchError::Hook {
                stage: crate::hooks::HookStage::BeforeRequest,
                ..
            }
        ));
    }
}
