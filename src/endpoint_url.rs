//! Composition of the final request URL.
//!
//! A request URL is built in two steps: the query string is applied to the
//! call-site URL with [`merge_params`], then the result is joined onto the
//! instance base URL with [`merge_url`].

/// Returns `true` if `url` starts with an `http` or `https` scheme.
fn is_absolute(url: &str) -> bool {
    starts_with_ignore_case(url, "http://") || starts_with_ignore_case(url, "https://")
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Joins `url` onto `base`.
///
/// If `base` is empty or `url` is already absolute, `url` is returned
/// unchanged. Otherwise the two are joined with exactly one `/` between them.
///
/// ```
/// use fetchwise::merge_url;
///
/// assert_eq!(merge_url("https://api.test", "/v1/x"), "https://api.test/v1/x");
/// assert_eq!(merge_url("https://api.test/", "/v1/x"), "https://api.test/v1/x");
/// assert_eq!(merge_url("", "http://other/x"), "http://other/x");
/// ```
#[must_use]
pub fn merge_url(base: &str, url: &str) -> String {
    if base.is_empty() || is_absolute(url) {
        return url.to_owned();
    }
    match (base.ends_with('/'), url.starts_with('/')) {
        (true, true) => format!("{base}{}", &url[1..]),
        (false, false) => format!("{base}/{url}"),
        _ => format!("{base}{url}"),
    }
}

/// Applies a query string to `url`.
///
/// An empty `query` leaves `url` unchanged. With `override_existing`, any
/// query string already on `url` is replaced. Otherwise `query` is appended,
/// with `&` if `url` already has a query and `?` if it does not; no separator
/// is added when `url` already ends with one.
#[must_use]
pub fn merge_params(url: &str, query: &str, override_existing: bool) -> String {
    let query = query.strip_prefix('?').unwrap_or(query);
    if query.is_empty() {
        return url.to_owned();
    }

    if override_existing {
        let path = url.split_once('?').map_or(url, |(path, _)| path);
        return format!("{path}?{query}");
    }

    let separator = match url.find('?') {
        None => "?",
        Some(_) if url.ends_with(['?', '&']) => "",
        Some(_) => "&",
    };
    format!("{url}{separator}{query}")
}
