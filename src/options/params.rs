//! Key/value parameter collections used for query strings and form bodies.
//!
//! [`Params`] is a plain mapping with unique keys; [`SearchParams`] is the
//! structured, possibly multi-valued form of a query string. Both implement
//! [`ParamSet`], which is all the option merger needs to fill in defaults.

use std::fmt;

use serde::{Serialize, ser::SerializeSeq as _};

/// The capabilities needed to merge default parameters into a collection.
pub trait ParamSet {
    /// Returns `true` if at least one value is present for `key`.
    fn has(&self, key: &str) -> bool;

    /// Sets `key` to `value`, replacing any existing values.
    fn set(&mut self, key: impl Into<String>, value: impl Into<String>);

    /// Returns all key/value pairs in order.
    fn entries(&self) -> impl Iterator<Item = (&str, &str)>;

    /// Sets every key of `defaults` that is not already present here.
    fn fill_missing<P: ParamSet>(&mut self, defaults: &P) {
        let missing = defaults
            .entries()
            .filter(|(key, _)| !self.has(key))
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect::<Vec<_>>();

        for (key, value) in missing {
            self.set(key, value);
        }
    }
}

/// An ordered mapping of unique keys to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`ParamSet::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a new mapping holding `self` overlaid with `other`.
    ///
    /// Keys of `other` win; keys only in `self` keep their position.
    #[must_use]
    pub fn overlay(&self, other: &Params) -> Params {
        let mut merged = self.clone();
        for (key, value) in other.entries() {
            merged.set(key, value);
        }
        merged
    }

    /// Renders the mapping as `application/x-www-form-urlencoded`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pairs cannot be serialized.
    pub fn to_form_string(&self) -> Result<String, serde_html_form::ser::Error> {
        serde_html_form::to_string(self)
    }
}

impl ParamSet for Params {
    fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

impl Serialize for Params {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.0, serializer)
    }
}

/// An ordered list of query parameters which may repeat keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams(Vec<(String, String)>);

impl SearchParams {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    ///
    /// A leading `?` is ignored.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Appends a pair, keeping any existing values for `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Returns every value for `key`.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ParamSet for SearchParams {
    fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.0.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                self.0[first].1 = value.into();
                let mut index = 0;
                self.0.retain(|(k, _)| {
                    let keep = index <= first || *k != key;
                    index += 1;
                    keep
                });
            }
            None => self.0.push((key, value.into())),
        }
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for SearchParams {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.0, serializer)
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_html_form::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

fn serialize_pairs<S: serde::Serializer>(
    pairs: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(pairs.len()))?;
    for pair in pairs {
        seq.serialize_element(pair)?;
    }
    seq.end()
}

/// Query parameters appended to the request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A plain mapping, merged key-for-key with a default mapping.
    Map(Params),
    /// Structured parameters; default keys are only filled in where missing.
    Search(SearchParams),
}

impl Query {
    /// Renders the query string, without a leading `?`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pairs cannot be serialized.
    pub fn to_query_string(&self) -> Result<String, serde_html_form::ser::Error> {
        match self {
            Self::Map(params) => params.to_form_string(),
            Self::Search(search) => serde_html_form::to_string(search),
        }
    }
}

impl From<Params> for Query {
    fn from(value: Params) -> Self {
        Self::Map(value)
    }
}

impl From<SearchParams> for Query {
    fn from(value: SearchParams) -> Self {
        Self::Search(value)
    }
}

/// A URL-encoded form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Form {
    /// A plain mapping, merged key-for-key with a default mapping.
    Map(Params),
    /// Structured parameters; default keys are only filled in where missing.
    Search(SearchParams),
    /// An already-encoded body, sent as-is.
    Raw(String),
}

impl Form {
    /// Encodes the form as `application/x-www-form-urlencoded`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pairs cannot be serialized.
    pub fn encode(&self) -> Result<String, serde_html_form::ser::Error> {
        match self {
            Self::Map(params) => params.to_form_string(),
            Self::Search(search) => serde_html_form::to_string(search),
            Self::Raw(raw) => Ok(raw.clone()),
        }
    }
}

impl From<Params> for Form {
    fn from(value: Params) -> Self {
        Self::Map(value)
    }
}

impl From<SearchParams> for Form {
    fn from(value: SearchParams) -> Self {
        Self::Search(value)
    }
}

impl From<String> for Form {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<&str> for Form {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_set_replaces_in_place() {
        let mut params = Params::new().with("a", "1").with("b", "2");
        params.set("a", "3");
        assert_eq!(
            params.entries().collect::<Vec<_>>(),
            vec![("a", "3"), ("b", "2")]
        );
    }

    #[test]
    fn test_overlay_call_keys_win() {
        let defaults = Params::new().with("a", "1").with("b", "2");
        let call = Params::new().with("b", "x").with("c", "3");
        let merged = defaults.overlay(&call);
        assert_eq!(
            merged.entries().collect::<Vec<_>>(),
            vec![("a", "1"), ("b", "x"), ("c", "3")]
        );
    }

    #[test]
    fn test_search_params_fill_missing_only() {
        let mut search = SearchParams::parse("?tag=a&tag=b");
        let defaults = Params::new().with("tag", "z").with("page", "1");
        search.fill_missing(&defaults);
        assert_eq!(search.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(search.to_string(), "tag=a&tag=b&page=1");
    }

    #[test]
    fn test_search_params_set_collapses_duplicates() {
        let mut search: SearchParams = [("k", "1"), ("x", "y"), ("k", "2")].into_iter().collect();
        search.set("k", "3");
        assert_eq!(search.to_string(), "k=3&x=y");
    }

    #[test]
    fn test_form_encoding_escapes() {
        let form = Form::from(Params::new().with("name", "a b&c"));
        assert_eq!(form.encode().unwrap(), "name=a+b%26c");
        assert_eq!(Form::from("raw=1").encode().unwrap(), "raw=1");
    }
}
