//! Instance defaults loaded from configuration.
//!
//! [`DefaultsConfig`] is the serializable subset of [`DefaultOptions`]. It can
//! be deserialized from any `serde` format and is validated when converted.
//!
//! ```
//! use fetchwise::config::DefaultsConfig;
//!
//! let config: DefaultsConfig = serde_json::from_str(
//!     r#"{ "base_url": "https://api.test", "method": "post", "type": "text" }"#,
//! )
//! .unwrap();
//! let options = config.into_options().unwrap();
//! assert_eq!(options.method, Some(http::Method::POST));
//! ```

use std::collections::BTreeMap;

use http::{
    HeaderMap, HeaderName, HeaderValue, Method,
    header::{InvalidHeaderName, InvalidHeaderValue},
    method::InvalidMethod,
};
use serde::Deserialize;
use snafu::prelude::*;

use crate::options::{Credentials, DefaultOptions, Params, Query, Redirect, ResponseType};

/// Errors raised when converting a [`DefaultsConfig`].
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// The method is not a valid HTTP method.
    #[snafu(display("Invalid HTTP method: {method}"))]
    InvalidMethod {
        /// The configured method.
        method: String,
        /// The underlying error.
        source: InvalidMethod,
    },
    /// A header name is invalid.
    #[snafu(display("Invalid header name: {name}"))]
    InvalidHeaderName {
        /// The configured name.
        name: String,
        /// The underlying error.
        source: InvalidHeaderName,
    },
    /// A header value is invalid.
    #[snafu(display("Invalid value for header {name}"))]
    InvalidHeaderValue {
        /// The header the value was configured for.
        name: String,
        /// The underlying error.
        source: InvalidHeaderValue,
    },
}

/// Serializable instance defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    /// The base URL.
    pub base_url: Option<String>,
    /// The HTTP method, case-insensitive.
    pub method: Option<String>,
    /// How response bodies are decoded.
    #[serde(rename = "type")]
    pub response_type: Option<ResponseType>,
    /// Redirect policy.
    pub redirect: Option<Redirect>,
    /// Redirect limit.
    pub follow: Option<u32>,
    /// Cross-origin credentials mode.
    pub credentials: Option<Credentials>,
    /// Default headers.
    pub headers: BTreeMap<String, String>,
    /// Default query parameters.
    pub query: BTreeMap<String, String>,
    /// A default JSON body.
    pub json: Option<serde_json::Value>,
}

impl DefaultsConfig {
    /// Validates the configuration and converts it into [`DefaultOptions`].
    ///
    /// # Errors
    ///
    /// Returns an error if the method or a header is invalid.
    pub fn into_options(self) -> Result<DefaultOptions, ConfigError> {
        let method = self
            .method
            .map(|method| {
                Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .context(InvalidMethodSnafu { method })
            })
            .transpose()?;

        let headers = if self.headers.is_empty() {
            None
        } else {
            let mut headers = HeaderMap::with_capacity(self.headers.len());
            for (name, value) in self.headers {
                let header_name =
                    HeaderName::from_bytes(name.as_bytes()).context(InvalidHeaderNameSnafu {
                        name: name.as_str(),
                    })?;
                let header_value =
                    HeaderValue::from_str(&value).context(InvalidHeaderValueSnafu { name })?;
                headers.append(header_name, header_value);
            }
            Some(headers)
        };

        let query = (!self.query.is_empty())
            .then(|| Query::Map(self.query.into_iter().collect::<Params>()));

        Ok(DefaultOptions {
            base_url: self.base_url,
            method,
            headers,
            credentials: self.credentials,
            redirect: self.redirect,
            follow: self.follow,
            query,
            json: self.json,
            response_type: self.response_type,
            ..DefaultOptions::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_full_config() {
        let config: DefaultsConfig = serde_json::from_value(json!({
            "base_url": "https://api.test",
            "method": "PUT",
            "type": "array-buffer",
            "redirect": "manual",
            "follow": 3,
            "credentials": "include",
            "headers": { "x-api-key": "k" },
            "query": { "v": "2" },
            "json": { "a": 1 }
        }))
        .unwrap();

        let options = config.into_options().unwrap();
        assert_eq!(options.base_url.as_deref(), Some("https://api.test"));
        assert_eq!(options.method, Some(Method::PUT));
        assert_eq!(options.response_type, Some(ResponseType::ArrayBuffer));
        assert_eq!(options.redirect, Some(Redirect::Manual));
        assert_eq!(options.follow, Some(3));
        assert_eq!(options.credentials, Some(Credentials::Include));
        assert_eq!(options.headers.unwrap()["x-api-key"], "k");
        assert_eq!(
            options.query,
            Some(Query::Map(Params::new().with("v", "2")))
        );
        assert_eq!(options.json, Some(json!({"a": 1})));
        assert!(options.hooks.is_empty());
    }

    #[test]
    fn test_empty_config() {
        let options = serde_json::from_str::<DefaultsConfig>("{}")
            .unwrap()
            .into_options()
            .unwrap();
        assert!(options.method.is_none());
        assert!(options.headers.is_none());
        assert!(options.query.is_none());
    }

    #[test]
    fn test_invalid_header_name() {
        let config = DefaultsConfig {
            headers: BTreeMap::from([("bad name".to_owned(), "v".to_owned())]),
            ..DefaultsConfig::default()
        };
        assert!(matches!(
            config.into_options(),
            Err(ConfigError::InvalidHeaderName { name, .. }) if name == "bad name"
        ));
    }

    #[test]
    fn test_invalid_method() {
        let config = DefaultsConfig {
            method: Some("GE T".to_owned()),
            ..DefaultsConfig::default()
        };
        assert!(matches!(
            config.into_options(),
            Err(ConfigError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(serde_json::from_str::<DefaultsConfig>(r#"{"agent": 1}"#).is_err());
    }
}
