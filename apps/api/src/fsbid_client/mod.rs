//! FSBid client: the single point of entry for all calls to the upstream HR system.
//!
//! ARCHITECTURAL RULE: No other module may talk to FSBid over HTTP directly.
//! Every request forwards the caller's JWT and goes through this module.
//!
//! Reads use `call`, which applies the FSBid envelope rules (`Data` must be
//! present, `return_code`/`ReturnCode` must not be -1). Mutations that only
//! care about the HTTP status use `send`.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

#[cfg(test)]
pub(crate) mod stub;

/// Header FSBid reads the caller's token from.
pub const JWT_HEADER: &str = "JWTAuthorization";

/// Everything but the RFC 3986 unreserved characters is escaped, so a space
/// travels as `%20`, never `+`.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FSBid returned status {status}")]
    Status { status: u16 },

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("FSBid response carried no Data")]
    MissingData,

    #[error("FSBid reported a failed call (return code -1)")]
    FailureCode,

    #[error("Cannot build FSBid URL from root '{0}'")]
    InvalidUrl(String),
}

impl UpstreamError {
    /// Short name of the failure, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Http(_) => "Http",
            UpstreamError::Status { .. } => "Status",
            UpstreamError::Decode(_) => "Decode",
            UpstreamError::MissingData => "MissingData",
            UpstreamError::FailureCode => "FailureCode",
            UpstreamError::InvalidUrl(_) => "InvalidUrl",
        }
    }
}

/// Ordered query parameters. Keys may repeat, which is how FSBid takes list values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Pushes the pair only when a value is present.
    pub fn push_opt<V: Into<String>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Pushes one pair per value, all under the same key.
    pub fn push_all<I, V>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.push(key, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

#[cfg(test)]
impl QueryParams {
    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Joins `path` onto `root` segment by segment and appends the encoded query.
pub fn build_url(root: &Url, path: &str, params: &QueryParams) -> Result<Url, UpstreamError> {
    let mut url = root.clone();
    url.path_segments_mut()
        .map_err(|_| UpstreamError::InvalidUrl(root.to_string()))?
        .pop_if_empty()
        .extend(path.split('/').filter(|segment| !segment.is_empty()));

    if !params.is_empty() {
        url.set_query(Some(&encode_query(params)));
    }

    Ok(url)
}

fn encode_query(params: &QueryParams) -> String {
    params
        .pairs()
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_ENCODE_SET),
                utf8_percent_encode(value, QUERY_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Unwraps the `Data` member of an FSBid payload.
///
/// Both spellings of the return code field have been seen in the wild.
pub fn check_envelope(payload: Value) -> Result<Value, UpstreamError> {
    let failed = ["return_code", "ReturnCode"]
        .iter()
        .any(|field| payload.get(field).and_then(Value::as_i64) == Some(-1));
    if failed {
        return Err(UpstreamError::FailureCode);
    }

    match payload {
        Value::Object(mut map) => map
            .remove("Data")
            .filter(|data| !data.is_null())
            .ok_or(UpstreamError::MissingData),
        _ => Err(UpstreamError::MissingData),
    }
}

/// Shared FSBid HTTP client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct FsbidClient {
    client: Client,
}

impl FsbidClient {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Issues a read-style call and returns the payload's `Data`.
    ///
    /// Every failure is logged with the URL here, so callers may degrade
    /// silently to empty results.
    pub async fn call(&self, method: Method, url: Url, jwt: &str) -> Result<Value, UpstreamError> {
        let result = self.fetch(method, &url, jwt).await;
        match &result {
            Ok(_) => debug!("FSBid call to '{url}' succeeded"),
            Err(e) => error!("FSBid call to '{url}' failed: {e}"),
        }
        result
    }

    /// Issues a mutation and only checks for a 2xx status.
    pub async fn send(&self, method: Method, url: Url, jwt: &str) -> Result<(), UpstreamError> {
        let response = self.request(method, url.clone(), jwt).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("FSBid call to '{url}' returned {status}");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn fetch(&self, method: Method, url: &Url, jwt: &str) -> Result<Value, UpstreamError> {
        let response = self.request(method, url.clone(), jwt).send().await?;
        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)?;
        check_envelope(payload)
    }

    fn request(&self, method: Method, url: Url, jwt: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(JWT_HEADER, jwt)
            .header(CONTENT_TYPE, "application/json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_build_url_appends_path_to_root_path() {
        let url = build_url(
            &root("http://mock_fsbid:3333/v1/TrackingPrograms"),
            "bidders",
            &QueryParams::new(),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://mock_fsbid:3333/v1/TrackingPrograms/bidders");
    }

    #[test]
    fn test_build_url_handles_trailing_slash_root() {
        let url = build_url(&root("http://mock_fsbid:3333/"), "/bids/", &QueryParams::new())
            .unwrap();
        assert_eq!(url.as_str(), "http://mock_fsbid:3333/bids");
    }

    #[test]
    fn test_build_url_repeats_list_keys() {
        let mut params = QueryParams::new();
        params
            .push_all("te_id", ["1", "2"])
            .push("perdet_seq_num", "4");
        let url = build_url(&root("http://tp/v1"), "bidders", &params).unwrap();
        assert_eq!(url.query(), Some("te_id=1&te_id=2&perdet_seq_num=4"));
    }

    #[test]
    fn test_build_url_encodes_reserved_characters() {
        let mut params = QueryParams::new();
        params.push("request_params.freeText", "a&b=c/d");
        let url = build_url(&root("http://fsbid/v1"), "CDOClients", &params).unwrap();
        assert_eq!(url.query(), Some("request_params.freeText=a%26b%3Dc%2Fd"));
    }

    #[test]
    fn test_build_url_sends_spaces_as_percent_20() {
        let mut params = QueryParams::new();
        params
            .push("request_params.order_by", "per_last_name asc")
            .push("request_params.freeText", "John Smith");
        let url = build_url(&root("http://fsbid/v1"), "CDOClients", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "http://fsbid/v1/CDOClients?request_params.order_by=per_last_name%20asc&request_params.freeText=John%20Smith"
        );
    }

    #[test]
    fn test_build_url_keeps_unreserved_and_escapes_plus() {
        let mut params = QueryParams::new();
        params.push("q", "a-b_c.d~e+f");
        let url = build_url(&root("http://fsbid/v1"), "x", &params).unwrap();
        assert_eq!(url.query(), Some("q=a-b_c.d~e%2Bf"));
    }

    #[test]
    fn test_push_opt_skips_absent_values() {
        let mut params = QueryParams::new();
        params.push_opt("a", None::<String>).push_opt("b", Some("1"));
        assert_eq!(params.pairs(), &[("b".to_string(), "1".to_string())]);
        assert_eq!(params.get("b"), Some("1"));
        assert_eq!(params.get("a"), None);
    }

    #[test]
    fn test_envelope_null_data_is_missing() {
        let err = check_envelope(json!({ "Data": null })).unwrap_err();
        assert!(matches!(err, UpstreamError::MissingData));
    }

    #[test]
    fn test_envelope_absent_data_is_missing() {
        let err = check_envelope(json!({ "return_code": 0 })).unwrap_err();
        assert!(matches!(err, UpstreamError::MissingData));
    }

    #[test]
    fn test_envelope_snake_case_failure_code() {
        let err = check_envelope(json!({ "Data": [], "return_code": -1 })).unwrap_err();
        assert!(matches!(err, UpstreamError::FailureCode));
    }

    #[test]
    fn test_envelope_pascal_case_failure_code() {
        let err = check_envelope(json!({ "Data": [], "ReturnCode": -1 })).unwrap_err();
        assert!(matches!(err, UpstreamError::FailureCode));
    }

    #[test]
    fn test_envelope_empty_list_is_success() {
        let data = check_envelope(json!({ "Data": [], "return_code": 0 })).unwrap();
        assert_eq!(data, json!([]));
    }
}
