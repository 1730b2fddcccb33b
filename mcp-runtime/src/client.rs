use std::fmt;
use std::time::Duration;

use guardian_core::error::GuardianError;
use guardian_core::intel::{LookupResult, TagDetails, TagIpsPage, TagSummary};
use guardian_core::validation::{Pagination, validate_ip, validate_tag_name};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::util::decode_body;

pub const DEFAULT_BASE_URL: &str = "https://api.guardianintel.io/v1";
pub const DEFAULT_AUTH_HEADER: &str = "X-API-Key";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
pub const USER_AGENT: &str = concat!("guardian-intel-mcp/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`GuardianClient`]. Immutable once the client is built.
#[derive(Clone)]
pub struct ClientConfig {
    api_key: String,
    base_url: String,
    auth_header: String,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Header that carries the API key. Defaults to `X-API-Key`.
    pub fn with_auth_header(mut self, auth_header: impl Into<String>) -> Self {
        self.auth_header = auth_header.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("auth_header", &self.auth_header)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Authenticated client for the Guardian Intel REST API.
///
/// Cloning is cheap and shares the underlying connection pool. Every data call
/// validates its input before touching the network and reports failures as a
/// normalized [`GuardianError`].
#[derive(Clone, Debug)]
pub struct GuardianClient {
    config: ClientConfig,
    base: Url,
    http: reqwest::Client,
}

impl GuardianClient {
    pub fn new(config: ClientConfig) -> Result<Self, GuardianError> {
        if config.api_key.trim().is_empty() {
            return Err(GuardianError::Config("API key is required".to_string()));
        }

        let base = Url::parse(config.base_url.trim()).map_err(|e| {
            GuardianError::Config(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(GuardianError::Config(format!(
                "Invalid base URL '{}': not a hierarchical URL",
                config.base_url
            )));
        }

        let header_name = HeaderName::from_bytes(config.auth_header.trim().as_bytes())
            .map_err(|e| {
                GuardianError::Config(format!(
                    "Invalid auth header name '{}': {e}",
                    config.auth_header
                ))
            })?;
        let mut header_value = HeaderValue::from_str(config.api_key.trim())
            .map_err(|_| GuardianError::Config("API key contains invalid characters".to_string()))?;
        header_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header_name, header_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| GuardianError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { config, base, http })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub async fn lookup_ip(&self, ip: &str) -> Result<LookupResult, GuardianError> {
        validate_ip(ip)?;
        let url = self.endpoint(&["query", ip])?;
        self.get_result(url).await
    }

    pub async fn get_tags(&self, include_descriptions: bool) -> Result<Vec<TagSummary>, GuardianError> {
        let mut url = self.endpoint(&["tags"])?;
        if include_descriptions {
            url.query_pairs_mut().append_pair("includeDescriptions", "true");
        }
        self.get_result(url).await
    }

    pub async fn get_tag_details(&self, tag_name: &str) -> Result<TagDetails, GuardianError> {
        validate_tag_name(tag_name)?;
        let url = self.endpoint(&["tags", tag_name])?;
        self.get_result(url).await
    }

    pub async fn get_tag_ips(
        &self,
        tag_name: &str,
        pagination: &Pagination,
    ) -> Result<TagIpsPage, GuardianError> {
        validate_tag_name(tag_name)?;
        let window = pagination.validate()?;

        let mut url = self.endpoint(&["tags", tag_name, "ips"])?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("offset", &window.offset.to_string());
            qp.append_pair("limit", &window.limit.to_string());
            if let Some(snapshot) = &window.snapshot {
                qp.append_pair("snapshot", snapshot);
            }
        }
        self.get_result(url).await
    }

    /// Startup probe. Any non-error HTTP status counts as healthy; never fails.
    pub async fn health_check(&self) -> bool {
        let mut url = match self.endpoint(&["tags"]) {
            Ok(url) => url,
            Err(_) => return false,
        };
        url.query_pairs_mut().append_pair("limit", "1");

        match self.http.get(url).timeout(HEALTH_CHECK_TIMEOUT).send().await {
            Ok(response) => {
                let status = response.status();
                let healthy = !(status.is_client_error() || status.is_server_error());
                tracing::debug!(status = status.as_u16(), healthy, "Guardian Intel health probe");
                healthy
            }
            Err(err) => {
                tracing::warn!(error = %err, "Guardian Intel health probe failed");
                false
            }
        }
    }

    /// Release the connection pool. Idle connections close when the last clone is dropped.
    pub fn close(self) {
        tracing::debug!(base_url = %self.config.base_url, "closing Guardian Intel client");
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GuardianError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GuardianError::Config("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_result<T: DeserializeOwned>(&self, url: Url) -> Result<T, GuardianError> {
        tracing::debug!(path = url.path(), "Guardian Intel API request");

        let result = async {
            let response = self.http.get(url).send().await.map_err(normalize_transport_error)?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(normalize_transport_error)?;
            let body = decode_body(&bytes);
            if !status.is_success() {
                return Err(normalize_status_error(status, &body));
            }
            unwrap_result(body)
        }
        .await;

        if let Err(err) = &result {
            tracing::warn!(code = err.code(), error = %err, "Guardian Intel API call failed");
        }
        result
    }
}

/// Map a failed HTTP exchange that produced a response.
///
/// A JSON object body wins over the generic status table, so upstream wording
/// such as "Tag not found" is kept.
pub(crate) fn normalize_status_error(status: StatusCode, body: &Value) -> GuardianError {
    if let Some(obj) = body.as_object() {
        let message = ["message", "error", "detail", "description"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(scalar_text))
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());
        let code = ["statusCode", "code"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(scalar_text))
            .unwrap_or_else(|| status.as_u16().to_string());
        return GuardianError::upstream(code, message);
    }

    let message = match status.as_u16() {
        401 => "Invalid API key or unauthorized access",
        403 => "Access forbidden - check API key permissions",
        404 => "Resource not found",
        429 => "Rate limit exceeded - please try again later",
        500 => "Internal server error",
        503 => "Service temporarily unavailable",
        _ => status.canonical_reason().unwrap_or("HTTP error"),
    };
    GuardianError::upstream(status.as_u16().to_string(), message)
}

/// Map a failure where no response was received at all.
pub(crate) fn normalize_transport_error(err: reqwest::Error) -> GuardianError {
    if err.is_timeout() {
        GuardianError::Timeout
    } else if err.is_connect() {
        GuardianError::Connection
    } else {
        GuardianError::Transport(err.to_string())
    }
}

fn unwrap_result<T: DeserializeOwned>(body: Value) -> Result<T, GuardianError> {
    let Value::Object(mut envelope) = body else {
        return Err(GuardianError::InvalidResponse(
            "expected a JSON object".to_string(),
        ));
    };
    let result = envelope
        .remove("result")
        .filter(|value| !value.is_null())
        .ok_or_else(|| GuardianError::InvalidResponse("missing result field".to_string()))?;
    serde_json::from_value(result)
        .map_err(|e| GuardianError::InvalidResponse(format!("unexpected result shape: {e}")))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
