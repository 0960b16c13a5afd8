use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::Config;
use crate::error_mapping::is_throttling_code;
use crate::errors::FacebookError;

/// Error envelope of the Graph API: `{"error": {"message", "code", ...}}`.
#[derive(Debug, Default, Deserialize)]
struct GraphErrorEnvelope {
    #[serde(default)]
    error: Option<GraphErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    fbtrace_id: Option<String>,
}

/// Low-level HTTP client for the Facebook Graph API.
///
/// Performs exactly one request per [`GraphClient::send`] and classifies the
/// response. Rate limiting is the caller's job.
#[derive(Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl GraphClient {
    /// Creates a new `GraphClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - Base URL, API version, access token and request timeout.
    pub fn new(config: &Config) -> Result<Self, FacebookError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                FacebookError::validation(format!("Failed to create Graph API client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Full URL for an endpoint such as `act_123/campaigns`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.api_version,
            endpoint.trim_start_matches('/')
        )
    }

    /// Sends one request to the Graph API.
    ///
    /// # Arguments
    ///
    /// * `method` - GET, POST or DELETE; anything else is rejected before any I/O.
    /// * `endpoint` - Path below the API version, e.g. `act_123/campaigns`.
    /// * `params` - Query parameters; `access_token` is always appended.
    /// * `body` - JSON body, only sent with POST.
    ///
    /// # Returns
    ///
    /// * `Result<Value, FacebookError>` - The parsed response body.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, FacebookError> {
        if method != Method::GET && method != Method::POST && method != Method::DELETE {
            return Err(FacebookError::validation(format!(
                "Unsupported HTTP method: {}",
                method
            )));
        }

        let url = self.endpoint_url(endpoint);
        let mut query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        query.push(("access_token", self.access_token.as_str()));

        tracing::info!("Facebook API {} {}", method, endpoint);
        // Redact token from logs to prevent credential exposure
        tracing::debug!("Facebook API URL: {}?access_token=[REDACTED]", url);

        let mut request = self.client.request(method.clone(), &url).query(&query);
        if method == Method::POST {
            if let Some(body) = body {
                request = request.json(body);
            }
        }

        // reqwest errors carry the request URL, which includes the token.
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!("Facebook API request error on {}: {}", endpoint, e);
            FacebookError::transport(e.to_string())
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            FacebookError::transport(format!(
                "Failed to read Facebook response: {}",
                e.without_url()
            ))
        })?;

        classify_response(status, endpoint, &bytes)
    }
}

/// Classifies a raw Graph API response.
///
/// * 2xx: parsed JSON body (`{}` when empty).
/// * 404: `NotFound` for the endpoint.
/// * 429: `RateLimited`; no retry hint is read from the response.
/// * anything else: `ApiError` with the platform code and message, tolerating
///   an empty or non-JSON body.
pub fn classify_response(
    status: StatusCode,
    endpoint: &str,
    body: &[u8],
) -> Result<Value, FacebookError> {
    if status.is_success() {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(json!({}));
        }
        return serde_json::from_slice(body).map_err(|e| FacebookError::ApiError {
            code: None,
            message: format!("Failed to parse Facebook response: {}", e),
            http_status: Some(status.as_u16()),
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(FacebookError::NotFound {
            resource_id: endpoint.to_string(),
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Facebook API throttled request to {}", endpoint);
        return Err(FacebookError::RateLimited { retry_after: None });
    }

    let envelope: GraphErrorEnvelope = serde_json::from_slice(body).unwrap_or_default();
    let error = envelope.error.unwrap_or_default();

    let code = error.code.and_then(|c| match c {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    });
    let message = error
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "Unknown error".to_string());

    if code.as_deref().is_some_and(is_throttling_code) {
        tracing::warn!(
            "Facebook API reported throttling on {} (code {:?}): {}",
            endpoint,
            code,
            message
        );
    } else {
        tracing::error!(
            "Facebook API returned {} on {} (code {:?}, type {:?}, trace {:?}): {}",
            status,
            endpoint,
            code,
            error.kind,
            error.fbtrace_id,
            message
        );
    }

    Err(FacebookError::ApiError {
        code,
        message,
        http_status: Some(status.as_u16()),
    })
}
