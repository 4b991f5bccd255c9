use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, Url};
use serde_json::Value;
use tracing::debug;

use crate::endpoints::{HumeEndpoint, RequestBody};
use crate::error::{Error, Result};

const HUME_API_KEY_HEADER: &str = "X-Hume-Api-Key";
const APPLICATION_JSON: &str = "application/json";

pub const DEFAULT_BASE_URL: &str = "https://api.hume.ai";

/// Authenticated handle on the Hume API.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HumeClient {
    inner: reqwest::Client,
    api_key: String,
    base: Url,
}

impl HumeClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host, e.g. a local mock of the API.
    pub fn with_base_url(api_key: impl Into<String>, base: impl AsRef<str>) -> Result<Self> {
        let base = Url::parse(base.as_ref()).map_err(|e| Error::InvalidBaseUrl(e.to_string()))?;
        Ok(Self {
            inner: reqwest::Client::new(),
            api_key: api_key.into(),
            base,
        })
    }

    pub async fn hit<T: HumeEndpoint>(&self, endpoint: T) -> Result<T::ResponseBody> {
        let url = endpoint.url(&self.base);
        debug!(method = %T::METHOD, %url, "dispatching request");

        let mut builder = self
            .inner
            .request(T::METHOD, url)
            .header(HUME_API_KEY_HEADER, &self.api_key);

        if matches!(T::METHOD, Method::POST | Method::PATCH) {
            match endpoint.request_body()? {
                RequestBody::Json(body) => {
                    builder = builder.header(CONTENT_TYPE, APPLICATION_JSON).json(&body);
                }
                RequestBody::Empty => return Err(Error::MissingRequestBody),
            }
        }

        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        endpoint.response_body(resp).await
    }
}

/// Turn a non-success response into [`Error::Api`], preferring the service's
/// own `message` field when the body is JSON.
async fn api_error(resp: Response) -> Error {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<Value>(&text) {
        Ok(body) => body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| body.to_string()),
        Err(_) if !text.is_empty() => text,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Error::Api {
        status: status.as_u16(),
        message,
    }
}
