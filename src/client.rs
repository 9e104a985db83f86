use std::borrow::Cow;
use std::future::Future;

use clap::ValueEnum;
use reqwest::Client;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// What happens when a call fails below HTTP: the request could not be built,
/// the connection failed, or the body could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportErrors {
    /// Return the error to the caller, the test reports it as a failed request.
    #[default]
    Propagate,
    /// Log the error and hand back an empty body, which then fails to decode.
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum CallError {
    #[error("`{0}` is a path but no base url is configured")]
    MissingBaseUrl(String),

    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CapturedResponse {
    /// `None` when the call failed and the error was swallowed.
    pub status: Option<StatusCode>,
    pub body: Vec<u8>,
}

impl CapturedResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Perform one request and hand back the raw body.
pub trait ApiClient: Send + Sync {
    fn call(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<CapturedResponse, CallError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Option<String>,
    transport_errors: TransportErrors,
}

impl HttpClient {
    pub fn new(base_url: Option<String>, transport_errors: TransportErrors) -> Self {
        Self {
            client: Client::new(),
            base_url,
            transport_errors,
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<CapturedResponse, CallError> {
        let url = resolve_url(self.base_url.as_deref(), &request.url)?;

        tracing::debug!(method = %request.method, %url, "calling api");

        // The content type is sent even without a body, the service expects it
        // on every verb.
        let response = self
            .client
            .request(request.method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(request.body.clone().unwrap_or_default())
            .send()
            .await
            .map_err(|source| CallError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| CallError::Body {
                url: url.to_string(),
                source,
            })?
            .to_vec();

        tracing::debug!(%status, bytes = body.len(), "api responded");

        Ok(CapturedResponse {
            status: Some(status),
            body,
        })
    }
}

impl ApiClient for HttpClient {
    async fn call(&self, request: &ApiRequest) -> Result<CapturedResponse, CallError> {
        match self.send(request).await {
            Ok(response) => Ok(response),
            // The empty body fails to decode, so the test still reports it.
            Err(error) if self.transport_errors == TransportErrors::Log => {
                tracing::error!(%error, "api call failed, continuing with an empty body");
                Ok(CapturedResponse::empty())
            }
            Err(error) => Err(error),
        }
    }
}

/// Joins paths (`/compiler/v1/...`) onto the base url, absolute urls are used
/// as they are.
pub fn resolve_url(base_url: Option<&str>, raw: &str) -> Result<Url, CallError> {
    let joined;
    let target = if raw.starts_with('/') {
        let base_url = base_url.ok_or_else(|| CallError::MissingBaseUrl(raw.to_string()))?;
        joined = format!("{base_url}{raw}");
        joined.as_str()
    } else {
        raw
    };

    Url::parse(target).map_err(|source| CallError::InvalidUrl {
        url: target.to_string(),
        source,
    })
}
