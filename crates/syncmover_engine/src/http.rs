//! HTTP implementation of the daemon control client.
//!
//! The actual HTTP library sits behind [`HttpClient`], so the request
//! building, authentication and status mapping here can be exercised
//! without a network. A `reqwest` backed client is provided behind the
//! `http` feature.
//!
//! Requests are bounded only by the pass context: the remaining deadline
//! becomes the request timeout, and cancelling the context aborts a
//! request in flight.

use crate::context::Context;
use crate::daemon::DaemonClient;
use crate::error::{MoverError, MoverResult};
use std::time::Duration;
use syncmover_protocol::{Connections, RemoteConfig, SystemStatus};

/// Header carrying the pre-shared API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

const CONFIG_PATH: &str = "/rest/config";
const SYSTEM_STATUS_PATH: &str = "/rest/system/status";
const CONNECTIONS_PATH: &str = "/rest/system/connections";

/// HTTP method used by the control API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

/// A request to the control API.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
    /// Time allowed for the whole exchange; `None` is unbounded.
    pub timeout: Option<Duration>,
}

/// A response from the control API.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual transport. An `Err` means
/// no response was received at all. Implementations must give up on the
/// request and return promptly once `ctx` is cancelled.
pub trait HttpClient: Send + Sync {
    /// Performs one request.
    fn send(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// Control API client speaking JSON over HTTP.
pub struct HttpDaemonClient<C: HttpClient> {
    /// Base URL of the control API (e.g., "https://127.0.0.1:8384").
    base_url: String,
    /// HTTP client implementation.
    client: C,
}

impl<C: HttpClient> HttpDaemonClient<C> {
    /// Creates a new control API client.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn exchange(
        &self,
        ctx: &Context,
        api_key: &str,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> MoverResult<Vec<u8>> {
        ctx.check()?;

        let request = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers: vec![
                (API_KEY_HEADER.to_string(), api_key.to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
            timeout: ctx.remaining(),
        };

        tracing::trace!(method = method.as_str(), url = %request.url, "control api request");
        let response = self.client.send(ctx, request).map_err(|e| {
            // cancellation or a deadline that fired mid-flight wins
            match ctx.check() {
                Err(ctx_err) => ctx_err,
                Ok(()) => MoverError::transport_retryable(e),
            }
        })?;

        match response.status {
            _ if response.is_success() => Ok(response.body),
            401 | 403 => Err(MoverError::AuthenticationFailed(format!(
                "{} {} returned {}",
                method.as_str(),
                path,
                response.status
            ))),
            status => Err(MoverError::Daemon {
                status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }),
        }
    }
}

impl<C: HttpClient> DaemonClient for HttpDaemonClient<C> {
    fn get_config(&self, ctx: &Context, api_key: &str) -> MoverResult<RemoteConfig> {
        let body = self.exchange(ctx, api_key, Method::Get, CONFIG_PATH, None)?;
        Ok(RemoteConfig::decode(&body)?)
    }

    fn put_config(&self, ctx: &Context, api_key: &str, config: &RemoteConfig) -> MoverResult<()> {
        let body = config.encode()?;
        self.exchange(ctx, api_key, Method::Put, CONFIG_PATH, Some(body))?;
        Ok(())
    }

    fn system_status(&self, ctx: &Context, api_key: &str) -> MoverResult<SystemStatus> {
        let body = self.exchange(ctx, api_key, Method::Get, SYSTEM_STATUS_PATH, None)?;
        Ok(SystemStatus::decode(&body)?)
    }

    fn connections(&self, ctx: &Context, api_key: &str) -> MoverResult<Connections> {
        let body = self.exchange(ctx, api_key, Method::Get, CONNECTIONS_PATH, None)?;
        Ok(Connections::decode(&body)?)
    }
}

/// How often a request in flight looks at the cancellation flag.
#[cfg(feature = "http")]
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// `reqwest` client driven on a private single-threaded runtime.
///
/// Each request races against the context's cancellation flag and is
/// dropped, closing its connection, as soon as the flag is set. Must not be
/// used from inside another async runtime.
#[cfg(feature = "http")]
pub struct ReqwestClient {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

#[cfg(feature = "http")]
impl ReqwestClient {
    /// Creates a client. With `accept_invalid_certs` the daemon's
    /// self-signed certificate is accepted.
    pub fn new(accept_invalid_certs: bool) -> MoverResult<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| {
                MoverError::transport_fatal(format!("failed to create HTTP client: {e}"))
            })?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MoverError::transport_fatal(format!("failed to create runtime: {e}")))?;
        Ok(Self { client, runtime })
    }
}

#[cfg(feature = "http")]
impl HttpClient for ReqwestClient {
    fn send(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        // the async client has no default timeout
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let url = request.url;
        self.runtime.block_on(async {
            tokio::select! {
                result = fetch(builder, &url) => result,
                () = cancelled(ctx) => Err(format!("request to {url} cancelled")),
            }
        })
    }
}

#[cfg(feature = "http")]
async fn fetch(builder: reqwest::RequestBuilder, url: &str) -> Result<HttpResponse, String> {
    let response = builder.send().await.map_err(|e| {
        if e.is_timeout() {
            format!("request to {url} timed out")
        } else {
            format!("request to {url} failed: {e}")
        }
    })?;
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| format!("failed to read response body: {e}"))?
        .to_vec();
    Ok(HttpResponse { status, body })
}

#[cfg(feature = "http")]
async fn cancelled(ctx: &Context) {
    while !ctx.is_cancelled() {
        tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
    }
}

/// Builds a control API client for `config` using `reqwest`.
#[cfg(feature = "http")]
pub fn connect(
    config: &crate::config::MoverConfig,
) -> MoverResult<HttpDaemonClient<ReqwestClient>> {
    let client = ReqwestClient::new(config.accept_invalid_certs)?;
    Ok(HttpDaemonClient::new(config.api_url.clone(), client))
}
