use std::error::Error as _;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde_json::Value;
use stdkit_base::catcher;
use stdkit_base::{ErrorKind, StdkitError, StdkitResult};
use tracing::{debug, instrument};

use super::info::{TransferInfo, TransferInfoKey};
use super::method::HttpMethod;

const DEFAULT_MAX_REDIRECTS: usize = 10;

/// One setting of a [`TransferClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOption {
    Url(String),
    Method(HttpMethod),
    /// Adds a request header; earlier headers with the same name are kept.
    Header(String, String),
    Body(Vec<u8>),
    /// Limit for the whole transfer, including reading the body.
    Timeout(Duration),
    ConnectTimeout(Duration),
    FollowRedirects(bool),
    MaxRedirects(usize),
    UserAgent(String),
    /// Treat a response status of 400 or above as a failed transfer.
    FailOnError(bool),
}

/// A configurable HTTP transfer that returns the response body.
///
/// Cloning copies the options but not the information about past transfers.
#[derive(Debug)]
pub struct TransferClient {
    url: Option<String>,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    follow_redirects: bool,
    max_redirects: usize,
    user_agent: Option<String>,
    fail_on_error: bool,
    info: Option<TransferInfo>,
}

impl Default for TransferClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TransferClient {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            method: self.method,
            headers: self.headers.clone(),
            body: self.body.clone(),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
            user_agent: self.user_agent.clone(),
            fail_on_error: self.fail_on_error,
            info: None,
        }
    }
}

impl TransferClient {
    pub fn new() -> Self {
        Self {
            url: None,
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
            timeout: None,
            connect_timeout: None,
            follow_redirects: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: None,
            fail_on_error: false,
            info: None,
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        let mut client = Self::new();
        client.set_option(TransferOption::Url(url.into()));
        client
    }

    pub fn set_option(&mut self, option: TransferOption) -> &mut Self {
        match option {
            TransferOption::Url(url) => self.url = Some(url),
            TransferOption::Method(method) => self.method = method,
            TransferOption::Header(name, value) => self.headers.push((name, value)),
            TransferOption::Body(body) => self.body = Some(body),
            TransferOption::Timeout(timeout) => self.timeout = Some(timeout),
            TransferOption::ConnectTimeout(timeout) => self.connect_timeout = Some(timeout),
            TransferOption::FollowRedirects(follow) => self.follow_redirects = follow,
            TransferOption::MaxRedirects(max) => self.max_redirects = max,
            TransferOption::UserAgent(agent) => self.user_agent = Some(agent),
            TransferOption::FailOnError(fail) => self.fail_on_error = fail,
        }
        self
    }

    pub fn set_options(&mut self, options: impl IntoIterator<Item = TransferOption>) -> &mut Self {
        for option in options {
            self.set_option(option);
        }
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Performs the transfer and returns the response body.
    #[instrument(skip(self), fields(method = %self.method, url = self.url.as_deref().unwrap_or_default()))]
    pub fn execute(&mut self) -> StdkitResult<Vec<u8>> {
        self.info = None;
        catcher::run(|| self.perform()).map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::Transfer { message } => message.clone(),
                _ => err.to_string(),
            };
            debug!(%reason, "transfer failed");
            Box::new(StdkitError::new(ErrorKind::Transfer {
                message: format!("Transfer request failed: {reason}."),
            }))
        })
    }

    fn perform(&mut self) -> StdkitResult<Vec<u8>> {
        let started = Instant::now();
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| transfer_error("no URL set".to_string()))?;
        let redirects = if self.follow_redirects {
            Policy::limited(self.max_redirects)
        } else {
            Policy::none()
        };
        let mut builder = Client::builder().redirect(redirects).timeout(self.timeout);
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        let client = builder.build().map_err(reqwest_error)?;

        let mut request = client.request(self.method.to_reqwest(), url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }
        debug!("sending request");
        let response = request.send().map_err(reqwest_error)?;
        let status = response.status();
        let effective_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let failed = self.fail_on_error && (status.is_client_error() || status.is_server_error());
        let body = if failed {
            Vec::new()
        } else {
            response.bytes().map_err(reqwest_error)?.to_vec()
        };
        self.info = Some(TransferInfo {
            effective_url,
            response_code: status.as_u16(),
            content_type,
            total_time: started.elapsed().as_secs_f64(),
            size_download: body.len() as u64,
            headers,
        });
        debug!(status = status.as_u16(), size = body.len(), "received response");
        if failed {
            return Err(transfer_error(format!(
                "The requested URL returned error: {status}"
            )));
        }
        Ok(body)
    }

    /// Information about the last successful or status-failed transfer.
    pub fn info(&self) -> Option<&TransferInfo> {
        self.info.as_ref()
    }

    pub fn get_info(&self, key: TransferInfoKey) -> Option<Value> {
        self.info.as_ref().map(|info| info.get(key))
    }

    /// Names the HTTP stack transfers run on.
    pub fn version() -> &'static str {
        concat!("stdkit/", env!("CARGO_PKG_VERSION"), " reqwest-blocking rustls")
    }
}

fn transfer_error(message: String) -> Box<StdkitError> {
    Box::new(StdkitError::new(ErrorKind::Transfer { message }))
}

/// Joins the error with its sources, which carry the useful detail such as "connection refused".
fn reqwest_error(err: reqwest::Error) -> Box<StdkitError> {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    transfer_error(reason)
}
