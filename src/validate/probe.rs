use std::io::{ErrorKind, Read};
use std::time::Duration;

use thiserror::Error;
use ureq::http::Response;
use ureq::{Agent, Body};
use url::Url;

const BODY_LIMIT: u64 = 64 * 1024;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Classified transport failure. The display strings are what ends up in
/// `ValidationResult::error`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Timeout")]
    Timeout,
    #[error("SSL Error")]
    Tls,
    #[error("Connection Error")]
    Connection,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Error: {0}")]
    Other(String),
}

impl From<ureq::Error> for ProbeError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => ProbeError::Timeout,
            ureq::Error::TooManyRedirects => ProbeError::TooManyRedirects,
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => ProbeError::Connection,
            ureq::Error::Io(io) => match io.kind() {
                ErrorKind::TimedOut | ErrorKind::WouldBlock => ProbeError::Timeout,
                ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::AddrNotAvailable
                | ErrorKind::BrokenPipe
                | ErrorKind::UnexpectedEof => ProbeError::Connection,
                _ => classify_message(io.to_string()),
            },
            other => classify_message(other.to_string()),
        }
    }
}

fn classify_message(message: String) -> ProbeError {
    let lower = message.to_lowercase();
    if ["tls", "ssl", "certificate", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        ProbeError::Tls
    } else {
        ProbeError::Other(message.chars().take(50).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
    /// GET with browser-like headers, for hosts behind challenge pages.
    BrowserGet,
}

impl Method {
    pub fn retry_label(self) -> &'static str {
        match self {
            Method::Head => "head",
            Method::Get => "get",
            Method::BrowserGet => "browser-get",
        }
    }
}

/// Terminal response of a request after redirects.
#[derive(Debug, Clone)]
pub struct Probe {
    pub status: u16,
    pub final_url: String,
    pub redirects: u32,
    /// Lowercase header names.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

pub struct HttpProber {
    agent: Agent,
    max_redirects: u32,
    user_agent: String,
}

impl HttpProber {
    pub fn new(timeout: Duration, max_redirects: u32, user_agent: &str, use_env_proxy: bool) -> Self {
        // Redirects are followed by hand so every hop is counted.
        let mut builder = Agent::config_builder()
            .timeout_global(Some(timeout))
            .max_redirects(0)
            .http_status_as_error(false);
        if !use_env_proxy {
            builder = builder.proxy(None);
        }
        let agent: Agent = builder.build().into();
        Self {
            agent,
            max_redirects,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn fetch(&self, url: &Url, method: Method) -> Result<Probe, ProbeError> {
        let mut current = url.clone();
        let mut redirects = 0;

        loop {
            let response = self.send(&current, method)?;
            let status = response.status().as_u16();

            if let Some(location) = redirect_target(&response) {
                if redirects >= self.max_redirects {
                    return Err(ProbeError::TooManyRedirects);
                }
                current = current
                    .join(&location)
                    .map_err(|e| ProbeError::Other(format!("bad redirect target: {}", e)))?;
                redirects += 1;
                tracing::trace!(url = %current, hop = redirects, "following redirect");
                continue;
            }

            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_lowercase(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            let body = if method == Method::Head {
                None
            } else {
                read_body(response)
            };

            return Ok(Probe {
                status,
                final_url: current.to_string(),
                redirects,
                headers,
                body,
            });
        }
    }

    fn send(&self, url: &Url, method: Method) -> Result<Response<Body>, ureq::Error> {
        match method {
            Method::Head => self
                .agent
                .head(url.as_str())
                .header("User-Agent", self.user_agent.as_str())
                .call(),
            Method::Get => self
                .agent
                .get(url.as_str())
                .header("User-Agent", self.user_agent.as_str())
                .call(),
            Method::BrowserGet => self
                .agent
                .get(url.as_str())
                .header("User-Agent", BROWSER_USER_AGENT)
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header("Accept-Language", "en-US,en;q=0.9")
                .call(),
        }
    }
}

fn redirect_target(response: &Response<Body>) -> Option<String> {
    if !matches!(response.status().as_u16(), 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn read_body(response: Response<Body>) -> Option<String> {
    let mut buf = Vec::new();
    response
        .into_body()
        .into_reader()
        .take(BODY_LIMIT)
        .read_to_end(&mut buf)
        .ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}
