use core::{num::NonZero, time::Duration};

use http::{uri::Scheme, Uri};
use thiserror::Error;

use crate::cmd::{Cmd, Format};

/// Configuration errors.
///
/// All of them are detected before any request is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("URL is required")]
    EmptyUrl,
    #[error("invalid URL '{url}': {err}")]
    InvalidUrl { url: String, err: http::uri::InvalidUri },
    #[error("unsupported URL '{0}': only absolute http and https URLs are allowed")]
    UnsupportedUrl(String),
    #[error("number of requests and concurrency must be positive")]
    Zero,
    #[error("number of requests ({requests}) should be greater than concurrency ({concurrency})")]
    TooFewRequests { requests: usize, concurrency: usize },
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target URL.
    pub target: Uri,
    /// Total number of requests to perform.
    pub requests: NonZero<usize>,
    /// Maximum number of requests in flight.
    pub concurrency: NonZero<usize>,
    /// Per-request timeout, if any.
    pub timeout: Option<Duration>,
    /// Whether to verify TLS peer certificates.
    pub verify_tls: bool,
    /// Report format.
    pub format: Format,
}

impl Config {
    /// Constructs a new [`Config`] with TLS verification disabled, no timeout
    /// and text output.
    pub fn new(target: &str, requests: usize, concurrency: usize) -> Result<Self, ConfigError> {
        let requests = NonZero::new(requests).ok_or(ConfigError::Zero)?;
        let concurrency = NonZero::new(concurrency).ok_or(ConfigError::Zero)?;

        let m = Self {
            target: parse_target(target)?,
            requests,
            concurrency,
            timeout: None,
            verify_tls: false,
            format: Format::Text,
        };
        m.validate()?;

        Ok(m)
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` if the target must be reached over TLS.
    #[inline]
    pub fn is_tls(&self) -> bool {
        self.target.scheme() == Some(&Scheme::HTTPS)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.requests < self.concurrency {
            return Err(ConfigError::TooFewRequests {
                requests: self.requests.get(),
                concurrency: self.concurrency.get(),
            });
        }

        Ok(())
    }
}

impl TryFrom<Cmd> for Config {
    type Error = ConfigError;

    fn try_from(cmd: Cmd) -> Result<Self, Self::Error> {
        let Cmd {
            url,
            requests,
            concurrency,
            timeout,
            verify_tls,
            format,
            verbose: _,
        } = cmd;

        let m = Self {
            target: parse_target(&url)?,
            requests,
            concurrency,
            timeout: timeout.map(Duration::from_millis),
            verify_tls,
            format,
        };
        m.validate()?;

        Ok(m)
    }
}

fn parse_target(url: &str) -> Result<Uri, ConfigError> {
    if url.is_empty() {
        return Err(ConfigError::EmptyUrl);
    }

    let uri: Uri = url.parse().map_err(|err| ConfigError::InvalidUrl { url: url.to_string(), err })?;

    match uri.scheme() {
        Some(scheme) if *scheme == Scheme::HTTP || *scheme == Scheme::HTTPS => {}
        _ => return Err(ConfigError::UnsupportedUrl(url.to_string())),
    }
    match uri.host() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(ConfigError::UnsupportedUrl(url.to_string())),
    }

    Ok(uri)
}
