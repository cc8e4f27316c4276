use core::time::Duration;

use anyhow::{anyhow, bail, Context, Error};
use bytes::Bytes;
use http::{header, uri::Scheme, Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::{native_tls, TlsConnector};

use super::Task;
use crate::cfg::Config;

const USER_AGENT: &str = concat!("stress-test/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed within a single request.
const MAX_REDIRECTS: usize = 10;

/// HTTP GET request following redirects.
///
/// Every hop uses a fresh connection. Only the status of the final response
/// is reported.
pub struct HttpTask {
    target: Uri,
    /// Used for HTTPS targets, including ones reached through a redirect.
    connector: TlsConnector,
    timeout: Option<Duration>,
}

impl HttpTask {
    pub fn new(cfg: &Config) -> Result<Self, Error> {
        // Fail early on a target we can't reach at all.
        let endpoint = Endpoint::new(&cfg.target)?;
        log::debug!("target endpoint: {:?}", endpoint);

        let connector = native_tls::TlsConnector::builder()
            .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
            .danger_accept_invalid_certs(!cfg.verify_tls)
            .danger_accept_invalid_hostnames(!cfg.verify_tls)
            .build()?;

        let m = Self {
            target: cfg.target.clone(),
            connector: TlsConnector::from(connector),
            timeout: cfg.timeout,
        };

        Ok(m)
    }

    async fn perform(&self) -> Result<u16, Error> {
        let mut uri = self.target.clone();
        let mut redirects = 0;

        loop {
            let endpoint = Endpoint::new(&uri)?;
            let (code, location) = self.perform_once(&endpoint).await?;

            let location = match location {
                Some(location) if is_redirect(code) => location,
                _ => return Ok(code),
            };
            if redirects == MAX_REDIRECTS {
                bail!("stopped after {MAX_REDIRECTS} redirects");
            }
            redirects += 1;

            uri = resolve(&uri, &location)?;
            log::trace!("following redirect {code} to {uri}");
        }
    }

    async fn perform_once(&self, endpoint: &Endpoint) -> Result<(u16, Option<String>), Error> {
        let stream = TcpStream::connect(&endpoint.addr)
            .await
            .with_context(|| format!("failed to connect to {}", endpoint.addr))?;

        if endpoint.is_tls {
            let stream = self
                .connector
                .connect(&endpoint.domain, stream)
                .await
                .with_context(|| format!("TLS handshake with {} failed", endpoint.addr))?;
            self.perform_request(stream, endpoint).await
        } else {
            self.perform_request(stream, endpoint).await
        }
    }

    async fn perform_request<S>(&self, stream: S, endpoint: &Endpoint) -> Result<(u16, Option<String>), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);
        let (mut sender, conn) = http1::handshake(io).await?;
        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                log::debug!("connection closed: {err}");
            }
        });

        let mut resp = sender
            .send_request(endpoint.request()?)
            .await
            .context("error making the request")?;

        let code = resp.status().as_u16();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        while let Some(frame) = resp.frame().await {
            frame.context("error reading the response body")?;
        }

        Ok((code, location))
    }
}

impl Task for HttpTask {
    async fn execute(&self) -> Result<u16, Error> {
        match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.perform()).await {
                Ok(rc) => rc,
                Err(..) => Err(anyhow!("request to {} timed out after {:?}", self.target, timeout)),
            },
            None => self.perform().await,
        }
    }
}

/// Connection and request parameters derived from an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    /// Endpoint in "host:port" form.
    addr: String,
    /// Value of the "Host" header.
    host: String,
    /// Server name used for SNI and, if enabled, certificate verification.
    domain: String,
    /// Request target in origin form.
    path: Uri,
    is_tls: bool,
}

impl Endpoint {
    fn new(uri: &Uri) -> Result<Self, Error> {
        let is_tls = match uri.scheme() {
            Some(scheme) if *scheme == Scheme::HTTPS => true,
            Some(scheme) if *scheme == Scheme::HTTP => false,
            _ => bail!("unsupported URL '{uri}'"),
        };
        let host = uri.host().ok_or_else(|| anyhow!("URL '{uri}' has no host"))?;
        let port = uri.port_u16().unwrap_or(if is_tls { 443 } else { 80 });

        let m = Self {
            addr: format!("{host}:{port}"),
            host: match uri.port_u16() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            },
            domain: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            path: uri.path_and_query().map(|v| v.as_str()).unwrap_or("/").parse()?,
            is_tls,
        };

        Ok(m)
    }

    fn request(&self) -> Result<Request<Empty<Bytes>>, Error> {
        let request = Request::get(self.path.clone())
            .header(header::HOST, &self.host)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Empty::new())?;

        Ok(request)
    }
}

#[inline]
fn is_redirect(code: u16) -> bool {
    matches!(code, 301 | 302 | 303 | 307 | 308)
}

/// Resolves the "Location" header value against the URL it was received
/// from.
fn resolve(base: &Uri, location: &str) -> Result<Uri, Error> {
    let scheme = base.scheme_str().unwrap_or("http");
    let authority = base.authority().map(|v| v.as_str()).unwrap_or_default();

    let uri = if location.contains("://") {
        location.to_string()
    } else if let Some(rest) = location.strip_prefix("//") {
        format!("{scheme}://{rest}")
    } else if location.starts_with('/') {
        format!("{scheme}://{authority}{location}")
    } else {
        let path = base.path();
        let dir = &path[..path.rfind('/').map_or(0, |idx| idx + 1)];
        let dir = if dir.is_empty() { "/" } else { dir };
        format!("{scheme}://{authority}{dir}{location}")
    };

    uri.parse()
        .with_context(|| format!("invalid redirect location '{location}'"))
}

#[cfg(test)]
mod test {
    use super::*;

    fn uri(v: &str) -> Uri {
        v.parse().unwrap()
    }

    #[test]
    fn test_plain_endpoint() {
        let endpoint = Endpoint::new(&uri("http://example.com/api/v1?x=1")).unwrap();

        assert_eq!("example.com:80", endpoint.addr);
        assert_eq!("example.com", endpoint.host);
        assert!(!endpoint.is_tls);

        let request = endpoint.request().unwrap();
        assert_eq!("/api/v1?x=1", request.uri().to_string());
        assert_eq!("example.com", request.headers()[header::HOST]);
        assert_eq!(http::Method::GET, request.method());
    }

    #[test]
    fn test_explicit_port() {
        let endpoint = Endpoint::new(&uri("http://127.0.0.1:8080")).unwrap();

        assert_eq!("127.0.0.1:8080", endpoint.addr);
        assert_eq!("127.0.0.1:8080", endpoint.host);
        assert_eq!("/", endpoint.request().unwrap().uri().to_string());
    }

    #[test]
    fn test_tls_endpoint() {
        let endpoint = Endpoint::new(&uri("https://[::1]/health")).unwrap();

        assert_eq!("[::1]:443", endpoint.addr);
        assert_eq!("::1", endpoint.domain);
        assert!(endpoint.is_tls);
    }

    #[test]
    fn test_task_keeps_timeout() {
        let cfg = Config::new("https://localhost/", 1, 1)
            .unwrap()
            .with_timeout(Duration::from_secs(1));
        let task = HttpTask::new(&cfg).unwrap();

        assert_eq!(Some(Duration::from_secs(1)), task.timeout);
        assert_eq!(cfg.target, task.target);
    }

    #[test]
    fn test_is_redirect() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect(code), "{code}");
        }
        for code in [200, 300, 304, 305, 404, 500] {
            assert!(!is_redirect(code), "{code}");
        }
    }

    #[test]
    fn test_resolve() {
        let base = uri("http://example.com:8080/a/b?x=1");
        let cases = [
            ("/ok", "http://example.com:8080/ok"),
            ("c", "http://example.com:8080/a/c"),
            ("//other.org/p", "http://other.org/p"),
            ("https://secure.example.com/", "https://secure.example.com/"),
        ];

        for (location, expected) in cases {
            assert_eq!(expected, resolve(&base, location).unwrap().to_string());
        }
    }

    #[test]
    fn test_resolve_relative_to_root() {
        let base = uri("http://example.com");

        assert_eq!("http://example.com/next", resolve(&base, "next").unwrap().to_string());
    }
}
