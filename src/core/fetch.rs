use crate::core::client::{build_client, request_headers};
use crate::domain::model::{FetchOptions, FetchResponse, HttpProtocol};
use crate::domain::ports::HostResolver;
use crate::utils::error::{FetchError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use url::{Host, Url};

/// Fetches `url` and returns the body decoded as text, using the protocol
/// selected in `options`.
pub async fn get_string(url: &str, options: &FetchOptions) -> Result<String> {
    match options.protocol {
        HttpProtocol::Http1 => get_string_http1(url, options).await,
        HttpProtocol::Http2 => get_string_http2(url, options).await,
    }
}

/// Fetches `url` and returns the raw body, using the protocol selected in
/// `options`.
pub async fn get_data(url: &str, options: &FetchOptions) -> Result<Vec<u8>> {
    match options.protocol {
        HttpProtocol::Http1 => get_data_http1(url, options).await,
        HttpProtocol::Http2 => get_data_http2(url, options).await,
    }
}

pub async fn get_string_http1(url: &str, options: &FetchOptions) -> Result<String> {
    let options = options.clone().with_protocol(HttpProtocol::Http1);
    let (client, target, headers) = prepare(url, &options)?;
    read_text(send(&client, target, &headers).await?).await
}

pub async fn get_string_http2(url: &str, options: &FetchOptions) -> Result<String> {
    let options = options.clone().with_protocol(HttpProtocol::Http2);
    let (client, target, headers) = prepare(url, &options)?;
    read_text(send(&client, target, &headers).await?).await
}

pub async fn get_data_http1(url: &str, options: &FetchOptions) -> Result<Vec<u8>> {
    let options = options.clone().with_protocol(HttpProtocol::Http1);
    let (client, target, headers) = prepare(url, &options)?;
    read_bytes(send(&client, target, &headers).await?).await
}

pub async fn get_data_http2(url: &str, options: &FetchOptions) -> Result<Vec<u8>> {
    let options = options.clone().with_protocol(HttpProtocol::Http2);
    let (client, target, headers) = prepare(url, &options)?;
    read_bytes(send(&client, target, &headers).await?).await
}

/// Fetches `url` and returns status, negotiated version, headers and body.
pub async fn fetch(url: &str, options: &FetchOptions) -> Result<FetchResponse> {
    let (client, target, headers) = prepare(url, options)?;
    read_response(send(&client, target, &headers).await?).await
}

/// Like [`get_string`], but the URL's host is looked up through `resolver`
/// and the connection is pinned to the returned address.
pub async fn get_string_resolved<R>(url: &str, resolver: &R, options: &FetchOptions) -> Result<String>
where
    R: HostResolver + ?Sized,
{
    let options = pin_through(url, resolver, options).await?;
    get_string(url, &options).await
}

/// Like [`get_data`], but the URL's host is looked up through `resolver`
/// and the connection is pinned to the returned address.
pub async fn get_data_resolved<R>(url: &str, resolver: &R, options: &FetchOptions) -> Result<Vec<u8>>
where
    R: HostResolver + ?Sized,
{
    let options = pin_through(url, resolver, options).await?;
    get_data(url, &options).await
}

/// A built client kept around for connection reuse across requests.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    headers: HeaderMap,
    options: FetchOptions,
    pinned_host: Option<String>,
}

impl Fetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        if options.pinned_addr.is_some() {
            return Err(FetchError::ConfigValidationError {
                field: "pinned_addr".to_string(),
                message: "a pinned address needs a host; use Fetcher::pinned".to_string(),
            });
        }
        let client = build_client(&options, None)?;
        let headers = request_headers(&options)?;
        Ok(Self {
            client,
            headers,
            options,
            pinned_host: None,
        })
    }

    /// A fetcher whose connections to `host` go to `options.pinned_addr`.
    pub fn pinned(host: &str, options: FetchOptions) -> Result<Self> {
        if options.pinned_addr.is_none() {
            return Err(FetchError::MissingConfigError {
                field: "pinned_addr".to_string(),
            });
        }
        let host = pinnable_host(host)?;
        let client = build_client(&options, Some(&host))?;
        let headers = request_headers(&options)?;
        Ok(Self {
            client,
            headers,
            options,
            pinned_host: Some(host),
        })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub async fn get_string(&self, url: &str) -> Result<String> {
        let target = self.target(url)?;
        read_text(send(&self.client, target, &self.headers).await?).await
    }

    pub async fn get_data(&self, url: &str) -> Result<Vec<u8>> {
        let target = self.target(url)?;
        read_bytes(send(&self.client, target, &self.headers).await?).await
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let target = self.target(url)?;
        read_response(send(&self.client, target, &self.headers).await?).await
    }

    fn target(&self, url: &str) -> Result<Url> {
        let target = parse_url(url)?;
        if let Some(pinned) = &self.pinned_host {
            if target.domain() != Some(pinned.as_str()) {
                return Err(FetchError::InvalidUrl {
                    url: url.to_string(),
                    reason: format!("this fetcher is pinned to host {}", pinned),
                });
            }
        }
        Ok(target)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme: {}", scheme),
        }),
    }
}

/// Normalises a host name the way `Url` does, so it compares equal to
/// `Url::domain`. IP literals cannot be pinned.
fn pinnable_host(host: &str) -> Result<String> {
    let invalid = |reason: String| FetchError::InvalidConfigValueError {
        field: "pinned_host".to_string(),
        value: host.to_string(),
        reason,
    };
    match Host::<String>::parse(host) {
        Ok(Host::Domain(domain)) => Ok(domain),
        Ok(Host::Ipv4(_)) | Ok(Host::Ipv6(_)) => {
            Err(invalid("an IP address is already a connection target".to_string()))
        }
        Err(e) => Err(invalid(e.to_string())),
    }
}

fn prepare(url: &str, options: &FetchOptions) -> Result<(Client, Url, HeaderMap)> {
    let target = parse_url(url)?;
    let headers = request_headers(options)?;
    let client = build_client(options, target.domain())?;
    Ok((client, target, headers))
}

async fn pin_through<R>(url: &str, resolver: &R, options: &FetchOptions) -> Result<FetchOptions>
where
    R: HostResolver + ?Sized,
{
    let target = parse_url(url)?;
    // IP literals are already an address
    let Some(host) = target.domain() else {
        return Ok(options.clone());
    };
    let addr = resolver.resolve(host).await?;
    tracing::debug!("Resolved {} to {}", host, addr);
    Ok(options.clone().with_pinned_addr(Some(addr)))
}

async fn send(client: &Client, target: Url, headers: &HeaderMap) -> Result<Response> {
    tracing::debug!("GET {}", target);
    let response = client.get(target).headers(headers.clone()).send().await?;
    let status = response.status();

    tracing::debug!(
        "Response {} ({:?}) from {}",
        status,
        response.version(),
        response.url()
    );

    if status.is_client_error() || status.is_server_error() {
        tracing::warn!("{} returned {}", response.url(), status);
        return Err(FetchError::Status {
            status,
            url: response.url().to_string(),
        });
    }

    Ok(response)
}

async fn read_text(response: Response) -> Result<String> {
    let url = response.url().to_string();
    let text = response.text().await?;
    tracing::info!("Fetched {} ({} bytes of text)", url, text.len());
    Ok(text)
}

async fn read_bytes(response: Response) -> Result<Vec<u8>> {
    let url = response.url().to_string();
    let body = response.bytes().await?;
    tracing::info!("Fetched {} ({} bytes)", url, body.len());
    Ok(body.to_vec())
}

async fn read_response(response: Response) -> Result<FetchResponse> {
    let url = response.url().to_string();
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    tracing::info!("Fetched {} ({} bytes)", url, body.len());

    Ok(FetchResponse {
        url,
        status,
        version,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolve::StaticResolver;
    use httpmock::prelude::*;

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        assert!(parse_url("https://dns.example/dns-query").is_ok());
        assert!(matches!(
            parse_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_url("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_string_returns_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/hello");
            then.status(200)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body("hello world");
        });

        let text = get_string(&server.url("/hello"), &FetchOptions::default())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_get_data_sends_extra_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/dns-query")
                .header("accept", "application/dns-message")
                .header("user-agent", "AuroraDNSC/0.1");
            then.status(200).body(vec![0x00u8, 0x01, 0x81, 0x80]);
        });

        let options = FetchOptions::new().with_header("Accept", "application/dns-message");
        let data = get_data(&server.url("/dns-query"), &options).await.unwrap();

        mock.assert();
        assert_eq!(data, vec![0x00, 0x01, 0x81, 0x80]);
    }

    #[tokio::test]
    async fn test_fetch_reports_http11_version() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v");
            then.status(200).header("X-Server", "mock").body("ok");
        });

        let response = fetch(&server.url("/v"), &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(response.status, reqwest::StatusCode::OK);
        assert_eq!(response.version, reqwest::Version::HTTP_11);
        assert_eq!(response.headers.get("x-server").unwrap(), "mock");
        assert_eq!(response.text_lossy(), "ok");
    }

    #[tokio::test]
    async fn test_client_error_status_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not here");
        });

        let err = get_string(&server.url("/missing"), &FetchOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
        assert!(matches!(err, FetchError::Status { .. }));
    }

    #[tokio::test]
    async fn test_resolver_failure_skips_request() {
        let resolver = StaticResolver::new();
        let err = get_string_resolved(
            "http://unknown.example.test/",
            &resolver,
            &FetchOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FetchError::Resolve { ref host, .. } if host == "unknown.example.test"));
    }

    #[tokio::test]
    async fn test_fetcher_rejects_other_hosts_when_pinned() {
        let options = FetchOptions::new().with_pinned_addr(Some("127.0.0.1".parse().unwrap()));
        let fetcher = Fetcher::pinned("doh.example.test", options).unwrap();

        let err = fetcher.get_string("http://other.example.test/").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_fetcher_pinning_needs_host() {
        let options = FetchOptions::new().with_pinned_addr(Some("127.0.0.1".parse().unwrap()));
        assert!(Fetcher::new(options).is_err());
        assert!(matches!(
            Fetcher::pinned("doh.example.test", FetchOptions::default()),
            Err(FetchError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_pinned_host_is_normalised_like_url() {
        let options = FetchOptions::new().with_pinned_addr(Some("127.0.0.1".parse().unwrap()));

        let fetcher = Fetcher::pinned("Bücher.Example", options.clone()).unwrap();
        assert!(fetcher.target("http://bücher.example/q").is_ok());
        assert!(fetcher.target("http://xn--bcher-kva.example/q").is_ok());

        let fetcher = Fetcher::pinned("DoH.Example.Test", options).unwrap();
        assert!(fetcher.target("https://doh.example.test/dns-query").is_ok());
    }

    #[test]
    fn test_pinned_host_rejects_ip_literals() {
        let options = FetchOptions::new().with_pinned_addr(Some("127.0.0.1".parse().unwrap()));

        for host in ["10.0.0.1", "[::1]"] {
            let err = Fetcher::pinned(host, options.clone()).unwrap_err();
            assert!(matches!(
                err,
                FetchError::InvalidConfigValueError { ref field, .. } if field == "pinned_host"
            ));
        }
    }
}
