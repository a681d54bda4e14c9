use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "AuroraDNSC/0.1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_REDIRECTS: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpProtocol {
    /// HTTP/1.1 only, keep-alive connections.
    #[default]
    Http1,
    /// HTTP/2 without falling back to HTTP/1.1.
    Http2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Per-request configuration shared by every fetch helper.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub protocol: HttpProtocol,
    /// `None` connects directly, ignoring proxy environment variables.
    pub proxy: Option<ProxySettings>,
    pub allow_redirect: bool,
    pub max_redirects: usize,
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    /// Connect to this address for the URL's host. `Host` and SNI keep the host name.
    pub pinned_addr: Option<IpAddr>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            protocol: HttpProtocol::Http1,
            proxy: None,
            allow_redirect: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
            pinned_addr: None,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: HttpProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_http2(self, http2: bool) -> Self {
        self.with_protocol(if http2 {
            HttpProtocol::Http2
        } else {
            HttpProtocol::Http1
        })
    }

    pub fn with_proxy(mut self, proxy: Option<ProxySettings>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_redirect(mut self, allow_redirect: bool) -> Self {
        self.allow_redirect = allow_redirect;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_pinned_addr(mut self, addr: Option<IpAddr>) -> Self {
        self.pinned_addr = addr;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Body as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert_eq!(options.protocol, HttpProtocol::Http1);
        assert!(options.proxy.is_none());
        assert!(options.allow_redirect);
        assert_eq!(options.max_redirects, 50);
        assert_eq!(options.timeout, Duration::from_secs(15));
        assert_eq!(options.user_agent, "AuroraDNSC/0.1");
        assert!(options.headers.is_empty());
        assert!(options.pinned_addr.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let options = FetchOptions::new()
            .with_http2(true)
            .with_redirect(false)
            .with_proxy(Some(
                ProxySettings::new("http://127.0.0.1:8080").with_credentials("user", "secret"),
            ))
            .with_header("Accept", "application/dns-json")
            .with_pinned_addr(Some("1.1.1.1".parse().unwrap()));

        assert_eq!(options.protocol, HttpProtocol::Http2);
        assert!(!options.allow_redirect);
        let proxy = options.proxy.unwrap();
        assert_eq!(proxy.username.as_deref(), Some("user"));
        assert_eq!(proxy.password.as_deref(), Some("secret"));
        assert_eq!(
            options.headers,
            vec![("Accept".to_string(), "application/dns-json".to_string())]
        );
        assert_eq!(options.pinned_addr, Some("1.1.1.1".parse().unwrap()));
    }
}
