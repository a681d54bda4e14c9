use crate::domain::ports::HostResolver;
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;

/// Resolves through the operating system, like the HTTP client would.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    prefer_ipv4: bool,
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self { prefer_ipv4: true }
    }
}

impl SystemResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefer_ipv4(mut self, prefer_ipv4: bool) -> Self {
        self.prefer_ipv4 = prefer_ipv4;
        self
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| FetchError::Resolve {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .map(|addr| addr.ip())
            .collect();

        let chosen = if self.prefer_ipv4 {
            addrs.iter().find(|ip| ip.is_ipv4()).or_else(|| addrs.first())
        } else {
            addrs.first()
        };

        chosen.copied().ok_or_else(|| FetchError::Resolve {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        })
    }
}

/// A fixed host table. Lookups for hosts not in the table fail.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, IpAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, host: &str, addr: IpAddr) -> Self {
        self.insert(host, addr);
        self
    }

    pub fn insert(&mut self, host: &str, addr: IpAddr) {
        self.entries.insert(host.to_ascii_lowercase(), addr);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, host: &str) -> bool {
        self.entries.contains_key(&host.to_ascii_lowercase())
    }

    /// Parses a `HOST=IP` entry as given on the command line.
    pub fn parse_entry(entry: &str) -> Result<(String, IpAddr)> {
        let invalid = |reason: &str| FetchError::InvalidConfigValueError {
            field: "resolve".to_string(),
            value: entry.to_string(),
            reason: reason.to_string(),
        };

        let (host, addr) = entry
            .split_once('=')
            .ok_or_else(|| invalid("expected HOST=IP"))?;
        let host = host.trim();
        if host.is_empty() {
            return Err(invalid("host is empty"));
        }
        let addr = addr
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| invalid("not an IP address"))?;

        Ok((host.to_ascii_lowercase(), addr))
    }
}

impl FromIterator<(String, IpAddr)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (String, IpAddr)>>(iter: I) -> Self {
        let mut resolver = StaticResolver::new();
        for (host, addr) in iter {
            resolver.insert(&host, addr);
        }
        resolver
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        self.entries
            .get(&host.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| FetchError::Resolve {
                host: host.to_string(),
                reason: "not in the static host table".to_string(),
            })
    }
}
