use crate::core::resolve::StaticResolver;
use crate::domain::model::{FetchOptions, HttpProtocol, ProxySettings};
use crate::utils::error::{FetchError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "aurora-fetch")]
#[command(about = "Fetch a URL with proxy, redirect, pinned-address and HTTP/2 control")]
pub struct CliConfig {
    /// URL to fetch
    pub url: String,

    /// Force HTTP/2 instead of HTTP/1.1
    #[arg(long)]
    pub http2: bool,

    /// Proxy URL (http, https, socks5 or socks5h)
    #[arg(long)]
    pub proxy: Option<String>,

    #[arg(long, requires = "proxy")]
    pub proxy_user: Option<String>,

    #[arg(long, requires = "proxy_user")]
    pub proxy_pass: Option<String>,

    /// Do not follow redirects
    #[arg(long)]
    pub no_redirect: bool,

    #[arg(long)]
    pub max_redirects: Option<usize>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Extra request header, "Name: value"
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Connect to this address for the URL's host
    #[arg(long, conflicts_with = "resolve")]
    pub pin: Option<IpAddr>,

    /// Static host entry HOST=IP, repeatable
    #[arg(long)]
    pub resolve: Vec<String>,

    /// Write the body to this file instead of printing it
    #[arg(short, long)]
    pub output: Option<String>,

    /// TOML configuration file. Its `[resolve]` table pins the URL's host only
    /// when the host is listed; other hosts are fetched without pinning
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl CliConfig {
    /// Applies command line overrides on top of `base`.
    pub fn apply_to(&self, base: FetchOptions) -> Result<FetchOptions> {
        let mut options = base;
        if self.http2 {
            options.protocol = HttpProtocol::Http2;
        }
        if let Some(url) = &self.proxy {
            let mut proxy = ProxySettings::new(url.clone());
            if let Some(user) = &self.proxy_user {
                proxy = proxy.with_credentials(user.clone(), self.proxy_pass.clone().unwrap_or_default());
            }
            options.proxy = Some(proxy);
        }
        if self.no_redirect {
            options.allow_redirect = false;
        }
        if let Some(max_redirects) = self.max_redirects {
            options.max_redirects = max_redirects;
        }
        if let Some(timeout) = self.timeout_secs {
            options.timeout = Duration::from_secs(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            options.user_agent = user_agent.clone();
        }
        for header in &self.headers {
            let (name, value) = parse_header(header)?;
            options.headers.push((name, value));
        }
        if self.pin.is_some() {
            options.pinned_addr = self.pin;
        }
        Ok(options)
    }

    /// Host table from `--resolve`, if any entries were given.
    pub fn resolver(&self) -> Result<Option<StaticResolver>> {
        if self.resolve.is_empty() {
            return Ok(None);
        }
        let entries = self
            .resolve
            .iter()
            .map(|entry| StaticResolver::parse_entry(entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(entries.into_iter().collect()))
    }

    /// Picks the host table for this run. `--resolve` wins and is strict.
    /// `--pin` disables table lookups. A config file table is used only
    /// when it lists the URL's host.
    pub fn effective_resolver(
        &self,
        options: &FetchOptions,
        file_resolver: Option<StaticResolver>,
    ) -> Result<Option<StaticResolver>> {
        if let Some(resolver) = self.resolver()? {
            return Ok(Some(resolver));
        }
        if options.pinned_addr.is_some() {
            return Ok(None);
        }

        let Some(table) = file_resolver else {
            return Ok(None);
        };
        let host = Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        match host {
            Some(host) if table.contains(&host) => Ok(Some(table)),
            Some(host) => {
                tracing::debug!("{} is not in the configured host table, fetching unpinned", host);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

fn parse_header(header: &str) -> Result<(String, String)> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| FetchError::InvalidConfigValueError {
            field: "header".to_string(),
            value: header.to_string(),
            reason: "expected \"Name: value\"".to_string(),
        })?;
    let (name, value) = (name.trim(), value.trim());
    validation::validate_header("header", name, value)?;
    Ok((name.to_string(), value.to_string()))
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("url", &self.url)?;
        if let Some(proxy) = &self.proxy {
            validation::validate_proxy_url("proxy", proxy)?;
        }
        if let Some(max_redirects) = self.max_redirects {
            validation::validate_positive_number("max_redirects", max_redirects, 1)?;
        }
        if let Some(timeout) = self.timeout_secs {
            validation::validate_range("timeout_secs", timeout, 1, 600)?;
        }
        if let Some(user_agent) = &self.user_agent {
            validation::validate_non_empty_string("user_agent", user_agent)?;
        }
        for header in &self.headers {
            parse_header(header)?;
        }
        self.resolver()?;
        Ok(())
    }
}
