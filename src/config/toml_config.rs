use crate::core::resolve::StaticResolver;
use crate::domain::model::{FetchOptions, HttpProtocol, ProxySettings};
use crate::utils::error::{FetchError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub client: ClientConfig,
    pub proxy: Option<ProxyConfig>,
    /// Static host table, host name to IP address.
    pub resolve: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    pub protocol: Option<HttpProtocol>,
    pub allow_redirect: Option<bool>,
    pub max_redirects: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl FetchConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FetchError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FetchError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PROXY_PASSWORD})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FetchError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn proxy_enabled(&self) -> bool {
        self.proxy.as_ref().map(|p| p.enabled).unwrap_or(false)
    }

    pub fn proxy_settings(&self) -> Result<Option<ProxySettings>> {
        let Some(proxy) = self.proxy.as_ref().filter(|p| p.enabled) else {
            return Ok(None);
        };
        let url = validation::validate_required_field("proxy.url", &proxy.url)?;
        Ok(Some(ProxySettings {
            url: url.clone(),
            username: proxy.username.clone(),
            password: proxy.password.clone(),
        }))
    }

    /// Maps the file onto request options. Unset keys keep their defaults.
    pub fn to_options(&self) -> Result<FetchOptions> {
        let mut options = FetchOptions::default();
        let client = &self.client;

        if let Some(protocol) = client.protocol {
            options.protocol = protocol;
        }
        if let Some(allow_redirect) = client.allow_redirect {
            options.allow_redirect = allow_redirect;
        }
        if let Some(max_redirects) = client.max_redirects {
            options.max_redirects = max_redirects;
        }
        if let Some(timeout) = client.timeout_seconds {
            options.timeout = Duration::from_secs(timeout);
        }
        if let Some(user_agent) = &client.user_agent {
            options.user_agent = user_agent.clone();
        }
        if let Some(headers) = &client.headers {
            let mut pairs: Vec<(String, String)> =
                headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            pairs.sort();
            options.headers.extend(pairs);
        }
        options.proxy = self.proxy_settings()?;

        Ok(options)
    }

    pub fn resolver(&self) -> Result<Option<StaticResolver>> {
        let Some(table) = &self.resolve else {
            return Ok(None);
        };
        let mut resolver = StaticResolver::new();
        for (host, addr) in table {
            let ip = addr
                .parse::<IpAddr>()
                .map_err(|_| FetchError::InvalidConfigValueError {
                    field: format!("resolve.{}", host),
                    value: addr.clone(),
                    reason: "not an IP address".to_string(),
                })?;
            resolver.insert(host, ip);
        }
        Ok(Some(resolver))
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> Result<()> {
        if let Some(max_redirects) = self.client.max_redirects {
            validation::validate_positive_number("client.max_redirects", max_redirects, 1)?;
        }
        if let Some(timeout) = self.client.timeout_seconds {
            validation::validate_range("client.timeout_seconds", timeout, 1, 600)?;
        }
        if let Some(user_agent) = &self.client.user_agent {
            validation::validate_non_empty_string("client.user_agent", user_agent)?;
        }
        if let Some(headers) = &self.client.headers {
            for (name, value) in headers {
                validation::validate_header("client.headers", name, value)?;
            }
        }
        if let Some(proxy) = self.proxy.as_ref().filter(|p| p.enabled) {
            let url = validation::validate_required_field("proxy.url", &proxy.url)?;
            validation::validate_proxy_url("proxy.url", url)?;
        }
        self.resolver()?;
        Ok(())
    }
}
