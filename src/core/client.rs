use crate::domain::model::{FetchOptions, HttpProtocol};
use crate::utils::error::{FetchError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, Proxy};
use std::net::SocketAddr;

/// Builds a `reqwest::Client` carrying every connection-level setting in
/// `options`. Extra headers go on each request, see [`request_headers`].
///
/// `pin_host` is the host name that `options.pinned_addr` applies to. It is
/// ignored when no address is pinned.
pub fn build_client(options: &FetchOptions, pin_host: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout);

    builder = if options.allow_redirect {
        builder.redirect(redirect::Policy::limited(options.max_redirects))
    } else {
        builder.redirect(redirect::Policy::none())
    };

    builder = match &options.proxy {
        Some(settings) => {
            let mut proxy =
                Proxy::all(settings.url.as_str()).map_err(|e| FetchError::InvalidConfigValueError {
                    field: "proxy.url".to_string(),
                    value: settings.url.clone(),
                    reason: e.to_string(),
                })?;
            if let Some(username) = &settings.username {
                proxy = proxy.basic_auth(username, settings.password.as_deref().unwrap_or(""));
            }
            tracing::debug!("Using proxy {}", settings.url);
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    builder = match options.protocol {
        HttpProtocol::Http1 => builder.http1_only(),
        HttpProtocol::Http2 => builder.http2_prior_knowledge(),
    };

    if let (Some(host), Some(addr)) = (pin_host, options.pinned_addr) {
        tracing::debug!("Pinning {} to {}", host, addr);
        // port is taken from the request URL
        builder = builder.resolve(host, SocketAddr::new(addr, 0));
    }

    tracing::debug!(
        "Client: protocol={:?} redirects={} timeout={:?}",
        options.protocol,
        if options.allow_redirect {
            options.max_redirects.to_string()
        } else {
            "off".to_string()
        },
        options.timeout
    );

    Ok(builder.build()?)
}

/// Extra headers from `options`, keeping every value of a repeated name.
///
/// `ClientBuilder::default_headers` keeps only the last value per name, so
/// these are set per request.
pub fn request_headers(options: &FetchOptions) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(options.headers.len());
    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            FetchError::InvalidConfigValueError {
                field: "headers".to_string(),
                value: name.clone(),
                reason: e.to_string(),
            }
        })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| FetchError::InvalidConfigValueError {
                field: "headers".to_string(),
                value: value.clone(),
                reason: e.to_string(),
            })?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProxySettings;

    #[test]
    fn test_build_default_client() {
        assert!(build_client(&FetchOptions::default(), None).is_ok());
    }

    #[test]
    fn test_build_http2_pinned_client() {
        let options = FetchOptions::new()
            .with_http2(true)
            .with_redirect(false)
            .with_pinned_addr(Some("127.0.0.1".parse().unwrap()));
        assert!(build_client(&options, Some("doh.example")).is_ok());
    }

    #[test]
    fn test_request_headers_keep_repeated_names() {
        let options = FetchOptions::new()
            .with_header("Accept", "application/dns-message")
            .with_header("Accept", "application/dns-json");
        let map = request_headers(&options).unwrap();
        assert_eq!(map.get_all("accept").iter().count(), 2);
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let options = FetchOptions::new().with_header("Bad Header", "x");
        let err = request_headers(&options).unwrap_err();
        assert!(matches!(
            err,
            FetchError::InvalidConfigValueError { ref field, .. } if field == "headers"
        ));
    }

    #[test]
    fn test_invalid_proxy_is_config_error() {
        let options = FetchOptions::new().with_proxy(Some(ProxySettings::new("not a url")));
        let err = build_client(&options, None).unwrap_err();
        assert!(matches!(
            err,
            FetchError::InvalidConfigValueError { ref field, .. } if field == "proxy.url"
        ));
    }
}
