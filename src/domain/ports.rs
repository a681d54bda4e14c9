use crate::utils::error::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// Supplies the address a host name should be reached at, bypassing the
/// system resolver used by the HTTP client.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr>;
}
