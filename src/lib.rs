pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::FetchConfig;

pub use crate::core::fetch::{
    fetch, get_data, get_data_http1, get_data_http2, get_data_resolved, get_string,
    get_string_http1, get_string_http2, get_string_resolved, Fetcher,
};
pub use crate::core::resolve::{StaticResolver, SystemResolver};
pub use crate::domain::model::{FetchOptions, FetchResponse, HttpProtocol, ProxySettings};
pub use crate::domain::ports::HostResolver;
pub use crate::utils::error::{FetchError, Result};
