pub mod client;
pub mod fetch;
pub mod resolve;

pub use crate::domain::model::{FetchOptions, FetchResponse, HttpProtocol, ProxySettings};
pub use crate::domain::ports::HostResolver;
pub use crate::utils::error::Result;
