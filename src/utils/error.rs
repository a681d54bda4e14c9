use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Could not resolve host '{host}': {reason}")]
    Resolve { host: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Server,
    Resolution,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code the CLI uses for a failure of this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::Request(_) => ErrorCategory::Network,
            FetchError::Status { .. } => ErrorCategory::Server,
            FetchError::Resolve { .. } => ErrorCategory::Resolution,
            FetchError::InvalidUrl { .. }
            | FetchError::ConfigValidationError { .. }
            | FetchError::InvalidConfigValueError { .. }
            | FetchError::MissingConfigError { .. } => ErrorCategory::Configuration,
            FetchError::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // transient on the network side, a rerun may succeed
            FetchError::Request(_) | FetchError::Resolve { .. } => ErrorSeverity::Medium,
            FetchError::Status { status, .. } if status.is_server_error() => ErrorSeverity::Medium,
            FetchError::Status { .. } => ErrorSeverity::High,
            FetchError::InvalidUrl { .. }
            | FetchError::ConfigValidationError { .. }
            | FetchError::InvalidConfigValueError { .. }
            | FetchError::MissingConfigError { .. } => ErrorSeverity::High,
            FetchError::Io(_) => ErrorSeverity::Critical,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Request(e) if e.is_timeout())
    }

    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Request(e) => e.status(),
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            FetchError::Request(e) if e.is_timeout() => {
                "The server did not answer in time; raise --timeout-secs or check the network".to_string()
            }
            FetchError::Request(e) if e.is_connect() => {
                "Could not connect; check the address, the proxy settings and any pinned IP".to_string()
            }
            FetchError::Request(e) if e.is_redirect() => {
                "Too many redirects; raise --max-redirects or disable redirects".to_string()
            }
            FetchError::Request(_) => "Check network connectivity and TLS settings".to_string(),
            FetchError::Status { status, .. } if status.is_server_error() => {
                "The server reported an internal error; try again later".to_string()
            }
            FetchError::Status { .. } => "Check the URL path and any required headers".to_string(),
            FetchError::InvalidUrl { .. } => {
                "Use an absolute http:// or https:// URL".to_string()
            }
            FetchError::Resolve { host, .. } => {
                format!("Make sure '{}' can be resolved or pin it to an IP with --pin", host)
            }
            FetchError::Io(_) => "Check file permissions and free disk space".to_string(),
            FetchError::ConfigValidationError { field, .. }
            | FetchError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' setting in the configuration", field)
            }
            FetchError::MissingConfigError { field } => {
                format!("Add the '{}' setting to the configuration", field)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FetchError::Request(e) if e.is_timeout() => "Request timed out".to_string(),
            FetchError::Request(_) => "Network request failed".to_string(),
            FetchError::Status { status, url } => {
                format!("{} answered with HTTP {}", url, status.as_u16())
            }
            FetchError::Resolve { host, .. } => format!("Could not find an address for {}", host),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_error_classification() {
        let not_found = FetchError::Status {
            status: StatusCode::NOT_FOUND,
            url: "http://example.com/x".to_string(),
        };
        assert_eq!(not_found.category(), ErrorCategory::Server);
        assert_eq!(not_found.severity(), ErrorSeverity::High);
        assert_eq!(not_found.status(), Some(StatusCode::NOT_FOUND));
        assert!(!not_found.is_timeout());
        assert_eq!(
            not_found.user_friendly_message(),
            "http://example.com/x answered with HTTP 404"
        );

        let unavailable = FetchError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            url: "http://example.com/".to_string(),
        };
        assert_eq!(unavailable.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_config_errors_point_at_field() {
        let err = FetchError::InvalidConfigValueError {
            field: "proxy.url".to_string(),
            value: "ftp://proxy".to_string(),
            reason: "Unsupported proxy scheme: ftp".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.recovery_suggestion().contains("proxy.url"));
    }

    #[test]
    fn test_resolve_error_suggests_pinning() {
        let err = FetchError::Resolve {
            host: "doh.example".to_string(),
            reason: "no records".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Resolution);
        assert!(err.recovery_suggestion().contains("--pin"));
    }

    #[test]
    fn test_io_error_converts_and_exits_critical() {
        let err: FetchError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, FetchError::Io(_)));
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().exit_code(), 3);
    }

    #[test]
    fn test_every_severity_exits_non_zero() {
        let missing = FetchError::MissingConfigError {
            field: "url".to_string(),
        };
        let resolve = FetchError::Resolve {
            host: "doh.example".to_string(),
            reason: "no records".to_string(),
        };
        assert_eq!(missing.severity().exit_code(), 1);
        assert_eq!(resolve.severity().exit_code(), 2);

        for severity in [ErrorSeverity::Medium, ErrorSeverity::High, ErrorSeverity::Critical] {
            assert_ne!(severity.exit_code(), 0);
        }
    }
}
