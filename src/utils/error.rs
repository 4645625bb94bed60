use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("GraphQL error in {operation}: {message}")]
    GraphQlError { operation: String, message: String },

    #[error("Upstream returned HTTP {status} for {operation}")]
    UpstreamStatusError { operation: String, status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Clustering error: {message}")]
    ClusteringError { message: String },

    #[error("No data to perform clustering")]
    NoData,
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Storage,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn graphql(operation: &str, message: impl Into<String>) -> Self {
        Self::GraphQlError {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ApiError(_) => ErrorCategory::Network,
            AppError::GraphQlError { .. } | AppError::UpstreamStatusError { .. } => {
                ErrorCategory::Upstream
            }
            AppError::IoError(_) | AppError::SerializationError(_) => ErrorCategory::Storage,
            AppError::ConfigValidationError { .. }
            | AppError::InvalidConfigValueError { .. }
            | AppError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AppError::ClusteringError { .. } | AppError::NoData => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::NoData => ErrorSeverity::Low,
            AppError::ApiError(_)
            | AppError::GraphQlError { .. }
            | AppError::UpstreamStatusError { .. } => ErrorSeverity::Medium,
            AppError::ClusteringError { .. } | AppError::SerializationError(_) => {
                ErrorSeverity::High
            }
            AppError::IoError(_)
            | AppError::ConfigValidationError { .. }
            | AppError::InvalidConfigValueError { .. }
            | AppError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the upstream endpoint, then retry",
            ErrorCategory::Upstream => "The upstream GraphQL API rejected the request; verify the endpoint and query",
            ErrorCategory::Storage => "Check that the output path exists and is writable",
            ErrorCategory::Configuration => "Fix the configuration file or command line arguments",
            ErrorCategory::Processing => "Fetch corporates before clustering, or lower the cluster count",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::NoData => "No companies have been fetched yet".to_string(),
            AppError::ApiError(e) if e.is_timeout() => "The upstream API timed out".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_is_low_severity() {
        let err = AppError::NoData;
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.category(), ErrorCategory::Processing);
        assert_eq!(err.to_string(), "No data to perform clustering");
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = AppError::MissingConfigError {
            field: "ranking.endpoint".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.to_string().contains("ranking.endpoint"));
    }

    #[test]
    fn test_graphql_helper() {
        let err = AppError::graphql("GetCorporates", "boom");
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert_eq!(err.to_string(), "GraphQL error in GetCorporates: boom");
    }
}
