use crate::utils::error::{AppError, Result};
use std::path::Path;
use url::Url;

/// 上游請求逾時的上限 (秒)
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> AppError {
    AppError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Name of the first `${VAR}` left behind by substitution, if any.
pub fn unresolved_placeholder(value: &str) -> Option<&str> {
    let start = value.find("${")? + 2;
    let len = value[start..].find('}')?;
    Some(&value[start..start + len])
}

/// 未設定的環境變數視為缺少設定
fn require_value(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::MissingConfigError {
            field: field.to_string(),
        });
    }
    if let Some(var) = unresolved_placeholder(value) {
        tracing::debug!("{} still references unset variable {}", field, var);
        return Err(AppError::MissingConfigError {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// A GraphQL endpoint: an http(s) URL with a host.
pub fn validate_graphql_endpoint(field: &str, endpoint: &str) -> Result<()> {
    require_value(field, endpoint)?;

    let url = Url::parse(endpoint).map_err(|e| invalid(field, endpoint, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(invalid(field, endpoint, format!("Unsupported URL scheme: {}", scheme))),
    }
    if url.host_str().is_none() {
        return Err(invalid(field, endpoint, "URL has no host"));
    }
    Ok(())
}

/// Sent as a header on every ranking request, so it must be a valid header value.
pub fn validate_user_agent(field: &str, user_agent: &str) -> Result<()> {
    require_value(field, user_agent)?;
    if user_agent.chars().any(char::is_control) {
        return Err(invalid(field, user_agent, "User agent cannot contain control characters"));
    }
    Ok(())
}

pub fn validate_timeout_seconds(field: &str, seconds: u64) -> Result<()> {
    if seconds == 0 || seconds > MAX_TIMEOUT_SECONDS {
        return Err(invalid(
            field,
            seconds,
            format!("Timeout must be between 1 and {} seconds", MAX_TIMEOUT_SECONDS),
        ));
    }
    Ok(())
}

pub fn validate_bind_address(field: &str, addr: &str) -> Result<()> {
    require_value(field, addr)?;
    addr.parse::<std::net::SocketAddr>()
        .map(|_| ())
        .map_err(|e| invalid(field, addr, format!("Invalid socket address: {}", e)))
}

/// Counts that drive the fetch loop and k-means (pages, clusters, restarts).
pub fn validate_at_least_one(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, value, "Value must be at least 1"));
    }
    Ok(())
}

pub fn validate_tolerance(field: &str, tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(invalid(field, tolerance, "Tolerance must be a non-negative number"));
    }
    Ok(())
}

/// Base directory for every file the service writes.
pub fn validate_output_dir(field: &str, path: &str) -> Result<()> {
    require_value(field, path)?;
    if path.contains('\0') {
        return Err(invalid(field, path, "Path contains null bytes"));
    }
    Ok(())
}

/// A report or collection file name, resolved under the output directory.
pub fn validate_output_file(field: &str, file: &str) -> Result<()> {
    validate_output_dir(field, file)?;
    if Path::new(file).is_absolute() {
        return Err(invalid(field, file, "File must be relative to the output path"));
    }
    if file.ends_with('/') || file.ends_with('\\') {
        return Err(invalid(field, file, "Path must name a file, not a directory"));
    }
    Ok(())
}
