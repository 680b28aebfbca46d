use std::fmt;
use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RosterError {
    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Record already exists: {message}")]
    ConstraintViolation {
        message: String,
        code: Option<String>,
    },

    #[error("Not found: {message}")]
    NotFoundError { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    TimeoutError { timeout_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("No valid rows found in CSV input")]
    NoValidRows,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {reason} (got '{value}')")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Gateway error: {message}")]
    GatewayError {
        message: String,
        code: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, RosterError>;

/// Failure tags exposed to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    ConstraintViolation,
    NotFound,
    Timeout,
    Cancelled,
    NoValidRows,
    Config,
    Validation,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::ConstraintViolation => "constraint-violation",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::NoValidRows => "no-valid-rows",
            ErrorKind::Config => "config",
            ErrorKind::Validation => "validation",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Remote,
    Input,
    Configuration,
    System,
}

impl RosterError {
    /// 依據後端回傳的錯誤碼與訊息分類
    pub fn from_gateway(code: Option<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();

        if code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
            || lowered.contains("duplicate key")
            || lowered.contains("already exists")
        {
            return RosterError::ConstraintViolation { message, code };
        }

        if code.as_deref() == Some("PGRST116") {
            return RosterError::NotFoundError { message };
        }

        RosterError::GatewayError { message, code }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RosterError::NetworkError { .. } => ErrorKind::Network,
            RosterError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            RosterError::NotFoundError { .. } => ErrorKind::NotFound,
            RosterError::TimeoutError { .. } => ErrorKind::Timeout,
            RosterError::Cancelled => ErrorKind::Cancelled,
            RosterError::NoValidRows => ErrorKind::NoValidRows,
            RosterError::ConfigError { .. }
            | RosterError::InvalidConfigValueError { .. }
            | RosterError::MissingConfigError { .. } => ErrorKind::Config,
            RosterError::ValidationError { .. } => ErrorKind::Validation,
            RosterError::IoError { .. } | RosterError::GatewayError { .. } => ErrorKind::Unknown,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::ConstraintViolation
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::Network
            | ErrorKind::ConstraintViolation
            | ErrorKind::NotFound
            | ErrorKind::Timeout
            | ErrorKind::Unknown => ErrorCategory::Remote,
            ErrorKind::NoValidRows | ErrorKind::Validation => ErrorCategory::Input,
            ErrorKind::Config => ErrorCategory::Configuration,
            ErrorKind::Cancelled => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::Cancelled => ErrorSeverity::Low,
            ErrorKind::Network | ErrorKind::Timeout => ErrorSeverity::Medium,
            ErrorKind::ConstraintViolation
            | ErrorKind::NotFound
            | ErrorKind::NoValidRows
            | ErrorKind::Validation => ErrorSeverity::High,
            ErrorKind::Config | ErrorKind::Unknown => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Network => "Check the network connection and the gateway URL, then retry",
            ErrorKind::Timeout => "The backend did not answer in time; retry or raise operation_timeout_secs",
            ErrorKind::ConstraintViolation => "Use a different email, or remove the existing student first",
            ErrorKind::NotFound => "Refresh the list; the record may have been deleted",
            ErrorKind::Cancelled => "The view was closed before the operation finished",
            ErrorKind::NoValidRows => "Paste a header line followed by rows of Name,Email,StudentID",
            ErrorKind::Validation => "Fill in every required field",
            ErrorKind::Config => "Check the configuration file and environment variables",
            ErrorKind::Unknown => "Inspect the logs for the gateway response",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RosterError::ConstraintViolation { .. } => {
                "A student with this email already exists in this class".to_string()
            }
            RosterError::NoValidRows => "No valid student data found in CSV".to_string(),
            RosterError::ValidationError { message, .. } => message.clone(),
            RosterError::TimeoutError { .. } => "The server took too long to respond".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for RosterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return RosterError::NetworkError {
                message: format!("request timed out: {}", err),
            };
        }
        if err.is_decode() {
            return RosterError::GatewayError {
                message: format!("unreadable response body: {}", err),
                code: None,
            };
        }
        RosterError::NetworkError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        RosterError::GatewayError {
            message: format!("Serialization error: {}", err),
            code: None,
        }
    }
}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        RosterError::IoError {
            message: err.to_string(),
        }
    }
}
