use thiserror::Error;

/// 座標文字解析失敗的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("input is empty")]
    Empty,

    #[error("expected two numbers, found {found}")]
    NotEnoughNumbers { found: usize },

    #[error("'{token}' is not a finite number")]
    NotFinite { token: String },
}

/// 貼上的座標文字無法解析
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot read coordinates from '{input}': {reason}")]
pub struct ParseError {
    pub input: String,
    pub reason: ParseFailure,
}

/// 經緯度欄位送出時驗證失敗
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {field} '{value}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub value: String,
    pub reason: String,
}

/// 單一資料來源呼叫失敗
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status} {reason}{}", body_suffix(.body))]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("malformed response: {message}")]
    Decode { message: String },

    #[error("{message}")]
    Other { message: String },
}

fn body_suffix(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl SourceError {
    pub fn is_timeout(&self) -> bool {
        match self {
            SourceError::Timeout => true,
            SourceError::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_decode() {
            SourceError::Decode {
                message: e.to_string(),
            }
        } else {
            SourceError::Transport(e)
        }
    }
}

#[derive(Error, Debug)]
pub enum SiteGeoError {
    #[error("Coordinate parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Query {run} was cancelled before it settled")]
    QueryCancelled { run: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Configuration,
    Storage,
    Data,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SiteGeoError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SiteGeoError::ParseError(_) | SiteGeoError::ValidationError(_) => ErrorCategory::Input,
            SiteGeoError::SourceError(_) | SiteGeoError::ApiError(_) => ErrorCategory::Network,
            SiteGeoError::ConfigError { .. }
            | SiteGeoError::ConfigValidationError { .. }
            | SiteGeoError::InvalidConfigValueError { .. }
            | SiteGeoError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SiteGeoError::IoError(_) | SiteGeoError::ZipError(_) => ErrorCategory::Storage,
            SiteGeoError::CsvError(_) | SiteGeoError::SerializationError(_) => ErrorCategory::Data,
            SiteGeoError::QueryCancelled { .. } => ErrorCategory::Interrupted,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 使用者可自行修正的輸入錯誤
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Interrupted => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SiteGeoError::ParseError(e) => format!("Could not read coordinates: {}", e.reason),
            SiteGeoError::ValidationError(e) => {
                format!("The {} value '{}' is not usable: {}", e.field, e.value, e.reason)
            }
            SiteGeoError::SourceError(e) => format!("A data source failed: {}", e),
            SiteGeoError::ApiError(_) => "The backend could not be reached".to_string(),
            SiteGeoError::ConfigError { message } => format!("Configuration problem: {}", message),
            SiteGeoError::ConfigValidationError { field, message } => {
                format!("Configuration field '{}' is invalid: {}", field, message)
            }
            SiteGeoError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            SiteGeoError::MissingConfigError { field } => {
                format!("Configuration field '{}' is missing", field)
            }
            SiteGeoError::IoError(e) => format!("File system error: {}", e),
            SiteGeoError::ZipError(_) => "The report archive could not be written".to_string(),
            SiteGeoError::CsvError(_) | SiteGeoError::SerializationError(_) => {
                "The report could not be serialized".to_string()
            }
            SiteGeoError::QueryCancelled { run } => {
                format!("The query ({}) was cancelled before every source answered", run)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Paste two numbers as 'lat, lon' (either '.' or ',' decimals), or use --swap if they are reversed"
            }
            ErrorCategory::Network => "Check that the backend base URL is reachable and try again",
            ErrorCategory::Configuration => "Review the registry TOML file and the command-line flags",
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Data => "Re-run with --verbose and inspect the offending payload",
            ErrorCategory::Interrupted => "Submit the query again",
        }
    }
}

pub type Result<T> = std::result::Result<T, SiteGeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_includes_body() {
        let err = SourceError::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
            body: " GPU WFS non configuré \n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 500 Internal Server Error: GPU WFS non configuré"
        );

        let bare = SourceError::Status {
            status: 404,
            reason: "Not Found".to_string(),
            body: String::new(),
        };
        assert_eq!(bare.to_string(), "HTTP 404 Not Found");
    }

    #[test]
    fn test_input_errors_are_low_severity() {
        let err: SiteGeoError = ParseError {
            input: "abc".to_string(),
            reason: ParseFailure::NotEnoughNumbers { found: 0 },
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.user_friendly_message().contains("expected two numbers"));
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = SiteGeoError::MissingConfigError {
            field: "backend.base_url".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(SourceError::Timeout.is_timeout());
    }

    #[test]
    fn test_cancelled_query_is_not_a_config_error() {
        let err = SiteGeoError::QueryCancelled {
            run: "run-3".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Interrupted);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.to_string(), "Query run-3 was cancelled before it settled");
    }
}
