use thiserror::Error;

#[derive(Error, Debug)]
pub enum AidError {
    #[error("Location unavailable: {reason}")]
    LocationUnavailable { reason: String },

    #[error("Classification ambiguous: model answered {response:?}")]
    ClassificationAmbiguous { response: String },

    #[error("Upstream '{provider}' unavailable{}: {message}", status_suffix(.status))]
    UpstreamUnavailable {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Generation failure: {message}")]
    GenerationFailure { message: String },

    #[error("Stage '{stage}' timed out after {seconds}s")]
    StageTimeout { stage: String, seconds: u64 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Location,
    Classification,
    Upstream,
    Generation,
    Configuration,
    Input,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AidError {
    pub fn upstream(provider: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        AidError::UpstreamUnavailable {
            provider: provider.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn location(reason: impl Into<String>) -> Self {
        AidError::LocationUnavailable {
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AidError::LocationUnavailable { .. } => ErrorCategory::Location,
            AidError::ClassificationAmbiguous { .. } => ErrorCategory::Classification,
            AidError::UpstreamUnavailable { .. }
            | AidError::HttpError(_)
            | AidError::StageTimeout { .. } => ErrorCategory::Upstream,
            AidError::GenerationFailure { .. } => ErrorCategory::Generation,
            AidError::InvalidInput { .. } => ErrorCategory::Input,
            AidError::ConfigError { .. }
            | AidError::MissingConfigError { .. }
            | AidError::InvalidConfigValueError { .. }
            | AidError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            AidError::Cancelled | AidError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Classification | ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Upstream | ErrorCategory::Generation => ErrorSeverity::Medium,
            ErrorCategory::Location | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => match self {
                AidError::Cancelled => ErrorSeverity::Low,
                _ => ErrorSeverity::Critical,
            },
        }
    }

    /// 給終端使用者看的訊息，不含內部細節
    pub fn user_friendly_message(&self) -> String {
        match self {
            AidError::LocationUnavailable { .. } => {
                "Could not determine your current location.".to_string()
            }
            AidError::ClassificationAmbiguous { response } => format!(
                "The wound in the image could not be classified (model answered {:?}).",
                response
            ),
            AidError::UpstreamUnavailable { provider, .. } => {
                format!("The {} service is currently unreachable.", provider)
            }
            AidError::HttpError(_) => "A network request failed.".to_string(),
            AidError::GenerationFailure { .. } => {
                "No first-aid guidance could be generated.".to_string()
            }
            AidError::StageTimeout { stage, .. } => {
                format!("The {} step took too long and was stopped.", stage)
            }
            AidError::Cancelled => "The request was cancelled.".to_string(),
            AidError::InvalidInput { message } => format!("Invalid input: {}", message),
            AidError::ConfigError { .. }
            | AidError::MissingConfigError { .. }
            | AidError::InvalidConfigValueError { .. }
            | AidError::ConfigValidationError { .. } => {
                format!("Configuration problem: {}", self)
            }
            AidError::IoError(e) => format!("File access failed: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Location => "Check your network connection or switch location.strategy to \"geocode\"",
            ErrorCategory::Classification => "Try a clearer, well-lit photo or describe the injury as text",
            ErrorCategory::Upstream => "Check the API keys and retry in a moment",
            ErrorCategory::Generation => "Retry the request; the model returned no usable text",
            ErrorCategory::Configuration => "Review the TOML configuration and required environment variables",
            ErrorCategory::Input => "Use --text with a description or --image with a jpg/jpeg/png file",
            ErrorCategory::System => "Check file permissions and available resources",
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, AidError>;
