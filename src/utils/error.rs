use std::fmt;
use thiserror::Error;

/// Where an element lookup failed: in the fetched page or in the display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementScope {
    Fetched,
    Live,
}

impl fmt::Display for ElementScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementScope::Fetched => write!(f, "fetched document"),
            ElementScope::Live => write!(f, "live document"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Element '#{id}' not found in {scope}")]
    ElementNotFound { id: String, scope: ElementScope },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration ({field}): {message}")]
    ConfigParse { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Extraction,
    Render,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PollError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PollError::Http(_) | PollError::HttpStatus { .. } => ErrorCategory::Network,
            PollError::ElementNotFound {
                scope: ElementScope::Fetched,
                ..
            } => ErrorCategory::Extraction,
            PollError::ElementNotFound {
                scope: ElementScope::Live,
                ..
            }
            | PollError::Render { .. } => ErrorCategory::Render,
            PollError::Io(_) => ErrorCategory::System,
            PollError::Config { .. }
            | PollError::InvalidConfigValue { .. }
            | PollError::ConfigParse { .. } => ErrorCategory::Configuration,
        }
    }

    /// A single failed tick is never fatal; only configuration and system
    /// errors stop the process.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Extraction => ErrorSeverity::Medium,
            ErrorCategory::Render => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PollError::Http(e) if e.is_timeout() => {
                "The server did not answer in time; raise --timeout-ms or check the server load".to_string()
            }
            PollError::Http(_) => {
                "Check that the timer server is running and reachable at the configured URL".to_string()
            }
            PollError::HttpStatus { status, .. } if *status >= 500 => {
                "The timer server reported an internal error; check its logs".to_string()
            }
            PollError::HttpStatus { .. } => {
                "Check the configured URL points at the page that renders the timer".to_string()
            }
            PollError::ElementNotFound {
                id,
                scope: ElementScope::Fetched,
            } => format!(
                "The page has no element with id '{}'; check --element-id or the page template",
                id
            ),
            PollError::ElementNotFound {
                id,
                scope: ElementScope::Live,
            } => format!("The display target has no element with id '{}'", id),
            PollError::Render { .. } => "Check the display target is writable".to_string(),
            PollError::Io(_) => "Check file permissions and free disk space".to_string(),
            PollError::Config { .. } | PollError::ConfigParse { .. } => {
                "Fix the configuration file and try again".to_string()
            }
            PollError::InvalidConfigValue { field, .. } => {
                format!("Correct the value of '{}'", field)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch the timer page: {}", self),
            ErrorCategory::Extraction => format!("Could not read the timer: {}", self),
            ErrorCategory::Render => format!("Could not update the display: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PollError>;
