//! Result and error types for the restocking pipeline.

use thiserror::Error;

/// Result type for restocker operations
pub type RestockResult<T> = Result<T, RestockError>;

/// Errors that can occur while driving the portal or building the report
#[derive(Debug, Error)]
pub enum RestockError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Script evaluation error (bad selector, detached node, ...)
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// A login form is on screen but no credentials are configured
    #[error("Login form detected but credentials are missing. Set BARNET_USER/BARNET_PASS (or BARNET_USERNAME/BARNET_PASSWORD)")]
    MissingCredentials,

    /// Download failed
    #[error("Download failed: {message}")]
    Download {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Reading the exported workbook failed
    #[error("Failed to read workbook {path}: {message}")]
    WorkbookRead {
        /// Workbook path
        path: String,
        /// Error message
        message: String,
    },

    /// Writing the output workbook failed
    #[error("Failed to write report: {message}")]
    Render {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Invalid pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl RestockError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a script evaluation error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create an input error
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole run
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials | Self::Timeout { .. } | Self::Download { .. } | Self::Config { .. }
        )
    }
}
