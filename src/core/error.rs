//! Error handling for the quickstart CLI
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`QuickstartError`]) so callers can tell a
//!    rejected URL from a lock timeout without string matching
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for the terminal
//!
//! # Error Categories
//!
//! - **Validation**: [`QuickstartError::InvalidScheme`], [`QuickstartError::DangerousCharacters`],
//!   [`QuickstartError::PathTraversal`], [`QuickstartError::UntrustedDomain`],
//!   [`QuickstartError::InvalidEnvVar`], [`QuickstartError::UnsafeShellString`]
//! - **Configuration**: [`QuickstartError::CorruptConfiguration`],
//!   [`QuickstartError::UnsupportedConfiguration`], [`QuickstartError::SettingsError`]
//! - **Concurrency and processes**: [`QuickstartError::LockTimeout`],
//!   [`QuickstartError::ProcessTimeout`], [`QuickstartError::ProcessFailed`],
//!   [`QuickstartError::ClaudeNotFound`]
//! - **Catalog**: [`QuickstartError::UnknownServer`], [`QuickstartError::MissingEnvVar`]
//!
//! Validation errors abort one server's registration, never the whole run.
//! Use [`user_friendly_error`] to turn any `anyhow::Error` into an [`ErrorContext`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use claude_code_quickstart::core::{ErrorContext, QuickstartError};
//!
//! let context = ErrorContext::new(QuickstartError::ClaudeNotFound)
//!     .with_suggestion("Install Claude Code or re-run with --direct");
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for quickstart operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuickstartError {
    /// URL is not an absolute `https` URL.
    ///
    /// Raised for `http`, `ftp`, relative and unparseable input alike.
    #[error("URL must be an absolute https URL: {url}")]
    InvalidScheme {
        /// The rejected URL
        url: String,
    },

    /// Input contains a shell metacharacter.
    #[error("URL contains dangerous character '{found}': {input}")]
    DangerousCharacters {
        /// The rejected input
        input: String,
        /// First offending character
        found: char,
    },

    /// URL path contains a `..` segment.
    #[error("URL path contains a traversal segment: {url}")]
    PathTraversal {
        /// The rejected URL
        url: String,
    },

    /// URL host is not on the trusted domain allow-list.
    #[error("Domain '{host}' is not a trusted MCP endpoint")]
    UntrustedDomain {
        /// Hostname as parsed from the URL
        host: String,
    },

    /// Configuration document could not be parsed.
    ///
    /// Recovered locally: the file is moved aside and an empty document is used.
    #[error("Configuration file is corrupt: {path} ({reason})")]
    CorruptConfiguration {
        /// Path of the unreadable file
        path: String,
        /// Parser message
        reason: String,
    },

    /// Configuration document is valid JSON but not laid out as expected.
    ///
    /// Not recovered: the file belongs to Claude Code and is left as it is.
    #[error("Configuration file has an unexpected layout: {path} ({reason})")]
    UnsupportedConfiguration {
        /// Path of the file
        path: String,
        /// Which part has the wrong type
        reason: String,
    },

    /// Another process held the configuration lock for too long.
    #[error(
        "Timed out after {} waiting for lock on {path}{}",
        format_wait(.waited_ms),
        holder_suffix(.holder)
    )]
    LockTimeout {
        /// Lock file path
        path: String,
        /// How long we waited, in milliseconds
        waited_ms: u64,
        /// Description of the blocking process when it could be read
        holder: Option<String>,
    },

    /// External command exceeded its timeout and was killed.
    #[error("Command timed out after {seconds}s: {command}")]
    ProcessTimeout {
        /// Redacted command line
        command: String,
        /// Timeout that elapsed
        seconds: u64,
    },

    /// External command exited unsuccessfully.
    #[error("Command failed with exit code {}: {command}", exit_code_label(.code))]
    ProcessFailed {
        /// Redacted command line
        command: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The `claude` executable is not on PATH.
    #[error("Claude Code CLI ('claude') was not found in PATH")]
    ClaudeNotFound,

    /// Server key is not in the catalog.
    #[error("Unknown MCP server '{key}'")]
    UnknownServer {
        /// Requested key
        key: String,
        /// Closest catalog key, if any is close enough
        suggestion: Option<String>,
    },

    /// Env var name or value failed validation.
    #[error("Invalid value for environment variable {name}: {reason}")]
    InvalidEnvVar {
        /// Variable name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A server needs an env var that was not supplied.
    #[error("Server '{server}' requires environment variable {name}")]
    MissingEnvVar {
        /// Server key
        server: String,
        /// Variable name
        name: String,
    },

    /// Joining a command vector would produce a shell-unsafe string.
    #[error("Command cannot be rendered as a shell string: contains '{}'", .found.escape_default())]
    UnsafeShellString {
        /// First offending character
        found: char,
    },

    /// Settings file could not be read or parsed.
    #[error("Invalid settings file {path}: {reason}")]
    SettingsError {
        /// Settings path
        path: String,
        /// Parser message
        reason: String,
    },

    /// Any other failure, carried as its rendered message.
    #[error("{0}")]
    Other(String),
}

fn format_wait(ms: &u64) -> String {
    if *ms < 1000 { format!("{ms}ms") } else { format!("{:.1}s", *ms as f64 / 1000.0) }
}

fn holder_suffix(holder: &Option<String>) -> String {
    holder.as_ref().map_or_else(String::new, |h| format!(" (held by {h})"))
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl QuickstartError {
    /// Returns `true` for the URL validation family.
    #[must_use]
    pub const fn is_url_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidScheme { .. }
                | Self::DangerousCharacters { .. }
                | Self::PathTraversal { .. }
                | Self::UntrustedDomain { .. }
        )
    }
}

/// Error with user-facing details and a suggested fix.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: QuickstartError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: QuickstartError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: red error, yellow details, green suggestion.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Attach the standard suggestion for a typed error.
#[must_use]
pub fn create_error_context(error: QuickstartError) -> ErrorContext {
    match &error {
        QuickstartError::InvalidScheme { .. } => ErrorContext::new(error)
            .with_suggestion("Use an https:// URL; plain http and relative URLs are refused"),
        QuickstartError::DangerousCharacters { .. } | QuickstartError::UnsafeShellString { .. } => {
            ErrorContext::new(error)
                .with_details("Shell metacharacters are never passed to external commands")
                .with_suggestion(
                    "Remove characters such as ; & | ` $ ( ) and quotes from the input",
                )
        }
        QuickstartError::PathTraversal { .. } => ErrorContext::new(error)
            .with_suggestion("Use the endpoint path exactly as documented, without '..' segments"),
        QuickstartError::UntrustedDomain { .. } => ErrorContext::new(error)
            .with_details("SSE endpoints are limited to the hosts of the supported integrations")
            .with_suggestion("Check the URL for typos in the host name"),
        QuickstartError::CorruptConfiguration { .. } => ErrorContext::new(error)
            .with_details(
                "The unreadable file was moved aside and an empty configuration was used",
            ),
        QuickstartError::UnsupportedConfiguration { .. } => ErrorContext::new(error)
            .with_details("The file was left untouched")
            .with_suggestion("Fix the named field by hand, then retry"),
        QuickstartError::LockTimeout { .. } => ErrorContext::new(error)
            .with_details(
                "Another claude-code-quickstart run is updating the same configuration file",
            )
            .with_suggestion("Wait for the other run to finish, then retry"),
        QuickstartError::ProcessTimeout { .. } => ErrorContext::new(error)
            .with_suggestion("Retry, or raise process_timeout_secs in the settings file"),
        QuickstartError::ProcessFailed { stderr, .. } => {
            let details = stderr.trim().to_string();
            let ctx = ErrorContext::new(error)
                .with_suggestion("Run the command shown above manually to see the full output");
            if details.is_empty() { ctx } else { ctx.with_details(details) }
        }
        QuickstartError::ClaudeNotFound => ErrorContext::new(error)
            .with_suggestion(
                "Install Claude Code (npm install -g @anthropic-ai/claude-code) \
                 or re-run with --direct",
            ),
        QuickstartError::UnknownServer { suggestion, .. } => {
            let hint = suggestion.as_ref().map_or_else(
                || "Run 'claude-code-quickstart list' to see available servers".to_string(),
                |s| format!("Did you mean '{s}'?"),
            );
            ErrorContext::new(error).with_suggestion(hint)
        }
        QuickstartError::InvalidEnvVar { .. } | QuickstartError::MissingEnvVar { .. } => {
            ErrorContext::new(error).with_suggestion("Pass values with --env NAME=VALUE")
        }
        QuickstartError::SettingsError { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the TOML syntax or delete the settings file to use defaults"),
        QuickstartError::Other(_) => ErrorContext::new(error),
    }
}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Typed errors anywhere in the chain win; otherwise I/O, JSON and TOML errors
/// are mapped to the closest category and the full chain becomes the details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(typed) = cause.downcast_ref::<QuickstartError>() {
            return create_error_context(typed.clone());
        }
    }

    let chain = format!("{error:#}");

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(QuickstartError::Other(io_error.to_string()))
            .with_details(chain)
            .with_suggestion("Check file ownership and permissions");
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(QuickstartError::SettingsError {
            path: "config.toml".to_string(),
            reason: toml_error.message().to_string(),
        })
        .with_suggestion("Fix the TOML syntax or delete the settings file to use defaults");
    }

    if error.downcast_ref::<serde_json::Error>().is_some() {
        return ErrorContext::new(QuickstartError::CorruptConfiguration {
            path: "unknown".to_string(),
            reason: error.to_string(),
        })
        .with_details(chain);
    }

    let message = error.to_string();
    let ctx = ErrorContext::new(QuickstartError::Other(message.clone()));
    if chain == message { ctx } else { ctx.with_details(chain) }
}
