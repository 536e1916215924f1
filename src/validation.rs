//! Validation of untrusted input that ends up in external command vectors.
//!
//! Two kinds of input reach `claude mcp add` from outside the compiled
//! catalog: SSE endpoint URLs and environment variable assignments. This
//! module decides whether either is safe to embed.
//!
//! # URL rules
//!
//! [`UrlValidator::validate`] applies, in this order:
//!
//! 1. **Dangerous characters** on the raw string: any of
//!    ``; & | ` $ ( ) { } [ ] \ < > ' "`` or whitespace/control characters
//!    anywhere, including after an otherwise valid URL
//! 2. **Scheme**: must parse as an absolute URL with scheme `https`
//! 3. **Path traversal**: no `..` segment (literal or percent-encoded) in the raw path
//! 4. **Domain allow-list**: the host equals a trusted host or is a subdomain
//!    of one, compared label-by-label from the right
//!
//! The raw-string check runs first so a metacharacter is always reported as
//! [`QuickstartError::DangerousCharacters`], whatever else is wrong with the URL.
//! The traversal check reads the raw string because URL parsing silently
//! resolves `..` segments.
//!
//! [`UrlValidator::is_valid`] runs the identical rules and folds the outcome
//! into a `bool` for status displays.

use crate::core::QuickstartError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Shell metacharacters that are never allowed in a URL or shell rendering.
pub const DANGEROUS_CHARACTERS: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '{', '}', '[', ']', '\\', '<', '>', '\'', '"',
];

/// Hosts that serve the SSE integrations in the catalog.
///
/// Subdomains of an entry are accepted; siblings are not, so
/// `fake-bindings.mcp.cloudflare.com` fails while `bindings.mcp.cloudflare.com`
/// passes.
pub const TRUSTED_HOSTS: &[&str] = &[
    "bindings.mcp.cloudflare.com",
    "builds.mcp.cloudflare.com",
    "observability.mcp.cloudflare.com",
    "docs.mcp.cloudflare.com",
    "radar.mcp.cloudflare.com",
    "browser.mcp.cloudflare.com",
    "localhost",
];

/// Returns the first character of `input` that must not reach a shell.
#[must_use]
pub fn find_dangerous_character(input: &str) -> Option<char> {
    input
        .chars()
        .find(|c| DANGEROUS_CHARACTERS.contains(c) || c.is_whitespace() || c.is_control())
}

/// Validator for SSE endpoint URLs with a fixed host allow-list.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    trusted_hosts: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(TRUSTED_HOSTS.iter().copied())
    }
}

impl UrlValidator {
    /// Build a validator trusting exactly `hosts` (and their subdomains).
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted_hosts: hosts
                .into_iter()
                .map(|h| h.into().trim_end_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Throwing convention: returns the URL unchanged when every rule passes.
    ///
    /// # Errors
    ///
    /// The first failing rule, as one of [`QuickstartError::DangerousCharacters`],
    /// [`QuickstartError::InvalidScheme`], [`QuickstartError::PathTraversal`] or
    /// [`QuickstartError::UntrustedDomain`].
    pub fn validate(&self, url: &str) -> Result<String, QuickstartError> {
        if let Some(found) = find_dangerous_character(url) {
            return Err(QuickstartError::DangerousCharacters {
                input: url.to_string(),
                found,
            });
        }

        let parsed = Url::parse(url).map_err(|_| QuickstartError::InvalidScheme {
            url: url.to_string(),
        })?;
        if parsed.scheme() != "https" || parsed.cannot_be_a_base() {
            return Err(QuickstartError::InvalidScheme {
                url: url.to_string(),
            });
        }

        if has_traversal_segment(url) {
            return Err(QuickstartError::PathTraversal {
                url: url.to_string(),
            });
        }

        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        if !self.is_trusted_host(&host) {
            return Err(QuickstartError::UntrustedDomain { host });
        }

        Ok(url.to_string())
    }

    /// Boolean convention: same rules as [`validate`](Self::validate).
    #[must_use]
    pub fn is_valid(&self, url: &str) -> bool {
        self.validate(url).is_ok()
    }

    fn is_trusted_host(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        self.trusted_hosts.iter().any(|trusted| {
            host == trusted
                || host
                    .strip_suffix(trusted.as_str())
                    .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
        })
    }
}

/// Validate `url` against the built-in allow-list.
pub fn validate_url(url: &str) -> Result<String, QuickstartError> {
    UrlValidator::default().validate(url)
}

/// Boolean form of [`validate_url`].
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    UrlValidator::default().is_valid(url)
}

/// Checks the raw path (before URL normalisation) for `..` segments.
fn has_traversal_segment(raw: &str) -> bool {
    let after_scheme = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let Some(path_start) = after_scheme.find(['/', '?', '#']) else {
        return false;
    };
    let rest = &after_scheme[path_start..];
    let path = rest.split(['?', '#']).next().unwrap_or_default();

    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == ".."
    })
}

fn env_name_regex() -> Option<&'static Regex> {
    static ENV_NAME: OnceLock<Option<Regex>> = OnceLock::new();
    ENV_NAME.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok()).as_ref()
}

/// Checks that `name` is a portable environment variable identifier.
pub fn validate_env_name(name: &str) -> Result<(), QuickstartError> {
    let valid = env_name_regex().is_some_and(|re| re.is_match(name));
    if valid {
        Ok(())
    } else {
        Err(QuickstartError::InvalidEnvVar {
            name: name.to_string(),
            reason: "names must start with a letter or '_' and contain only letters, digits and '_'"
                .to_string(),
        })
    }
}

/// Checks an env var value supplied by the user.
///
/// Values travel as a single vector element, so shell metacharacters are
/// harmless there. Empty values and control characters (newlines, NUL) are
/// still refused because the external tool stores them verbatim.
pub fn validate_env_value(name: &str, value: &str) -> Result<(), QuickstartError> {
    if value.trim().is_empty() {
        return Err(QuickstartError::InvalidEnvVar {
            name: name.to_string(),
            reason: "value is empty".to_string(),
        });
    }
    if let Some(c) = value.chars().find(|c| c.is_control()) {
        return Err(QuickstartError::InvalidEnvVar {
            name: name.to_string(),
            reason: format!("value contains control character {}", c.escape_default()),
        });
    }
    Ok(())
}

/// Parses a `NAME=VALUE` assignment from the command line.
pub fn parse_env_assignment(raw: &str) -> Result<(String, String), QuickstartError> {
    let (name, value) = raw.split_once('=').ok_or_else(|| QuickstartError::InvalidEnvVar {
        name: raw.to_string(),
        reason: "expected NAME=VALUE".to_string(),
    })?;
    let name = name.trim();
    validate_env_name(name)?;
    validate_env_value(name, value)?;
    Ok((name.to_string(), value.to_string()))
}
