//! The catalog of installable MCP servers.
//!
//! A [`Catalog`] is built once at startup (normally from [`Catalog::builtin`])
//! and passed by reference to whatever needs it, so tests can substitute
//! their own list without touching process-wide state.
//!
//! Every [`ServerSpec`] carries exactly one transport description: the
//! [`TransportSpec`] enum makes a half-stdio, half-SSE entry unrepresentable.

use crate::config_store::PersistedServerRecord;
use crate::core::QuickstartError;
use crate::validation::{UrlValidator, find_dangerous_character, validate_env_name};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Environment variable assignments for one registration.
///
/// Ordered so generated command vectors are deterministic.
pub type EnvVarMap = BTreeMap<String, String>;

/// Transport kind, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Local process spawned by Claude Code
    Stdio,
    /// Remote Server-Sent-Events endpoint
    Sse,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
        })
    }
}

/// A locally spawned server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StdioSpec {
    /// Executable registered with Claude Code (e.g. `npx`)
    pub command: String,
    /// Arguments passed to `command`, in order
    pub args: Vec<String>,
    /// Primary environment variable the server needs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
    /// Secondary environment variable (dual-credential servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_var2: Option<String>,
    /// Helper CLI that must be on PATH for `command` to work (e.g. `uvx`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
}

/// A remote SSE endpoint; authentication happens later in the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SseSpec {
    /// Absolute HTTPS endpoint
    pub url: String,
    /// Documentation for the manual authentication step
    pub help_url: String,
}

/// Transport-specific part of a [`ServerSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportSpec {
    /// npm/uvx-style local server
    Stdio(StdioSpec),
    /// Remote SSE server
    Sse(SseSpec),
}

/// How the setup flow has to talk to the user for a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// No input needed beyond a confirmation
    NoConfig,
    /// One env var
    SingleEnv,
    /// Two env vars
    DualEnv,
    /// Needs a helper binary on PATH, no env vars
    WrapperCli,
    /// Remote endpoint, credentials exchanged out of band
    Sse,
}

/// Static descriptor of one installable MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSpec {
    /// Stable identifier, used as JSON map key and CLI argument
    pub key: String,
    /// Display name
    pub title: String,
    /// Transport and its fields
    #[serde(flatten)]
    pub transport: TransportSpec,
}

impl ServerSpec {
    /// Describe a stdio server.
    pub fn stdio<I, S>(key: &str, title: &str, command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            transport: TransportSpec::Stdio(StdioSpec {
                command: command.to_string(),
                args: args.into_iter().map(Into::into).collect(),
                env_var: None,
                env_var2: None,
                wrapper: None,
            }),
        }
    }

    /// Describe an SSE server.
    #[must_use]
    pub fn sse(key: &str, title: &str, url: &str, help_url: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            transport: TransportSpec::Sse(SseSpec {
                url: url.to_string(),
                help_url: help_url.to_string(),
            }),
        }
    }

    /// Attach the env vars a stdio server needs. No effect on SSE specs.
    #[must_use]
    pub fn with_env(mut self, primary: &str, secondary: Option<&str>) -> Self {
        if let TransportSpec::Stdio(stdio) = &mut self.transport {
            stdio.env_var = Some(primary.to_string());
            stdio.env_var2 = secondary.map(str::to_string);
        }
        self
    }

    /// Mark a stdio server as depending on a helper CLI.
    #[must_use]
    pub fn with_wrapper(mut self, binary: &str) -> Self {
        if let TransportSpec::Stdio(stdio) = &mut self.transport {
            stdio.wrapper = Some(binary.to_string());
        }
        self
    }

    #[must_use]
    pub const fn transport(&self) -> Transport {
        match self.transport {
            TransportSpec::Stdio(_) => Transport::Stdio,
            TransportSpec::Sse(_) => Transport::Sse,
        }
    }

    /// Env var names this server expects, primary first.
    #[must_use]
    pub fn required_env(&self) -> Vec<&str> {
        match &self.transport {
            TransportSpec::Stdio(stdio) => {
                stdio.env_var.iter().chain(stdio.env_var2.iter()).map(String::as_str).collect()
            }
            TransportSpec::Sse(_) => Vec::new(),
        }
    }

    #[must_use]
    pub fn prompt_kind(&self) -> PromptKind {
        match &self.transport {
            TransportSpec::Sse(_) => PromptKind::Sse,
            TransportSpec::Stdio(stdio) => match (&stdio.env_var, &stdio.env_var2, &stdio.wrapper) {
                (Some(_), Some(_), _) => PromptKind::DualEnv,
                (Some(_), None, _) | (None, Some(_), _) => PromptKind::SingleEnv,
                (None, None, Some(_)) => PromptKind::WrapperCli,
                (None, None, None) => PromptKind::NoConfig,
            },
        }
    }

    /// Record written to a configuration file when registering directly.
    ///
    /// Only the env vars this server declares are kept.
    #[must_use]
    pub fn record(&self, env: &EnvVarMap) -> PersistedServerRecord {
        match &self.transport {
            TransportSpec::Sse(sse) => PersistedServerRecord::sse(&sse.url),
            TransportSpec::Stdio(stdio) => {
                let declared: EnvVarMap = self
                    .required_env()
                    .into_iter()
                    .filter_map(|name| env.get(name).map(|v| (name.to_string(), v.clone())))
                    .collect();
                PersistedServerRecord::stdio(&stdio.command, stdio.args.clone(), declared)
            }
        }
    }
}

const CLOUDFLARE_MCP_DOCS: &str =
    "https://developers.cloudflare.com/agents/model-context-protocol/mcp-servers-for-cloudflare/";

/// An immutable, ordered list of [`ServerSpec`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    servers: Vec<ServerSpec>,
}

impl Catalog {
    #[must_use]
    pub const fn new(servers: Vec<ServerSpec>) -> Self {
        Self { servers }
    }

    /// The catalog shipped with this release.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            ServerSpec::stdio("context7", "Context7 Docs", "npx", ["-y", "@upstash/context7-mcp"]),
            ServerSpec::stdio(
                "github",
                "GitHub",
                "npx",
                ["-y", "@modelcontextprotocol/server-github"],
            )
            .with_env("GITHUB_PERSONAL_ACCESS_TOKEN", None),
            ServerSpec::stdio(
                "supabase",
                "Supabase",
                "npx",
                ["-y", "@supabase/mcp-server-supabase@latest", "--read-only"],
            )
            .with_env("SUPABASE_ACCESS_TOKEN", None),
            ServerSpec::stdio(
                "brave-search",
                "Brave Search",
                "npx",
                ["-y", "@modelcontextprotocol/server-brave-search"],
            )
            .with_env("BRAVE_API_KEY", None),
            ServerSpec::stdio("tavily", "Tavily Search", "npx", ["-y", "tavily-mcp@latest"])
                .with_env("TAVILY_API_KEY", None),
            ServerSpec::stdio(
                "n8n",
                "n8n Workflows",
                "npx",
                ["-y", "@leonardsellem/n8n-mcp-server"],
            )
            .with_env("N8N_API_URL", Some("N8N_API_KEY")),
            ServerSpec::stdio(
                "playwright",
                "Playwright Browser",
                "npx",
                ["-y", "@playwright/mcp@latest"],
            ),
            ServerSpec::stdio(
                "serena",
                "Serena Coding Agent",
                "uvx",
                [
                    "--from",
                    "git+https://github.com/oraios/serena",
                    "serena",
                    "start-mcp-server",
                    "--context",
                    "ide-assistant",
                ],
            )
            .with_wrapper("uvx"),
            ServerSpec::sse(
                "cloudflare-bindings",
                "Cloudflare Workers Bindings",
                "https://bindings.mcp.cloudflare.com/sse",
                CLOUDFLARE_MCP_DOCS,
            ),
            ServerSpec::sse(
                "cloudflare-builds",
                "Cloudflare Workers Builds",
                "https://builds.mcp.cloudflare.com/sse",
                CLOUDFLARE_MCP_DOCS,
            ),
            ServerSpec::sse(
                "cloudflare-observability",
                "Cloudflare Observability",
                "https://observability.mcp.cloudflare.com/sse",
                CLOUDFLARE_MCP_DOCS,
            ),
        ])
    }

    /// Look up a server by key.
    ///
    /// # Errors
    ///
    /// [`QuickstartError::UnknownServer`] with the closest key as a suggestion.
    pub fn get(&self, key: &str) -> Result<&ServerSpec, QuickstartError> {
        self.servers.iter().find(|s| s.key == key).ok_or_else(|| QuickstartError::UnknownServer {
            key: key.to_string(),
            suggestion: self.closest_key(key),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerSpec> {
        self.servers.iter()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.key.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    fn closest_key(&self, key: &str) -> Option<String> {
        self.servers
            .iter()
            .map(|s| (strsim::jaro_winkler(key, &s.key), &s.key))
            .filter(|(score, _)| *score >= 0.8)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, k)| k.clone())
    }

    /// Check the invariants a catalog must satisfy before it is used.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self, validator: &UrlValidator) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for spec in &self.servers {
            if !seen.insert(spec.key.as_str()) {
                problems.push(format!("duplicate key '{}'", spec.key));
            }
            if spec.title.trim().is_empty() {
                problems.push(format!("'{}' has an empty title", spec.key));
            }
            if let Some(c) = find_dangerous_character(&spec.key) {
                problems.push(format!("key '{}' contains '{}'", spec.key, c.escape_default()));
            }

            match &spec.transport {
                TransportSpec::Sse(sse) => {
                    if let Err(e) = validator.validate(&sse.url) {
                        problems.push(format!("'{}': {e}", spec.key));
                    }
                }
                TransportSpec::Stdio(stdio) => {
                    if stdio.command.trim().is_empty() {
                        problems.push(format!("'{}' has an empty command", spec.key));
                    }
                    for token in std::iter::once(&stdio.command).chain(stdio.args.iter()) {
                        if let Some(c) = find_dangerous_character(token) {
                            problems.push(format!(
                                "'{}' argument '{token}' contains '{}'",
                                spec.key,
                                c.escape_default()
                            ));
                        }
                    }
                    for name in spec.required_env() {
                        if let Err(e) = validate_env_name(name) {
                            problems.push(format!("'{}': {e}", spec.key));
                        }
                    }
                }
            }
        }

        if problems.is_empty() { Ok(()) } else { Err(problems) }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
