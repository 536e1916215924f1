//! Construction of `claude mcp` argument vectors.
//!
//! A [`CommandVector`] is an ordered list of independently passed arguments.
//! It is handed to the process layer as-is and never collapsed into a shell
//! string along the way. The only route to a single string is
//! [`CommandVector::to_shell_string`], which re-checks the joined result for
//! shell metacharacters because no per-token escaping happens.
//!
//! # Layout
//!
//! ```text
//! claude mcp add [--scope S] --transport sse <key> <url>
//! claude mcp add [--scope S] [--env NAME=VALUE]... -- <key> <command> <args>...
//! claude mcp remove [--scope S] <key>
//! ```
//!
//! `--scope` is omitted for `local`, the external tool's default.

use crate::catalog::{EnvVarMap, ServerSpec, TransportSpec};
use crate::constants::CLAUDE_PROGRAM;
use crate::core::QuickstartError;
use crate::scope::RegistrationScope;
use crate::validation::{UrlValidator, find_dangerous_character};
use std::fmt;

/// Ordered argument vector for one external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandVector {
    tokens: Vec<String>,
}

impl CommandVector {
    /// Start a vector with the program name.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            tokens: vec![program.into()],
        }
    }

    /// Build from raw tokens; the first one is the program.
    ///
    /// Returns `None` for an empty token list.
    pub fn from_tokens<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() { None } else { Some(Self { tokens }) }
    }

    fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    fn extend<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always `false`; a vector carries at least its program name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Human-readable rendering with env var values replaced by `***`.
    ///
    /// Used for logs and error messages; never executed.
    #[must_use]
    pub fn redacted(&self) -> String {
        let mut out = Vec::with_capacity(self.tokens.len());
        let mut after_env_flag = false;
        for token in &self.tokens {
            if after_env_flag {
                let name = token.split_once('=').map_or(token.as_str(), |(n, _)| n);
                out.push(format!("{name}=***"));
            } else {
                out.push(token.clone());
            }
            after_env_flag = token == "--env";
        }
        out.join(" ")
    }

    /// Join with single spaces for a string-only execution primitive.
    ///
    /// # Errors
    ///
    /// [`QuickstartError::UnsafeShellString`] if the joined string contains
    /// any shell metacharacter, or whitespace/control characters inside a token
    /// (which would change the word split).
    pub fn to_shell_string(&self) -> Result<ShellCommand, QuickstartError> {
        for token in &self.tokens {
            if token.is_empty() {
                return Err(QuickstartError::UnsafeShellString { found: ' ' });
            }
            if let Some(found) = find_dangerous_character(token) {
                return Err(QuickstartError::UnsafeShellString { found });
            }
        }
        Ok(ShellCommand(self.tokens.join(" ")))
    }
}

impl fmt::Display for CommandVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// A command line that passed the joined-string safety check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand(String);

impl ShellCommand {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds `claude mcp` command vectors.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    validator: UrlValidator,
}

impl CommandBuilder {
    #[must_use]
    pub const fn new(validator: UrlValidator) -> Self {
        Self { validator }
    }

    fn base(subcommand: &str, scope: RegistrationScope) -> CommandVector {
        let mut cmd = CommandVector::new(CLAUDE_PROGRAM);
        cmd.extend(["mcp", subcommand]);
        if scope.needs_flag() {
            cmd.extend(["--scope", scope.as_str()]);
        }
        cmd
    }

    /// Registration command for `spec`.
    ///
    /// SSE URLs are validated first; a rejected URL aborts construction and
    /// no partial vector is returned. Env var flags always precede the `--`
    /// separator, even when there are none.
    ///
    /// # Errors
    ///
    /// URL validation errors, only for SSE specs.
    pub fn build_add(
        &self,
        spec: &ServerSpec,
        scope: RegistrationScope,
        env: &EnvVarMap,
    ) -> Result<CommandVector, QuickstartError> {
        let mut cmd = Self::base("add", scope);

        match &spec.transport {
            TransportSpec::Sse(sse) => {
                let url = self.validator.validate(&sse.url)?;
                cmd.extend(["--transport", "sse"]);
                cmd.push(spec.key.as_str());
                cmd.push(url);
            }
            TransportSpec::Stdio(stdio) => {
                for (name, value) in env {
                    cmd.push("--env");
                    cmd.push(format!("{name}={value}"));
                }
                cmd.push("--");
                cmd.push(spec.key.as_str());
                cmd.push(stdio.command.as_str());
                cmd.extend(stdio.args.iter().map(String::as_str));
            }
        }

        tracing::debug!(target: "command", "Built command: {}", cmd.redacted());
        Ok(cmd)
    }

    /// Removal command for `key`.
    #[must_use]
    pub fn build_remove(&self, key: &str, scope: RegistrationScope) -> CommandVector {
        let mut cmd = Self::base("remove", scope);
        cmd.push(key);
        cmd
    }
}

/// [`CommandBuilder::build_add`] with the built-in allow-list.
pub fn build_add_command(
    spec: &ServerSpec,
    scope: RegistrationScope,
    env: &EnvVarMap,
) -> Result<CommandVector, QuickstartError> {
    CommandBuilder::default().build_add(spec, scope, env)
}

/// [`CommandBuilder::build_remove`] with the built-in allow-list.
#[must_use]
pub fn build_remove_command(key: &str, scope: RegistrationScope) -> CommandVector {
    CommandBuilder::default().build_remove(key, scope)
}
