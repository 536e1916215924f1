//! Questions asked during setup.
//!
//! The orchestrator talks to the user only through the [`Prompter`] trait.
//! [`TerminalPrompter`] reads answers from stdin; when stdin is not a
//! terminal (CI, pipes) it never blocks and every question takes its default.

use anyhow::Result;
use colored::Colorize;
use std::io::{IsTerminal, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

/// Source of answers for the setup flow.
#[allow(async_fn_in_trait)]
pub trait Prompter {
    /// Ask a free-text question. An empty answer yields `default`
    /// (or an empty string without one).
    async fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String>;

    /// Like [`Prompter::ask`], but the default is shown masked.
    async fn ask_secret(&mut self, question: &str, default: Option<&str>) -> Result<String>;

    /// Ask a yes/no question.
    async fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}

/// Interpret a yes/no answer. `None` means the input was not understood.
#[must_use]
pub fn parse_confirmation(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Render a secret for display: a short prefix, the rest starred.
#[must_use]
pub fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count <= 8 {
        return "*".repeat(count.max(4));
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}{}", "*".repeat(8))
}

/// Prompter on the process's stdin/stdout.
pub struct TerminalPrompter {
    reader: BufReader<Stdin>,
    interactive: bool,
    assume_yes: bool,
}

impl TerminalPrompter {
    /// `assume_yes` answers every confirmation with "yes" without asking.
    #[must_use]
    pub fn new(assume_yes: bool) -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            interactive: std::io::stdin().is_terminal(),
            assume_yes,
        }
    }

    /// Whether questions are actually shown to a person.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn read_answer(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt} ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            // stdin closed; behave as non-interactive from here on
            self.interactive = false;
            println!();
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn ask_displayed(
        &mut self,
        question: &str,
        default: Option<&str>,
        shown_default: Option<String>,
    ) -> Result<String> {
        if !self.interactive {
            return Ok(default.unwrap_or_default().to_string());
        }

        let prompt = match &shown_default {
            Some(shown) => format!("{} [{}]:", question.green(), shown.dimmed()),
            None => format!("{}:", question.green()),
        };
        match self.read_answer(&prompt).await? {
            Some(answer) if !answer.is_empty() => Ok(answer),
            _ => Ok(default.unwrap_or_default().to_string()),
        }
    }
}

impl Prompter for TerminalPrompter {
    async fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        self.ask_displayed(question, default, default.map(str::to_string)).await
    }

    async fn ask_secret(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        self.ask_displayed(question, default, default.map(mask_secret)).await
    }

    async fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        if !self.interactive {
            return Ok(default);
        }

        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let prompt = format!("{} {hint}:", question.green());
        loop {
            let Some(answer) = self.read_answer(&prompt).await? else {
                return Ok(default);
            };
            if let Some(choice) = parse_confirmation(&answer, default) {
                return Ok(choice);
            }
            println!("{}", "Please answer 'y' or 'n'.".yellow());
        }
    }
}
