//! `check-url`: run the SSE endpoint validator by hand.

use crate::validation::UrlValidator;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Check a URL against the rules applied to SSE server endpoints.
#[derive(Args)]
pub struct CheckUrlCommand {
    /// URL to check
    url: String,
}

impl CheckUrlCommand {
    /// A rejected URL comes back as the typed validation error.
    pub fn execute(&self) -> Result<()> {
        let url = UrlValidator::default().validate(&self.url)?;
        println!("{} {url}", "✓ accepted:".green());
        Ok(())
    }
}
