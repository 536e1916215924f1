//! Scaffold starter files into a project.
//!
//! ```bash
//! claude-code-quickstart init
//! claude-code-quickstart init --path ./my-project
//! claude-code-quickstart init --force
//! ```
//!
//! Writes `CLAUDE.md`, `.claude/commands/review.md` and an empty `.mcp.json`,
//! then makes sure `.claude/settings.local.json` is git-ignored.

use super::CliContext;
use crate::scaffold::{FileAction, GITIGNORE_ENTRY, scaffold_project};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

/// Command to scaffold project files.
#[derive(Args)]
pub struct InitCommand {
    /// Target directory (defaults to the project directory)
    ///
    /// Created if it does not exist.
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Overwrite existing template files (`.mcp.json` is never replaced)
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub fn execute(self, ctx: &CliContext) -> Result<()> {
        let target = self.path.unwrap_or_else(|| ctx.project_dir.clone());
        let report = scaffold_project(&target, self.force)?;

        for (path, action) in &report.files {
            let shown = path.strip_prefix(&target).unwrap_or(path).display();
            match action {
                FileAction::Created => println!("{} Created {shown}", "✓".green()),
                FileAction::Overwritten => println!("{} Overwrote {shown}", "✓".green()),
                FileAction::Kept => {
                    println!("{} Kept existing {shown}", "-".yellow());
                }
            }
        }
        if report.gitignore_updated {
            println!("{} Added {GITIGNORE_ENTRY} to .gitignore", "✓".green());
        }

        if report.files.iter().any(|(_, a)| *a == FileAction::Kept) && !self.force {
            println!("\nUse {} to overwrite the kept templates.", "--force".bright_white());
        }
        println!("\n{}", "Next steps:".cyan());
        println!("  Edit CLAUDE.md to describe the project");
        println!("  Register servers with {}", "claude-code-quickstart setup".bright_white());
        Ok(())
    }
}
