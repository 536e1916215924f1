//! `list`: catalog servers and their status in one scope.

use super::CliContext;
use crate::catalog::{ServerSpec, Transport, TransportSpec};
use crate::config_store::ConfigStore;
use crate::scope::RegistrationScope;
use crate::setup::{ServerStatus, check_server_status};
use crate::validation::UrlValidator;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// List catalog servers with their registration status.
#[derive(Args)]
pub struct ListCommand {
    /// Scope whose configuration file is inspected
    #[arg(long, value_enum)]
    scope: Option<RegistrationScope>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ServerRow<'a> {
    key: &'a str,
    title: &'a str,
    transport: Transport,
    exists: bool,
    configured: bool,
    status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    env: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> ServerRow<'a> {
    fn new(spec: &'a ServerSpec, status: ServerStatus) -> Self {
        let url = match &spec.transport {
            TransportSpec::Sse(sse) => Some(sse.url.as_str()),
            TransportSpec::Stdio(_) => None,
        };
        Self {
            key: &spec.key,
            title: &spec.title,
            transport: spec.transport(),
            exists: status.exists,
            configured: status.configured,
            status: status.status,
            env: spec.required_env(),
            url,
            error: status.error,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListReport<'a> {
    scope: RegistrationScope,
    path: String,
    servers: Vec<ServerRow<'a>>,
    /// Registered keys that are not in the catalog
    other: Vec<String>,
}

impl ListCommand {
    pub fn execute(self, ctx: &CliContext) -> Result<()> {
        let scope = ctx.scope(self.scope);
        let store = ConfigStore::for_scope(scope, &ctx.project_dir)?;
        let validator = UrlValidator::default();

        let servers: Vec<ServerRow<'_>> = ctx
            .catalog
            .iter()
            .map(|spec| ServerRow::new(spec, check_server_status(spec, &store, &validator)))
            .collect();

        let other = store
            .read()
            .map(|doc| {
                doc.mcp_servers
                    .keys()
                    .filter(|k| ctx.catalog.get(k).is_err())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let report = ListReport {
            scope,
            path: store.target().to_string(),
            servers,
            other,
        };

        match self.format {
            OutputFormat::Json => {
                let json =
                    serde_json::to_string_pretty(&report).context("Failed to serialize list")?;
                println!("{json}");
            }
            OutputFormat::Table => print_table(&report),
        }
        Ok(())
    }
}

fn print_table(report: &ListReport<'_>) {
    println!("{} {} ({})", "Scope:".bold(), report.scope, report.path.dimmed());
    println!();

    let key_width = report.servers.iter().map(|r| r.key.len()).max().unwrap_or(3).max(3);
    let title_width = report.servers.iter().map(|r| r.title.len()).max().unwrap_or(5).max(5);
    println!(
        "  {:<key_width$}  {:<title_width$}  {:<9}  {}",
        "KEY".bold(),
        "TITLE".bold(),
        "TRANSPORT".bold(),
        "STATUS".bold()
    );

    for row in &report.servers {
        let status = match (row.configured, row.exists, row.error.is_some()) {
            (true, _, _) => row.status.green(),
            (false, _, true) => row.status.red(),
            (false, true, false) => row.status.yellow(),
            (false, false, false) => row.status.dimmed(),
        };
        let needs = if row.env.is_empty() {
            String::new()
        } else {
            format!("  {}", format!("needs {}", row.env.join(", ")).dimmed())
        };
        println!(
            "  {:<key_width$}  {:<title_width$}  {:<9}  {status}{needs}",
            row.key,
            row.title,
            row.transport.to_string()
        );
    }

    if !report.other.is_empty() {
        println!();
        println!("{} {}", "Other registered servers:".bold(), report.other.join(", "));
    }
}
