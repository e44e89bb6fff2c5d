//! Command-line interface for freightmail using clap.
//!
//! Supports configuration file path via `-c` argument.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::template::{Category, TemplateStatus};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format for log aggregation.
    Json,
}

/// Email notification templates for freight operations.
#[derive(Parser, Debug)]
#[command(name = "freightmail")]
#[command(version)]
#[command(about = "Email notification templates for freight operations")]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Log format: text or json.
    #[arg(
        long = "log-format",
        value_enum,
        default_value_t = LogFormat::Text,
        env = "LOG_FORMAT",
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate configuration and report routing issues of every template.
    Validate,

    /// List templates.
    List {
        /// Case-insensitive text matched against name, subject and description.
        #[arg(long)]
        search: Option<String>,
        /// Only templates of this category (repeatable).
        #[arg(long = "category")]
        categories: Vec<Category>,
        /// Only templates with this status (repeatable).
        #[arg(long = "status")]
        statuses: Vec<TemplateStatus>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the variables a template uses.
    Variables {
        /// Template id.
        id: String,
    },

    /// Show the variables offered for a category.
    Catalog {
        /// operational, financial, marketplace or onboarding.
        category: Category,
    },

    /// Render a template with sample data.
    Preview {
        /// Template id.
        id: String,
        /// Override a sample value: Name=Value (repeatable).
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Send a rendered template to a test address.
    SendTest {
        /// Template id.
        id: String,
        /// Test recipient address.
        #[arg(long)]
        to: String,
        /// Override a sample value: Name=Value (repeatable).
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        /// Log the email instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Parses `Name=Value`. The value may be empty and may contain `=`.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected Name=Value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}
