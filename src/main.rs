//! freightmail - email notification templates for freight operations.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info};

use freightmail::catalog;
use freightmail::cli::{Cli, Command, LogFormat};
use freightmail::config::Config;
use freightmail::dispatch::{Dispatcher, TestSendRequest};
use freightmail::mail::{LogMailSender, MailSender, SmtpMailSender};
use freightmail::routing::Severity;
use freightmail::store::{InMemoryTemplateStore, TemplateFilter, TemplateStore};
use freightmail::template::{Category, Template, TemplateId, TemplateStatus};
use freightmail::variables::{VariableValues, extract_variables_from, variable_token};

/// Initialize the tracing subscriber with the specified log format.
///
/// Logs go to stderr so command output on stdout stays clean.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    info!(config_path = %cli.config.display(), "Loading configuration");

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, path = %cli.config.display(), "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(error = %e, "Configuration validation error");
        }
        error!(
            error_count = errors.len(),
            "Configuration validation failed"
        );
        std::process::exit(1);
    }

    match cli.command {
        Command::Validate => {
            print_validation_summary(&cli.config, &config);
            Ok(())
        }
        Command::Catalog { category } => {
            print_catalog(category);
            Ok(())
        }
        command => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run(command, config))
        }
    }
}

/// Runs a command that needs the template store.
async fn run(command: Command, config: Config) -> Result<()> {
    let store = Arc::new(InMemoryTemplateStore::with_validator(
        config.routing_validator(),
    ));
    config
        .seed_store(store.as_ref())
        .await
        .context("failed to load templates")?;

    match command {
        Command::List {
            search,
            categories,
            statuses,
            json,
        } => {
            let filter = TemplateFilter {
                search,
                categories,
                statuses,
            };
            let templates = store.list(&filter).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&templates)?);
            } else {
                print_template_table(&templates);
            }
        }
        Command::Variables { id } => {
            let template = store.get(&TemplateId::new(id)).await?;
            print_variables(&template);
        }
        Command::Preview { id, set, json } => {
            let template = store.get(&TemplateId::new(id)).await?;
            let overrides: VariableValues = set.into_iter().collect();
            let preview = config.preview_renderer().render_with(&template, &overrides);

            if json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                println!("From:     {}", preview.from);
                println!("Reply-To: {}", preview.reply_to);
                println!("CC:       {}", preview.cc.join(", "));
                println!("BCC:      {}", preview.bcc.join(", "));
                println!("Subject:  {}", preview.subject);
                println!();
                println!("{}", preview.body);
                if !preview.attachments.is_empty() {
                    println!();
                    println!("Attachments: {}", preview.attachments.join(", "));
                }
                if !preview.unresolved.is_empty() {
                    println!();
                    println!("Unresolved variables: {}", preview.unresolved.join(", "));
                }
            }
        }
        Command::SendTest {
            id,
            to,
            set,
            dry_run,
        } => {
            let sender: Arc<dyn MailSender> = if dry_run {
                Arc::new(LogMailSender::default())
            } else {
                let Some(smtp) = &config.smtp else {
                    bail!("no smtp section in configuration; use --dry-run to log instead");
                };
                Arc::new(SmtpMailSender::from_config("smtp", smtp)?)
            };

            let dispatcher = Dispatcher::new(store, sender)
                .with_renderer(config.preview_renderer())
                .with_validator(config.routing_validator());

            let mut request = TestSendRequest::new(TemplateId::new(id), to);
            request.overrides = set.into_iter().collect();

            let record = dispatcher.send_test(request).await?;
            println!(
                "Test email '{}' sent to {} via {}",
                record.subject, record.recipient, record.sender
            );
            for entry in &record.dropped {
                println!("  skipped {}", entry);
            }
        }
        Command::Validate | Command::Catalog { .. } => {}
    }

    Ok(())
}

fn print_validation_summary(path: &std::path::Path, config: &Config) {
    println!("Configuration is valid: {}", path.display());
    println!(
        "  Templates: {} ({} active)",
        config.templates.len(),
        config
            .templates
            .iter()
            .filter(|t| t.status == TemplateStatus::Active)
            .count()
    );
    match &config.smtp {
        Some(smtp) => println!("  SMTP: {}:{} ({:?})", smtp.host, smtp.port, smtp.tls),
        None => println!("  SMTP: not configured (dry runs only)"),
    }
    if let Some(domain) = &config.branding.custom_domain {
        println!("  Custom domain: {}", domain);
    }
    let sending_domains = config.sending_domains();
    println!(
        "  Sending domains: {}{}",
        if sending_domains.is_empty() {
            "none".to_string()
        } else {
            sending_domains.join(", ")
        },
        if config.domains.enforce {
            " (enforced)"
        } else {
            ""
        }
    );

    let validator = config.routing_validator();
    let default_from = config.branding.default_from.as_deref().unwrap_or_default();
    for entry in &config.templates {
        let mut fields = entry.content.routing();
        if fields.from.trim().is_empty() {
            fields.from = default_from;
        }
        let report = validator.validate(&fields);
        for issue in report.issues() {
            let level = match issue.severity() {
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            println!("  {}: {}: {}", level, entry.id, issue);
        }
    }
}

fn print_template_table(templates: &[Template]) {
    println!("{:<24} {:<9} {:<12} NAME", "ID", "STATUS", "CATEGORY");
    for t in templates {
        println!(
            "{:<24} {:<9} {:<12} {}",
            t.id(),
            t.status(),
            t.category(),
            t.name()
        );
    }
}

fn print_variables(template: &Template) {
    println!("{} ({})", template.name(), template.category());

    println!("Subject and body:");
    if template.variables().is_empty() {
        println!("  no variables");
    }
    for name in template.variables() {
        print_variable_line(template.category(), name);
    }

    // Routing tokens are not part of the template's variable list
    let routing = template.routing();
    let routing_variables: Vec<String> = extract_variables_from(
        [routing.from, routing.reply_to]
            .into_iter()
            .chain(routing.cc.iter().map(String::as_str))
            .chain(routing.bcc.iter().map(String::as_str)),
    );
    if !routing_variables.is_empty() {
        println!("Routing fields:");
        for name in &routing_variables {
            print_variable_line(template.category(), name);
        }
    }
}

fn print_variable_line(category: Category, name: &str) {
    let note = if catalog::is_available(category, name) {
        ""
    } else {
        " [not offered for this category]"
    };
    println!(
        "  {:<28} {}{}",
        variable_token(name),
        catalog::describe(name),
        note
    );
}

fn print_catalog(category: Category) {
    println!("{}: {}", category.display_name(), category.description());
    for group in catalog::catalog_for(category) {
        println!();
        println!("{}", group.name);
        for name in group.variables {
            match catalog::lookup(name) {
                Some(info) => println!(
                    "  {:<28} {} (e.g. {})",
                    variable_token(name),
                    info.description,
                    info.example
                ),
                None => println!("  {}", variable_token(name)),
            }
        }
    }
}
