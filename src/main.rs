//! chat-export - Render captured AI chat conversations to portable formats.
//!
//! Captures are JSON files produced by the browser-side scraper. This tool
//! converts their message HTML into semantic blocks and renders Markdown,
//! plain text, HTML, Word, print-ready HTML for PDF, or a Notion page.
//!
//! QUICK START:
//!   chat-export list captures/                  # See captured conversations
//!   chat-export export chat.json                # Markdown into exports/
//!   chat-export export captures/ --all -f html  # Merge a directory into one page
//!   chat-export notion chat.json --page <url>   # Create a Notion page

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::render::notion::document_blocks;
use application::{render, CollectOutcome, ExportFormat, ExportService, Scope};
use cli::{parse_format, parse_scope, Cli, Commands};
use domain::{AppError, ConversationDocument, ExportOptions};
use infrastructure::{
    config_file_path, ensure_config_exists, load_config, normalize_notion_page_id, write_export,
    AppConfig, CaptureSource, ImageInliner, NotionClient,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let config = load_config()?;

    match cli.command {
        Commands::Export {
            inputs,
            format,
            output,
            all,
            pick,
            filter,
            from,
            to,
            label_lang,
            date_stamp,
            no_highlight,
            inline_images,
            stdout,
        } => {
            let format = parse_format(format.as_deref(), &config.export.format)
                .map_err(|message| AppError::Config { message })?;
            let options = build_options(
                &config,
                filter.as_deref(),
                label_lang.as_deref(),
                date_stamp.as_deref(),
                from.as_deref(),
                to.as_deref(),
                no_highlight,
            )?;
            let scope = resolve_scope(&inputs, all, pick.as_deref())?;
            cmd_export(
                &config, &inputs, format, &output, &scope, &options, inline_images, stdout,
            )
            .await?;
        }
        Commands::Notion {
            inputs,
            page,
            token,
            all,
            pick,
            filter,
            label_lang,
        } => {
            let options = build_options(
                &config,
                filter.as_deref(),
                label_lang.as_deref(),
                None,
                None,
                None,
                false,
            )?;
            let scope = resolve_scope(&inputs, all, pick.as_deref())?;
            cmd_notion(
                &config,
                &inputs,
                page.as_deref(),
                token.as_deref(),
                &scope,
                &options,
            )
            .await?;
        }
        Commands::List { dir } => {
            cmd_list(&dir).await?;
        }
        Commands::Config { init } => {
            cmd_config(init)?;
        }
    }

    Ok(())
}

/// Merge config defaults with command-line overrides.
fn build_options(
    config: &AppConfig,
    filter: Option<&str>,
    label_lang: Option<&str>,
    date_stamp: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    no_highlight: bool,
) -> domain::Result<ExportOptions> {
    let mut options = ExportOptions {
        message_filter: config.export.message_filter,
        label_language: config.export.label_language,
        date_stamp_mode: config.export.date_stamp_mode,
        syntax_highlight: config.export.syntax_highlight && !no_highlight,
        ..ExportOptions::default()
    };

    if let Some(value) = filter {
        options.message_filter = value.parse().map_err(|message| AppError::Config { message })?;
    }
    if let Some(value) = label_lang {
        options.label_language = value.parse().map_err(|message| AppError::Config { message })?;
    }
    if let Some(value) = date_stamp {
        options.date_stamp_mode = value.parse().map_err(|message| AppError::Config { message })?;
    }
    options.date_range_start = parse_date(from)?;
    options.date_range_end = parse_date(to)?;

    Ok(options)
}

fn parse_date(value: Option<&str>) -> domain::Result<Option<chrono::NaiveDate>> {
    value
        .map(|v| {
            chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| AppError::Config {
                message: format!("Invalid date '{v}': expected YYYY-MM-DD"),
            })
        })
        .transpose()
}

/// Build the capture source for the given inputs.
fn build_source(inputs: &[PathBuf]) -> CaptureSource {
    match inputs {
        [single] if single.is_dir() => CaptureSource::from_dir(single.clone()),
        files => CaptureSource::from_files(files.to_vec()),
    }
}

/// Explicit file lists cover every listed file by default; directories
/// default to the first conversation unless `--all`/`--pick` widen it.
fn resolve_scope(inputs: &[PathBuf], all: bool, pick: Option<&str>) -> domain::Result<Scope> {
    if inputs.len() > 1 && !all && pick.is_none() {
        return Ok(Scope::All);
    }
    parse_scope(all, pick).map_err(|message| AppError::Config { message })
}

fn service_for(config: &AppConfig) -> ExportService {
    ExportService {
        fetch_timeout: config.export.fetch_timeout(),
        thresholds: config.scoring.thresholds(),
        app_name: "Chat".to_owned(),
    }
}

/// Token that trips on Ctrl-C so collection stops between conversations.
fn cancellation_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trip = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trip.cancel();
        }
    });
    token
}

fn report_partial(outcome: &CollectOutcome) {
    for failure in &outcome.failures {
        eprintln!(
            "{} {}: {}",
            "Skipped".yellow().bold(),
            failure.reference.title,
            failure.reason
        );
    }
    if outcome.succeeded() < outcome.total {
        println!(
            "{} Processed {} of {} conversations",
            "!".yellow().bold(),
            outcome.succeeded(),
            outcome.total
        );
    }
}

/// Export captures to a file format.
#[allow(clippy::too_many_arguments)]
async fn cmd_export(
    config: &AppConfig,
    inputs: &[PathBuf],
    format: ExportFormat,
    output: &PathBuf,
    scope: &Scope,
    options: &ExportOptions,
    inline_images: bool,
    stdout: bool,
) -> domain::Result<()> {
    let source = build_source(inputs);
    let service = service_for(config);

    let outcome = service.collect(&source, scope, &cancellation_token()).await?;
    report_partial(&outcome);

    let (document, date_filter_skipped) = service.assemble(outcome.documents, options);
    if date_filter_skipped {
        println!(
            "{} Date filter could not be applied; exporting without it",
            "!".yellow().bold()
        );
    }

    let artifact = render_with_images(&service, &document, format, options, inline_images).await?;

    if stdout {
        print!("{}", String::from_utf8_lossy(&artifact.blob.bytes));
        return Ok(());
    }

    // an explicit -o wins; the config default only replaces the built-in one
    let dir = if output.as_os_str() == "exports" {
        config.export.output_dir.clone().unwrap_or_else(|| output.clone())
    } else {
        output.clone()
    };
    let path = write_export(&artifact.blob, &dir, &artifact.basename)?;
    println!(
        "{} {} → {}",
        "✓".green().bold(),
        document.title.cyan(),
        path.display()
    );

    Ok(())
}

/// Render, optionally inlining remote images first.
async fn render_with_images(
    service: &ExportService,
    document: &ConversationDocument,
    format: ExportFormat,
    options: &ExportOptions,
    inline_images: bool,
) -> domain::Result<application::ExportArtifact> {
    if !inline_images {
        return service.render(document, format, options);
    }

    let mut prepared = render::prepare(document, options);
    ImageInliner::new().inline_document(&mut prepared).await;
    service.render_prepared(&prepared, format, options)
}

/// Create a Notion page from captures.
async fn cmd_notion(
    config: &AppConfig,
    inputs: &[PathBuf],
    page: Option<&str>,
    token: Option<&str>,
    scope: &Scope,
    options: &ExportOptions,
) -> domain::Result<()> {
    let token = token
        .map(str::to_owned)
        .or_else(|| config.notion.token.clone())
        .ok_or_else(|| AppError::Config {
            message: "No Notion token configured. Pass --token or set [notion] token".to_owned(),
        })?;
    let page = page
        .map(str::to_owned)
        .or_else(|| config.notion.parent_page_id.clone())
        .ok_or_else(|| AppError::Config {
            message: "No parent page configured. Pass --page or set [notion] parent_page_id"
                .to_owned(),
        })?;
    let page_id = normalize_notion_page_id(&page)?;

    let source = build_source(inputs);
    let service = service_for(config);

    let outcome = service.collect(&source, scope, &cancellation_token()).await?;
    report_partial(&outcome);
    let (document, _) = service.assemble(outcome.documents, options);

    let prepared = render::prepare(&document, options);
    if prepared.messages.is_empty() {
        return Err(AppError::ExtractionEmpty {
            message: "no message content survived filtering and conversion".to_owned(),
        });
    }

    let blocks = document_blocks(&prepared, options);
    let client = NotionClient::new(token);
    let page_url = client.publish(&document.title, &page_id, blocks).await?;

    println!("{} {} → {}", "✓".green().bold(), document.title.cyan(), page_url);
    Ok(())
}

/// List the conversations in a capture directory.
async fn cmd_list(dir: &PathBuf) -> domain::Result<()> {
    use application::ConversationSource as _;

    let source = CaptureSource::from_dir(dir.clone());
    let refs = source.list().await?;

    let thresholds = application::ScoreThresholds::default();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Title", "Messages", "First message", "Weak?"]);

    for (i, reference) in refs.iter().enumerate() {
        let row = match source.fetch(reference).await {
            Ok(document) => vec![
                (i + 1).to_string(),
                if document.title.is_empty() {
                    reference.title.clone()
                } else {
                    document.title.clone()
                },
                document.message_count().to_string(),
                document
                    .first_timestamp()
                    .map_or_else(|| "-".to_owned(), |ts| ts.format("%Y-%m-%d %H:%M").to_string()),
                if application::is_weak_extraction(&document.messages, thresholds) {
                    "yes".to_owned()
                } else {
                    String::new()
                },
            ],
            Err(err) => vec![
                (i + 1).to_string(),
                reference.title.clone(),
                "-".to_owned(),
                format!("unreadable: {err}"),
                String::new(),
            ],
        };
        table.add_row(row);
    }

    println!("{table}");
    println!("Total: {} capture(s)", refs.len());
    Ok(())
}

/// Show the active configuration, optionally seeding the default file first.
fn cmd_config(init: bool) -> domain::Result<()> {
    if init {
        ensure_config_exists()?;
    }

    let path = config_file_path();
    let marker = if path.exists() { "" } else { " (not created yet)" };
    println!("Config file: {}{marker}", path.display());

    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;
    print!("{rendered}");
    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
