//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::{ExportFormat, Scope};

/// chat-export - Render captured AI chat conversations to portable formats.
#[derive(Parser, Debug)]
#[command(name = "chat-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render captures to a file format (markdown, text, html, word, pdf, notion).
    Export {
        /// Capture files, or a single directory of captures.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output format: markdown, text, html, word, pdf, notion.
        #[arg(short, long)]
        format: Option<String>,

        /// Output directory for the rendered file.
        #[arg(short, long, default_value = "exports")]
        output: PathBuf,

        /// Export every conversation in the directory, merged into one file.
        #[arg(long)]
        all: bool,

        /// Comma-separated conversation numbers from `list` (e.g. "1,3").
        #[arg(long)]
        pick: Option<String>,

        /// Which messages to include: all, user, assistant.
        #[arg(long)]
        filter: Option<String>,

        /// Keep only messages on or after this date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Keep only messages on or before this date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,

        /// Role label language: tr, en.
        #[arg(long)]
        label_lang: Option<String>,

        /// Date stamp placement: none, filename, content, both.
        #[arg(long)]
        date_stamp: Option<String>,

        /// Disable code syntax highlighting in HTML-based formats.
        #[arg(long)]
        no_highlight: bool,

        /// Fetch remote images and embed them as data URLs.
        #[arg(long)]
        inline_images: bool,

        /// Print the rendered export to stdout instead of writing a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Create a Notion page from captures.
    Notion {
        /// Capture files, or a single directory of captures.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Parent page: id, dashed UUID or full Notion URL.
        #[arg(short, long)]
        page: Option<String>,

        /// Integration token (overrides the config file).
        #[arg(long)]
        token: Option<String>,

        /// Export every conversation in the directory.
        #[arg(long)]
        all: bool,

        /// Comma-separated conversation numbers from `list`.
        #[arg(long)]
        pick: Option<String>,

        /// Which messages to include: all, user, assistant.
        #[arg(long)]
        filter: Option<String>,

        /// Role label language: tr, en.
        #[arg(long)]
        label_lang: Option<String>,
    },

    /// List the conversations in a capture directory.
    List {
        /// Capture directory.
        dir: PathBuf,
    },

    /// Show the active configuration and where it is loaded from.
    Config {
        /// Write a commented default config file if none exists.
        #[arg(long)]
        init: bool,
    },
}

/// Resolve the collection scope from `--all` and `--pick`.
pub fn parse_scope(all: bool, pick: Option<&str>) -> Result<Scope, String> {
    match (all, pick) {
        (_, Some(list)) => Ok(Scope::Selected(parse_pick(list)?)),
        (true, None) => Ok(Scope::All),
        (false, None) => Ok(Scope::Single),
    }
}

/// Parse a comma-separated 1-based selection into zero-based indices.
fn parse_pick(list: &str) -> Result<Vec<usize>, String> {
    let mut indices = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let number: usize = part
            .parse()
            .map_err(|_| format!("Invalid selection '{part}': expected a number"))?;
        if number == 0 {
            return Err("Selections are numbered from 1".to_owned());
        }
        indices.push(number - 1);
    }
    if indices.is_empty() {
        return Err("Empty selection".to_owned());
    }
    Ok(indices)
}

/// Parse a `--format` value, defaulting when absent.
pub fn parse_format(value: Option<&str>, default: &str) -> Result<ExportFormat, String> {
    value
        .unwrap_or(default)
        .parse()
        .map_err(|e: crate::domain::AppError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_resolution() {
        assert_eq!(parse_scope(false, None).unwrap(), Scope::Single);
        assert_eq!(parse_scope(true, None).unwrap(), Scope::All);
        assert_eq!(
            parse_scope(true, Some("1,3")).unwrap(),
            Scope::Selected(vec![0, 2])
        );
    }

    #[test]
    fn test_pick_rejects_zero_and_garbage() {
        assert!(parse_pick("0").is_err());
        assert!(parse_pick("a,b").is_err());
        assert!(parse_pick("").is_err());
    }

    #[test]
    fn test_config_subcommand_parses() {
        let cli = Cli::try_parse_from(["chat-export", "config", "--init"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { init: true }));

        let cli = Cli::try_parse_from(["chat-export", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { init: false }));
    }

    #[test]
    fn test_format_default() {
        assert_eq!(
            parse_format(None, "markdown").unwrap(),
            ExportFormat::Markdown
        );
        assert_eq!(parse_format(Some("txt"), "markdown").unwrap(), ExportFormat::Text);
        assert!(parse_format(Some("bogus"), "markdown").is_err());
    }
}
