use console::{style, StyledObject};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Writes command output.
///
/// In JSON mode stdout carries exactly one document, the command result;
/// progress messages are dropped and problems go to stderr.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        let format = if json { OutputFormat::Json } else { OutputFormat::Human };
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Human-only status line on stdout
    fn line(&self, symbol: StyledObject<&str>, message: impl Display) {
        if !self.is_json() {
            println!("{} {}", symbol, message);
        }
    }

    /// Warnings and errors; always on stderr
    fn problem(&self, status: &str, symbol: StyledObject<&str>, message: impl Display) {
        if self.is_json() {
            let body = json!({ "status": status, "message": message.to_string() });
            let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
            eprintln!("{}", text);
        } else {
            eprintln!("{} {}", symbol, message);
        }
    }

    pub fn success(&self, message: impl Display) {
        self.line(style("✓").green().bold(), message);
    }

    pub fn info(&self, message: impl Display) {
        self.line(style("ℹ").blue().bold(), message);
    }

    pub fn warning(&self, message: impl Display) {
        self.problem("warning", style("⚠").yellow().bold(), message);
    }

    pub fn error(&self, message: impl Display) {
        self.problem("error", style("✗").red().bold(), message);
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if !self.is_json() {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    pub fn section(&self, title: impl Display) {
        if !self.is_json() {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    /// Human mode only; JSON callers report rows through [`Self::result`]
    pub fn table<T: Tabled>(&self, rows: Vec<T>) {
        if self.is_json() {
            return;
        }
        if rows.is_empty() {
            println!("{}", style("(no data)").dim());
            return;
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }

    /// The single stdout document of a JSON-mode run
    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.is_json() {
            let body = json!({ "status": "success", "data": data });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Ok(())
    }
}
