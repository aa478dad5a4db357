//! Output formatting for dvs-cli (table, json)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub no_color: bool,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self {
            format,
            no_color,
            quiet,
        }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print a section heading (table mode only)
    pub fn heading(&self, msg: &str) {
        if !self.quiet && self.format == OutputFormat::Table {
            println!("{}", msg.bold());
        }
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    let table = Table::new(data).to_string();
                    println!("{}", table);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(Tabled, Serialize)]
pub struct BalanceRow {
    #[tabled(rename = "Minutes")]
    pub minutes: String,
    #[tabled(rename = "Upgrades left")]
    pub remaining_upgrades: String,
    #[tabled(rename = "Downgrades left")]
    pub remaining_downgrades: String,
    #[tabled(rename = "Unit price")]
    pub unit_price: String,
}

#[derive(Tabled, Serialize)]
pub struct ReservationRow {
    #[tabled(rename = "Plate")]
    pub plate: String,
    #[tabled(rename = "From")]
    pub valid_from: String,
    #[tabled(rename = "Until")]
    pub valid_until: String,
    #[tabled(rename = "Units")]
    pub units: String,
    #[tabled(rename = "Cost")]
    pub cost: String,
    #[tabled(rename = "ID")]
    pub reservation_id: String,
}

#[derive(Tabled, Serialize)]
pub struct PlateRow {
    #[tabled(rename = "Plate")]
    pub plate: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Present")]
    pub present: String,
}

/// Render an optional value, empty cell when absent
pub fn opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}
