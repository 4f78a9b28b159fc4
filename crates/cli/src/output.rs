//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format mebibytes as human-readable string
pub fn format_memory(mebibytes: u64) -> String {
    if mebibytes >= 1024 {
        format!("{:.2}Gi", mebibytes as f64 / 1024.0)
    } else {
        format!("{}Mi", mebibytes)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

pub fn format_ms(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}ms", v))
}

pub fn format_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}%", v))
}

/// Color run status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "pending" | "completing" => status.yellow().to_string(),
        "running" => status.blue().to_string(),
        "completed" | "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "failed" | "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color an SLA verdict; runs without one show a dash
pub fn color_verdict(verdict: Option<&str>) -> String {
    match verdict {
        Some("PASS") => "PASS".green().bold().to_string(),
        Some("FAIL") => "FAIL".red().bold().to_string(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}

/// Color a saving percentage by size
pub fn color_saving(percent: f64) -> String {
    let formatted = format!("{:.1}%", percent);
    if percent >= 30.0 {
        formatted.green().to_string()
    } else if percent > 0.0 {
        formatted.yellow().to_string()
    } else {
        formatted.normal().to_string()
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    // Try to parse and format nicely, otherwise return as-is
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(240), "240m");
        assert_eq!(format_cpu(1500), "1.5");
    }

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(512), "512Mi");
        assert_eq!(format_memory(2048), "2.00Gi");
    }

    #[test]
    fn test_optional_figures() {
        assert_eq!(format_ms(Some(47.26)), "47.3ms");
        assert_eq!(format_ms(None), "-");
        assert_eq!(format_percent(Some(2.0)), "2.0%");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2026-10-18T09:00:00Z"),
            "2026-10-18 09:00:00"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_missing_verdict_is_dash() {
        assert_eq!(color_verdict(None), "-");
    }
}
