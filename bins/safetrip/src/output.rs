//! Terminal output helpers

use crate::OutputFormat;
use owo_colors::OwoColorize;
use safetrip_geo::{AlertKind, GeofenceAlert};
use safetrip_tracker::{TickIssue, TickReport};
use serde::Serialize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Print an error on stderr, as a JSON report or as text with its hint
pub fn print_error(err: &safetrip_core::Error, format: OutputFormat) {
    if format == OutputFormat::Json {
        if let Ok(json) = serde_json::to_string(&err.to_report()) {
            eprintln!("{json}");
            return;
        }
    }
    eprintln!("{} {}", "Error:".red().bold(), err.message);
    eprintln!("  {} {}", "code:".dimmed(), err.code);
    if let Some(context) = &err.context {
        eprintln!("  {} {}", "context:".dimmed(), context);
    }
    if let Some(suggestion) = &err.suggestion {
        eprintln!("  {} {}", "hint:".cyan(), suggestion);
    }
}

/// Print `value` as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Human readable distance: meters below 10 km, kilometers above
pub fn format_distance(meters: f64) -> String {
    if meters < 10_000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// One alert line, colored by kind
pub fn print_alert(alert: &GeofenceAlert) {
    let distance = format_distance(alert.distance_meters);
    let line = format!("{} ({distance} from center)", alert.message);
    match alert.kind {
        AlertKind::Entry => println!("  {} {}", "→".green().bold(), line.green()),
        AlertKind::Exit => println!("  {} {}", "←".red().bold(), line.red()),
        AlertKind::Inside => println!("  {} {}", "●".blue(), line),
        AlertKind::Outside => println!("  {} {}", "○".dimmed(), line.dimmed()),
    }
}

/// Text rendering of one tick
pub fn print_tick(index: usize, report: &TickReport) {
    let sample = &report.sample;
    println!(
        "{} {} {}",
        format!("[{index}]").dimmed(),
        sample.coordinate.bold(),
        format!("±{:.0} m", sample.accuracy_meters).dimmed()
    );

    for alert in &report.alerts {
        print_alert(alert);
    }
    if report.evaluated && report.alerts.is_empty() {
        println!(
            "  {}",
            format!("no alerts ({})", format_count(report.fences_checked, "fence", "fences")).dimmed()
        );
    }

    for issue in &report.issues {
        match issue {
            TickIssue::PoorSignal { .. } => println!("  {} {}", "⚠".yellow(), issue.yellow()),
            _ => println!("  {} {}", "✗".red(), issue.red()),
        }
    }
}

/// JSON line for one tick
#[derive(Debug, Serialize)]
pub struct TickLine<'a> {
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub captured_at: String,
    pub fences_checked: usize,
    pub evaluated: bool,
    pub persisted: bool,
    pub alerts: &'a [GeofenceAlert],
    pub issues: Vec<String>,
}

impl<'a> TickLine<'a> {
    pub fn new(index: usize, report: &'a TickReport) -> Self {
        Self {
            index,
            latitude: report.sample.coordinate.latitude,
            longitude: report.sample.coordinate.longitude,
            accuracy_meters: report.sample.accuracy_meters,
            captured_at: report.sample.captured_at.to_rfc3339(),
            fences_checked: report.fences_checked,
            evaluated: report.evaluated,
            persisted: report.persisted(),
            alerts: &report.alerts,
            issues: report.issues.iter().map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(42.4), "42 m");
        assert_eq!(format_distance(9_999.0), "9999 m");
        assert_eq!(format_distance(111_195.0), "111.2 km");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "fence", "fences"), "1 fence");
        assert_eq!(format_count(3, "fence", "fences"), "3 fences");
    }
}
