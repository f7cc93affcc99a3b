//! Location history command

use super::backend;
use crate::output::{format_count, print_json, Status};
use crate::OutputFormat;
use anyhow::Result;
use owo_colors::OwoColorize;

/// Print the user's stored samples, newest first
pub async fn run(user: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let client = backend()?;
    let records = client
        .location()
        .history(user, limit)
        .await
        .map_err(safetrip_core::Error::from)?;

    if format == OutputFormat::Json {
        return print_json(&records);
    }

    Status::header(&format!("Location history for {user}"));
    if records.is_empty() {
        Status::info("No stored locations");
        return Ok(());
    }

    for record in &records {
        let accuracy = record
            .accuracy
            .map(|a| format!("±{a:.0} m"))
            .unwrap_or_default();
        let trip = record
            .trip_id
            .as_deref()
            .map(|t| format!("trip {t}"))
            .unwrap_or_default();
        println!(
            "  {}  {}  {} {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S").dimmed(),
            record.display_address(),
            accuracy.dimmed(),
            trip.cyan()
        );
    }
    println!();
    Status::info(&format_count(records.len(), "location", "locations"));
    Ok(())
}
