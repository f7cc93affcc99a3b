//! Distance command

use crate::input::geo_error;
use crate::output::{format_distance, print_json};
use crate::OutputFormat;
use anyhow::Result;
use owo_colors::OwoColorize;
use safetrip_geo::{distance_meters, Coordinate};
use serde_json::json;

/// Print the great-circle distance between two points
pub fn run(from: (f64, f64), to: (f64, f64), format: OutputFormat) -> Result<()> {
    let from = Coordinate::from(from);
    let to = Coordinate::from(to);
    let meters = distance_meters(&from, &to).map_err(geo_error)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "from": from,
            "to": to,
            "distance_meters": meters,
        })),
        OutputFormat::Text => {
            println!(
                "{} {} {}  {}",
                from,
                "→".dimmed(),
                to,
                format_distance(meters).bold()
            );
            println!("{}", format!("{meters:.1} m").dimmed());
            Ok(())
        }
    }
}
