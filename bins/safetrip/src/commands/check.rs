//! Geofence check command

use super::backend;
use crate::input::{geo_error, load_fences, LOCAL_USER};
use crate::output::{format_count, format_distance, print_alert, print_json, Status};
use crate::OutputFormat;
use anyhow::Result;
use owo_colors::OwoColorize;
use safetrip_api_client::endpoints::{RemoteAlert, RemoteGeofenceCheck};
use safetrip_geo::{evaluate, Coordinate, Geofence};
use std::path::PathBuf;

/// Evaluate fences for one position, locally or on the backend
pub async fn run(
    lat: f64,
    lon: f64,
    fences: Option<PathBuf>,
    user: Option<String>,
    remote: bool,
    format: OutputFormat,
) -> Result<()> {
    let position = Coordinate::new(lat, lon);
    position.validate().map_err(geo_error)?;

    if remote {
        let user = user.as_deref().unwrap_or(LOCAL_USER);
        let client = backend()?;
        let check = client
            .location()
            .check_geofences(user, position)
            .await
            .map_err(safetrip_core::Error::from)?;
        return report_remote(&position, &check, format);
    }

    let fences: Vec<Geofence> = match (&fences, &user) {
        (Some(path), _) => load_fences(path, user.as_deref().unwrap_or(LOCAL_USER))?,
        (None, Some(user)) => backend()?
            .geofences()
            .active(user)
            .await
            .map_err(safetrip_core::Error::from)?,
        (None, None) => anyhow::bail!("either --fences or --user is required"),
    };

    let alerts = evaluate(&position, &fences).map_err(geo_error)?;
    let checked = fences.iter().filter(|f| f.active).count();
    tracing::debug!(checked, alerts = alerts.len(), "Evaluated geofences locally");

    match format {
        OutputFormat::Json => print_json(&RemoteGeofenceCheck {
            alerts: alerts.iter().map(RemoteAlert::from).collect(),
            geofences_checked: checked,
        }),
        OutputFormat::Text => {
            Status::header(&format!("Geofences at {position}"));
            for alert in &alerts {
                print_alert(alert);
            }
            summary(alerts.len(), checked);
            Ok(())
        }
    }
}

fn report_remote(position: &Coordinate, check: &RemoteGeofenceCheck, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(check),
        OutputFormat::Text => {
            Status::header(&format!("Geofences at {position} (backend)"));
            for alert in &check.alerts {
                println!(
                    "  {} {} ({} from center)",
                    "•".blue(),
                    alert.message,
                    format_distance(alert.distance)
                );
            }
            summary(check.alerts.len(), check.geofences_checked);
            Ok(())
        }
    }
}

fn summary(alerts: usize, checked: usize) {
    let fences = format_count(checked, "fence", "fences");
    if alerts == 0 {
        Status::info(&format!("No alerts ({fences} checked)"));
    } else {
        Status::success(&format!(
            "{} from {fences}",
            format_count(alerts, "alert", "alerts")
        ));
    }
}
