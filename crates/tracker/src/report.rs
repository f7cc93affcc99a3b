//! Per-tick results handed to the alert sink

use crate::error::{PersistenceError, RegistryError};
use crate::sample::PositionSample;
use safetrip_geo::{GeoError, GeofenceAlert};
use std::fmt;

/// Something that went wrong, or looked wrong, during one tick.
///
/// None of these stop the tracker; the next sample is processed normally.
#[derive(Debug, Clone, PartialEq)]
pub enum TickIssue {
    /// The sample's coordinate was out of range; nothing was stored or evaluated
    InvalidSample(GeoError),
    /// The sample was not stored; alerts were still computed
    Persistence(PersistenceError),
    /// Fences could not be fetched; evaluation was skipped
    Registry(RegistryError),
    /// A fence carried a bad center; evaluation was aborted
    Evaluation(GeoError),
    /// Accuracy radius above the configured threshold
    PoorSignal {
        /// Reported accuracy of the sample
        accuracy_meters: f64,
    },
}

impl fmt::Display for TickIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickIssue::InvalidSample(e) => write!(f, "invalid sample: {e}"),
            TickIssue::Persistence(e) => write!(f, "{e}"),
            TickIssue::Registry(e) => write!(f, "{e}"),
            TickIssue::Evaluation(e) => write!(f, "evaluation aborted: {e}"),
            TickIssue::PoorSignal { accuracy_meters } => write!(
                f,
                "Poor GPS signal detected - location accuracy may be compromised ({accuracy_meters:.0} m)"
            ),
        }
    }
}

/// Outcome of processing one position sample
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// The sample this tick processed
    pub sample: PositionSample,
    /// Alerts in fence order; empty when evaluation did not run
    pub alerts: Vec<GeofenceAlert>,
    /// Active fences considered by the evaluation
    pub fences_checked: usize,
    /// Whether geofence evaluation ran to completion
    pub evaluated: bool,
    /// Problems encountered along the way
    pub issues: Vec<TickIssue>,
}

impl TickReport {
    pub(crate) fn new(sample: PositionSample) -> Self {
        Self {
            sample,
            alerts: Vec::new(),
            fences_checked: 0,
            evaluated: false,
            issues: Vec::new(),
        }
    }

    /// True when the sample was stored
    pub fn persisted(&self) -> bool {
        self.issues.iter().all(|issue| {
            !matches!(issue, TickIssue::Persistence(_) | TickIssue::InvalidSample(_))
        })
    }

    /// True when anything other than a poor-signal warning went wrong
    pub fn is_degraded(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| !matches!(issue, TickIssue::PoorSignal { .. }))
    }
}
