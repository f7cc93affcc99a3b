//! CLI command implementations

pub mod check;
pub mod distance;
pub mod history;
pub mod replay;

use safetrip_api_client::SafeTripClient;

/// Backend client from the environment, with errors mapped for exit codes
pub(crate) fn backend() -> anyhow::Result<SafeTripClient> {
    SafeTripClient::new()
        .map_err(safetrip_core::Error::from)
        .map_err(|e| {
            e.with_suggestion("Set SUPABASE_URL and SUPABASE_ANON_KEY, or use --fences for offline checks")
        })
        .map_err(anyhow::Error::from)
}
