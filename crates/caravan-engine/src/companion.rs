//! HTTP availability check for the dialogue companion service.

use std::time::Duration;

use caravan_core::CompanionProbe;
use caravan_core::config::CompanionConfig;
use tracing::{debug, info};

use crate::error::EngineError;

/// Start a detached probe of the configured companion URL.
///
/// Without a URL the probe stays idle and the companion is reported as
/// unknown. Any 2xx answer within the timeout counts as available.
///
/// # Errors
///
/// Returns [`EngineError::Http`] if the HTTP client cannot be built.
pub fn start_probe(config: &CompanionConfig) -> Result<CompanionProbe, EngineError> {
    let Some(url) = config.url.clone() else {
        info!("no companion url configured, companion disabled");
        return Ok(CompanionProbe::idle());
    };
    let timeout = Duration::from_millis(config.timeout_ms);
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    info!(url = %url, ?timeout, "probing companion service");
    Ok(CompanionProbe::spawn(
        async move {
            match client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(status = %status, "companion answered");
                    status.is_success()
                }
                Err(e) => {
                    debug!(error = %e, "companion request failed");
                    false
                }
            }
        },
        timeout,
    ))
}
