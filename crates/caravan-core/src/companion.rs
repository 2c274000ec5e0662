//! Detached availability probe for the dialogue companion service.
//!
//! The frame loop must never wait on the network. The probe runs the check
//! on its own tokio task bounded by a timeout and publishes the outcome
//! through a shared atomic flag that the scheduler polls each frame.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

/// Availability of the companion service as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeStatus {
    /// No probe has been started.
    #[default]
    Unknown,
    /// A probe is running.
    Checking,
    /// The service answered.
    Available,
    /// The service failed, refused or timed out.
    Unavailable,
}

impl ProbeStatus {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Checking => 1,
            Self::Available => 2,
            Self::Unavailable => 3,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Checking,
            2 => Self::Available,
            3 => Self::Unavailable,
            _ => Self::Unknown,
        }
    }
}

impl core::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Checking => write!(f, "checking"),
            Self::Available => write!(f, "available"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Shared status flag written by the probe task and read by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct CompanionProbe {
    status: Arc<AtomicU8>,
}

impl CompanionProbe {
    /// A probe that has not been started. Status stays [`ProbeStatus::Unknown`].
    pub fn idle() -> Self {
        Self::default()
    }

    /// Run `check` on a detached task, bounded by `timeout`.
    ///
    /// `check` resolves to `true` if the service is reachable. A timeout
    /// counts as unavailable. Must be called from within a tokio runtime.
    pub fn spawn<F>(check: F, timeout: Duration) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        let probe = Self::idle();
        probe.set(ProbeStatus::Checking);
        let flag = probe.clone();
        tokio::spawn(async move {
            let status = match tokio::time::timeout(timeout, check).await {
                Ok(true) => ProbeStatus::Available,
                Ok(false) => ProbeStatus::Unavailable,
                Err(_elapsed) => {
                    warn!(?timeout, "companion probe timed out");
                    ProbeStatus::Unavailable
                }
            };
            debug!(status = %status, "companion probe finished");
            flag.set(status);
        });
        probe
    }

    /// Current status. Never blocks.
    pub fn status(&self) -> ProbeStatus {
        ProbeStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Overwrite the status.
    pub fn set(&self, status: ProbeStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }
}
