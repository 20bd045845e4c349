use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::scenario::ScenarioData;

const PENDING_FIELD: &str = "pending_confirm";

/// Default window between the two taps of a destructive action.
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// First tap: the action is armed and waits for a second tap.
    Armed,
    /// Second tap within the window on the same target.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PendingConfirm {
    target: String,
    expires_at_ms: u64,
}

/// Two-tap confirmation of destructive actions.
///
/// The pending marker is a scenario value, so any scenario reset disarms it.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmGuard {
    window: Duration,
}

impl Default for ConfirmGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_WINDOW)
    }
}

impl ConfirmGuard {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Register a tap on `target` at `now_ms` (unix milliseconds).
    pub async fn check(
        &self,
        scenario: &ScenarioData<'_>,
        target: &str,
        now_ms: u64,
    ) -> Result<ConfirmOutcome> {
        let pending: Option<PendingConfirm> = scenario.get(PENDING_FIELD).await?;
        let armed = pending
            .as_ref()
            .is_some_and(|p| p.target == target && p.expires_at_ms >= now_ms);

        if armed {
            scenario.remove(PENDING_FIELD).await?;
            log::debug!("Confirmed {target}");
            return Ok(ConfirmOutcome::Confirmed);
        }

        let window_ms = u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX);
        let marker = PendingConfirm {
            target: target.to_string(),
            expires_at_ms: now_ms.saturating_add(window_ms),
        };
        scenario.set(PENDING_FIELD, &marker).await?;
        log::debug!("Armed {target} until {}", marker.expires_at_ms);
        Ok(ConfirmOutcome::Armed)
    }

    /// [`Self::check`] against the wall clock.
    pub async fn check_now(
        &self,
        scenario: &ScenarioData<'_>,
        target: &str,
    ) -> Result<ConfirmOutcome> {
        self.check(scenario, target, unix_ms_now()).await
    }
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
