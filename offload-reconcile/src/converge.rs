//! Blocking convergence wait.
//!
//! [`await_converged`] polls the provider until two named conditions hold in
//! turn: the function is `Active`, then its last update is `Successful`. Polls
//! back off exponentially with jitter. There is no timeout; callers that need
//! a deadline must impose it themselves.

use std::fmt;
use std::time::Duration;

use offload_core::config::ConvergenceConfig;
use offload_core::{FunctionName, FunctionState, LastUpdateStatus, RemoteFunctionState};

use crate::error::{provider_err, ReconcileError};
use crate::provider::FunctionProvider;

/// One of the two conditions a converged function satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceCondition {
    Active,
    LastUpdateSuccessful,
}

impl ConvergenceCondition {
    /// Checked in this order.
    pub const ALL: [ConvergenceCondition; 2] = [
        ConvergenceCondition::Active,
        ConvergenceCondition::LastUpdateSuccessful,
    ];

    fn check(self, state: &RemoteFunctionState) -> Check {
        match self {
            ConvergenceCondition::Active => match state.state {
                FunctionState::Active => Check::Satisfied,
                FunctionState::Failed => Check::Failed,
                FunctionState::Pending | FunctionState::Inactive => Check::Waiting,
            },
            ConvergenceCondition::LastUpdateSuccessful => match state.last_update {
                LastUpdateStatus::Successful => Check::Satisfied,
                LastUpdateStatus::Failed => Check::Failed,
                LastUpdateStatus::InProgress => Check::Waiting,
            },
        }
    }
}

impl fmt::Display for ConvergenceCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceCondition::Active => f.write_str("active"),
            ConvergenceCondition::LastUpdateSuccessful => f.write_str("last update successful"),
        }
    }
}

enum Check {
    Satisfied,
    Waiting,
    Failed,
}

/// Poll backoff: starts at `initial_delay`, doubles up to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

/// Smallest step once backoff is enabled.
const MIN_DELAY: Duration = Duration::from_millis(1);

impl ConvergencePolicy {
    /// Poll back-to-back. For tests against in-process providers.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after `delay`. Only a zero `max_delay` keeps it at zero.
    fn next_delay(&self, delay: Duration) -> Duration {
        (delay * 2).max(MIN_DELAY).min(self.max_delay)
    }
}

impl From<&ConvergenceConfig> for ConvergencePolicy {
    fn from(config: &ConvergenceConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.initial_delay_ms)),
        }
    }
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self::from(&ConvergenceConfig::default())
    }
}

/// Block until `name` is active and its last update succeeded. Returns the
/// final observed state.
pub fn await_converged<P: FunctionProvider>(
    provider: &P,
    name: &FunctionName,
    policy: ConvergencePolicy,
) -> Result<RemoteFunctionState, ReconcileError> {
    let mut delay = policy.initial_delay;
    let mut polls = 0u32;
    let mut state = provider
        .get_function(name)
        .map_err(|e| provider_err("get-function", name, e))?;

    for condition in ConvergenceCondition::ALL {
        loop {
            match condition.check(&state) {
                Check::Satisfied => break,
                Check::Failed => {
                    return Err(ReconcileError::ConvergenceFailed {
                        name: name.clone(),
                        condition,
                        reason: state
                            .reason
                            .clone()
                            .unwrap_or_else(|| format!("status {}", state.status())),
                    });
                }
                Check::Waiting => {}
            }

            polls += 1;
            tracing::debug!(%name, %condition, status = %state.status(), polls, "waiting");
            sleep_with_jitter(delay);
            delay = policy.next_delay(delay);
            state = provider
                .get_function(name)
                .map_err(|e| provider_err("get-function", name, e))?;
        }
    }

    tracing::info!(%name, polls, "converged");
    Ok(state)
}

fn sleep_with_jitter(delay: Duration) {
    let millis = delay.as_millis() as u64;
    if millis == 0 {
        return;
    }
    let jitter = rand::random::<u64>() % (millis / 4).max(1);
    std::thread::sleep(Duration::from_millis(millis + jitter));
}
