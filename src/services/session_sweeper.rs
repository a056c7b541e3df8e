//! Background eviction of idle client sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use super::SessionRegistry;

/// Configuration for the session sweeper.
#[derive(Debug, Clone, Copy)]
pub struct SweeperConfig {
    /// How often to look for idle sessions
    pub interval: Duration,
}

/// Start the sweeper background task.
///
/// Periodically stops and removes client sessions that have been idle for
/// longer than the registry's idle timeout.
pub fn start_session_sweeper(registry: Arc<SessionRegistry>, config: SweeperConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = config.interval.as_secs(),
            "Starting session sweeper"
        );

        let mut ticker = interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let evicted = registry.evict_idle();
            if evicted > 0 {
                info!(
                    evicted,
                    remaining = registry.len(),
                    "Idle session sweep complete"
                );
            }
        }
    })
}
