/// Periodic removal of refresh sessions that can no longer be used
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::security::TokenIssuer;

pub fn spawn_session_sweeper(tokens: Arc<TokenIssuer>, sweep_interval: Duration) -> JoinHandle<()> {
    info!(
        sweep_interval_secs = sweep_interval.as_secs(),
        "Starting refresh session sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = interval(sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match tokens.purge_expired_sessions().await {
                Ok(0) => debug!("No refresh sessions to purge"),
                Ok(purged) => info!(purged, "Purged expired refresh sessions"),
                Err(err) => error!("Refresh session sweep failed: {}", err),
            }
        }
    })
}
