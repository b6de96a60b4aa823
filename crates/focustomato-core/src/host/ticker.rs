use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::FocusHost;

/// Drive `host.tick()` every `period` until `shutdown` resolves.
///
/// Late ticks are skipped rather than bunched up, so a stalled process
/// never replays a burst of seconds.
pub async fn run_ticker(
    host: Arc<Mutex<FocusHost>>,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    interval.tick().await;

    tokio::pin!(shutdown);
    info!(period_ms = period.as_millis() as u64, "ticker started");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                let events = host.lock().await.tick();
                for event in events {
                    debug!(?event, "tick event");
                }
            }
        }
    }
    info!("ticker stopped");
}
