use std::time::Duration;

use tracing::warn;

use convo_core::{Services, digest};

/// Background task that sends digests to every user on an interval.
///
/// Sweeps run one at a time, so a user's digest never overlaps with itself.
/// The first tick fires immediately; it is skipped so a restart does not
/// resend.
pub async fn run_digest_loop(services: Services, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        interval.tick().await;

        match digest::run_digest_for_all(&services).await {
            Ok(summary) => {
                if summary.failed > 0 {
                    warn!("Digest sweep: {} users failed", summary.failed);
                }
            }
            Err(e) => {
                warn!("Digest sweep error: {}", e);
            }
        }
    }
}
