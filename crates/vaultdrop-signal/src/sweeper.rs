//! Background expiry sweeper.

use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Spawn a task that evicts sessions older than `ttl` every `interval`.
///
/// The task runs until aborted.
pub fn spawn_sweeper(registry: Arc<Registry>, interval: Duration, ttl: Duration) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let evicted = registry.sweep_expired(Instant::now(), ttl);
            for token in &evicted {
                tracing::info!(session = %token, "session expired");
            }
            if !evicted.is_empty() {
                tracing::debug!(
                    evicted = evicted.len(),
                    remaining = registry.session_count(),
                    "sweep complete"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PeerId, Role, SignalMessage};
    use crate::registry::{PeerHandle, SessionState};
    use tokio::sync::{Notify, mpsc};

    const TTL: Duration = Duration::from_secs(30 * 60);
    const INTERVAL: Duration = Duration::from_secs(5 * 60);

    #[tokio::test(start_paused = true)]
    async fn test_evicts_only_stale_sessions() {
        let registry = Arc::new(Registry::new());

        let old = registry.create_session().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let handle = PeerHandle::new(PeerId::from_u64(1), tx, Arc::new(Notify::new()));
        registry.add_peer(&old, handle, Role::Sender).unwrap();

        tokio::time::advance(Duration::from_secs(21 * 60)).await;
        let young = registry.create_session().unwrap();

        let sweeper = spawn_sweeper(registry.clone(), INTERVAL, TTL);
        // Ticks at +5 and +10 minutes; the second sees `old` at 31 minutes.
        tokio::time::sleep(Duration::from_secs(10 * 60 + 1)).await;

        assert_eq!(registry.session_state(&old), None);
        assert_eq!(registry.session_state(&young), Some(SessionState::Empty));
        assert_eq!(rx.try_recv().unwrap(), SignalMessage::Expired);

        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_evicted_before_ttl() {
        let registry = Arc::new(Registry::new());
        let token = registry.create_session().unwrap();

        let sweeper = spawn_sweeper(registry.clone(), INTERVAL, TTL);
        tokio::time::sleep(Duration::from_secs(25 * 60)).await;

        assert_eq!(registry.session_state(&token), Some(SessionState::Empty));
        sweeper.abort();
    }
}
