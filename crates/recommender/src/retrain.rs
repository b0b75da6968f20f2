//! Background periodic retraining

use crate::service::RecommendationService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

/// Retrain every `interval` until `shutdown` flips to `true` or its sender drops
///
/// The first pass runs one full interval after spawning. A failed pass is
/// logged and the previously published model keeps serving.
pub fn spawn_retrain_task(
    service: Arc<RecommendationService>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            warn!("Retrain interval is zero; periodic retraining disabled");
            return;
        }

        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Starting retrain task");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match service.train().await {
                        Ok(report) => info!(
                            ratings = report.ratings,
                            duration_ms = report.duration_ms,
                            "Scheduled retrain completed"
                        ),
                        Err(e) => error!(error = %e, "Scheduled retrain failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Retrain task stopping");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecommenderConfig;
    use crate::interaction::{Interaction, InteractionKind};
    use crate::store::InMemoryInteractionStore;

    #[tokio::test]
    async fn test_retrain_task_trains_on_interval_and_stops() {
        let store = Arc::new(
            InMemoryInteractionStore::new()
                .with_product_ids(["p1", "p2"])
                .with_interactions([Interaction::new("u1", "p1", InteractionKind::Purchase)]),
        );
        let service = Arc::new(RecommendationService::new(
            store,
            &RecommenderConfig::default(),
        ));
        let (tx, rx) = watch::channel(false);

        let handle = spawn_retrain_task(service.clone(), Duration::from_millis(20), rx);
        assert!(!service.is_ready());

        for _ in 0..250 {
            if service.is_ready() {
                break;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        assert!(service.is_ready());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_retrain_task_stops_when_sender_dropped() {
        let service = Arc::new(RecommendationService::new(
            Arc::new(InMemoryInteractionStore::new()),
            &RecommenderConfig::default(),
        ));
        let (tx, rx) = watch::channel(false);

        let handle = spawn_retrain_task(service, Duration::from_secs(3600), rx);
        drop(tx);
        handle.await.unwrap();
    }
}
