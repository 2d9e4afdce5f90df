//! Background auto-sync triggers.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::orchestrator::SyncEngine;
use super::transport::SyncTransport;
use crate::store::QueueStore;

/// Drive automatic sync until `shutdown` flips to `true` or its sender is dropped.
///
/// Syncs after an offline→online transition once the settle delay has passed,
/// and on every interval tick while online. Both triggers are skipped when
/// nothing is pending.
pub async fn run_auto_sync<S, T>(engine: Arc<SyncEngine<S, T>>, mut shutdown: watch::Receiver<bool>)
where
    S: QueueStore,
    T: SyncTransport,
{
    let config = engine.config().clone();
    let mut connectivity = engine.connectivity().subscribe();
    let mut was_online = connectivity.borrow_and_update().is_online();
    let mut ticker = config.auto_sync_interval.map(|period| {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    tracing::info!(
        "Auto-sync started (interval: {:?}, settle delay: {:?})",
        config.auto_sync_interval,
        config.settle_delay
    );

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = connectivity.borrow_and_update().is_online();
                let reconnected = online && !was_online;
                was_online = online;
                if !reconnected {
                    continue;
                }

                tokio::select! {
                    () = tokio::time::sleep(config.settle_delay) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
                sync_if_pending(&engine, "reconnect").await;
            }
            () = next_tick(&mut ticker) => {
                sync_if_pending(&engine, "interval").await;
            }
        }
    }

    tracing::info!("Auto-sync stopped");
}

async fn sync_if_pending<S: QueueStore, T: SyncTransport>(
    engine: &SyncEngine<S, T>,
    trigger: &str,
) {
    if !engine.connectivity().is_online() || engine.status().pending == 0 {
        return;
    }
    tracing::debug!("Auto-sync triggered by {}", trigger);
    engine.sync_now().await;
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{DeviceId, Mutation};
    use crate::store::MemoryQueueStore;
    use crate::sync::connectivity::{Connectivity, ConnectivityMonitor};
    use crate::sync::queue::OfflineQueue;
    use crate::sync::test_support::ScriptedTransport;
    use serde_json::json;
    use std::time::Duration;

    async fn engine(
        transport: Arc<ScriptedTransport>,
        connectivity: Connectivity,
        config: EngineConfig,
    ) -> Arc<SyncEngine<MemoryQueueStore, Arc<ScriptedTransport>>> {
        let queue = Arc::new(OfflineQueue::open(MemoryQueueStore::new()).await);
        Arc::new(SyncEngine::new(
            queue,
            transport,
            DeviceId::from_persisted("dev_driver"),
            ConnectivityMonitor::new(connectivity),
            config,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_waits_for_settle_delay() {
        let transport = Arc::new(ScriptedTransport::applying_all());
        let engine = engine(
            Arc::clone(&transport),
            Connectivity::Offline,
            EngineConfig::default(),
        )
        .await;
        engine
            .enqueue(Mutation::create("permit", json!({"title": "A"})))
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = tokio::spawn(run_auto_sync(Arc::clone(&engine), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(transport.calls(), 0);

        engine.connectivity().set_online(true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.calls(), 0);
        assert!(engine.queue().status().online);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.calls(), 1);
        assert_eq!(engine.status().pending, 0);

        shutdown_tx.send(true).unwrap();
        driver.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_retries_while_items_stay_pending() {
        let transport = Arc::new(ScriptedTransport::empty());
        let engine = engine(
            Arc::clone(&transport),
            Connectivity::Online,
            EngineConfig::default().with_auto_sync_interval(Duration::from_secs(30)),
        )
        .await;
        engine
            .enqueue(Mutation::create("incident", json!({"severity": "high"})))
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = tokio::spawn(run_auto_sync(Arc::clone(&engine), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(transport.calls(), 2);
        assert_eq!(engine.queue().items().await[0].attempts, 2);

        shutdown_tx.send(true).unwrap();
        driver.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_without_pending_items_stays_quiet() {
        let transport = Arc::new(ScriptedTransport::applying_all());
        let engine = engine(
            Arc::clone(&transport),
            Connectivity::Online,
            EngineConfig::default(),
        )
        .await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = tokio::spawn(run_auto_sync(Arc::clone(&engine), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.calls(), 0);

        drop(shutdown_tx);
        driver.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_settle_skips_sync() {
        let transport = Arc::new(ScriptedTransport::applying_all());
        let engine = engine(
            Arc::clone(&transport),
            Connectivity::Offline,
            EngineConfig::default().without_auto_sync(),
        )
        .await;
        engine
            .enqueue(Mutation::create("worker", json!({"name": "K"})))
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = tokio::spawn(run_auto_sync(Arc::clone(&engine), shutdown_rx));
        tokio::task::yield_now().await;

        engine.connectivity().set_online(true);
        tokio::time::sleep(Duration::from_millis(500)).await;
        shutdown_tx.send(true).unwrap();
        driver.await.unwrap();

        assert_eq!(transport.calls(), 0);
        assert_eq!(engine.status().pending, 1);
    }
}
