use anyhow::Result;
use clusterwatch::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let storage = kv_store::open(&app_config.storage).await?;
    let store = Arc::new(
        log_store::LogStore::open(
            storage,
            log_store::LogStoreOptions::from(&app_config.storage),
        )
        .await,
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let persister_handle = persister::spawn(
        store.clone(),
        persister::PersisterConfig::from(&app_config.storage),
        shutdown_rx,
    );

    let source = Arc::new(cluster_source::HttpClusterSource::new(
        &app_config.monitoring.api_base_url,
        Duration::from_millis(app_config.monitoring.request_timeout_ms),
    )?);
    let watcher = Arc::new(watcher::ClusterWatcher::new(
        source,
        store.clone(),
        watcher::WatcherConfig::from(&app_config.monitoring),
    ));
    if app_config.monitoring.auto_start {
        let watcher = watcher.clone();
        let delay = Duration::from_millis(app_config.monitoring.start_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            watcher.start();
        });
    }

    let balancer = Arc::new(balancer::LoadBalancer::new(store.clone()));

    let app = routes::app(store.clone(), watcher.clone(), balancer, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            watcher.stop();
            let _ = shutdown_tx.send(());
            let _ = persister_handle.await;
        }
    }

    Ok(())
}
