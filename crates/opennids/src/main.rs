//! OpenNIDS - Main Entry Point

use anyhow::Context;
use crossbeam_channel::bounded;
use opennids::{DaemonConfig, IdsPipeline, PacketSource, ReplaySource, StdinSource};
use nids_detect::DetectionEngine;
use nids_report::{DirectSink, QueuedSink, TelegramNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("OpenNIDS v{}", env!("CARGO_PKG_VERSION"));

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "/etc/opennids/config.json".into());
    let config = DaemonConfig::load(config_path.as_ref()).unwrap_or_else(|_| {
        tracing::warn!("config not found, using defaults");
        DaemonConfig::default()
    });

    config
        .store
        .ensure_dir()
        .with_context(|| format!("creating store directory {}", config.store.dir().display()))?;

    // Events come from a replay file when one is given, otherwise from the
    // external sniffer piping into stdin.
    let source: Box<dyn PacketSource> = match std::env::args().nth(1) {
        Some(path) => Box::new(ReplaySource::new(path)),
        None => Box::new(StdinSource),
    };

    // All file and collaborator I/O runs on its own worker so a slow disk or
    // chat API can never back the packet queue up.
    let notifier = TelegramNotifier::from_config_file(&config.store.notifications());
    let direct = DirectSink::new(&config.store, &config.report, Box::new(notifier));
    let (report_sink, report_worker) = QueuedSink::spawn(direct, config.report_queue_size);

    let engine = DetectionEngine::new(config.detector.clone(), &config.store, &config.gate);
    let mut pipeline = IdsPipeline::new(
        engine,
        &config.report,
        Box::new(report_sink.clone()),
        Box::new(report_sink),
    );

    let (event_tx, event_rx) = bounded(config.event_queue_size);
    std::thread::spawn(move || {
        if let Err(err) = source.run(event_tx) {
            tracing::warn!(error = %err, "packet source stopped with error");
        }
    });

    let worker = tokio::task::spawn_blocking(move || {
        for event in event_rx {
            pipeline.handle(&event);
        }
        let stats = pipeline.engine().stats();
        tracing::info!(
            events = stats.events_processed,
            exempt = stats.events_exempt,
            alerts = stats.alerts_emitted,
            "event stream ended"
        );
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        result = worker => {
            result.context("processing worker panicked")?;
            // The pipeline (and with it every sink handle) is gone, so the
            // report worker drains its queue and exits; wait for it.
            if report_worker.join().is_err() {
                tracing::warn!("report worker panicked during drain");
            }
        }
    }

    Ok(())
}
