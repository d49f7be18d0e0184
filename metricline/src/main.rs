use std::future::Future;

use clap::Parser;
use metricline::collection::TimelineMetricsCollector;
use metricline::model::PropertyBag;
use metricline::settings::{CliOptions, ProbeSettings, Settings};
use metricline::{logging, metrics, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};
use settings_loader::SettingsLoader;

static METRICS_REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("metricline".to_string()), None).expect("failed to create prometheus registry")
});

fn main() -> Result<()> {
    let subscriber = logging::get_subscriber("metricline", "info", std::io::stdout);
    logging::init_subscriber(subscriber)?;

    let main_span = tracing::trace_span!("main");
    let _main_span_guard = main_span.enter();

    let options = CliOptions::parse();
    let settings = Settings::load(&options)?;
    metrics::register_metrics(&METRICS_REGISTRY)?;
    let collector = TimelineMetricsCollector::from_settings(&settings)?;

    start_pipeline(async move {
        tracing::info!(?collector, "starting timeline metrics probe...");
        run_probe(&collector, &settings.probe).await;
        log_metrics(&METRICS_REGISTRY);
        tracing::info!("timeline metrics probe stopped.");
        Ok(())
    })
}

async fn run_probe(collector: &TimelineMetricsCollector, probe: &ProbeSettings) {
    let mut interval = tokio::time::interval(probe.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => refresh(collector, probe).await,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            },
        }
    }
}

#[tracing::instrument(level = "info", skip(collector, probe))]
async fn refresh(collector: &TimelineMetricsCollector, probe: &ProbeSettings) {
    let request = probe.request(chrono::Utc::now());
    let mut resources: Vec<PropertyBag> = probe.property_bags(collector.keys());
    let outcome = collector.populate_resources(&mut resources, &request).await;

    match serde_json::to_string(&resources) {
        Ok(populated) => tracing::info!(?outcome, %populated, "probe resources refreshed"),
        Err(error) => tracing::warn!(?error, ?outcome, "failed to render refreshed probe resources"),
    }
}

fn log_metrics(registry: &Registry) {
    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        Ok(()) => tracing::info!(metrics=%String::from_utf8_lossy(&buffer), "final collection metrics"),
        Err(error) => tracing::warn!(?error, "failed to encode collection metrics"),
    }
}

#[tracing::instrument(level="trace", skip(future), fields(worker_threads=num_cpus::get()))]
fn start_pipeline<F>(future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let worker_threads = num_cpus::get();
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?
        .block_on(future)
}
