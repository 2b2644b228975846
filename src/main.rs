use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tailtrack::config::{AssetType, Config};
use tailtrack::http::ReqwestHttpClient;
use tailtrack::player::SimulatedPlayer;
use tailtrack::session::SessionManager;
use tailtrack::tracking::{AdEvent, AdEventKind};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Interval of the simulated player clock (5 Hz)
const CLOCK_TICK: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting tailtrack demo");

    if let Err(e) = run().await {
        error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    if config.is_dev {
        info!("Running in DEV mode");
    }

    if let Some(port) = config.metrics_port {
        start_metrics_server(port).await?;
    }

    let live = matches!(config.session.asset_type, AssetType::Linear { .. });
    let player = Arc::new(SimulatedPlayer::new(live));
    let http_client = Arc::new(ReqwestHttpClient::new()?);

    let mut manager = SessionManager::new(player.clone(), http_client);
    tokio::spawn(log_events(manager.events()));

    let manifest_url = manager.initialize_session(config.session.clone()).await?;
    info!("Player loading {}", manifest_url);
    player.load();
    player.play();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut clock = tokio::time::interval(CLOCK_TICK);
    let mut time = 0.0;
    while time < config.playback_secs {
        tokio::select! {
            _ = clock.tick() => {
                player.advance_to(time);
                time += CLOCK_TICK.as_secs_f64();
            }
            _ = &mut shutdown => {
                info!("Interrupted, stopping playback");
                break;
            }
        }
    }

    player.destroy();
    manager.destroy();
    info!("Playback finished after {:.1}s", time);
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<AdEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => log_event(&event),
            Err(RecvError::Lagged(skipped)) => warn!("Event log lagging, {} events skipped", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &AdEvent) {
    let at = event.timestamp.format("%H:%M:%S%.3f");
    match &event.kind {
        AdEventKind::AdStarted { ad, index_in_queue } => {
            info!("[{}] Ad started: {} (#{} in break)", at, ad.id, index_in_queue)
        }
        AdEventKind::AdFinished { ad } => info!("[{}] Ad finished: {}", at, ad.id),
        AdEventKind::AdBreakStarted { ad_break } => info!(
            "[{}] Ad break started: {} ({} ads, {}s)",
            at,
            ad_break.id,
            ad_break.ads.len(),
            ad_break.duration
        ),
        AdEventKind::AdBreakFinished { ad_break } => {
            info!("[{}] Ad break finished: {}", at, ad_break.id)
        }
        AdEventKind::UpcomingAdBreakUpdated { ad_break } => match ad_break {
            Some(ad_break) => info!(
                "[{}] Next ad break: {} at {}s",
                at, ad_break.id, ad_break.schedule_time
            ),
            None => info!("[{}] No upcoming ad break", at),
        },
        AdEventKind::AdBreakScheduleUpdated { ad_breaks } => {
            match serde_json::to_string(&**ad_breaks) {
                Ok(json) => info!("[{}] Ad break schedule: {}", at, json),
                Err(e) => warn!("Failed to serialize ad break schedule: {}", e),
            }
        }
        AdEventKind::Info { message } => info!("[{}] {}", at, message),
        AdEventKind::Error { message } => error!("[{}] {}", at, message),
    }
}

async fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let app = Router::new().route("/metrics", get(move || serve_metrics(handle.clone())));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Metrics available on http://{}/metrics", listener.local_addr()?);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });
    Ok(())
}

/// Serve Prometheus metrics in text exposition format
async fn serve_metrics(handle: PrometheusHandle) -> Response {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
        .into_response()
}
