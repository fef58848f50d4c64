use crate::cli::ServeArgs;
use crate::infra::{seed_demo_placements, AppState, InMemoryPlacements, LoggingCascadeSink};
use crate::routes::with_withdrawal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use placement_desk::config::AppConfig;
use placement_desk::error::AppError;
use placement_desk::telemetry;
use placement_desk::workflows::withdrawals::WithdrawalService;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let placements = Arc::new(InMemoryPlacements::default());
    if args.seed_demo {
        seed_demo_placements(&placements, false);
    }
    let withdrawal_service = Arc::new(WithdrawalService::new(
        placements.clone(),
        placements.clone(),
        placements,
        Arc::new(LoggingCascadeSink),
    ));

    let app = with_withdrawal_routes(withdrawal_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "placement withdrawal service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
