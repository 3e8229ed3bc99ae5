use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::dashboard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use sdr_funnel::config::AppConfig;
use sdr_funnel::error::AppError;
use sdr_funnel::telemetry;
use sdr_funnel::workflows::publish::ReportStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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
    let store = Arc::new(ReportStore::new(&config.reports.data_dir));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store: store.clone(),
    };

    let app = dashboard_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    let stored = store.index()?.len();
    info!(
        ?config.environment,
        %addr,
        data_dir = %store.root().display(),
        stored,
        "SDR dashboard ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
