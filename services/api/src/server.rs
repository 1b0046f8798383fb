use crate::cli::ServeArgs;
use crate::infra::{AppState, ForwardedIdentityAuthenticator, InMemoryApplicationRepository};
use crate::routes::with_application_routes;
use ats_portal::application::{ApplicationController, PropertyMappingConfiguration, RouteTable};
use ats_portal::config::AppConfig;
use ats_portal::error::AppError;
use ats_portal::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let mapping = PropertyMappingConfiguration::for_application(config.uploads.clone());
    let controller = Arc::new(ApplicationController::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(ForwardedIdentityAuthenticator),
        Arc::new(RouteTable::standard(config.portal.base_url.clone())),
        config.portal.clone(),
        mapping,
    ));

    let app = with_application_routes(controller)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        base_url = %config.portal.base_url,
        group = config.portal.fe_user_group.as_ref().map(|group| group.0.as_str()),
        "application portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
