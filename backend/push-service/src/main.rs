use actix_web::{web, App, HttpServer};
use anyhow::Context;
use push_service::{configure_routes, metrics, AppState, Config};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting push service");

    let config = Config::from_env().context("failed to load configuration")?;
    let addr = config.bind_addr();
    tracing::info!(
        heartbeat_interval_secs = config.heartbeat_interval_secs,
        client_timeout_secs = config.client_timeout_secs,
        max_frame_size = config.max_frame_size,
        "configuration loaded"
    );

    let state = AppState::new(config);
    tracing::info!("Channel registry initialized");

    let app_state = state.clone();
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/", web::get().to(|| async { "Push Service v1.0" }))
            .configure(configure_routes)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {addr}"))?
    .run()
    .await
    .context("HTTP server error")?;

    state.shutdown();
    tracing::info!("Push service stopped");
    Ok(())
}
