use job_radar::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    middleware::cors::cors_layer,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.json_logs);

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool, config)?;

    if let Some(interval_secs) = config.scrape_interval_secs {
        let state = app_state.clone();
        info!(interval_secs, "Starting periodic scrape worker");
        tokio::spawn(async move {
            let defaults = state.scrape_defaults.clone();
            loop {
                tokio::time::sleep(Duration::from_secs(interval_secs)).await;
                match state
                    .ingest_service
                    .scrape(
                        &state.feed_service,
                        &defaults.search_term,
                        &defaults.location,
                        defaults.max_jobs,
                    )
                    .await
                {
                    Ok(report) => info!(
                        jobs_found = report.summary.jobs_found,
                        jobs_inserted = report.summary.jobs_inserted,
                        "Periodic scrape finished"
                    ),
                    Err(e) if e.is_retryable() => {
                        tracing::warn!(error = %e, "Periodic scrape failed, retrying next tick")
                    }
                    Err(e) => tracing::error!(error = ?e, "Periodic scrape worker error"),
                }
            }
        });
    }

    let app = routes::api_router()
        .with_state(app_state)
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
