use anyhow::Context;
use menus_service::{
    config::Config,
    establish_store,
    seed::{load_dataset, seed},
    web::{router, AppState},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = establish_store(&config)
        .with_context(|| format!("cannot open store at {}", config.database_url))?;

    let dataset = load_dataset(config.seed_path.as_deref())?;
    if let Err(err) = seed(&store, &dataset).await {
        error!(error = %err, "startup seeding failed, serving what was stored");
    }

    let app = router(AppState {
        store: store.clone(),
    })
    .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("menus service listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => warn!(error = %err, "cannot listen for shutdown signal"),
    }
}
