use anyhow::Context;
use menus_service::{
    config::Config,
    establish_store,
    seed::{load_dataset, seed, SeedOutcome},
};
use tracing::info;

pub async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = establish_store(&config)
        .with_context(|| format!("cannot open store at {}", config.database_url))?;

    let dataset = load_dataset(config.seed_path.as_deref())?;
    match seed(&store, &dataset).await? {
        SeedOutcome::Skipped => info!("store already seeded"),
        SeedOutcome::Seeded { restaurants } => info!(restaurants, "store seeded"),
    }

    store.close();
    Ok(())
}
