use tracing::info;

use klyroframe::{config, migrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting database migration");

    // DATABASE_URL wins over the layered configuration
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => config::load_config()?.database_url,
    };

    migrator::run_migration(&database_url).await?;

    info!("Migration completed successfully");
    Ok(())
}
