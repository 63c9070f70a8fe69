//! Seed data script - creates (or resets) a dashboard login
//!
//! Run with: cargo run --bin seed-data -- --email admin@klyroframe.local --password changeme123

use clap::Parser;
use std::sync::Arc;
use tracing::info;

use klyroframe::{config, db, services::accounts::AccountService};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Upsert a Klyroframe dashboard user")]
struct Args {
    /// Login email, stored lowercased
    #[arg(long, default_value = "admin@klyroframe.local")]
    email: String,

    /// Display name
    #[arg(long, default_value = "Admin Klyro")]
    name: String,

    /// Plain-text password, hashed with argon2 before storage
    #[arg(long, env = "SEED_PASSWORD")]
    password: String,

    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Run pending migrations before seeding
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    info!("=== Klyroframe Seed Data ===");

    let database_url = match args.database_url {
        Some(url) => url,
        None => config::load_config()?.database_url,
    };

    let pool = db::establish_connection(&database_url).await?;
    if args.migrate {
        db::run_migrations(&pool).await?;
    }

    let accounts = AccountService::new(Arc::new(pool));
    let user = accounts
        .upsert_user(&args.email, &args.name, &args.password)
        .await?;

    info!(user_id = %user.id, email = %user.email, "Seeded dashboard user");
    Ok(())
}
