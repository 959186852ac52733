//! Fill a portal database with demo users, categories and posts

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use newsportal::{
    config::Config,
    db,
    seed::{SeedOptions, Seeder, DEMO_PASSWORD},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Create demo data for the news portal")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    #[arg(long, default_value_t = 5)]
    users: usize,

    #[arg(long, default_value_t = 8)]
    categories: usize,

    #[arg(long, default_value_t = 30)]
    posts: usize,

    /// RNG seed; the same seed builds the same data
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "newsportal=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let config = Config::load_with_env(&args.config)?;

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let options = SeedOptions {
        users: args.users,
        categories: args.categories,
        posts: args.posts,
        rng_seed: args.seed,
    };
    let report = Seeder::new(pool).run(&options, Utc::now()).await?;

    tracing::info!(
        users = report.users,
        categories = report.categories,
        posts = report.posts,
        comments = report.comments,
        subscriptions = report.subscriptions,
        "Demo data created"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("Log in as testuser1 .. testuser{} with password {}", report.users, DEMO_PASSWORD);
    Ok(())
}
