//! Remove all application data, keeping the schema.
//!
//! Usage: DATABASE_URL=... ./unseed --yes

use anyhow::{bail, Result};
use clap::Parser;

use lessonbook_api::{config::Config, db};

#[derive(Parser)]
#[command(name = "unseed", about = "Delete every row of lessonbook data")]
struct Args {
    /// Confirm the deletion
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if !args.yes {
        bail!("Refusing to delete data without --yes");
    }

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    db::clear_all(&pool).await?;
    tracing::info!("All data removed");
    Ok(())
}
