mod migrations;
mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use overlaytv_core::{
    bootstrap::{init_database, init_services, load_config},
    logging,
};

use server::OverlayTvServer;

#[derive(Parser, Debug)]
#[command(name = "overlaytv")]
#[command(about = "OverlayTV stream and overlay server", version, long_about = None)]
struct Args {
    /// Config file (YAML or TOML); searched in default locations when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Do not apply database migrations at startup
    #[arg(long, env = "OVERLAYTV_SKIP_MIGRATIONS")]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("OverlayTV server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Initialize database (optional)
    let pool = if config.uses_database() {
        let pool = init_database(&config).await?;

        // 4. Run migrations
        if args.skip_migrations {
            info!("Skipping database migrations");
        } else {
            migrations::run_migrations(&pool).await?;
        }
        Some(pool)
    } else {
        None
    };

    // 5. Initialize services
    let services = init_services(pool.clone(), &config);

    // 6. Start the transcoder watchdog
    let watchdog = config.stream.health_check_interval().map(|interval| {
        info!(interval_ms = config.stream.health_check_interval_ms, "Starting transcoder watchdog");
        services.stream_manager.spawn_watchdog(interval)
    });

    // 7. Serve until shutdown
    let server = OverlayTvServer::new(config, services, pool, watchdog);
    server.start().await?;

    Ok(())
}
