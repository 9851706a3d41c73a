//! Back-office HTTP server.
//!
//! The connectors use blocking HTTP clients, which must not be created on a
//! runtime thread, so everything is wired before the Tokio runtime starts.

use std::path::PathBuf;
use std::sync::Arc;

use backoffice_engine::api::{AppState, create_router};
use backoffice_engine::config::{AccountingMode, AppConfig, ConfigLoader, GroupwareMode};
use backoffice_engine::connectors::{
    AccountingConnector, DisabledGroupwareConnector, GraphGroupwareConnector, GroupwareConnector,
    HttpAccountingConnector, SandboxAccountingConnector,
};
use backoffice_engine::error::BackofficeResult;
use backoffice_engine::store::Database;
use backoffice_engine::store::integrations::latest_accounting_credentials;
use backoffice_engine::store::seed::seed_demo_data;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Construction back-office server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "./config/backoffice.yaml")]
    config: PathBuf,

    /// Replace all data with the demo data set before serving
    #[arg(long)]
    seed: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing .env is normal outside development.
    let dotenv = dotenvy::dotenv();

    let loader = ConfigLoader::load(&args.config)?;
    let config = loader.config().clone();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }
    info!(config = %args.config.display(), "Configuration loaded");

    let db = Arc::new(Database::open(&config.database.path)?);
    info!(path = %config.database.path, "Database ready");

    if args.seed {
        let summary = seed_demo_data(&db)?;
        info!(admin_id = %summary.admin_id, project_id = %summary.project_id, "Demo data seeded");
    }

    let accounting = build_accounting(&db, &config)?;
    let groupware = build_groupware(&config)?;
    let state = AppState::new(db, accounting, groupware, &config);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(state, config.server.bind_address.clone()))?;
    Ok(())
}

fn build_accounting(
    db: &Database,
    config: &AppConfig,
) -> BackofficeResult<Arc<dyn AccountingConnector>> {
    match config.accounting.mode {
        AccountingMode::Sandbox => {
            info!("Accounting connector running in sandbox mode");
            Ok(Arc::new(SandboxAccountingConnector::new(
                config.accounting.clone(),
            )))
        }
        AccountingMode::Live => {
            let credentials = db.read(latest_accounting_credentials)?;
            match &credentials {
                Some(creds) => info!(realm_id = %creds.realm_id, "Accounting credentials restored"),
                None => warn!("Accounting service not connected yet"),
            }
            Ok(Arc::new(HttpAccountingConnector::new(
                config.accounting.clone(),
                credentials,
            )?))
        }
    }
}

fn build_groupware(config: &AppConfig) -> BackofficeResult<Arc<dyn GroupwareConnector>> {
    match config.groupware.mode {
        GroupwareMode::Disabled => {
            warn!("Groupware connector disabled, receipt uploads will fail");
            Ok(Arc::new(DisabledGroupwareConnector))
        }
        GroupwareMode::Live => Ok(Arc::new(GraphGroupwareConnector::new(
            config.groupware.clone(),
        )?)),
    }
}

async fn serve(state: AppState, bind_address: String) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Back-office server listening");
    axum::serve(listener, app).await
}
