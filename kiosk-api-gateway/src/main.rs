use std::sync::Arc;

use clap::{Parser, Subcommand};
use kiosk_api_gateway::config::Config;
use kiosk_api_gateway::db;
use kiosk_api_gateway::state::AppState;
use kiosk_auth_service::{AuthService, NewAdmin, PgAdminStore, TokenService};
use kiosk_menu_service::PgMenuStore;
use kiosk_order_service::{BoxError, establish_pool};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Self-service kiosk ordering backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations, seed default categories and serve HTTP (default)
    Serve,
    /// Apply pending migrations
    Migrate,
    /// Revert every migration, then apply them again
    ResetDb,
    /// Create an admin account
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "kiosk_api_gateway=info,kiosk_order_service=info,tower_http=info".into()
        }))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Migrate => db::run_migrations(&config.database_url).await,
        Commands::ResetDb => db::reset_database(&config.database_url).await,
        Commands::CreateAdmin {
            username,
            email,
            password,
        } => create_admin(config, username, email, password).await,
    }
}

async fn serve(config: Config) -> Result<(), BoxError> {
    db::run_migrations(&config.database_url).await?;
    let pool = establish_pool(&config.database_url, config.database_pool_size)?;

    PgMenuStore::new(pool.clone())
        .seed_default_categories()
        .await?;

    let state = AppState::from_config(&config, pool)?;
    let app = kiosk_api_gateway::app(state, &config.cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    info!(
        environment = %config.environment,
        "kiosk API listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;

    Ok(())
}

async fn create_admin(
    config: Config,
    username: String,
    email: String,
    password: String,
) -> Result<(), BoxError> {
    db::run_migrations(&config.database_url).await?;
    let pool = establish_pool(&config.database_url, 1)?;

    let auth = AuthService::new(
        Arc::new(PgAdminStore::new(pool)),
        TokenService::new(&config.auth.jwt_secret, config.auth.access_token_ttl),
    );
    let admin = auth
        .create_admin(NewAdmin {
            username,
            email,
            password,
        })
        .await?;
    info!(admin_id = %admin.id, username = %admin.username, "admin account created");

    Ok(())
}
