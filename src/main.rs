//! InsightFlow - customer feedback API
//!
//! Entry point for the HTTP server and the operator commands that prepare
//! and inspect its database.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use insightflow_core::{
    api::{
        handlers::auth::{is_valid_email, normalize_email, password_length, MIN_PASSWORD_LEN},
        ApiServer, ApiServerConfig, AppState,
    },
    auth::PasswordHasher,
    AppConfig, InsightError, LibsqlStorage, NewUser, Role, StorageBackend,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "insightflow")]
#[command(about = "Customer feedback collection API with sentiment analytics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (defaults to ./insightflow.toml when present)
    #[arg(short, long, env = "INSIGHTFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Database path (overrides configuration)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server (default)
    Serve,

    /// Create the database and apply migrations
    Init,

    /// Create an account, e.g. the initial admin
    CreateUser {
        /// Display name
        #[arg(long)]
        name: String,

        /// Login email
        #[arg(long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(long, env = "INSIGHTFLOW_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account role: user or admin
        #[arg(long, default_value = "user")]
        role: String,
    },

    /// Check that the database answers and the admin account exists
    CheckDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins when set; otherwise our level, with HTTP internals quieter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "insightflow={lvl},insightflow_core={lvl},tower_http={lvl},hyper=warn,libsql=warn",
            lvl = level.as_str().to_lowercase()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("InsightFlow v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Init => {
            let storage = LibsqlStorage::open(&config.database.path).await?;
            println!("Database ready at {}", storage.path().display());
            Ok(())
        }
        Commands::CreateUser {
            name,
            email,
            password,
            role,
        } => create_user(&config, name, email, password, role).await,
        Commands::CheckDb => check_db(&config).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address '{}:{}'",
                config.server.host, config.server.port
            )
        })?;

    let storage = LibsqlStorage::open(&config.database.path).await?;
    info!("Using database: {}", storage.path().display());

    let state = AppState::from_config(&config, Arc::new(storage));
    let server_config = ApiServerConfig {
        addr,
        expose_errors: config.is_development(),
    };

    ApiServer::new(server_config, state).serve().await
}

async fn create_user(
    config: &AppConfig,
    name: String,
    email: String,
    password: String,
    role: String,
) -> anyhow::Result<()> {
    let name = name.trim().to_string();
    let email = normalize_email(&email);

    if name.is_empty() {
        bail!("Name must not be empty");
    }
    if !is_valid_email(&email) {
        bail!("'{}' is not a valid email address", email);
    }
    if password_length(&password) < MIN_PASSWORD_LEN {
        bail!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        );
    }
    let role: Role = role.parse()?;

    let storage = LibsqlStorage::open(&config.database.path).await?;
    let password_hash = PasswordHasher::new(config.auth.bcrypt_cost)
        .hash(&password)
        .await?;

    match storage
        .create_user(&NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await
    {
        Ok(user) => {
            println!("Created {} account {} (id {})", user.role, user.email, user.id);
            Ok(())
        }
        Err(InsightError::AlreadyExists(email)) => {
            bail!("An account with email {} already exists", email)
        }
        Err(e) => Err(e.into()),
    }
}

async fn check_db(config: &AppConfig) -> anyhow::Result<()> {
    let storage = LibsqlStorage::open(&config.database.path).await?;
    storage
        .health_check()
        .await
        .context("Database connection error")?;
    println!("Database connection successful ({})", storage.path().display());

    match storage.find_user_by_email(&config.admin.email).await? {
        Some(admin) => {
            println!(
                "Admin account: {} <{}> (id {})",
                admin.name, admin.email, admin.id
            );
            Ok(())
        }
        None => bail!(
            "Admin user {} not found. Run `insightflow create-user --role admin` first.",
            config.admin.email
        ),
    }
}
