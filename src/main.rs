// src/main.rs

use std::{sync::Arc, time::Duration};

use dotenvy::dotenv;
use quizwalk::ai::GeminiClient;
use quizwalk::config::Config;
use quizwalk::routes;
use quizwalk::state::AppState;
use quizwalk::utils::{hash::hash_password, jwt::ROLE_ADMIN};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = Config::from_env()?;

    // The guard flushes the file appender; keep it alive until shutdown.
    let _log_guard = init_tracing(&config.rust_log);

    let pool = connect_with_retry(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database ready, migrations applied");

    if let Err(e) = seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; quiz generation will fail");
    }
    let generator = Arc::new(GeminiClient::from_config(&config)?);

    let addr = config.bind_addr;
    let app = routes::create_router(AppState {
        pool,
        config,
        generator,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Quiz walk backend listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Logs to stdout and to a daily-rotated file under `logs/`.
fn init_tracing(filter: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "quizwalk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}

/// Opens the SQLite pool, creating the database file on first start.
/// Retries a few times in case the volume is mounted late.
async fn connect_with_retry(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    const MAX_RETRIES: u32 = 5;

    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);

    let mut attempt = 0;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options.clone())
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::warn!("Database not ready ({}), retry {}/{} in 2s", e, attempt, MAX_RETRIES);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => {
                tracing::error!("Giving up on database after {} retries: {}", MAX_RETRIES, e);
                return Err(e);
            }
        }
    }
}

async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(team_name), Some(password)) = (&config.admin_username, &config.admin_password) {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE team_name = ?")
            .bind(team_name)
            .fetch_optional(pool)
            .await?;

        if exists.is_none() {
            tracing::info!("Seeding admin account: {}", team_name);
            let hashed_password = hash_password(password)?;

            sqlx::query("INSERT INTO users (team_name, password, role) VALUES (?, ?, ?)")
                .bind(team_name)
                .bind(hashed_password)
                .bind(ROLE_ADMIN)
                .execute(pool)
                .await?;
            tracing::info!("Admin account created successfully.");
        }
    }
    Ok(())
}
