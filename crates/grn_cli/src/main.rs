//! `grn-server`: HTTP server for GRN, supplier and payment records.
//!
//! Usage:
//!   grn-server [--config grn.toml] [--listen 0.0.0.0:8080] [--db grn.sqlite3]

mod config;

use anyhow::{anyhow, Context};
use clap::Parser;
use config::{Overrides, ServerConfig};
use grn_api::{build_router, AppState, JwtState, ShareSettings};
use grn_core::{default_log_level, init_logging, init_stderr_logging, open_db};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "grn-server", version, about = "GRN, supplier and payment server")]
struct Cli {
    /// TOML configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Listen address, e.g. `127.0.0.1:8080`.
    #[arg(long = "listen")]
    listen: Option<String>,

    /// SQLite database path.
    #[arg(long = "db")]
    db: Option<PathBuf>,

    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Directory for rolling log files; logs go to stderr when unset.
    #[arg(long = "log-dir")]
    log_dir: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen: self.listen.clone(),
            db_path: self.db.clone(),
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut server_config = ServerConfig::load(cli.config.as_deref())?;
    server_config.apply_env(|key| std::env::var(key).ok());
    server_config.apply_overrides(cli.overrides());
    server_config.validate()?;

    let level = server_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    match server_config.logging.dir.as_deref() {
        Some(dir) => init_logging(&level, dir),
        None => init_stderr_logging(&level),
    }
    .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    let addr = server_config.listen_addr()?;
    let db_path = &server_config.storage.db_path;
    let conn = open_db(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    let jwt_state = JwtState::from_secret(&server_config.jwt.secret, server_config.jwt.leeway_secs);
    let share = ShareSettings {
        default_country_code: server_config.share.default_country_code.clone(),
    };
    let app = build_router(AppState::new(conn, jwt_state, share));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!(
        "event=server_start module=cli status=ok listen={addr} db_path={} version={}",
        db_path.display(),
        grn_core::core_version()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("event=server_stop module=cli status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("event=server_signal module=cli status=error error={err}");
        std::future::pending::<()>().await;
    }
}
