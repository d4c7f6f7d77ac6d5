//! Server configuration: TOML file, then environment, then CLI flags.

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const ENV_JWT_SECRET: &str = "GRN_JWT_SECRET";
pub const ENV_DB_PATH: &str = "GRN_DB_PATH";

const MIN_JWT_SECRET_BYTES: usize = 16;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub jwt: JwtSection,
    pub logging: LoggingSection,
    pub share: ShareSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub db_path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("grn.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtSection {
    /// HS256 shared secret. Never logged.
    pub secret: String,
    /// Clock skew tolerated when checking `exp`.
    pub leeway_secs: u64,
}

impl Default for JwtSection {
    fn default() -> Self {
        Self {
            secret: String::new(),
            leeway_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    /// Rolling log file directory; stderr when unset.
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShareSection {
    pub default_country_code: Option<String>,
}

/// Values given on the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
}

impl ServerConfig {
    /// Loads `path`, or built-in defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Applies `GRN_JWT_SECRET` and `GRN_DB_PATH` through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(ENV_JWT_SECRET).filter(|value| !value.is_empty()) {
            self.jwt.secret = secret;
        }
        if let Some(db_path) = lookup(ENV_DB_PATH).filter(|value| !value.trim().is_empty()) {
            self.storage.db_path = PathBuf::from(db_path);
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(listen) = overrides.listen {
            self.server.listen = listen;
        }
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = Some(level);
        }
        if let Some(dir) = overrides.log_dir {
            self.logging.dir = Some(dir);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_BYTES {
            bail!(
                "jwt secret must be at least {MIN_JWT_SECRET_BYTES} bytes; set [jwt] secret or {ENV_JWT_SECRET}"
            );
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .map_err(|err| anyhow!("invalid listen address `{}`: {err}", self.server.listen))
    }
}
