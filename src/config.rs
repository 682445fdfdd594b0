use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Default upload ceiling: 50 MB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Personal file vault API")]
pub struct Args {
    /// Host to bind to (overrides FILEVAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILEVAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded files are stored (overrides FILEVAULT_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides FILEVAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Upload size ceiling in bytes (overrides FILEVAULT_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("FILEVAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FILEVAULT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FILEVAULT_PORT value `{value}`"))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading FILEVAULT_PORT"),
        };
        let env_storage =
            env::var("FILEVAULT_STORAGE_DIR").unwrap_or_else(|_| "./data/files".into());
        let env_db = env::var("FILEVAULT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/filevault.db".into());
        let env_limit = match env::var("FILEVAULT_MAX_UPLOAD_BYTES") {
            Ok(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing FILEVAULT_MAX_UPLOAD_BYTES value `{value}`"))?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_UPLOAD_BYTES,
            Err(err) => return Err(err).context("reading FILEVAULT_MAX_UPLOAD_BYTES"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_limit),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
