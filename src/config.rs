use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Scope of the duplicate-name check performed before inserting a new
/// repository row. The check is a lookup, not a constraint, so two
/// concurrent creates can still both pass it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoNameScope {
    /// One flat namespace of repository names across all owners.
    Global,
    /// Names only need to be unique among a single owner's repositories.
    PerOwner,
}

impl RepoNameScope {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "owner" | "per-owner" => Ok(Self::PerOwner),
            other => anyhow::bail!("invalid repo name scope `{}` (expected global|owner)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub repo_name_scope: RepoNameScope,
    pub ai_base_url: String,
    pub ai_model: String,
    /// When absent the reviewer is disabled and file views carry no
    /// annotations.
    pub ai_api_key: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Repository file manager API")]
pub struct Args {
    /// Host to bind to (overrides REPOVAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides REPOVAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides REPOVAULT_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides REPOVAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Repository name uniqueness scope: global|owner (overrides REPOVAULT_REPO_NAME_SCOPE)
    #[arg(long)]
    pub repo_name_scope: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("REPOVAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("REPOVAULT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing REPOVAULT_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading REPOVAULT_PORT"),
        };
        let env_storage =
            env::var("REPOVAULT_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("REPOVAULT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/repovault.db".into());
        let env_scope = env::var("REPOVAULT_REPO_NAME_SCOPE").unwrap_or_else(|_| "global".into());

        let ai_base_url = env::var("REPOVAULT_AI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".into());
        let ai_model =
            env::var("REPOVAULT_AI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".into());
        let ai_api_key = env::var("REPOVAULT_AI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            repo_name_scope: RepoNameScope::parse(&args.repo_name_scope.unwrap_or(env_scope))?,
            ai_base_url,
            ai_model,
            ai_api_key,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
