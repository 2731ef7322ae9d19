//! CLI argument parsing, validation, and startup helpers.

use crate::auth::{ClientIpHeader, SameSitePolicy};
use crate::db::Database;
use crate::jwt::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS};
use crate::password::DEFAULT_COST;
use crate::{MIN_JWT_SECRET_LENGTH, ServerConfig};
use clap::Parser;
use tracing::{error, info};
use url::Url;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "Token authentication gateway with origin-checked login and rotating refresh cookies"
)]
pub struct Args {
    /// Base path prefix. Login at {base}/auth/login
    #[arg(short, long, env = "TOKENGATE_BASE", value_parser = validate_base_path)]
    pub base: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "TOKENGATE_PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "TOKENGATE_DATABASE", default_value = "tokengate.db")]
    pub database: String,

    /// The browser origin allowed to call the API (e.g., "https://app.example.com")
    #[arg(long, env = "TOKENGATE_ALLOWED_ORIGIN", default_value = "http://localhost:5173")]
    pub allowed_origin: String,

    /// This server's public origin, used for Referer checks and to decide the
    /// cookie Secure flag (e.g., "https://api.example.com")
    #[arg(long, env = "TOKENGATE_SERVER_ORIGIN", default_value = "http://localhost:7291")]
    pub server_origin: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "TOKENGATE_ACCESS_TOKEN_TTL", default_value_t = DEFAULT_ACCESS_TOKEN_TTL_SECS)]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "TOKENGATE_REFRESH_TOKEN_TTL", default_value_t = DEFAULT_REFRESH_TOKEN_TTL_SECS)]
    pub refresh_token_ttl: u64,

    /// SameSite attribute of the refresh cookie ("none" requires an HTTPS server origin)
    #[arg(long, env = "TOKENGATE_SAME_SITE", default_value = "strict")]
    pub same_site: SameSitePolicy,

    /// Disable new user signups
    #[arg(long)]
    pub no_signup: bool,

    /// bcrypt work factor for new password hashes
    #[arg(long, default_value_t = DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Read the client IP from this header (only when behind a trusted proxy)
    #[arg(long, env = "TOKENGATE_IP_HEADER")]
    pub ip_header: Option<ClientIpHeader>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_base_path(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Ok(String::new());
    }

    if !s.starts_with('/') {
        return Err(format!("Base path must start with '/': {}", s));
    }

    if s.len() > 1 && s.ends_with('/') {
        return Err(format!("Base path must not end with '/': {}", s));
    }

    if s.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Base path contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} bytes. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse an origin argument.
/// Returns None and logs an error if it is not a URL.
pub fn parse_origin(name: &str, value: &str) -> Option<Url> {
    match Url::parse(value) {
        Ok(url) => Some(url),
        Err(e) => {
            error!(argument = name, origin = %value, error = %e, "Invalid origin URL");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    allowed_origin: Url,
    server_origin: Url,
    jwt_secret: String,
) -> ServerConfig {
    let secure_cookies = server_origin.scheme() == "https";

    ServerConfig {
        base: args.base.clone(),
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_token_ttl: args.access_token_ttl,
        refresh_token_ttl: args.refresh_token_ttl,
        allowed_origin,
        server_origin,
        secure_cookies,
        same_site: args.same_site,
        no_signup: args.no_signup,
        bcrypt_cost: args.bcrypt_cost,
        rate_limit: true,
        ip_header: args.ip_header,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
