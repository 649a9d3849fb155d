//! Layered configuration for the server and the CLI client.
//!
//! Priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (clap `env`, with `.env` loaded by `dotenvy`)
//! 3. TOML config file (`planpilot.toml`, `[server]` and `[auth]` tables)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::board::ServerConfig;
use crate::board::auth::AuthConfig;

pub const DEFAULT_CONFIG_FILE: &str = "planpilot.toml";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEV_JWT_SECRET: &str = "planpilot-dev-secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("invalid token lifetime '{0}' (expected e.g. 1d, 12h, 30m, 45s or 3600)")]
    InvalidExpiry(String),

    #[error("JWT_SECRET is not set; set it in the environment, .env or [auth] jwt_secret (or run with --dev)")]
    MissingSecret,
}

// ── TOML file structs (all fields Option for partial overrides) ───────

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PlanPilotConfigFile {
    server: ServerFileConfig,
    auth: AuthFileConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    port: Option<u16>,
    db_path: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    dev_mode: Option<bool>,
    log_level: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthFileConfig {
    jwt_secret: Option<String>,
    jwt_expire: Option<String>,
}

// ── CLI arguments ─────────────────────────────────────────────────────

/// Flags shared by `serve` and `init-db`.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Port to serve on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// SQLite database path
    #[arg(long, env = "PLANPILOT_DB")]
    pub db_path: Option<PathBuf>,

    /// Directory holding the built front end
    #[arg(long, env = "PLANPILOT_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Enable dev mode (permissive CORS, bind all interfaces)
    #[arg(long)]
    pub dev: bool,

    /// Secret used to sign bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Token lifetime, e.g. 1d, 12h or 3600
    #[arg(long, env = "JWT_EXPIRE")]
    pub jwt_expire: Option<String>,

    /// Path to config file (default: ./planpilot.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Client connection flags, global to every client subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ClientArgs {
    /// Board server URL
    #[arg(long, global = true, env = "PLANPILOT_URL")]
    pub server: Option<String>,

    /// Where the login session is stored
    #[arg(long, global = true, env = "PLANPILOT_SESSION")]
    pub session_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "PLANPILOT_TIMEOUT")]
    pub timeout: Option<u64>,
}

// ── Resolved configuration ────────────────────────────────────────────

/// Fully resolved server settings plus the log level to initialise with.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub server: ServerConfig,
    pub log_level: String,
}

impl ServerSettings {
    /// Load server settings by merging CLI args, env vars, and a TOML file.
    ///
    /// An explicit `--config` that does not exist is an error; the default
    /// `planpilot.toml` is optional.
    pub fn load(args: &ServeArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(args.config.as_deref())?;
        Self::resolve(args, &file)
    }

    /// True when dev mode fell back to the built-in signing secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.server.auth.jwt_secret == DEV_JWT_SECRET
    }

    fn resolve(args: &ServeArgs, file: &PlanPilotConfigFile) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();
        let dev_mode = args.dev || file.server.dev_mode.unwrap_or(false);

        let jwt_secret = match args
            .jwt_secret
            .clone()
            .or_else(|| file.auth.jwt_secret.clone())
            .filter(|s| !s.trim().is_empty())
        {
            Some(secret) => secret,
            None if dev_mode => DEV_JWT_SECRET.to_string(),
            None => return Err(ConfigError::MissingSecret),
        };
        let token_ttl = match args.jwt_expire.as_deref().or(file.auth.jwt_expire.as_deref()) {
            Some(raw) => parse_expiry(raw)?,
            None => DEFAULT_TOKEN_TTL,
        };

        Ok(Self {
            server: ServerConfig {
                port: args.port.or(file.server.port).unwrap_or(defaults.port),
                db_path: resolve_db_path(args, file),
                static_dir: args
                    .static_dir
                    .clone()
                    .or_else(|| file.server.static_dir.clone()),
                dev_mode,
                auth: AuthConfig {
                    jwt_secret,
                    token_ttl,
                },
            },
            log_level: file
                .server
                .log_level
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

/// Database path only, for commands that never sign tokens.
pub fn load_db_path(args: &ServeArgs) -> Result<PathBuf, ConfigError> {
    let file = load_config_file(args.config.as_deref())?;
    Ok(resolve_db_path(args, &file))
}

fn resolve_db_path(args: &ServeArgs, file: &PlanPilotConfigFile) -> PathBuf {
    args.db_path
        .clone()
        .or_else(|| file.server.db_path.clone())
        .unwrap_or_else(|| ServerConfig::default().db_path)
}

/// Fully resolved client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub session_path: PathBuf,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn resolve(args: &ClientArgs) -> Self {
        Self {
            server_url: args
                .server
                .as_deref()
                .unwrap_or(DEFAULT_SERVER_URL)
                .trim_end_matches('/')
                .to_string(),
            session_path: args
                .session_file
                .clone()
                .unwrap_or_else(default_session_path),
            timeout: Duration::from_secs(args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// `<config dir>/planpilot/session.toml`, or a project-local file when the
/// platform has no config directory.
pub fn default_session_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("planpilot").join("session.toml"),
        None => PathBuf::from(".planpilot").join("session.toml"),
    }
}

/// Parse a token lifetime: `1d`, `12h`, `30m`, `45s`, or bare seconds.
pub fn parse_expiry(raw: &str) -> Result<Duration, ConfigError> {
    let trimmed = raw.trim();
    let invalid = || ConfigError::InvalidExpiry(raw.to_string());

    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, 'd')) => (&trimmed[..idx], 24 * 60 * 60),
        Some((idx, 'h')) => (&trimmed[..idx], 60 * 60),
        Some((idx, 'm')) => (&trimmed[..idx], 60),
        Some((idx, 's')) => (&trimmed[..idx], 1),
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };
    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }
    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<PlanPilotConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let path = PathBuf::from(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PlanPilotConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_secret() -> ServeArgs {
        ServeArgs {
            jwt_secret: Some("s3cret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_with_empty_file() {
        let file: PlanPilotConfigFile = toml::from_str("").unwrap();
        let settings = ServerSettings::resolve(&args_with_secret(), &file).unwrap();

        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.server.db_path, PathBuf::from(".planpilot/planpilot.db"));
        assert!(settings.server.static_dir.is_none());
        assert!(!settings.server.dev_mode);
        assert_eq!(settings.server.auth.token_ttl, Duration::from_secs(86_400));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn toml_parsing_full() {
        let toml_str = r#"
[server]
port = 8080
db_path = "/var/lib/planpilot/board.db"
static_dir = "web/dist"
dev_mode = true
log_level = "debug"

[auth]
jwt_secret = "from-file"
jwt_expire = "12h"
"#;
        let file: PlanPilotConfigFile = toml::from_str(toml_str).unwrap();
        let settings = ServerSettings::resolve(&ServeArgs::default(), &file).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.db_path, PathBuf::from("/var/lib/planpilot/board.db"));
        assert_eq!(settings.server.static_dir, Some(PathBuf::from("web/dist")));
        assert!(settings.server.dev_mode);
        assert_eq!(settings.server.auth.jwt_secret, "from-file");
        assert_eq!(settings.server.auth.token_ttl, Duration::from_secs(12 * 3600));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn cli_overrides_file() {
        let toml_str = r#"
[server]
port = 8080
db_path = "file.db"

[auth]
jwt_secret = "from-file"
"#;
        let file: PlanPilotConfigFile = toml::from_str(toml_str).unwrap();
        let args = ServeArgs {
            port: Some(9000),
            jwt_secret: Some("from-cli".into()),
            ..Default::default()
        };
        let settings = ServerSettings::resolve(&args, &file).unwrap();

        assert_eq!(settings.server.port, 9000); // from CLI
        assert_eq!(settings.server.db_path, PathBuf::from("file.db")); // from file
        assert_eq!(settings.server.auth.jwt_secret, "from-cli");
    }

    #[test]
    fn missing_secret_is_an_error_outside_dev_mode() {
        let file = PlanPilotConfigFile::default();
        let result = ServerSettings::resolve(&ServeArgs::default(), &file);
        assert!(matches!(result, Err(ConfigError::MissingSecret)));

        let dev = ServeArgs {
            dev: true,
            ..Default::default()
        };
        let settings = ServerSettings::resolve(&dev, &file).unwrap();
        assert_eq!(settings.server.auth.jwt_secret, DEV_JWT_SECRET);
        assert!(settings.uses_dev_secret());
    }

    #[test]
    fn parse_expiry_accepts_units_and_bare_seconds() {
        assert_eq!(parse_expiry("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_expiry("12h").unwrap(), Duration::from_secs(43_200));
        assert_eq!(parse_expiry("30m").unwrap(), Duration::from_secs(1_800));
        assert_eq!(parse_expiry("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_expiry(" 3600 ").unwrap(), Duration::from_secs(3_600));
    }

    #[test]
    fn parse_expiry_rejects_garbage() {
        for raw in ["", "d", "0", "1w", "-5m", "soon"] {
            assert!(
                matches!(parse_expiry(raw), Err(ConfigError::InvalidExpiry(_))),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::resolve(&ClientArgs::default());
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.session_path.ends_with("session.toml"));
    }

    #[test]
    fn client_config_trims_trailing_slash() {
        let args = ClientArgs {
            server: Some("http://board.example:8080/".into()),
            session_file: Some(PathBuf::from("/tmp/s.toml")),
            timeout: Some(5),
        };
        let config = ClientConfig::resolve(&args);
        assert_eq!(config.server_url, "http://board.example:8080");
        assert_eq!(config.session_path, PathBuf::from("/tmp/s.toml"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn explicit_missing_config_file_returns_error() {
        let result = load_config_file(Some(Path::new("/nonexistent/planpilot.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn load_db_path_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planpilot.toml");
        std::fs::write(&path, "[server]\ndb_path = \"custom.db\"\n").unwrap();
        let args = ServeArgs {
            config: Some(path),
            ..Default::default()
        };
        assert_eq!(load_db_path(&args).unwrap(), PathBuf::from("custom.db"));
    }
}
