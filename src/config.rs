use crate::cli::ConnectionArgs;
use crate::error::DashError;
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "0.0.0.0,1433";
pub const DEFAULT_DATABASE: &str = "netflix_analytics";
pub const DEFAULT_USERNAME: &str = "sa";
pub const DEFAULT_DRIVER_FAMILY: &str = "SQL Server";
pub const DEFAULT_PREFERRED_DRIVER: &str = "18";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub target: ConnectionTarget,
    pub drivers: DriverPolicy,
    pub cache_ttl: Duration,
    pub query_timeout_secs: u64,
    pub invalidate_on_write: bool,
    pub show_secrets: bool,
}

/// The fixed endpoint every driver candidate is tried against.
#[derive(Debug)]
pub struct ConnectionTarget {
    pub server: String,
    pub database: String,
    pub auth: SqlServerAuth,
    pub trust_server_certificate: bool,
    pub encrypt: bool,
}

/// Authentication method for SQL Server.
#[derive(Debug)]
pub enum SqlServerAuth {
    WindowsIntegrated,
    SqlLogin {
        username: String,
        password: SecretString,
    },
}

/// Which installed drivers are candidates, and which are tried first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverPolicy {
    /// Substring a driver description must contain to be a candidate.
    pub family: String,
    /// Substring marking the preferred major version.
    pub preferred_marker: String,
}

impl Default for DriverPolicy {
    fn default() -> Self {
        Self {
            family: DEFAULT_DRIVER_FAMILY.to_string(),
            preferred_marker: DEFAULT_PREFERRED_DRIVER.to_string(),
        }
    }
}

// --- TOML config file structs ---

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    #[serde(default)]
    defaults: TomlDefaults,
    #[serde(default)]
    profiles: HashMap<String, TomlProfile>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDefaults {
    cache_ttl: Option<u64>,
    timeout: Option<u64>,
    verbose: Option<bool>,
    invalidate_on_write: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct TomlProfile {
    server: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    password_env: Option<String>,
    windows_auth: Option<bool>,
    trust_server_certificate: Option<bool>,
    encrypt: Option<bool>,
    driver_family: Option<String>,
    preferred_driver: Option<String>,
}

/// Config path resolution result, distinguishing explicit from auto-resolved paths.
struct ResolvedConfigPath {
    path: PathBuf,
    /// true if given via --config or FLIXDASH_CONFIG
    explicit: bool,
}

/// Resolve the config file path: --config flag > env var > platform default.
fn resolve_config_path(cli_config: Option<&PathBuf>) -> Option<ResolvedConfigPath> {
    if let Some(path) = cli_config {
        return Some(ResolvedConfigPath { path: path.clone(), explicit: true });
    }
    if let Some(path) = env_non_empty("FLIXDASH_CONFIG") {
        return Some(ResolvedConfigPath { path: PathBuf::from(path), explicit: true });
    }
    ProjectDirs::from("", "", "flixdash").map(|dirs| ResolvedConfigPath {
        path: dirs.config_dir().join("config.toml"),
        explicit: false,
    })
}

/// Load and parse the TOML config file (if it exists).
fn load_toml_config(resolved: Option<&ResolvedConfigPath>) -> Result<TomlConfig, DashError> {
    let resolved = match resolved {
        Some(r) => r,
        None => return Ok(TomlConfig::default()),
    };

    if !resolved.path.exists() {
        if resolved.explicit {
            return Err(DashError::Config {
                message: format!("config file not found: {}", resolved.path.display()),
            });
        }
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&resolved.path).map_err(|e| DashError::Config {
        message: format!("cannot read config file {}: {}", resolved.path.display(), e),
    })?;

    toml::from_str(&content).map_err(|e| DashError::Config {
        message: format!("invalid config file {}: {}", resolved.path.display(), e),
    })
}

/// Treat empty strings as unset.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Read an env var, treating empty values as unset.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Resolve a password from direct value, env indirection, or env var.
fn resolve_secret(
    direct: Option<&str>,
    env_key: Option<&str>,
    fallback_env: &str,
) -> Option<SecretString> {
    if let Some(val) = non_empty(direct) {
        return Some(SecretString::from(val.to_string()));
    }
    // Env indirection (e.g., password_env = "MY_SECRET")
    if let Some(val) = env_key.and_then(env_non_empty) {
        return Some(SecretString::from(val));
    }
    env_non_empty(fallback_env).map(SecretString::from)
}

fn load_profile(
    toml_config: &TomlConfig,
    name: Option<&String>,
) -> Result<TomlProfile, DashError> {
    let profile = name
        .map(|name| {
            toml_config.profiles.get(name).cloned().ok_or_else(|| DashError::Config {
                message: format!("profile '{}' not found in config file", name),
            })
        })
        .transpose()?;
    Ok(profile.unwrap_or_default())
}

fn driver_policy(profile: &TomlProfile) -> DriverPolicy {
    let defaults = DriverPolicy::default();
    DriverPolicy {
        family: non_empty(profile.driver_family.as_deref())
            .map(str::to_string)
            .unwrap_or(defaults.family),
        preferred_marker: non_empty(profile.preferred_driver.as_deref())
            .map(str::to_string)
            .unwrap_or(defaults.preferred_marker),
    }
}

/// Build AppConfig from the connection flags: CLI/env > profile > defaults.
pub fn load(
    args: &ConnectionArgs,
    show_secrets: bool,
    config_path: Option<&PathBuf>,
) -> Result<AppConfig, DashError> {
    let resolved_path = resolve_config_path(config_path);
    let toml_config = load_toml_config(resolved_path.as_ref())?;
    let profile = load_profile(&toml_config, args.profile.as_ref())?;

    let server = non_empty(args.server.as_deref())
        .or(non_empty(profile.server.as_deref()))
        .unwrap_or(DEFAULT_SERVER)
        .to_string();

    let database = non_empty(args.database.as_deref())
        .or(non_empty(profile.database.as_deref()))
        .unwrap_or(DEFAULT_DATABASE)
        .to_string();

    let windows_auth = args.windows_auth || profile.windows_auth.unwrap_or(false);

    let auth = if windows_auth {
        SqlServerAuth::WindowsIntegrated
    } else {
        let username = non_empty(args.username.as_deref())
            .or(non_empty(profile.username.as_deref()))
            .unwrap_or(DEFAULT_USERNAME)
            .to_string();

        let password = resolve_secret(
            args.password.as_deref(),
            profile.password_env.as_deref(),
            "FLIXDASH_PASSWORD",
        )
        .or_else(|| {
            non_empty(profile.password.as_deref()).map(|p| SecretString::from(p.to_string()))
        })
        .ok_or_else(|| DashError::Config {
            message: "no password specified for SQL Server SQL Auth".to_string(),
        })?;

        SqlServerAuth::SqlLogin { username, password }
    };

    let target = ConnectionTarget {
        server,
        database,
        auth,
        trust_server_certificate: profile.trust_server_certificate.unwrap_or(true),
        encrypt: args.encrypt || profile.encrypt.unwrap_or(false),
    };

    // cache ttl: CLI/ENV > TOML > 600
    let cache_ttl_secs = args
        .cache_ttl
        .or(toml_config.defaults.cache_ttl)
        .unwrap_or(DEFAULT_CACHE_TTL_SECS);

    // timeout: CLI/ENV > TOML > 60
    let query_timeout_secs = args
        .timeout
        .or(toml_config.defaults.timeout)
        .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);

    let invalidate_on_write = env_non_empty("FLIXDASH_INVALIDATE_ON_WRITE")
        .map(|v| v == "true")
        .unwrap_or(toml_config.defaults.invalidate_on_write.unwrap_or(false));

    Ok(AppConfig {
        target,
        drivers: driver_policy(&profile),
        cache_ttl: Duration::from_secs(cache_ttl_secs),
        query_timeout_secs,
        invalidate_on_write,
        show_secrets,
    })
}

/// Driver selection only; needs no credentials.
pub fn load_driver_policy(
    args: &ConnectionArgs,
    config_path: Option<&PathBuf>,
) -> Result<DriverPolicy, DashError> {
    let resolved_path = resolve_config_path(config_path);
    let toml_config = load_toml_config(resolved_path.as_ref())?;
    let profile = load_profile(&toml_config, args.profile.as_ref())?;
    Ok(driver_policy(&profile))
}

/// Whether diagnostics are on: `--verbose` or `[defaults] verbose = true`.
///
/// Read before logging is initialized, so it needs no credentials.
pub fn verbose_enabled(cli_verbose: bool, config_path: Option<&PathBuf>) -> Result<bool, DashError> {
    if cli_verbose {
        return Ok(true);
    }
    let resolved_path = resolve_config_path(config_path);
    let toml_config = load_toml_config(resolved_path.as_ref())?;
    Ok(toml_config.defaults.verbose.unwrap_or(false))
}
