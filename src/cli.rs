use crate::dashboard::Page;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flixdash", about = "Streaming analytics dashboard over SQL Server")]
pub struct Cli {
    /// Path to config file
    #[arg(short = 'c', long, global = true, env = "FLIXDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit diagnostics to stderr
    #[arg(short = 'v', long, global = true, env = "FLIXDASH_VERBOSE")]
    pub verbose: bool,

    /// Disable credential masking in diagnostics
    #[arg(long, global = true, env = "FLIXDASH_SHOW_SECRETS")]
    pub show_secrets: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a dashboard page
    Page(PageArgs),

    /// Run an ad-hoc query (read-only unless --allow-write)
    Query(QueryArgs),

    /// Record a watch event and show the user's updated stats and recommendations
    #[command(name = "simulate-watch")]
    SimulateWatch(SimulateWatchArgs),

    /// List users available to the watch simulation
    Users,

    /// List titles available to the watch simulation
    Titles,

    /// List installed SQL Server drivers in connection preference order
    Drivers,

    /// Connect and report the driver in use
    Probe,
}

/// Connection target overrides, shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// SQL Server host and port
    #[arg(short = 's', long, global = true, env = "FLIXDASH_SERVER")]
    pub server: Option<String>,

    /// Database name
    #[arg(short = 'd', long, global = true, env = "FLIXDASH_DATABASE")]
    pub database: Option<String>,

    /// SQL Auth username
    #[arg(short = 'u', long, global = true, env = "FLIXDASH_USERNAME")]
    pub username: Option<String>,

    /// SQL Auth password
    #[arg(short = 'p', long, global = true, env = "FLIXDASH_PASSWORD")]
    pub password: Option<String>,

    /// Use Windows Integrated Auth
    #[arg(short = 'w', long, global = true, env = "FLIXDASH_WINDOWS_AUTH")]
    pub windows_auth: bool,

    /// Require encryption on the connection
    #[arg(long, global = true, env = "FLIXDASH_ENCRYPT")]
    pub encrypt: bool,

    /// Cache time-to-live in seconds (default: 600)
    #[arg(long, global = true, env = "FLIXDASH_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Query timeout in seconds (default: 60)
    #[arg(short = 't', long, global = true, env = "FLIXDASH_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Config file profile name
    #[arg(short = 'P', long, global = true, env = "FLIXDASH_PROFILE")]
    pub profile: Option<String>,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// Page to render
    #[arg(value_enum)]
    pub page: Page,

    /// Fail on the first panel whose query errors instead of showing it empty
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// SQL query text
    pub sql: Option<String>,

    /// Read SQL from file
    #[arg(short = 'f', long = "file", conflicts_with = "sql")]
    pub sql_file: Option<PathBuf>,

    /// Skip read-only validation
    #[arg(long, env = "FLIXDASH_ALLOW_WRITE")]
    pub allow_write: bool,

    /// Write results to file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SimulateWatchArgs {
    /// User identifier
    #[arg(long = "user")]
    pub user_id: String,

    /// Title identifier or exact title name
    #[arg(long = "title")]
    pub title_id: String,

    /// Percentage of the title watched
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub percentage: u8,

    /// Number of recommendations to return
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub recommendations: u32,
}
