use clap::Parser;
use flixdash::backend::odbc::OdbcCatalog;
use flixdash::backend::{DriverCatalog, Query, QueryResult};
use flixdash::cache::QueryCache;
use flixdash::cli::{self, Cli, Command};
use flixdash::config::{self, AppConfig};
use flixdash::connection::{self, ConnectionManager};
use flixdash::dashboard::{self, WatchRequest};
use flixdash::error::DashError;
use flixdash::executor::{QueryExecutor, RunOutput};
use flixdash::output::{self, StderrNotifier};
use flixdash::verbose::{self, Timer};
use flixdash::{format, validation};
use std::process;
use std::sync::Arc;
use tracing::{debug, info};

fn main() {
    // Load .env file (optional, ignore if missing)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    // A broken config file is reported by the command itself once it loads.
    let verbose = config::verbose_enabled(cli.verbose, cli.config.as_ref()).unwrap_or(cli.verbose);
    verbose::init(verbose);

    let result = match cli.command {
        Command::Page(ref args) => page(&cli, args),
        Command::Query(ref args) => query(&cli, args),
        Command::SimulateWatch(ref args) => simulate_watch(&cli, args),
        Command::Users => listing(&cli, dashboard::users),
        Command::Titles => listing(&cli, dashboard::titles),
        Command::Drivers => drivers(&cli),
        Command::Probe => probe(&cli),
    };

    if let Err(err) = result {
        output::print_error(&err);
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig, DashError> {
    config::load(
        &cli.connection,
        cli.show_secrets,
        cli.config.as_ref(),
    )
}

fn build_executor(app_config: AppConfig) -> Result<QueryExecutor<OdbcCatalog>, DashError> {
    let catalog = OdbcCatalog::new(app_config.show_secrets)?;
    let notifier = Arc::new(StderrNotifier);
    debug!(
        server = %app_config.target.server,
        database = %app_config.target.database,
        ttl_secs = app_config.cache_ttl.as_secs(),
        "building query executor"
    );
    let connections =
        ConnectionManager::new(catalog, app_config.target, app_config.drivers, notifier.clone());
    Ok(
        QueryExecutor::new(connections, QueryCache::new(app_config.cache_ttl), notifier)
            .with_query_timeout(app_config.query_timeout_secs)
            .with_invalidate_on_write(app_config.invalidate_on_write),
    )
}

/// Connection exhaustion is terminal: the cause was already shown inline by
/// the notifier, and no page is rendered from empty results.
fn ensure_connected<C: DriverCatalog>(executor: &mut QueryExecutor<C>) -> Result<(), DashError> {
    if executor.connections_mut().get_connection().is_some() {
        return Ok(());
    }
    Err(DashError::Connection {
        message: executor.connections().unavailable_reason().to_string(),
    })
}

fn page(cli: &Cli, args: &cli::PageArgs) -> Result<(), DashError> {
    let mut executor = build_executor(load_config(cli)?)?;

    ensure_connected(&mut executor)?;

    let timer = Timer::start();
    let rendered = dashboard::render(&mut executor, args.page, args.strict)?;
    info!(
        page = ?args.page,
        panels = rendered.panels.len(),
        elapsed_ms = timer.elapsed_ms() as u64,
        "page rendered"
    );

    output::print_result(&format::page_to_toon(&rendered)?);
    executor.close();
    Ok(())
}

fn resolve_sql(args: &cli::QueryArgs) -> Result<String, DashError> {
    if let Some(ref sql) = args.sql {
        return Ok(sql.clone());
    }
    if let Some(ref path) = args.sql_file {
        let content = std::fs::read_to_string(path).map_err(|e| DashError::Config {
            message: format!("cannot read SQL file {}: {}", path.display(), e),
        })?;
        return Ok(content);
    }
    Err(DashError::Config {
        message: "no SQL provided, use positional argument or --file".to_string(),
    })
}

fn query(cli: &Cli, args: &cli::QueryArgs) -> Result<(), DashError> {
    let sql = resolve_sql(args)?;

    if args.allow_write {
        debug!("executing query (validation skipped)");
    } else if let validation::ValidationResult::Denied { reasons } = validation::validate(&sql) {
        let detail = reasons
            .iter()
            .map(|r| r.detail.clone())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(DashError::Validation { reason: detail });
    }

    let mut executor = build_executor(load_config(cli)?)?;
    let result = executor.try_run(&Query::new(sql))?;
    let toon = format::to_toon(&result)?;

    match args.output {
        Some(ref path) => {
            output::write_file(&toon, path)?;
            output::print_result(&format::to_toon_kv(&[
                ("rows_written", &result.rows.len().to_string()),
                ("file", &path.display().to_string()),
            ]));
            println!();
        }
        None => output::print_result(&toon),
    }

    executor.close();
    Ok(())
}

fn simulate_watch(cli: &Cli, args: &cli::SimulateWatchArgs) -> Result<(), DashError> {
    let mut executor = build_executor(load_config(cli)?)?;
    let title_id = dashboard::resolve_title(&mut executor, &args.title_id)?;
    let request = WatchRequest {
        user_id: args.user_id.clone(),
        title_id,
        watch_percentage: args.percentage,
        recommendations: args.recommendations,
    };

    let outcome = dashboard::simulate_watch(&mut executor, &request)?;
    output::print_result(&format::watch_to_toon(&outcome)?);
    executor.close();
    Ok(())
}

type Listing = fn(&mut QueryExecutor<OdbcCatalog>) -> Result<Arc<QueryResult>, DashError>;

fn listing(cli: &Cli, fetch: Listing) -> Result<(), DashError> {
    let mut executor = build_executor(load_config(cli)?)?;
    let result = fetch(&mut executor)?;
    output::print_result(&format::to_toon(&result)?);
    executor.close();
    Ok(())
}

fn drivers(cli: &Cli) -> Result<(), DashError> {
    let policy = config::load_driver_policy(&cli.connection, cli.config.as_ref())?;
    let catalog = OdbcCatalog::new(cli.show_secrets)?;
    let installed = catalog.drivers()?;
    let candidates = connection::order_by_preference(
        connection::filter_family(installed, &policy.family),
        &policy.preferred_marker,
    );

    let toon = format::candidates_to_toon(&candidates)?;
    output::print_result(&toon);
    Ok(())
}

fn probe(cli: &Cli) -> Result<(), DashError> {
    let mut executor = build_executor(load_config(cli)?)?;
    let RunOutput::Sentinel(sentinel) = executor.run(None) else {
        return Err(DashError::Query {
            message: "probe returned rows".to_string(),
        });
    };

    ensure_connected(&mut executor)?;
    let driver = executor.connections().driver().unwrap_or("unknown").to_string();

    output::print_result(&format::to_toon_kv(&[("status", sentinel), ("driver", &driver)]));
    println!();
    executor.close();
    Ok(())
}
