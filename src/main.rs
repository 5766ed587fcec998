use anyhow::{anyhow, bail, Context, Result};
use neovex_query::query::{CriteriaFile, CriteriaStore, Dialect, Query, QueryBuilder, QueryMode};
use neovex_query::settings::{OutputFormat, Settings};
use neovex_query::utils::{
    log_backend, log_count, log_criteria, log_generic_error, log_migrations, log_query,
    print_json, print_table,
};
use neovex_query::ResultTable;
use std::env;
use std::fs;
use std::process;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn print_usage() {
    eprintln!("Usage: neovex-query <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  sql <criteria.ron> [mode]          Print the query without connecting");
    eprintln!("  run <criteria.ron> [mode] [--json] Execute the query and print the rows");
    eprintln!("  criteria <criteria.ron>            Print the validated criteria");
    eprintln!("  migrate                            Apply pending schema migrations");
    eprintln!();
    eprintln!("Mode (pick one, default selects rows):");
    eprintln!("  --count              Count matching rows");
    eprintln!("  --group-by a,b       Count rows per distinct column values");
    eprintln!("  --per <unit>         Count rows per year|quarter|month|week|day");
}

struct Invocation {
    criteria_path: String,
    mode: QueryMode,
    json: bool,
}

fn parse_invocation(args: &[String]) -> Result<Invocation> {
    let mut criteria_path = None;
    let mut mode = None;
    let mut json = false;
    let mut iter = args.iter();

    let set_mode = |next: QueryMode, mode: &mut Option<QueryMode>| {
        if mode.replace(next).is_some() {
            bail!("--count, --group-by and --per are mutually exclusive");
        }
        Ok(())
    };

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--count" => set_mode(QueryMode::Count, &mut mode)?,
            "--group-by" => {
                let columns = iter.next().ok_or_else(|| anyhow!("--group-by needs columns"))?;
                let columns: Vec<&str> = columns.split(',').map(str::trim).collect();
                if columns.iter().any(|c| c.is_empty()) {
                    bail!("--group-by has an empty column name");
                }
                set_mode(QueryMode::count_grouped(columns), &mut mode)?;
            }
            "--per" => {
                let unit = iter.next().ok_or_else(|| anyhow!("--per needs a unit"))?;
                set_mode(QueryMode::count_by_period(unit)?, &mut mode)?;
            }
            "--json" => json = true,
            other if other.starts_with("--") => bail!("unknown flag {other}"),
            other => {
                if criteria_path.replace(other.to_string()).is_some() {
                    bail!("only one criteria file can be given");
                }
            }
        }
    }

    Ok(Invocation {
        criteria_path: criteria_path.ok_or_else(|| anyhow!("missing criteria file"))?,
        mode: mode.unwrap_or_default(),
        json,
    })
}

fn load_criteria(path: &str) -> Result<CriteriaStore> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let criteria = CriteriaFile::from_ron(&source)?.into_criteria()?;
    Ok(criteria)
}

#[cfg(feature = "sqlite")]
fn run_sqlite(settings: &Settings, query: Option<&Query>) -> Result<Option<ResultTable>> {
    use neovex_query::db::{establish_sqlite, migrate_sqlite};

    let path = settings.database.sqlite_path.to_string_lossy();
    log_backend(Dialect::Sqlite, &path);
    let mut conn = establish_sqlite(&path)?;
    match query {
        Some(query) => Ok(Some(neovex_query::execute(&mut conn, query)?)),
        None => {
            log_migrations(migrate_sqlite(&mut conn)?);
            Ok(None)
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn run_sqlite(_settings: &Settings, _query: Option<&Query>) -> Result<Option<ResultTable>> {
    bail!("built without the sqlite feature")
}

#[cfg(feature = "postgres")]
fn run_postgres(settings: &Settings, query: Option<&Query>) -> Result<Option<ResultTable>> {
    use neovex_query::db::{establish_postgres, migrate_postgres, ConnectionConfig};

    let env_file = &settings.database.env_file;
    let config = if env_file.exists() {
        ConnectionConfig::from_env_file(env_file)?
    } else {
        ConnectionConfig::from_env()?
    };
    log_backend(
        Dialect::Postgres,
        &format!("{}:{}/{}", config.host, config.port, config.database),
    );
    match query {
        Some(query) => Ok(Some(neovex_query::executor::execute_with(&config, query)?)),
        None => {
            let mut conn = establish_postgres(&config)?;
            log_migrations(migrate_postgres(&mut conn)?);
            Ok(None)
        }
    }
}

#[cfg(not(feature = "postgres"))]
fn run_postgres(_settings: &Settings, _query: Option<&Query>) -> Result<Option<ResultTable>> {
    bail!("built without the postgres feature")
}

fn dispatch(settings: &Settings, query: Option<&Query>) -> Result<Option<ResultTable>> {
    match settings.database.backend {
        Dialect::Sqlite => run_sqlite(settings, query),
        Dialect::Postgres => run_postgres(settings, query),
    }
}

fn run(command: &str, args: &[String], settings: &Settings) -> Result<()> {
    let builder = QueryBuilder::new(settings.database.backend);
    match command {
        "sql" => {
            let invocation = parse_invocation(args)?;
            let criteria = load_criteria(&invocation.criteria_path)?;
            log_query(&builder.build(&criteria, &invocation.mode)?);
        }
        "run" => {
            let invocation = parse_invocation(args)?;
            let criteria = load_criteria(&invocation.criteria_path)?;
            let query = builder.build(&criteria, &invocation.mode)?;
            let table = dispatch(settings, Some(&query))?.unwrap_or_default();

            let json = invocation.json || settings.output.format == OutputFormat::Json;
            if json {
                print_json(&table);
            } else if let (QueryMode::Count, Some(count)) = (&invocation.mode, table.scalar_count()) {
                log_count(count);
            } else {
                print_table(&table, &settings.output);
            }
        }
        "criteria" => {
            let path = args.first().ok_or_else(|| anyhow!("missing criteria file"))?;
            log_criteria(&load_criteria(path)?);
        }
        "migrate" => {
            dispatch(settings, None)?;
        }
        other => bail!("unknown command {other}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("neovex_query=info".parse()?))
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        );
    set_global_default(subscriber)?;

    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        print_usage();
        process::exit(1);
    };
    if command == "--help" || command == "-h" {
        print_usage();
        return Ok(());
    }

    let settings = Settings::load();
    if let Err(e) = run(command, rest, &settings) {
        log_generic_error(&format!("{e:#}"));
        print_usage();
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use neovex_query::TimeUnit;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults_to_select() {
        let invocation = parse_invocation(&args(&["c.ron"])).unwrap();
        assert_eq!(invocation.criteria_path, "c.ron");
        assert_eq!(invocation.mode, QueryMode::Select);
        assert!(!invocation.json);
    }

    #[test]
    fn test_parse_modes() {
        let invocation = parse_invocation(&args(&["c.ron", "--per", "Month", "--json"])).unwrap();
        assert_eq!(invocation.mode, QueryMode::CountByPeriod(TimeUnit::Month));
        assert!(invocation.json);

        let invocation =
            parse_invocation(&args(&["--group-by", "platform,language", "c.ron"])).unwrap();
        assert_eq!(
            invocation.mode,
            QueryMode::count_grouped(["platform", "language"])
        );
    }

    #[test]
    fn test_parse_rejects_conflicts() {
        assert!(parse_invocation(&args(&["c.ron", "--count", "--per", "day"])).is_err());
        assert!(parse_invocation(&args(&["c.ron", "--per", "decade"])).is_err());
        assert!(parse_invocation(&args(&["--count"])).is_err());
        assert!(parse_invocation(&args(&["a.ron", "b.ron"])).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_group_column() {
        assert!(parse_invocation(&args(&["c.ron", "--group-by", "platform,,language"])).is_err());
        assert!(parse_invocation(&args(&["c.ron", "--group-by", "platform,"])).is_err());
        assert!(parse_invocation(&args(&["c.ron", "--group-by", ""])).is_err());

        let invocation =
            parse_invocation(&args(&["c.ron", "--group-by", "platform, language"])).unwrap();
        assert_eq!(
            invocation.mode,
            QueryMode::count_grouped(["platform", "language"])
        );
    }
}
