use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pldbg_debug::{get_call_statement, DebuggerSettings};

#[derive(Debug, Parser)]
#[command(name = "pldbg", about = "PL/pgSQL debugger bridge tools")]
struct Cli {
    /// Settings file (defaults are used when omitted).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show how a statement would be debugged.
    Parse { sql: String },
    /// Validate a settings file and print the effective values.
    Config { path: PathBuf },
    /// Stream `SELECT * FROM <path>` from a SQLite database as text columns.
    #[cfg(feature = "sqlite")]
    Rows {
        database: PathBuf,
        path: String,
        #[arg(long, default_value_t = 1)]
        columns: usize,
    },
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("pldbg error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    // RUST_LOG overrides the level from the settings file.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = match &cli.settings {
        Some(path) => DebuggerSettings::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DebuggerSettings::default(),
    };
    init_tracing(&settings.log_level);
    match cli.command {
        Command::Parse { sql } => {
            let call = get_call_statement(&sql, &settings);
            println!("mode: {:?}", call.mode);
            if call.can_debug() {
                println!("routine: {}", call.qualified_name());
                println!("args: {}", call.args.join(" | "));
            }
        }
        Command::Config { path } => {
            let settings = DebuggerSettings::load(&path)?;
            println!("{settings:#?}");
        }
        #[cfg(feature = "sqlite")]
        Command::Rows {
            database,
            path,
            columns,
        } => rows(&database, &path, columns)?,
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn rows(database: &std::path::Path, path: &str, columns: usize) -> anyhow::Result<()> {
    use pldbg_rowset::driver::sqlite::SqliteConnection;
    use pldbg_rowset::{open, Query};
    use tracing::info;

    let mut conn = SqliteConnection::open(database)?;
    let stream = open(&Query::select_all(path), &mut conn)?.rows(|row| {
        (0..columns)
            .map(|_| row.read_string())
            .collect::<Result<Vec<_>, _>>()
    });
    let mut count = 0usize;
    for values in stream {
        println!("{}", values?.join("\t"));
        count += 1;
    }
    info!("{count} rows from {path}");
    Ok(())
}
