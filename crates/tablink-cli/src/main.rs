//! `tablink`: move tables between SQLite, CSV and JSON files.

mod job;

use anyhow::{Result, bail};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tablink_core::{Endpoint, Properties, PropertiesExt, Registry, Transfer, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tablink",
    version,
    about = "Move tables between SQLite databases and text formats",
    after_help = r#"EXAMPLES
  $ tablink formats
  $ tablink convert -i people.db -q "SELECT * FROM people" -o people.csv
  $ tablink convert -i people.csv -o people.db --table people --row-labels
  $ tablink convert --job nightly.toml --set dest.delimiter=";""#
)]
struct Cli {
    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available formats
    Formats,

    /// Import a table from one format and export it to another
    Convert(ConvertArgs),

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Source format (default: from the input file extension)
    #[arg(long)]
    from: Option<String>,

    /// Destination format (default: from the output file extension)
    #[arg(long)]
    to: Option<String>,

    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// SQL statement to run against a sqlite source
    #[arg(short, long)]
    query: Option<String>,

    /// Destination table for a sqlite destination
    #[arg(long)]
    table: Option<String>,

    /// Rows to export: `all`, or comma-separated indices and tag/label names
    #[arg(long, value_name = "SELECTOR")]
    rows: Option<String>,

    /// Columns to export: `all`, or comma-separated indices and tag/label names
    #[arg(long, value_name = "SELECTOR")]
    columns: Option<String>,

    /// Export row labels as a leading `_rowId` column
    #[arg(long)]
    row_labels: bool,

    /// Extra connector option, e.g. `dest.delimiter=;` (value read as JSON if it parses)
    #[arg(long = "set", value_name = "SIDE.KEY=VALUE", value_parser = parse_setting)]
    settings: Vec<Setting>,

    /// TOML job file with [source] and [dest] tables; flags override it
    #[arg(long, value_name = "PATH")]
    job: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Dest,
}

#[derive(Debug, Clone)]
struct Setting {
    side: Side,
    key: String,
    value: Value,
}

fn parse_setting(raw: &str) -> Result<Setting, String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SIDE.KEY=VALUE, got {raw:?}"))?;
    let (side, key) = path
        .split_once('.')
        .ok_or_else(|| format!("expected SIDE.KEY=VALUE, got {raw:?}"))?;
    let side = match side {
        "source" | "src" => Side::Source,
        "dest" | "dst" => Side::Dest,
        other => return Err(format!("unknown side {other:?} (use source or dest)")),
    };
    if key.is_empty() {
        return Err(format!("empty option name in {raw:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(Setting {
        side,
        key: key.to_string(),
        value,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", report(&err));
            ExitCode::FAILURE
        }
    }
}

/// The error and its causes on one line, skipping a cause whose text the
/// previous message already ends with.
fn report(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if !message.ends_with(&cause) {
            message.push_str(": ");
            message.push_str(&cause);
        }
    }
    message
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_registry() -> Registry {
    let mut registry = Registry::new();
    #[cfg(feature = "sqlite")]
    tablink_sqlite::register_all(&mut registry);
    #[cfg(feature = "text")]
    tablink_text::register_all(&mut registry);
    registry
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Formats => {
            let registry = build_registry();
            for connector in registry.iter() {
                let decl = connector.decl();
                println!("{:<8} {}", decl.name, decl.description);
            }
            Ok(())
        }
        Command::Convert(args) => convert(&build_registry(), args),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tablink", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn convert(registry: &Registry, args: ConvertArgs) -> Result<()> {
    let job = match &args.job {
        Some(path) => job::load(path)?,
        None => job::Job::default(),
    };
    let mut source = job.source.properties()?;
    let mut dest = job.dest.properties()?;

    if let Some(path) = &args.input {
        source.insert("path".into(), path_value(path));
    }
    if let Some(query) = args.query {
        source.insert("query".into(), query.into());
    }
    if let Some(path) = &args.output {
        dest.insert("path".into(), path_value(path));
    }
    if let Some(table) = args.table {
        dest.insert("table".into(), table.into());
    }
    if let Some(rows) = args.rows {
        dest.insert("rows".into(), rows.into());
    }
    if let Some(columns) = args.columns {
        dest.insert("columns".into(), columns.into());
    }
    if args.row_labels {
        dest.insert("row_labels".into(), true.into());
    }
    for setting in args.settings {
        let target = match setting.side {
            Side::Source => &mut source,
            Side::Dest => &mut dest,
        };
        target.insert(setting.key, setting.value);
    }

    let from = resolve_format(args.from.or(job.source.format), &source, "source", "--from")?;
    let to = resolve_format(args.to.or(job.dest.format), &dest, "destination", "--to")?;
    tracing::debug!(%from, %to, "resolved formats");

    let source = Endpoint::new(from, source);
    let dest = Endpoint::new(to, dest);
    let (_, stats) = Transfer::new(registry).run(&source, &dest)?;

    println!(
        "{}: {} rows, {} columns -> {}",
        source.format, stats.rows, stats.columns, dest.format
    );
    Ok(())
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

fn resolve_format(
    explicit: Option<String>,
    options: &Properties,
    side: &str,
    flag: &str,
) -> Result<String> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    match options.get_str("path").map(Path::new).and_then(format_for_path) {
        Some(format) => Ok(format.to_string()),
        None => bail!("cannot tell the {side} format; pass {flag} or set `format` in the job file"),
    }
}

/// Format implied by a file extension.
fn format_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "db" | "sqlite" | "sqlite3" => Some("sqlite"),
        "csv" => Some("csv"),
        "json" => Some("json"),
        _ => None,
    }
}
