//! relfilter CLI - Compile relation filters to SQL
//!
//! Usage:
//!   relfilter compile --entity <name> --filter <json> [--schema <file>] [--dialect <dialect>]
//!   relfilter normalize --entity <name> --filter-file <file>
//!
//! Examples:
//!   relfilter compile --entity Book --filter '{"authors":{"lastName":{"ilike":"orwe%"}}}'
//!   relfilter compile --entity Book --filter-file filter.json --format inline --dialect mysql
//!   relfilter normalize --entity Book --filter '{"or":[{"id":1},{"title":"X"}]}'

use clap::{Args, Parser, Subcommand, ValueEnum};
use relfilter::config::{DatasourceSettings, Settings, SettingsError};
use relfilter::{CompileOptions, Dialect, FilterError, QueryCompiler, Schema, SchemaError};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "relfilter")]
#[command(about = "relfilter - Compile nested relation filters to SQL")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filter to SQL
    Compile {
        #[command(flatten)]
        input: FilterInput,

        /// SQL dialect of the root entity's datasource (overrides config)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        format: OutputFormat,
    },

    /// Print the normalized form of a filter
    Normalize {
        #[command(flatten)]
        input: FilterInput,
    },
}

#[derive(Args)]
struct FilterInput {
    /// Root entity the filter applies to
    #[arg(short, long)]
    entity: String,

    /// Filter as inline JSON
    #[arg(long, conflicts_with = "filter_file", required_unless_present = "filter_file")]
    filter: Option<String>,

    /// Path to a JSON file holding the filter
    #[arg(long)]
    filter_file: Option<PathBuf>,

    /// Path to the schema file (.toml or .json); defaults to `schema` in config
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Path to the config file; defaults to the usual search locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail on unknown properties instead of dropping them
    #[arg(long)]
    reject_unknown: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Duckdb,
    Mysql,
    Tsql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Tsql => Dialect::TSql,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// SQL with placeholders, followed by the bound values
    Sql,
    /// SQL with values rendered in place (diagnostics only)
    Inline,
    /// JSON document with sql, params and dialect
    Json,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Filter(#[from] FilterError),

    #[error("Failed to read filter file '{path}': {source}")]
    FilterFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid filter JSON: {0}")]
    FilterJson(#[from] serde_json::Error),

    #[error("No schema given: pass --schema or set `schema` in the config file")]
    NoSchema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            input,
            dialect,
            format,
        } => cmd_compile(input, dialect, format),
        Commands::Normalize { input } => cmd_normalize(input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn cmd_compile(
    input: FilterInput,
    dialect: Option<DialectArg>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let (mut settings, schema, filter) = load(&input)?;

    if let Some(dialect) = dialect.map(Dialect::from) {
        if let Some(entity) = schema.entities.get(&input.entity) {
            settings
                .datasources
                .entry(entity.datasource.clone())
                .and_modify(|ds| ds.dialect = dialect)
                .or_insert_with(|| DatasourceSettings::new(dialect));
        }
    }

    let compiled = compiler(&schema, &settings, input.reject_unknown).compile(&input.entity, &filter)?;

    match format {
        OutputFormat::Sql => {
            println!("{}", compiled.sql());
            if !compiled.params().is_empty() {
                println!("-- params: {}", serde_json::to_string(compiled.params())?);
            }
        }
        OutputFormat::Inline => println!("{}", compiled.to_inline_sql()),
        OutputFormat::Json => {
            let document = json!({
                "sql": compiled.sql(),
                "params": compiled.params(),
                "dialect": compiled.dialect(),
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(())
}

fn cmd_normalize(input: FilterInput) -> Result<(), CliError> {
    let (settings, schema, filter) = load(&input)?;
    let normalized = compiler(&schema, &settings, input.reject_unknown).normalize(&input.entity, &filter)?;
    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}

fn compiler<'a>(schema: &'a Schema, settings: &'a Settings, reject_unknown: bool) -> QueryCompiler<'a> {
    let mut options = CompileOptions::default();
    if reject_unknown {
        options = options.with_reject_unknown_properties(true);
    }
    QueryCompiler::new(schema, settings).with_options(options)
}

fn load(input: &FilterInput) -> Result<(Settings, Schema, Value), CliError> {
    let settings = match &input.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    let schema_path = match &input.schema {
        Some(path) => path.clone(),
        None => settings.schema_path()?.ok_or(CliError::NoSchema)?,
    };
    let schema = Schema::from_file(&schema_path)?;

    let raw = match (&input.filter, &input.filter_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|source| CliError::FilterFile {
            path: path.clone(),
            source,
        })?,
        (None, None) => "{}".to_string(),
    };
    let filter = serde_json::from_str(&raw)?;

    log::debug!(
        "Loaded schema {} with {} entities",
        schema_path.display(),
        schema.entities.len()
    );
    Ok((settings, schema, filter))
}
