//! Command-line interface for soulprint
//! This binary parses and validates soulprint files, prints their Report or canonical form, and
//! seals files with their content Hash.
//!
//! Usage:
//!   soulprint `<path>` [--format `<format>`] [--config `<file>`]   - Validate and print the result
//!   soulprint `<path>` --seal                                   - Print the source with its Hash
//!
//! Exit status is 0 on success, 1 when the document is rejected and 2 on I/O or configuration
//! errors. Logs go to stderr; set `RUST_LOG` to see more than warnings.

use clap::{Arg, ArgAction, ArgMatches, Command};
use soulprint_config::{ConfigError, Loader, SoulprintConfig, USER_CONFIG_FILE};
use soulprint_parser::soul::formats::{document_json, render, render_report, FormatError, ReportFormat};
use soulprint_parser::soul::loader::{DocumentLoader, LoaderError};
use soulprint_parser::soul::registry::{Registry, RegistryError};
use soulprint_parser::{Document, FatalError, ParseOptions, Report};
use std::process;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const EXIT_REJECTED: i32 = 1;
const EXIT_FAILURE: i32 = 2;

/// Values accepted by `--format`
const FORMATS: [&str; 6] = [
    "report",
    "report-json",
    "report-jsonl",
    "report-yaml",
    "canonical",
    "document-json",
];

/// Parse switches that map one-to-one onto configuration keys
const FLAG_OVERRIDES: [(&str, &str); 3] = [
    ("strict", "parse.strict"),
    ("allow-expired", "parse.allow_expired_consent"),
    ("migrate", "parse.migrate_legacy"),
];

#[derive(Error, Debug)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Load(LoaderError),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("document rejected: {error}")]
    Rejected { error: FatalError, rendered: String },
}

fn main() {
    let matches = command().get_matches();
    init_tracing();

    let code = match run(&matches) {
        Ok(output) => {
            emit(&output);
            0
        }
        Err(CliError::Rejected { error, rendered }) => {
            emit(&rendered);
            eprintln!("document rejected: {error}");
            EXIT_REJECTED
        }
        Err(err) => {
            eprintln!("error: {err}");
            EXIT_FAILURE
        }
    };
    process::exit(code);
}

fn command() -> Command {
    Command::new("soulprint")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse, validate and seal soulprint files")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the .soul file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("What to print (default: the report, in the configured output format)")
                .value_parser(FORMATS),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over the built-in defaults"),
        )
        .arg(
            Arg::new("seal")
                .long("seal")
                .help("Print the source with its Hash line written, after checking it parses")
                .conflicts_with("format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Reject the document on any warning or error")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jumbo")
                .long("jumbo")
                .help("Raise the size ceiling and per-section entry caps")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("allow-expired")
                .long("allow-expired")
                .help("Accept documents whose consent has expired")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("migrate")
                .long("migrate")
                .help("Migrate legacy (v0) documents instead of rejecting them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("auth-token")
                .long("auth-token")
                .help("Auth token for restricted documents"),
        )
        .arg(
            Arg::new("creator-key")
                .long("creator-key")
                .help("Creator key for private documents"),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit(output: &str) {
    if output.is_empty() || output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
}

fn run(matches: &ArgMatches) -> Result<String, CliError> {
    let config = load_config(matches)?;
    let registry = Arc::new(config.registry()?);
    let options = parse_options(matches, &config);
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("report");
    let report_format = report_format(format, &config);

    let path = matches
        .get_one::<String>("path")
        .expect("path is a required argument");
    let loader = DocumentLoader::from_path(path).map_err(CliError::Load)?;

    if matches.get_flag("seal") {
        let sealed = loader.sealed().map_err(CliError::Load)?;
        parse_document(
            &DocumentLoader::from_string(sealed.as_str()),
            &options,
            registry,
            report_format,
        )?;
        tracing::info!(path = %path, "document sealed");
        return Ok(sealed);
    }

    let (document, report) = parse_document(&loader, &options, registry, report_format)?;
    render_output(format, &document, &report, report_format)
}

fn load_config(matches: &ArgMatches) -> Result<SoulprintConfig, ConfigError> {
    let mut loader = match matches.get_one::<String>("config") {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file(USER_CONFIG_FILE),
    };
    for (flag, key) in FLAG_OVERRIDES {
        if matches.get_flag(flag) {
            loader = loader.set_override(key, true)?;
        }
    }
    if matches.get_flag("jumbo") {
        loader = loader.set_override("parse.mode", "jumbo")?;
    }
    loader.build()
}

/// Configured options plus the per-invocation credentials
fn parse_options(matches: &ArgMatches, config: &SoulprintConfig) -> ParseOptions {
    let mut options = config.parse_options();
    if let Some(token) = matches.get_one::<String>("auth-token") {
        options = options.with_auth_token(token.as_str());
    }
    if let Some(key) = matches.get_one::<String>("creator-key") {
        options = options.with_creator_key(key.as_str());
    }
    options
}

fn report_format(format: &str, config: &SoulprintConfig) -> ReportFormat {
    match format {
        "report-json" => ReportFormat::Json,
        "report-jsonl" => ReportFormat::JsonLines,
        "report-yaml" => ReportFormat::Yaml,
        _ => config.report_format(),
    }
}

fn parse_document(
    loader: &DocumentLoader,
    options: &ParseOptions,
    registry: Arc<Registry>,
    report_format: ReportFormat,
) -> Result<(Document, Report), CliError> {
    match loader.parse_with_registry(options, registry) {
        Ok(parsed) => Ok(parsed),
        Err(LoaderError::Fatal(error)) => {
            let rendered = render_report(&error.report, report_format)?;
            Err(CliError::Rejected { error, rendered })
        }
        Err(other) => Err(CliError::Load(other)),
    }
}

fn render_output(
    format: &str,
    document: &Document,
    report: &Report,
    report_format: ReportFormat,
) -> Result<String, CliError> {
    let output = match format {
        "canonical" => render(document),
        "document-json" => document_json(document)?,
        _ => render_report(report, report_format)?,
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn flags_become_parse_options() {
        let matches = command().get_matches_from([
            "soulprint",
            "profile.soul",
            "--strict",
            "--jumbo",
            "--creator-key",
            "k3y",
        ]);
        let config = load_config(&matches).unwrap();
        let options = parse_options(&matches, &config);
        assert!(options.strict);
        assert_eq!(options.mode, soulprint_parser::Mode::Jumbo);
        assert_eq!(options.creator_key.as_deref(), Some("k3y"));
        assert!(options.auth_token.is_none());
    }

    #[test]
    fn report_formats_follow_the_flag() {
        let config = soulprint_config::load_defaults().unwrap();
        assert_eq!(report_format("report", &config), ReportFormat::Text);
        assert_eq!(report_format("report-jsonl", &config), ReportFormat::JsonLines);
        assert_eq!(report_format("canonical", &config), ReportFormat::Text);
    }
}
