use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use research_resolver::config::{find_config_file, get_config, load_config, Config};
use research_resolver::models::{PartialRecord, Query};
use research_resolver::sources::{ProviderRegistry, ResolveError};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Resolver - Resolve bibliographic metadata from multiple providers
#[derive(Parser, Debug)]
#[command(name = "research-resolver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve bibliographic metadata for a publication from scholarly providers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Plain text on a terminal, JSON otherwise
    Auto,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> OutputFormat {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Plain,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look up one publication with one provider
    #[command(alias = "l")]
    Lookup {
        /// Provider to query (europepmc, openaire, repec, semanticscholar, unpaywall, dimensions, ssrn)
        #[arg(long, short)]
        provider: String,

        /// Publication title
        #[arg(long, short)]
        title: Option<String>,

        /// Publication DOI
        #[arg(long, short)]
        doi: Option<String>,

        /// Provider-specific identifier (RePEc handle, Semantic Scholar id, Dimensions id, SSRN URL)
        #[arg(long = "id", short = 'i')]
        identifier: Option<String>,
    },

    /// Exact-phrase full-text search (Dimensions)
    #[command(name = "full-text")]
    FullText {
        #[arg(long, short, default_value = "dimensions")]
        provider: String,

        /// Phrase to search for
        term: String,
    },

    /// List available providers
    Providers,

    /// Show the effective configuration with secrets redacted
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("research_resolver={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load(&cli)?;
    let format = cli.output.resolve();

    match cli.command {
        Commands::Lookup {
            provider,
            title,
            doi,
            identifier,
        } => {
            let query = Query::new(title, doi, identifier)?;
            let registry = ProviderRegistry::from_config(&config)?;

            match registry.lookup(&query, &provider).await {
                Ok(Some(record)) => output_record(&record, format)?,
                Ok(None) => {
                    if !cli.quiet {
                        println!("No metadata found");
                    }
                }
                Err(err @ ResolveError::UnknownProvider(_)) => {
                    let known: Vec<&str> = registry.ids().collect();
                    return Err(err).with_context(|| format!("available providers: {}", known.join(", ")));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Commands::FullText { provider, term } => {
            let registry = ProviderRegistry::from_config(&config)?;
            let hits = registry.full_text_search(&term, &provider).await?;

            if hits.is_empty() {
                if !cli.quiet {
                    println!("No metadata found");
                }
            } else {
                output_hits(&hits, format)?;
            }
        }

        Commands::Providers => {
            let registry = ProviderRegistry::from_config(&config)?;
            match format {
                OutputFormat::Json => {
                    let providers: Vec<Value> = registry
                        .all()
                        .map(|p| {
                            serde_json::json!({
                                "id": p.id(),
                                "name": p.name(),
                                "capabilities": p.capabilities().labels(),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&providers)?);
                }
                _ => {
                    for provider in registry.all() {
                        println!(
                            "{:<16} {:<18} {}",
                            provider.id().bold(),
                            provider.name(),
                            provider.capabilities().labels().join(", ").dimmed()
                        );
                    }
                }
            }
        }

        Commands::ShowConfig => {
            let mut shown = config.clone();
            shown.credentials = config.credentials.redacted();
            print!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

/// Load configuration from `--config`, a discovered file, or defaults
fn load(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config {
        load_config(path).with_context(|| format!("failed to load {}", path.display()))?
    } else if let Some(path) = find_config_file() {
        tracing::info!("Using config file: {}", path.display());
        load_config(&path).with_context(|| format!("failed to load {}", path.display()))?
    } else {
        get_config()
    };

    if let Some(timeout) = cli.timeout {
        config.http.timeout_seconds = timeout;
    }
    Ok(config)
}

fn output_record(record: &PartialRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        _ => {
            for (key, value) in record.iter() {
                println!("{:<14} {}", key.cyan().bold(), plain_value(value));
            }
        }
    }
    Ok(())
}

fn output_hits(hits: &[Value], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(hits)?),
        _ => {
            for hit in hits {
                let title = hit.get("title").and_then(Value::as_str).unwrap_or("(untitled)");
                println!("{}", title.bold());
                if let Some(doi) = hit.get("doi").and_then(Value::as_str) {
                    println!("  DOI: {}", doi);
                }
            }
            println!("{} hits", hits.len());
        }
    }
    Ok(())
}

/// Render a field value on one line
fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => match (obj.get("name"), obj.get("affiliation")) {
                    (Some(Value::String(name)), Some(Value::String(affiliation))) => {
                        format!("{} ({})", name, affiliation)
                    }
                    (Some(Value::String(name)), _) => name.clone(),
                    _ => item.to_string(),
                },
                other => plain_value(other),
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_lookup_command() {
        let cli = Cli::try_parse_from([
            "research-resolver",
            "lookup",
            "--provider",
            "europepmc",
            "--title",
            "Deal or no deal?",
        ])
        .unwrap();

        match cli.command {
            Commands::Lookup {
                provider,
                title,
                doi,
                identifier,
            } => {
                assert_eq!(provider, "europepmc");
                assert_eq!(title.as_deref(), Some("Deal or no deal?"));
                assert!(doi.is_none());
                assert!(identifier.is_none());
            }
            _ => panic!("Expected Lookup command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "research-resolver",
            "-vv",
            "--output",
            "json",
            "--timeout",
            "5",
            "lookup",
            "-p",
            "unpaywall",
            "--doi",
            "10.1/x",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.timeout, Some(5));
    }

    #[test]
    fn test_cli_full_text_defaults_to_dimensions() {
        let cli = Cli::try_parse_from(["research-resolver", "full-text", "price promotions"]).unwrap();
        match cli.command {
            Commands::FullText { provider, term } => {
                assert_eq!(provider, "dimensions");
                assert_eq!(term, "price promotions");
            }
            _ => panic!("Expected FullText command"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["research-resolver"]).is_err());
    }

    #[test]
    fn test_plain_value() {
        let authors = serde_json::json!([{"name": "A", "affiliation": "U"}, {"name": "B"}]);
        assert_eq!(plain_value(&authors), "A (U); B");
        assert_eq!(plain_value(&serde_json::json!(["x", "y"])), "x; y");
        assert_eq!(plain_value(&serde_json::json!(true)), "true");
    }
}
