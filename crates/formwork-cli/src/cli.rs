use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// How rendered output is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Html,
    Text,
    /// The output tree as JSON
    Json,
}

#[derive(Parser)]
#[command(name = "formwork")]
#[command(about = "formwork - render and inspect schema-driven UI documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses the config file value
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ./formwork.toml when present)
    #[arg(short = 'C', long, global = true, env = "FORMWORK_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a schema document
    Render {
        /// Schema JSON file
        schema: PathBuf,

        /// JSON file `{object: [records]}` served as an in-memory data source.
        /// Overrides the configured data source.
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,

        /// Locale for translated labels (overrides render.locale)
        #[arg(long)]
        locale: Option<String>,

        /// JSON catalogs `{locale: {key: text}}` for translated labels
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Exit with an error when any subtree failed or was left as a placeholder
        #[arg(long)]
        strict: bool,
    },

    /// List registered component types
    Components {
        /// Only list this namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Print the listing as JSON, including input descriptors
        #[arg(long)]
        json: bool,
    },

    /// Report node types in a schema that no renderer is registered for
    Check {
        /// Schema JSON file
        schema: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let cli = Cli::try_parse_from(["formwork", "render", "page.json"]).unwrap();
        match cli.command {
            Commands::Render {
                schema,
                data,
                format,
                locale,
                strict,
                ..
            } => {
                assert_eq!(schema, PathBuf::from("page.json"));
                assert!(data.is_none());
                assert_eq!(format, OutputFormat::Html);
                assert!(locale.is_none());
                assert!(!strict);
            }
            _ => panic!("expected render"),
        }
        assert!(!cli.verbose);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "formwork",
            "components",
            "--namespace",
            "ui",
            "--log-level",
            "debug",
            "-C",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(
            cli.command,
            Commands::Components { namespace: Some(ref ns), json: false } if ns == "ui"
        ));
    }

    #[test]
    fn test_text_format() {
        let cli =
            Cli::try_parse_from(["formwork", "render", "a.json", "--format", "text"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Render {
                format: OutputFormat::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["formwork"]).is_err());
    }
}
