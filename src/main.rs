use anyhow::{Context, Result};
use clap::Parser;
use protolock::compat::registry;
use protolock::config::split_list;
use protolock::{Commit, Config, Report, extend, status};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_WARNINGS: u8 = 1;
const EXIT_FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "protolock")]
#[command(
    about = "Track your .proto files and prevent changes to messages and services which impact API compatibility"
)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Initialize a proto.lock file from the current tree")]
    Init,
    #[command(about = "Rewrite the proto.lock file with the current tree if there are no conflicts")]
    Commit,
    #[command(about = "Check for breaking changes and report conflicts")]
    Status,
    #[command(about = "List the built-in rules")]
    Rules,
}

#[derive(clap::Args)]
struct Options {
    #[arg(long, global = true, help = "Enable strict mode and enforce all built-in rules [default: true]")]
    strict: Option<bool>,
    #[arg(long, global = true, help = "Enable debug output")]
    debug: bool,
    #[arg(long, global = true, help = "Comma-separated list of paths to ignore, relative to the proto root")]
    ignore: Option<String>,
    #[arg(long, global = true, help = "Rewrite the proto.lock file even if there are warnings")]
    force: bool,
    #[arg(long, global = true, help = "Comma-separated list of plugin executables")]
    plugins: Option<String>,
    #[arg(long, global = true, help = "Directory containing proto.lock")]
    lockdir: Option<PathBuf>,
    #[arg(long, global = true, help = "Root of the .proto tree")]
    protoroot: Option<PathBuf>,
    #[arg(long, global = true, help = "Comma-separated list of extra import paths")]
    includes: Option<String>,
    #[arg(long, global = true, help = "Fail status if proto.lock does not match the tree exactly")]
    uptodate: bool,
    #[arg(long, global = true, help = "YAML configuration file")]
    config: Option<PathBuf>,
}

impl Options {
    /// Loads the configuration file, if any, then applies the flags on top.
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_yaml_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => Config::default(),
        };

        if let Some(strict) = self.strict {
            config.strict = strict;
        }
        config.debug |= self.debug;
        config.force |= self.force;
        config.up_to_date |= self.uptodate;
        if let Some(ignore) = self.ignore {
            config.ignore = split_list(&ignore);
        }
        if let Some(plugins) = self.plugins {
            config.plugins = split_list(&plugins);
        }
        if let Some(includes) = self.includes {
            config.includes = split_list(&includes);
        }
        if let Some(lock_dir) = self.lockdir {
            config.lock_dir = lock_dir;
        }
        if let Some(proto_root) = self.protoroot {
            config.proto_root = proto_root;
        }

        Ok(config)
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_conflicts(report: &Report) {
    for warning in &report.warnings {
        println!("CONFLICT: {} [{}]", warning.message, warning.filepath);
    }
}

fn run(command: Commands, config: Config) -> Result<ExitCode> {
    match command {
        Commands::Init => {
            let content = status::init(&config)?;
            status::write_lock(&config, &content)?;
        }
        Commands::Commit => match status::commit(&config)? {
            Commit::Ready(content) => status::write_lock(&config, &content)?,
            Commit::Refused(report) => {
                print_conflicts(&report);
                return Ok(ExitCode::from(EXIT_WARNINGS));
            }
        },
        Commands::Status => {
            let report = status::status(&config)?;
            let report = extend::run_plugins(&config.plugins, report, config.debug)?;
            if report.has_warnings() {
                print_conflicts(&report);
                return Ok(ExitCode::from(EXIT_WARNINGS));
            }
        }
        Commands::Rules => {
            for rule in registry::rules() {
                let mode = if rule.strict_only { " (strict)" } else { "" };
                println!("{}{}: {}", rule.id, mode, rule.description);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.options.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[protolock]: {e:#}");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    init_tracing(config.debug);
    tracing::debug!(?config, "resolved configuration");

    match run(args.command, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[protolock]: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
