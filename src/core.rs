//! Process entry: configuration, argument parsing, logging and the runtime

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::config::Config;
use crate::errors::ChainprobeError;
use crate::pipeline;
use crate::status::ExitStatus;

/// Main entry point for the CLI.
pub fn run(args: Vec<String>) -> ExitStatus {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}", e);
            Config::default()
        }
    };

    let merged_args = merge_default_options(args, &config);

    let debug = merged_args.iter().any(|a| a == "--debug");
    let traceback = merged_args.iter().any(|a| a == "--traceback") || debug;

    let parsed = match Args::try_parse_from(&merged_args) {
        Ok(args) => args,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    init_tracing(&parsed);

    // Steps run one at a time, so a single-threaded runtime is enough
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return handle_error(ChainprobeError::Io(e), traceback),
    };

    match runtime.block_on(program(parsed, config)) {
        Ok(status) => status,
        Err(e) => handle_error(e, traceback),
    }
}

pub async fn program(args: Args, config: Config) -> Result<ExitStatus, ChainprobeError> {
    if args.debug {
        eprintln!("Debug: {:?}", args);
    }

    pipeline::run_suite(&args, &config).await
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the level implied by `-v`/`--debug`. Logs go to stderr
/// so stdout carries only results.
fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed when embedded; keep it
    let _ = if args.json_output() {
        builder.json().try_init()
    } else {
        builder.with_ansi(!args.no_color && std::env::var_os("NO_COLOR").is_none()).try_init()
    };
}

/// Prepend the config file options; positional arguments before the first flag are ignored
fn merge_default_options(args: Vec<String>, config: &Config) -> Vec<String> {
    if config.default_options.is_empty() {
        return args;
    }

    // Entries before the first flag would be taken as the suite path; values
    // after a flag stay attached to it
    let first_flag = config
        .default_options
        .iter()
        .position(|opt| opt.starts_with('-'))
        .unwrap_or(config.default_options.len());
    let (positional, flags) = config.default_options.split_at(first_flag);

    if !positional.is_empty() {
        eprintln!("Warning: Positional arguments in default_options are ignored: {:?}", positional);
        eprintln!("default_options must start with a flag (starting with -).");
    }

    if flags.is_empty() {
        return args;
    }

    let mut merged = Vec::with_capacity(args.len() + flags.len());

    if let Some(program) = args.first() {
        merged.push(program.clone());
    }

    merged.extend(flags.iter().cloned());
    merged.extend(args.into_iter().skip(1));

    merged
}

fn handle_error(error: ChainprobeError, traceback: bool) -> ExitStatus {
    if traceback {
        eprintln!("Error: {:?}", error);
    } else {
        eprintln!("Error: {}", error);
    }

    ExitStatus::Error
}
