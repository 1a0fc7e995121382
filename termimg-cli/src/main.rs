// ABOUTME: Main entry point for the termimg CLI application
// ABOUTME: Loads configuration, builds the backend registry and dispatches subcommands

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use termimg_cli::cli::{Cli, Commands};
use termimg_cli::commands::{self, Hold, RawModeGuard, RegionHost};
use termimg_cli::completions::{generate_completions, installation_instructions};
use termimg_cli::config::Config;
use termimg_cli::constants::env;
use termimg_cli::detection;
use termimg_cli::output::{InfoReport, JsonFormatter, OutputFormat, TableFormatter};
use termimg_sdk::{
    BackendContext, DisplayRequest, GeometryProvider, ImageError, Registry, TerminalGeometry,
};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        if let Some(help) = e.downcast_ref::<ImageError>().and_then(ImageError::help_text) {
            eprintln!();
            eprintln!("{}", help);
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}

fn run(cli: Cli) -> Result<()> {
    let use_color = !cli.no_color
        && std::env::var_os(env::NO_COLOR).is_none()
        && std::env::var(env::TERM).unwrap_or_default() != "dumb"
        && io::stdout().is_terminal();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate_completions(shell, &mut cmd, &mut io::stdout());
            if io::stdout().is_terminal() {
                eprintln!("{}", installation_instructions());
            }
            Ok(())
        }
        Commands::Size { ref path } => match commands::header_size(path)? {
            Some((width, height)) => {
                println!("{}x{}", width, height);
                Ok(())
            }
            None => anyhow::bail!(
                "{}: not a PNG, GIF or JPEG file, or its header is truncated",
                path.display()
            ),
        },
        Commands::Methods => {
            let config = load_config(&cli)?;
            let registry = Registry::with_defaults(BackendContext::new(config.display_settings()));
            let keys: Vec<&str> = registry.keys().collect();
            let detected = detection::detect();
            let output = TableFormatter::new(use_color)
                .format_methods(&keys, detected.method.as_deref())?;
            println!("{}", output);
            Ok(())
        }
        Commands::Info { json } => {
            let report = InfoReport::new(detection::detect(), query_window());
            let output = if json {
                JsonFormatter::new(true).format_info(&report)?
            } else {
                TableFormatter::new(use_color).format_info(&report)?
            };
            println!("{}", output);
            Ok(())
        }
        Commands::Draw {
            ref path,
            region,
            ref method,
            hold_ms,
        } => {
            let config = load_config(&cli)?;
            let method =
                commands::resolve_method(method.as_deref(), &config, &detection::detect())?;
            let path = path
                .canonicalize()
                .with_context(|| format!("Image not found: {}", path.display()))?;
            let request = DisplayRequest::new(path, region.area());

            let host = Arc::new(RegionHost::new());
            let registry = Registry::with_defaults(
                BackendContext::new(config.display_settings()).with_host(host.clone()),
            );

            let _raw = RawModeGuard::enable()?;
            let mut stdout = io::stdout();
            commands::draw_session(
                &registry,
                &method,
                &host,
                &mut stdout,
                &request,
                Hold::from(hold_ms),
            )?;
            stdout.flush()?;
            Ok(())
        }
        Commands::Clear { region, ref method } => {
            let config = load_config(&cli)?;
            let method =
                commands::resolve_method(method.as_deref(), &config, &detection::detect())?;

            let host = Arc::new(RegionHost::new());
            let registry = Registry::with_defaults(
                BackendContext::new(config.display_settings()).with_host(host.clone()),
            );

            let mut stdout = io::stdout();
            commands::clear_session(&registry, &method, &host, &mut stdout, region.area())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn query_window() -> Option<termimg_sdk::WindowGeometry> {
    match TerminalGeometry::new().window() {
        Ok(window) => Some(window),
        Err(e) => {
            log::debug!("Window size query failed: {}", e);
            None
        }
    }
}
