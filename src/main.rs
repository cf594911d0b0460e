use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camera_session::cli::{self, Args, Command, PreviewArgs};
use camera_session::config::Config;
use clap::Parser;

/// Set up the Ctrl+C handler that ends a running preview.
fn setup_ctrlc_handler(stop: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

/// Initialise logging. `RUST_LOG` wins over `-v` flags, which win over the
/// config file.
fn init_logging(verbose: u8, config_level: &str) {
    let level = match verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn main() {
    let args = Args::parse();

    // Config errors are reported after logging is up, so load first and
    // fall back to defaults for the log level.
    let loaded = Config::load(args.config.as_deref());
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(args.verbose, &level);

    let config = match loaded {
        Ok(c) => c,
        Err(e) if args.config.is_some() => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            log::warn!("Failed to load config file: {}", e);
            log::warn!("Using default settings.");
            Config::default()
        }
    };

    let result = match args.command {
        Some(Command::ListCameras) => {
            cli::list_cameras();
            Ok(())
        }
        Some(Command::Config { action }) => {
            cli::handle_config_action(action, &config, args.config.as_deref())
        }
        Some(Command::Preview(preview)) => run_preview(&config, &preview),
        None => run_preview(&config, &PreviewArgs::default()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_preview(config: &Config, preview: &PreviewArgs) -> Result<(), Box<dyn std::error::Error>> {
    let stop = Arc::new(AtomicBool::new(false));
    if let Err(e) = setup_ctrlc_handler(Arc::clone(&stop)) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }
    let summary = cli::preview(config, preview, stop)?;
    println!(
        "{} frame(s) received, {} dropped, final camera: {}",
        summary.received, summary.dropped, summary.final_position
    );
    Ok(())
}
