//! cachetrigger - cache refresh trigger for Kafka
//!
#![doc = "Main entry point for the cachetrigger consumer."]

use std::future::Future;

use cachetrigger::cli::{Cli, Commands};
use cachetrigger::commands;
use cachetrigger::config::Config;
use cachetrigger::error::{exit_code_for, Result, EXIT_CONFIG};
use cachetrigger::logging::{init_logging, startup_subscriber};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Logging is configured by the file, so loading warnings use a stderr subscriber
    let loaded = tracing::subscriber::with_default(startup_subscriber(), || {
        Config::load(&cli.config)
    });
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(e) = init_logging(&config.logging, cli.verbose) {
        eprintln!("Error: failed to initialize logging: {:#}", e);
        std::process::exit(EXIT_CONFIG);
    }

    tracing::debug!(config = %cli.config.display(), "Loaded configuration");

    // Execute command. The descriptor is written before any runtime thread exists.
    let result = match cli.command {
        Commands::Run { dry_run } => {
            tracing::info!("Starting consumer mode");
            commands::run::prepare(&config).and_then(|descriptor_path| {
                block_on(commands::run::run_consumer(config, descriptor_path, dry_run))
            })
        }
        Commands::Provision => {
            tracing::info!("Starting topic provisioning");
            block_on(commands::provision::provision_topic(config))
        }
        Commands::Credentials { print_path } => {
            commands::credentials::write_credentials(config, print_path)
        }
    };

    if let Err(e) = result {
        let code = exit_code_for(&e);
        tracing::error!(exit_code = code, error = %format!("{:#}", e), "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(code);
    }
}

fn block_on<F>(future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}
