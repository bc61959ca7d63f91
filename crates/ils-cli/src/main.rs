mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use ils_connect::{ConnectConfig, RequestOptions};
use output::{print_error, print_success, print_value};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ils_connect=debug")),
            )
            .init();
    }

    let mut config = ConnectConfig::from_env()?;
    if let Some(environment) = &cli.environment {
        config.environment = environment.parse()?;
    }

    match &cli.command {
        Commands::Token(args) => {
            let client = config.build_client()?;
            let token = client.get_access_token(args.force).await?;
            println!("{token}");
        }
        Commands::Test => {
            let client = config.build_client()?;
            let status = client.test_connection().await;
            println!("{}: {}", "Environment".cyan(), status.environment);
            if status.success {
                print_success(&status.message);
            } else {
                print_error(&status.message);
                std::process::exit(1);
            }
        }
        Commands::Get(args) => {
            let client = config.build_client()?;
            let mut options = RequestOptions::get();
            for param in &args.params {
                let (key, value) = param
                    .split_once('=')
                    .with_context(|| format!("Invalid query parameter {param:?} (expected key=value)"))?;
                options = options.with_query(key, value);
            }
            let value = client
                .make_authenticated_request(&args.path, options)
                .await?;
            print_value(&value);
        }
    }

    Ok(())
}
