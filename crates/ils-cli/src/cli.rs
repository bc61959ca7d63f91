use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ils")]
#[command(about = "ILS gateway auth client — acquire tokens and call the FHIR API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Target environment (overrides ILS_ENVIRONMENT)
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Acquire an access token and print it
    Token(TokenArgs),
    /// Probe the auth chain against the configured environment
    Test,
    /// Issue an authenticated GET against the FHIR API
    Get(GetArgs),
}

#[derive(clap::Args)]
pub struct TokenArgs {
    /// Bypass the token cache and force a fresh exchange
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct GetArgs {
    /// Request path relative to the FHIR base URL (e.g. Patient/123)
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short = 'q', long = "query")]
    pub params: Vec<String>,
}
