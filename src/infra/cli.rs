use clap::Parser;

/// Storefront server.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Insert the sample users and products before starting.
    #[arg(long)]
    pub seed: bool,

    /// Apply database migrations and exit.
    #[arg(long)]
    pub migrate_only: bool,
}
