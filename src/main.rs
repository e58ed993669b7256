//! Clinic CLI binary entry point.

use clap::Parser;
use clinic_client::cli::commands;
use clinic_client::cli::{AuthCommands, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match commands::build_client(cli.profile.as_deref()) {
        Ok(client) => match &cli.command {
            Commands::Auth(auth_args) => match &auth_args.command {
                AuthCommands::Login(args) => commands::handle_login(&client, args).await,
                AuthCommands::Status => commands::handle_status(&client).await,
                AuthCommands::Logout => commands::handle_logout(&client).await,
            },
            Commands::Request(args) => commands::handle_request(&client, args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
