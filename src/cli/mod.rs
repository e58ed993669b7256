//! CLI for the clinic records API.

pub mod commands;

use clap::{Parser, Subcommand};

/// Clinic API CLI
#[derive(Parser, Debug)]
#[command(name = "clinic", version, about = "Command-line client for the clinic records API")]
pub struct Cli {
    /// Session profile name (stored as session.<profile>.toml)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// Send an authenticated request and print the JSON response
    Request(RequestArgs),
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in and store the session
    Login(LoginArgs),
    /// Show the stored session
    Status,
    /// Forget the stored session
    Logout,
}

/// Arguments for `clinic auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    pub username: String,

    /// Password; read from CLINIC_PASSWORD when omitted
    #[arg(long, env = "CLINIC_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments for `clinic request`.
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Endpoint relative to the base URL, e.g. /patients?page=0
    pub endpoint: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,
}
