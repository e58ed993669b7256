//! Handlers for the `clinic` subcommands.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;

use super::{LoginArgs, RequestArgs};
use crate::auth::{FileSessionStore, TokenClaims};
use crate::client::{ApiClient, Payload, RequestOptions};
use crate::config::ClientConfig;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Build a client over the on-disk session for `profile`.
pub fn build_client(profile: Option<&str>) -> Result<ApiClient, Box<dyn std::error::Error>> {
    let config = ClientConfig::load()?;
    let mut store = FileSessionStore::new_default();
    if let Some(profile) = profile {
        store = store.with_profile(profile);
    }
    let client = ApiClient::new(config)?
        .with_store(Arc::new(store))
        .with_navigator(Arc::new(|_route: &str| {
            eprintln!("Session expired. Run `clinic auth login <username>` to sign in again.");
        }));
    Ok(client)
}

/// Handle `clinic auth login`.
pub async fn handle_login(client: &ApiClient, args: &LoginArgs) -> CommandResult {
    let profile = client.auth().login(&args.username, &args.password).await?;
    println!("Signed in as {}", profile.display_name());
    if let Some(role) = profile.primary_role() {
        println!("   Role: {role}");
    }
    if profile.password_change_required {
        println!("   A password change is required before using the clinic.");
    }
    Ok(())
}

/// Handle `clinic auth status`.
pub async fn handle_status(client: &ApiClient) -> CommandResult {
    let Some(token) = client.store().access_token()? else {
        println!("Not signed in");
        return Ok(());
    };

    match client.auth().current_profile()? {
        Some(profile) => println!("Signed in as {}", profile.display_name()),
        None => println!("Signed in"),
    }
    match TokenClaims::decode(&token) {
        Ok(claims) => {
            let remaining = claims.seconds_remaining(Utc::now());
            if remaining > 0 {
                println!("   Access token expires in {}m {}s", remaining / 60, remaining % 60);
            } else {
                println!("   Access token expired; it is refreshed on the next request");
            }
        }
        Err(e) => println!("   Access token unreadable: {e}"),
    }
    println!("   Backend: {}", client.config().base_url);
    Ok(())
}

/// Handle `clinic auth logout`.
pub async fn handle_logout(client: &ApiClient) -> CommandResult {
    client.auth().logout()?;
    println!("Signed out");
    Ok(())
}

/// Handle `clinic request`.
pub async fn handle_request(client: &ApiClient, args: &RequestArgs) -> CommandResult {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())?;
    let mut options = RequestOptions::new().method(method);
    if let Some(data) = &args.data {
        let body: serde_json::Value = serde_json::from_str(data)?;
        options = options.json(&body)?;
    }

    match client
        .request::<serde_json::Value>(&args.endpoint, options)
        .await?
    {
        Payload::Content(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Payload::NoContent => println!("(no content)"),
    }
    Ok(())
}
