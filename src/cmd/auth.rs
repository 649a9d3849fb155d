//! Account commands: `signup`, `login`, `logout`.

use anyhow::{Context, Result};
use console::style;
use dialoguer::Password;

use planpilot::client::{ApiClient, Session, SessionStore};
use planpilot::config::ClientConfig;
use planpilot::ui::icons;

/// Use the given password, or ask for one on the terminal.
fn password_or_prompt(given: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    prompt
        .interact()
        .context("Failed to read password; pass --password or set PLANPILOT_PASSWORD")
}

pub async fn cmd_signup(
    config: &ClientConfig,
    username: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_prompt(password, true)?;
    let client = ApiClient::new(&config.server_url, config.timeout)?;
    let user = client.signup(username, email, &password).await?;
    println!(
        "{} Created account {} <{}>",
        icons::CHECK,
        style(&user.username).bold(),
        user.email
    );
    println!("Run `planpilot login {}` to start using the board.", user.email);
    Ok(())
}

pub async fn cmd_login(config: &ClientConfig, email: &str, password: Option<String>) -> Result<()> {
    let password = password_or_prompt(password, false)?;
    let client = ApiClient::new(&config.server_url, config.timeout)?;
    let response = client.login(email, &password).await?;

    let store = SessionStore::new(&config.session_path);
    store.save(&Session {
        server: client.base_url().to_string(),
        token: response.token,
        user: response.user.clone(),
    })?;
    tracing::debug!(path = %store.path().display(), "session saved");

    println!(
        "{} Logged in as {} on {}",
        icons::KEY,
        style(&response.user.username).bold(),
        client.base_url()
    );
    Ok(())
}

pub fn cmd_logout(config: &ClientConfig) -> Result<()> {
    let store = SessionStore::new(&config.session_path);
    if store.clear()? {
        println!("{} Logged out", icons::CHECK);
    } else {
        println!("Not logged in.");
    }
    Ok(())
}
