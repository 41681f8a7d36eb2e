//! Account and session command handlers

use anyhow::Result;
use colored::Colorize;

use crate::auth::credential_store::Credential;
use crate::auth::service::SignUpRequest;
use crate::client::AuthlinkClient;
use crate::commands::explain;
use crate::config::Config;

/// Create an account
pub async fn sign_up(
    config: &Config,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    let request = SignUpRequest {
        email,
        password,
        first_name,
        last_name,
    };
    let user = client.auth().sign_up(&request).await.map_err(explain)?;

    println!("{} {}", "Account created:".green(), user.email);
    println!("Check your inbox for the verification link, then run `authlink verify`.");
    Ok(())
}

/// Sign in with email and password
pub async fn sign_in(config: &Config, email: &str, password: &str) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    let credential = client
        .auth()
        .sign_in(email, password)
        .await
        .map_err(explain)?;

    println!("{} {}", "Signed in as".green(), email.cyan());
    print_expiry(&credential);
    Ok(())
}

/// Sign in with a Google credential
pub async fn sign_in_with_google(config: &Config, credential: &str) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    let stored = client
        .auth()
        .sign_in_with_google(credential)
        .await
        .map_err(explain)?;

    println!("{}", "Signed in with Google".green());
    print_expiry(&stored);
    Ok(())
}

/// Confirm an account
pub async fn verify(config: &Config, uid: &str, token: &str) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    client
        .auth()
        .verify_account(uid, token)
        .await
        .map_err(explain)?;

    println!("{}", "Account verified. You can now sign in.".green());
    Ok(())
}

/// Print the signed-in user
pub async fn whoami(config: &Config) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    let user = client.auth().current_user().await.map_err(explain)?;

    println!("\nSigned-in User\n");
    println!("Name:      {}", user.display_name());
    println!("Email:     {}", user.email);
    println!("ID:        {}", user.id);
    if let Some(verified) = user.is_verified {
        println!("Verified:  {}", if verified { "yes" } else { "no" });
    }
    println!();
    Ok(())
}

/// Force an access token refresh
pub async fn refresh(config: &Config) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    client.auth().refresh().await.map_err(explain)?;

    println!("{}", "Access token refreshed.".green());
    print_expiry(&client.store().get());
    Ok(())
}

/// Sign out and clear stored tokens
pub async fn sign_out(config: &Config) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    client.auth().sign_out().await.map_err(explain)?;

    println!("{}", "Signed out.".green());
    Ok(())
}

/// Print the local session state
pub fn status(config: &Config) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    let credential = client.store().get();

    println!("\nSession Status\n");
    println!("API:            {}", config.api.base_url);
    println!("Storage:        {}", config.storage.backend);
    println!("State:          {}", client.store().state());
    println!(
        "Access token:   {}",
        presence(credential.access_token.is_some())
    );
    println!(
        "Refresh token:  {}",
        presence(credential.refresh_token.is_some())
    );
    print_expiry(&credential);
    println!();
    Ok(())
}

fn presence(present: bool) -> String {
    if present {
        "present".green().to_string()
    } else {
        "absent".yellow().to_string()
    }
}

fn print_expiry(credential: &Credential) {
    if let Some(expires_at) = credential.access_expires_at() {
        println!(
            "Access token expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
}
