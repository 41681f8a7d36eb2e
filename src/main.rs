//! Authlink - authenticated API client CLI
//!
#![doc = "Main entry point for the Authlink command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use authlink::cli::{Cli, Commands, ShortsCommand, ThemeCommand};
use authlink::commands;
use authlink::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.log_json);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::SignUp {
            email,
            password,
            first_name,
            last_name,
        } => {
            tracing::info!("Starting sign-up");
            commands::session::sign_up(&config, email, password, first_name, last_name).await
        }
        Commands::SignIn { email, password } => {
            tracing::info!("Starting sign-in");
            commands::session::sign_in(&config, &email, &password).await
        }
        Commands::Google { credential } => {
            tracing::info!("Starting Google sign-in");
            commands::session::sign_in_with_google(&config, &credential).await
        }
        Commands::Verify { uid, token } => commands::session::verify(&config, &uid, &token).await,
        Commands::Whoami => commands::session::whoami(&config).await,
        Commands::Refresh => commands::session::refresh(&config).await,
        Commands::SignOut => commands::session::sign_out(&config).await,
        Commands::Status => commands::session::status(&config),
        Commands::Shorts { command } => match command {
            ShortsCommand::List { page, json } => commands::shorts::list(&config, page, json).await,
        },
        Commands::Theme { command } => match command {
            ThemeCommand::Get => commands::theme::get(&config),
            ThemeCommand::Set { theme } => commands::theme::set(&config, &theme),
        },
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "authlink=debug" } else { "authlink=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
