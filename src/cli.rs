//! Command-line interface definition for Authlink
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the sign-in flows, session inspection,
//! the shorts feed and the theme preference.

use clap::{Parser, Subcommand};

/// Authlink - authenticated API client
///
/// Sign up, sign in and keep a session alive against the backend API.
#[derive(Parser, Debug, Clone)]
#[command(name = "authlink")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit log lines as JSON objects
    #[arg(long)]
    pub log_json: bool,

    /// Override the API base URL from config
    #[arg(long, env = "AUTHLINK_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Override the credential storage backend (file, keyring, memory)
    #[arg(long)]
    pub storage_backend: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Authlink
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new account
    SignUp {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "AUTHLINK_PASSWORD", hide_env_values = true)]
        password: String,

        /// First name
        #[arg(long)]
        first_name: Option<String>,

        /// Last name
        #[arg(long)]
        last_name: Option<String>,
    },

    /// Sign in with email and password
    SignIn {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "AUTHLINK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in with a Google OAuth credential (ID token)
    Google {
        /// Credential returned by Google Identity Services
        #[arg(long)]
        credential: String,
    },

    /// Confirm an account from the verification email
    Verify {
        /// Encoded user id from the verification link
        #[arg(long)]
        uid: String,

        /// Verification token from the verification link
        #[arg(long)]
        token: String,
    },

    /// Show the signed-in user
    Whoami,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Sign out and clear stored credentials
    SignOut,

    /// Show the local session state without calling the API
    Status,

    /// Browse the shorts feed
    Shorts {
        /// Shorts subcommand
        #[command(subcommand)]
        command: ShortsCommand,
    },

    /// Read or change the theme preference
    Theme {
        /// Theme subcommand
        #[command(subcommand)]
        command: ThemeCommand,
    },
}

/// Shorts subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ShortsCommand {
    /// List one page of shorts
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Theme subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ThemeCommand {
    /// Print the stored theme
    Get,

    /// Store a theme (light, dark, system)
    Set {
        /// Theme name
        theme: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            log_json: false,
            api_base_url: None,
            storage_backend: None,
            command: Commands::Status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.log_json);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_sign_in() {
        let cli = Cli::try_parse_from([
            "authlink",
            "sign-in",
            "--email",
            "a@b.com",
            "--password",
            "x",
        ])
        .unwrap();
        match cli.command {
            Commands::SignIn { email, password } => {
                assert_eq!(email, "a@b.com");
                assert_eq!(password, "x");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_global_overrides() {
        let cli = Cli::try_parse_from([
            "authlink",
            "--api-base-url",
            "https://api.example.com",
            "--storage-backend",
            "memory",
            "-v",
            "whoami",
        ])
        .unwrap();
        assert_eq!(cli.api_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(cli.storage_backend.as_deref(), Some("memory"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Whoami));
    }

    #[test]
    fn test_cli_parse_log_json() {
        let cli = Cli::try_parse_from(["authlink", "--log-json", "status"]).unwrap();
        assert!(cli.log_json);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_shorts_list_defaults_to_first_page() {
        let cli = Cli::try_parse_from(["authlink", "shorts", "list"]).unwrap();
        match cli.command {
            Commands::Shorts {
                command: ShortsCommand::List { page, json },
            } => {
                assert_eq!(page, 1);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_theme_set() {
        let cli = Cli::try_parse_from(["authlink", "theme", "set", "dark"]).unwrap();
        match cli.command {
            Commands::Theme {
                command: ThemeCommand::Set { theme },
            } => assert_eq!(theme, "dark"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_verify_requires_uid_and_token() {
        assert!(Cli::try_parse_from(["authlink", "verify", "--uid", "MQ"]).is_err());
    }
}
