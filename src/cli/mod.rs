//! CLI entry point for socialkit.

pub mod commands;
pub mod console;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// socialkit CLI
#[derive(Parser, Debug)]
#[command(name = "socialkit", version, about = "Authenticated social service requests")]
pub struct Cli {
    /// Services file (defaults to ~/.socialkit/services.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured services and their capabilities
    Services,
    /// List stored accounts for a service
    Accounts(ServiceArgs),
    /// Sign in to a service in the browser
    Login(ServiceArgs),
    /// Forget a stored account
    Logout(LogoutArgs),
    /// Send an authenticated request
    Request(RequestArgs),
}

#[derive(Parser, Debug)]
pub struct ServiceArgs {
    /// Service id from the services file
    pub service: String,
}

#[derive(Parser, Debug)]
pub struct LogoutArgs {
    pub service: String,
    /// Account id to forget
    pub account: String,
}

#[derive(Parser, Debug)]
pub struct RequestArgs {
    pub service: String,
    /// HTTP method (GET, POST, ...)
    pub method: String,
    pub url: String,

    /// Request parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Multipart file as field=path (repeatable)
    #[arg(long = "attach", value_parser = parse_key_value)]
    pub attachments: Vec<(String, String)>,

    /// Account id to use (defaults to the first account)
    #[arg(long)]
    pub account: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_services() {
        let cli = Cli::try_parse_from(["socialkit", "services"]).unwrap();
        assert!(matches!(cli.command, Commands::Services));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_login_with_config() {
        let cli =
            Cli::try_parse_from(["socialkit", "login", "facebook", "--config", "/tmp/s.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        match cli.command {
            Commands::Login(args) => assert_eq!(args.service, "facebook"),
            other => panic!("expected Login, got {other:?}"),
        }
    }

    #[test]
    fn parse_request_with_params_and_attachments() {
        let cli = Cli::try_parse_from([
            "socialkit",
            "request",
            "flickr",
            "post",
            "https://up.flickr.com/services/upload/",
            "-p",
            "title=Sunset",
            "--param",
            "tags=sky=blue",
            "--attach",
            "photo=./sunset.jpg",
            "--account",
            "alice",
        ])
        .unwrap();
        match cli.command {
            Commands::Request(args) => {
                assert_eq!(args.method, "post");
                assert_eq!(
                    args.params,
                    vec![
                        ("title".to_string(), "Sunset".to_string()),
                        ("tags".to_string(), "sky=blue".to_string()),
                    ]
                );
                assert_eq!(
                    args.attachments,
                    vec![("photo".to_string(), "./sunset.jpg".to_string())]
                );
                assert_eq!(args.account.as_deref(), Some("alice"));
            }
            other => panic!("expected Request, got {other:?}"),
        }
    }

    #[test]
    fn malformed_param_is_error() {
        assert!(Cli::try_parse_from(["socialkit", "request", "x", "GET", "https://a", "-p", "=v"])
            .is_err());
        assert!(
            Cli::try_parse_from(["socialkit", "request", "x", "GET", "https://a", "-p", "novalue"])
                .is_err()
        );
    }

    #[test]
    fn parse_logout_missing_account_is_error() {
        assert!(Cli::try_parse_from(["socialkit", "logout", "facebook"]).is_err());
    }
}
