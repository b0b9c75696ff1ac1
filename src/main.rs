//! socialkit CLI binary entry point.

use socialkit::cli::commands::{self, Context};
use socialkit::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_tracing();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Services => commands::handle_services(&ctx),
        Commands::Accounts(args) => commands::handle_accounts(&ctx, &args).await,
        Commands::Login(args) => commands::handle_login(&ctx, &args).await,
        Commands::Logout(args) => commands::handle_logout(&ctx, &args).await,
        Commands::Request(args) => commands::handle_request(&ctx, args).await,
    }
}

fn init_tracing() {
    // RUST_LOG wins; otherwise socialkit at info, dependencies at warn
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("socialkit=info,warn"));

    // stdout carries response bodies
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
