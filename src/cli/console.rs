//! Terminal stand-in for a browsing surface.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use crate::auth::{AuthenticationUi, AuthorizationPrompt, UiOutcome};

/// Prints the authorize URL and reads the redirected URL from stdin.
/// An empty line cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleUi;

#[async_trait]
impl AuthenticationUi for ConsoleUi {
    async fn present(&self, prompt: &AuthorizationPrompt) -> UiOutcome {
        println!("🔗 Visit: {}", prompt.authorize_url);
        println!(
            "📋 After authorizing, paste the URL starting with {} (empty line cancels):",
            prompt.redirect.redirect_url()
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => return UiOutcome::Cancelled,
            };
            let line = line.trim();
            if line.is_empty() {
                return UiOutcome::Cancelled;
            }
            match Url::parse(line) {
                Ok(url) if prompt.redirect.matches(&url) => return UiOutcome::Redirected(url),
                Ok(_) => eprintln!("⚠️  That URL does not match the redirect URL, try again:"),
                Err(e) => eprintln!("⚠️  Not a URL ({e}), try again:"),
            }
        }
    }
}
