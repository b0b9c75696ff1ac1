//! CLI command handlers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Method;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::console::ConsoleUi;
use super::{LogoutArgs, RequestArgs, ServiceArgs};
use crate::auth::AuthenticationUi;
use crate::config::SocialConfig;
use crate::request::ByteStream;
use crate::service::Service;
use crate::store::CredentialStore;
use crate::types::{Account, Completion};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Loaded services file plus the credential store it selects.
pub struct Context {
    config: SocialConfig,
    store: Arc<dyn CredentialStore>,
}

impl Context {
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match path {
            Some(path) => SocialConfig::load(path)?,
            None => SocialConfig::load_default()?,
        };
        config.apply_env();
        let store = config.build_store()?;
        Ok(Self { config, store })
    }

    fn service(&self, service_id: &str) -> Result<Service, Box<dyn std::error::Error>> {
        let config = self
            .config
            .service(service_id)
            .ok_or_else(|| format!("Unknown service: {service_id}"))?
            .clone();
        Ok(Service::builder(config)
            .credential_store(self.store.clone())
            .build()?)
    }
}

/// Handle `socialkit services`.
pub fn handle_services(ctx: &Context) -> CliResult {
    if ctx.config.services.is_empty() {
        println!("No services configured. Add [[services]] to ~/.socialkit/services.toml");
        return Ok(());
    }
    println!("🌐 Services (store: {})\n", ctx.store.name());
    for service in &ctx.config.services {
        let limits = &service.limits;
        println!(
            "  {} ({}) [{}] text: {}, links: {}, images: {}, files: {}",
            service.service_id,
            service.title,
            service.kind(),
            limits.max_text_length,
            limits.max_links,
            limits.max_images,
            limits.max_files,
        );
    }
    Ok(())
}

/// Handle `socialkit accounts <service>`.
pub async fn handle_accounts(ctx: &Context, args: &ServiceArgs) -> CliResult {
    let service = ctx.service(&args.service)?;
    let accounts = service.list_accounts(None).await?;
    if accounts.is_empty() {
        println!("❌ No accounts for {}. Run `socialkit login {}`", service.title(), args.service);
        return Ok(());
    }
    let now = chrono::Utc::now();
    for account in accounts {
        let status = match account.expires_at() {
            Some(expires) if expires <= now => "⚠️  expired".to_string(),
            Some(expires) => format!("✅ expires {}", expires.format("%Y-%m-%d %H:%M")),
            None => "✅".to_string(),
        };
        println!(
            "  {} ({}) {status}",
            account.id(),
            account.username().unwrap_or("-")
        );
    }
    Ok(())
}

/// Handle `socialkit login <service>`.
pub async fn handle_login(ctx: &Context, args: &ServiceArgs) -> CliResult {
    let service = ctx.service(&args.service)?;
    match service.begin_authentication(&ConsoleUi).await {
        Ok(account) => {
            println!("✅ Logged in to {} as {}", service.title(), account.id());
            Ok(())
        }
        Err(err) if err.is_cancellation() => {
            println!("Login cancelled.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Handle `socialkit logout <service> <account>`.
pub async fn handle_logout(ctx: &Context, args: &LogoutArgs) -> CliResult {
    let service = ctx.service(&args.service)?;
    let account = find_account(&service, &args.account).await?;
    service.delete_account(&account).await?;
    println!("✅ Logged out {} from {}", args.account, service.title());
    Ok(())
}

/// Handle `socialkit request ...`. Ctrl-C cancels the call.
pub async fn handle_request(ctx: &Context, args: RequestArgs) -> CliResult {
    let service = ctx.service(&args.service)?;
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())?;
    let url = url::Url::parse(&args.url)?;

    let account = match &args.account {
        Some(id) => find_account(&service, id).await?,
        None => service
            .list_accounts(Some(&ConsoleUi as &dyn AuthenticationUi))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| format!("No account available for {}", service.title()))?,
    };

    let parameters: BTreeMap<String, String> = args.params.into_iter().collect();
    let mut request = service.create_request(method, url, parameters, Some(account))?;
    for (field, path) in args.attachments {
        let path = PathBuf::from(path);
        let file = tokio::fs::File::open(&path).await?;
        let stream: ByteStream = Box::pin(ReaderStream::new(file));
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        request.add_multipart_data(field, stream, guess_mime(&path), filename);
    }

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    match request.execute(&cancel).await? {
        Completion::Completed(response) => {
            eprintln!("HTTP {}", response.status_code());
            println!("{}", response.text());
        }
        Completion::Cancelled => eprintln!("Request cancelled."),
    }
    Ok(())
}

async fn find_account(service: &Service, id: &str) -> Result<Account, Box<dyn std::error::Error>> {
    service
        .list_accounts(None)
        .await?
        .into_iter()
        .find(|account| account.id() == id)
        .ok_or_else(|| format!("No account '{id}' for {}", service.title()).into())
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_is_guessed_from_extension() {
        assert_eq!(guess_mime(Path::new("a/photo.JPG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("notes.txt")), "text/plain");
        assert_eq!(guess_mime(Path::new("blob")), "application/octet-stream");
    }
}
