use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use reqwest::Method;
use std::sync::Arc;

use kkom_client::api::{AccountApi, SignInRequest};
use kkom_client::auth::AuthClient;
use kkom_client::config::{CliArgs, Command, Config, LogFormat};
use kkom_client::http_client::ReqwestTransport;
use kkom_client::session::{Session, SessionStore, SqliteSessionStore};
use kkom_client::transport::ApiRequest;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments first (for log level), so configuration warnings are logged
    let args = CliArgs::load();
    init_logging(&args.log_level, LogFormat::parse(&args.log_format));

    let command = args.command.clone();
    let config = Config::from_args(args)?;
    config.validate()?;

    tracing::debug!("API base URL: {}", config.api_url);
    tracing::debug!("Refresh policy: {:?}", config.refresh_policy);

    let store: Arc<dyn SessionStore> = Arc::new(
        SqliteSessionStore::open(&config.session_db_file).with_context(|| {
            format!(
                "Failed to open session store: {}",
                config.session_db_file.display()
            )
        })?,
    );

    let transport = Arc::new(ReqwestTransport::new(
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);

    let client = Arc::new(
        AuthClient::new(config.api_url.clone(), transport, store.clone())?
            .with_refresh_policy(config.refresh_policy)
            .with_access_token_max_age(config.access_token_max_age),
    );

    let session = Session::new(
        store,
        config.access_token_max_age,
        config.refresh_token_max_age,
    );

    match command {
        Command::Login { email } => {
            let email = match email {
                Some(email) => email,
                None => Input::new()
                    .with_prompt("Email")
                    .interact_text()
                    .context("Failed to read email")?,
            };
            let password = Password::new()
                .with_prompt("Password")
                .interact()
                .context("Failed to read password")?;

            let accounts = AccountApi::new(client, session, config.provider_redirects.clone());
            match accounts.sign_in(&SignInRequest { email, password }).await {
                Ok(payload) => {
                    let nickname = payload.user["nickname"].as_str().unwrap_or("unknown");
                    println!("✅ Logged in as {}", nickname);
                }
                Err(e) => fail(&e),
            }
        }

        Command::Request {
            method,
            path,
            data,
            no_auth,
        } => {
            let method: Method = method
                .to_uppercase()
                .parse()
                .with_context(|| format!("Invalid HTTP method: {}", method))?;

            let mut request = ApiRequest::new(method, client.endpoint(&path)?);
            if let Some(data) = data {
                let body: serde_json::Value =
                    serde_json::from_str(&data).context("--data must be valid JSON")?;
                request = request.json(&body)?;
            }
            if !no_auth {
                request = request.with_credentials();
            }

            // A replay after refresh comes back unmapped
            match client.send(&request).await.and_then(|r| r.error_for_status()) {
                Ok(response) => println!("{}", response.text()),
                Err(e) => fail(&e),
            }
        }

        Command::Status => {
            if session.is_authenticated().await? {
                let fresh = if session.has_access_token().await? {
                    "valid"
                } else {
                    "expired, will refresh on next request"
                };
                println!("Logged in (access token {})", fresh);
            } else {
                println!("Not logged in");
            }
        }

        Command::Logout => {
            session.clear().await?;
            println!("👋 Logged out");
        }
    }

    Ok(())
}

/// Initialize the stderr subscriber; `RUST_LOG` overrides the configured level
fn init_logging(log_level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Report a client failure and exit non-zero
fn fail(err: &kkom_client::ClientError) -> ! {
    tracing::error!("{}", err);
    eprintln!("❌ {}", err.user_message());
    std::process::exit(1);
}
