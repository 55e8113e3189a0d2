use std::error::Error;
use std::sync::Arc;

use lens_auth::deep_link::LinkRouter;
use lens_auth::oauth::token::{EncryptedStorage, FileStorage, Storage, Token};
use lens_auth::oauth::{AuthenticationType, Authenticator};
use log::{error, info, warn};
use secrecy::ExposeSecret;
use service::{
    config::{Action, Config},
    logging::Logger,
};

mod loopback;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let storage = build_storage(&config)?;
    let router = Arc::new(LinkRouter::new(|url| {
        println!("Open this URL in your browser to continue:\n\n  {url}\n");
        Ok(())
    }));

    // Only authorization needs the redirect listener.
    let listener = match config.action {
        Action::Authorize => {
            if config.authentication_type == AuthenticationType::Implicit {
                warn!(
                    "Implicit redirects carry the token in the URL fragment, \
                     which browsers do not send to a loopback listener"
                );
            }
            let listener = loopback::bind(config.callback_port).await?;
            info!("Listening for the authorization redirect on port {}", config.callback_port);
            Some(tokio::spawn(loopback::serve(listener, Arc::clone(&router))))
        }
        _ => None,
    };

    let authenticator =
        Authenticator::new(config.authenticator_options(), storage, router).await?;

    let result = match config.action {
        Action::Authorize => authenticator
            .authorize(&config.scope)
            .await
            .map(|token| println!("Authorized: {}", describe(&token))),
        Action::Token => authenticator
            .access_token()
            .await
            .map(|access_token| println!("{}", access_token.expose_secret())),
        Action::Refresh => authenticator
            .refresh_token()
            .await
            .map(|token| println!("Refreshed: {}", describe(&token))),
        Action::Status => {
            print!("{}: ", authenticator.options().client_id);
            match authenticator.token() {
                Some(token) if token.is_valid() => println!("Authorized: {}", describe(&token)),
                Some(token) => println!("Expired: {}", describe(&token)),
                None => println!("Not authorized"),
            }
            Ok(())
        }
        Action::SignOut => {
            authenticator.sign_out().await;
            println!("Signed out");
            Ok(())
        }
    };

    if let Some(listener) = listener {
        listener.abort();
    }
    Ok(result?)
}

fn build_storage(config: &Config) -> Result<Arc<dyn Storage>, lens_auth::Error> {
    let file = FileStorage::new(config.token_store_path.clone());
    info!("Using token store {}", file.path().display());
    match config.token_encryption_key() {
        Some(key) => Ok(Arc::new(EncryptedStorage::new(file, key)?)),
        None => Ok(Arc::new(file)),
    }
}

fn describe(token: &Token) -> String {
    let expires = token
        .expires_at()
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    let refreshable = if token.has_refresh_token() { "yes" } else { "no" };
    format!("expires {expires}, refreshable: {refreshable}")
}
