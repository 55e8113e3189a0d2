use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use lens_auth::oauth::{AuthenticationType, AuthenticatorOptions};
use log::LevelFilter;
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Path component of the loopback redirect URI served by the CLI.
pub const LOOPBACK_CALLBACK_PATH: &str = "/callback";

/// What the CLI should do once the authenticator is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Run the configured authorization flow.
    Authorize,
    /// Print a usable access token, refreshing it if needed.
    Token,
    /// Force a refresh-token exchange.
    Refresh,
    /// Report whether a valid token is held.
    Status,
    /// Forget the held token.
    SignOut,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ActionParseError;

impl FromStr for Action {
    type Err = ActionParseError;
    fn from_str(action: &str) -> Result<Action, Self::Err> {
        match action.to_lowercase().as_str() {
            "authorize" => Ok(Action::Authorize),
            "token" => Ok(Action::Token),
            "refresh" => Ok(Action::Refresh),
            "status" => Ok(Action::Status),
            "sign-out" => Ok(Action::SignOut),
            _ => Err(ActionParseError),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Authorize => write!(f, "authorize"),
            Action::Token => write!(f, "token"),
            Action::Refresh => write!(f, "refresh"),
            Action::Status => write!(f, "status"),
            Action::SignOut => write!(f, "sign-out"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The action to perform
    #[arg(
        env,
        default_value_t = Action::Status,
        value_parser = clap::builder::PossibleValuesParser::new([
            "authorize", "token", "refresh", "status", "sign-out"
        ])
            .map(|s| s.parse::<Action>().unwrap()),
    )]
    pub action: Action,

    /// The OAuth client ID registered with the provider
    #[arg(long, env)]
    pub client_id: String,

    /// The provider's authorization endpoint
    #[arg(long, env)]
    pub authorization_uri: String,

    /// The provider's token endpoint
    #[arg(long, env)]
    pub token_uri: String,

    /// A separate refresh endpoint, when the provider uses one
    #[arg(long, env)]
    pub refresh_uri: Option<String>,

    /// Client secret for confidential clients, sent as HTTP Basic credentials
    #[arg(long, env, hide_env_values = true)]
    client_secret: Option<String>,

    /// Redirect URI registered with the provider.
    /// Defaults to the loopback listener on `callback_port`.
    #[arg(long, env)]
    redirect_uri: Option<String>,

    /// Which flow to run when authorizing
    #[arg(
        long,
        env,
        default_value_t = AuthenticationType::Code,
        value_parser = clap::builder::PossibleValuesParser::new([
            "code", "implicit", "CODE", "IMPLICIT"
        ])
            .map(|s| s.parse::<AuthenticationType>().unwrap()),
    )]
    pub authentication_type: AuthenticationType,

    /// Space-separated scopes to request
    #[arg(long, env, default_value = "openid")]
    pub scope: String,

    /// File the token is persisted to
    #[arg(long, env, default_value = "tokens.json")]
    pub token_store_path: PathBuf,

    /// Hex-encoded 32-byte key; when set, stored tokens are encrypted with AES-256-GCM
    #[arg(long, env, hide_env_values = true)]
    token_encryption_key: Option<String>,

    /// Local TCP port the loopback callback listener binds to
    #[arg(long, env, default_value_t = 8765)]
    pub callback_port: u16,

    /// Seconds to wait for the authorization redirect before giving up
    #[arg(long, env)]
    pub callback_timeout_secs: Option<u64>,

    /// Set the log level verbosity threshold (level) to control what gets displayed
    /// on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new([
            "OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"
        ])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Redirect URI sent to the provider.
    pub fn redirect_uri(&self) -> String {
        self.redirect_uri.clone().unwrap_or_else(|| {
            format!(
                "http://127.0.0.1:{}{}",
                self.callback_port, LOOPBACK_CALLBACK_PATH
            )
        })
    }

    pub fn token_encryption_key(&self) -> Option<&str> {
        self.token_encryption_key.as_deref()
    }

    /// Map the configuration onto the library's authenticator options.
    pub fn authenticator_options(&self) -> AuthenticatorOptions {
        let mut options = AuthenticatorOptions::new(
            self.client_id.clone(),
            self.authorization_uri.clone(),
            self.token_uri.clone(),
            self.authentication_type,
        )
        .with_redirect_uri(self.redirect_uri());

        if let Some(refresh_uri) = &self.refresh_uri {
            options = options.with_refresh_uri(refresh_uri.clone());
        }
        if let Some(client_secret) = &self.client_secret {
            options = options.with_client_secret(SecretString::from(client_secret.clone()));
        }
        if let Some(secs) = self.callback_timeout_secs {
            options = options.with_callback_timeout(Duration::from_secs(secs));
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "lens_oauth",
        "--client-id",
        "lens-client",
        "--authorization-uri",
        "https://provider.example/authorize",
        "--token-uri",
        "https://provider.example/token",
    ];

    fn parse(extra: &[&str]) -> Config {
        let args: Vec<&str> = REQUIRED.iter().chain(extra.iter()).copied().collect();
        Config::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);

        assert_eq!(config.action, Action::Status);
        assert_eq!(config.authentication_type, AuthenticationType::Code);
        assert_eq!(config.scope, "openid");
        assert_eq!(config.token_store_path, PathBuf::from("tokens.json"));
        assert_eq!(config.callback_port, 8765);
        assert_eq!(config.log_level_filter, LevelFilter::Info);
        assert!(config.token_encryption_key().is_none());
    }

    #[test]
    fn test_action_is_positional() {
        assert_eq!(parse(&["authorize"]).action, Action::Authorize);
        assert_eq!(parse(&["sign-out"]).action, Action::SignOut);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let args: Vec<&str> = REQUIRED.iter().copied().chain(["logout"]).collect();
        assert!(Config::try_parse_from(args).is_err());
    }

    #[test]
    fn test_redirect_uri_defaults_to_loopback() {
        let config = parse(&["--callback-port", "9001"]);
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:9001/callback");

        let config = parse(&["--redirect-uri", "app://oauth"]);
        assert_eq!(config.redirect_uri(), "app://oauth");
    }

    #[test]
    fn test_authenticator_options_mapping() {
        let config = parse(&[
            "--authentication-type",
            "implicit",
            "--refresh-uri",
            "https://provider.example/refresh",
            "--client-secret",
            "secret",
            "--callback-timeout-secs",
            "30",
        ]);
        let options = config.authenticator_options();

        assert_eq!(options.client_id, "lens-client");
        assert_eq!(options.authentication_type, AuthenticationType::Implicit);
        assert_eq!(options.refresh_endpoint(), "https://provider.example/refresh");
        assert_eq!(options.redirect_uri(), "http://127.0.0.1:8765/callback");
        assert_eq!(options.callback_timeout, Some(Duration::from_secs(30)));
        assert!(options.basic_auth().is_some());
    }

    #[test]
    fn test_action_display_round_trips() {
        for action in [
            Action::Authorize,
            Action::Token,
            Action::Refresh,
            Action::Status,
            Action::SignOut,
        ] {
            assert_eq!(action.to_string().parse::<Action>(), Ok(action));
        }
    }
}
