use std::path::PathBuf;

use clap::{ArgAction, Parser};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "ferry",
    about = "Mattermost <-> Redmine bridge: slash-command ticket creation and #t<id> link rewriting",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "FERRY_MATTERMOST_URL",
        help = "Mattermost base URL, e.g. https://chat.example.org"
    )]
    pub mattermost_url: String,

    #[arg(
        long,
        env = "FERRY_MATTERMOST_BOT_TOKEN",
        hide_env_values = true,
        help = "Bot account access token for the Mattermost REST and websocket APIs"
    )]
    pub mattermost_bot_token: String,

    #[arg(
        long,
        env = "FERRY_REDMINE_URL",
        help = "Redmine base URL, e.g. https://redmine.example.org"
    )]
    pub redmine_url: String,

    #[arg(
        long,
        env = "FERRY_REDMINE_API_KEY",
        hide_env_values = true,
        help = "Administrative Redmine API key used for impersonated sessions"
    )]
    pub redmine_api_key: String,

    #[arg(
        long,
        env = "FERRY_IDENTITY_TABLE",
        default_value = "identities.toml",
        help = "TOML file mapping Mattermost usernames to Redmine logins"
    )]
    pub identity_table: PathBuf,

    #[arg(
        long,
        env = "FERRY_BIND",
        default_value = "127.0.0.1:4000",
        help = "Host:port the slash-command HTTP server binds to"
    )]
    pub bind: String,

    #[arg(
        long,
        env = "FERRY_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for both remote platforms, in milliseconds"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        env = "FERRY_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Transport retry attempts for retryable statuses (429/5xx)"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long,
        env = "FERRY_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential transport backoff, in milliseconds"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long,
        env = "FERRY_RECONNECT_DELAY_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Delay before the watcher reconnects a dropped event socket, in milliseconds"
    )]
    pub reconnect_delay_ms: u64,

    #[arg(
        long,
        env = "FERRY_NO_WATCHER",
        action = ArgAction::SetTrue,
        help = "Serve slash commands only; do not start the channel message watcher"
    )]
    pub no_watcher: bool,
}
