mod bootstrap_helpers;
mod cli_args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use ferry_access::IdentityDirectory;
use ferry_bridge::{
    run_command_server, Bridge, CommandServerConfig, MessageWatcher, SessionBroker,
};
use ferry_mattermost::{ChatGateway, MattermostApiClient, MattermostClientConfig};
use ferry_redmine::{RedmineApiClient, RedmineClientConfig, TrackerGateway};

use bootstrap_helpers::init_tracing;
use cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let directory = Arc::new(IdentityDirectory::load(&cli.identity_table).with_context(|| {
        format!(
            "failed to load identity table {}",
            cli.identity_table.display()
        )
    })?);
    tracing::info!(
        entries = directory.snapshot().len(),
        path = %cli.identity_table.display(),
        "identity table loaded"
    );

    let tracker_client = RedmineApiClient::new(RedmineClientConfig {
        base_url: cli.redmine_url.clone(),
        admin_api_key: cli.redmine_api_key.clone(),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })
    .context("failed to construct the Redmine client")?;
    let tracker_base_url = tracker_client.base_url().to_string();
    let tracker: Arc<dyn TrackerGateway> = Arc::new(tracker_client);

    let chat_client = MattermostApiClient::new(MattermostClientConfig {
        base_url: cli.mattermost_url.clone(),
        bot_token: cli.mattermost_bot_token.clone(),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })
    .context("failed to construct the Mattermost client")?;
    let chat: Arc<dyn ChatGateway> = Arc::new(chat_client.clone());

    let broker = SessionBroker::new(tracker);
    let bridge = Bridge::new(
        Arc::clone(&directory),
        broker.clone(),
        Arc::clone(&chat),
        &tracker_base_url,
    );
    let server_config = CommandServerConfig {
        bind: cli.bind.clone(),
    };

    if cli.no_watcher {
        tracing::info!("watcher disabled; serving slash commands only");
        return run_command_server(server_config, bridge).await;
    }

    let bot_user_id = chat
        .bot_user_id()
        .await
        .context("failed to resolve the bridge's own chat account")?;
    let watcher = MessageWatcher::new(
        directory,
        broker,
        chat,
        &tracker_base_url,
        bot_user_id,
    );
    let reconnect_delay = Duration::from_millis(cli.reconnect_delay_ms);

    tokio::try_join!(
        run_command_server(server_config, bridge),
        watcher.run(&chat_client, reconnect_delay),
    )?;
    Ok(())
}
