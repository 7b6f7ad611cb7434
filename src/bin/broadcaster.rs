//! Broadcaster Application
//!
//! Captures the azaan from the default microphone and streams it to the
//! relay over TLS. The group registry's live flag is synced best-effort: a
//! failed status update never blocks the broadcast itself.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use azaan_streamer::{
    auth::AuthClient,
    config::AppConfig,
    net::StreamSender,
    registry::RegistryClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting azaan broadcaster");

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args
        .next()
        .unwrap_or_else(|| "9443".to_string())
        .parse()
        .context("Invalid relay port")?;
    let group_id = args.next().unwrap_or_default();

    let mut config = load_config()?;
    config.stream.host = host;
    config.stream.port = port;

    // Status sync is advisory; run without it when credentials are absent
    let mut status = match status_clients(&config).await {
        Ok(clients) => clients,
        Err(e) => {
            tracing::warn!("Live-status sync disabled: {}", e);
            None
        }
    };

    let mut sender = StreamSender::new(config.stream.clone());
    sender
        .start()
        .context("Failed to start the broadcast stream")?;
    tracing::info!(
        "Broadcasting live to {}:{}",
        config.stream.host,
        config.stream.port
    );

    set_live(&mut status, &group_id, true).await;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Stopping broadcast");

    sender.stop();
    set_live(&mut status, &group_id, false).await;

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let path = std::env::var("AZAAN_CONFIG").unwrap_or_else(|_| "azaan.toml".to_string());
    let mut config = AppConfig::load_or_default(std::path::Path::new(&path))?;

    if let Ok(api_key) = std::env::var("AZAAN_API_KEY") {
        config.auth.api_key = api_key;
    }
    if let Ok(project_id) = std::env::var("AZAAN_PROJECT_ID") {
        config.registry.project_id = project_id;
    }
    if let Ok(ca_cert) = std::env::var("AZAAN_CA_CERT") {
        config.stream.ca_cert = Some(ca_cert.into());
    }
    Ok(config)
}

/// Log in and build the registry client used for the live flag
async fn status_clients(config: &AppConfig) -> Result<Option<(AuthClient, RegistryClient)>> {
    let mut auth = AuthClient::new(&config.auth)?;
    let registry = RegistryClient::new(&config.registry)?;

    let email = std::env::var("AZAAN_EMAIL").context("AZAAN_EMAIL is not set")?;
    let password = std::env::var("AZAAN_PASSWORD").context("AZAAN_PASSWORD is not set")?;
    let session = auth.login(&email, &password).await?;
    tracing::info!("Signed in as {}", session.email);

    Ok(Some((auth, registry)))
}

/// Best-effort live flag update; failures are logged, never propagated
async fn set_live(status: &mut Option<(AuthClient, RegistryClient)>, group_id: &str, live: bool) {
    if group_id.is_empty() {
        return;
    }
    let Some((auth, registry)) = status else {
        return;
    };

    let result = async {
        let token = auth.require_token().await?;
        registry.set_group_live(&token, group_id, live).await?;
        Ok::<(), azaan_streamer::Error>(())
    }
    .await;

    match result {
        Ok(()) => tracing::info!("Marked {} live={}", group_id, live),
        Err(e) => tracing::warn!("Live flag update failed for {}: {}", group_id, e),
    }
}
